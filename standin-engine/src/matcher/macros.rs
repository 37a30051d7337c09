//! Panicking assertion macros built on [Matchers][super::Matchers], for test code.

/// Assert that a double was called at least once
#[macro_export]
macro_rules! assert_called {
    ( $double:expr ) => {{
        if let Err(error) = $crate::matcher::Matchers::default().was_called(&$double) {
            panic!("{error}");
        }
    }};
}

/// Assert that a double was called exactly the given number of times
#[macro_export]
macro_rules! assert_called_times {
    ( $double:expr, $times:expr ) => {{
        if let Err(error) =
            $crate::matcher::Matchers::default().was_called_times(&$double, $times)
        {
            panic!("{error}");
        }
    }};
}

/// Assert that some call of a double was given structurally equal arguments
#[macro_export]
macro_rules! assert_called_with {
    ( $double:expr $(, $arg:expr)* $(,)? ) => {{
        let expected: Vec<$crate::entities::Value> =
            vec![$($crate::entities::Value::from($arg)),*];
        if let Err(error) =
            $crate::matcher::Matchers::default().was_called_with(&$double, &expected)
        {
            panic!("{error}");
        }
    }};
}

/// Assert that the last call of a double was given structurally equal arguments
#[macro_export]
macro_rules! assert_last_called_with {
    ( $double:expr $(, $arg:expr)* $(,)? ) => {{
        let expected: Vec<$crate::entities::Value> =
            vec![$($crate::entities::Value::from($arg)),*];
        if let Err(error) =
            $crate::matcher::Matchers::default().was_last_called_with(&$double, &expected)
        {
            panic!("{error}");
        }
    }};
}

/// Assert that two values are structurally equal
#[macro_export]
macro_rules! assert_equals {
    ( $actual:expr, $expected:expr ) => {{
        let actual = $crate::entities::Value::from($actual);
        let expected = $crate::entities::Value::from($expected);
        if let Err(error) = $crate::matcher::Matchers::default().equals(&actual, &expected) {
            panic!("{error}");
        }
    }};
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use crate::args;
    use crate::double::Double;

    #[test]
    fn macros_pass_on_matching_history() {
        let double = Double::named("sum");
        double.returning(100);
        double.invoke(args![1, 2]).unwrap();
        double.invoke(args![2, 2]).unwrap();

        assert_called!(double);
        assert_called_times!(double, 2);
        assert_called_with!(double, 1, 2);
        assert_last_called_with!(double, 2, 2);
        assert_equals!(json!({"a": [1, 2]}), json!({"a": [1, 2]}));
    }

    #[test]
    #[should_panic(expected = "assertion `was_called_times` failed")]
    fn macro_panics_with_the_failure_description() {
        let double = Double::named("sub");
        double.invoke(args![9, 4]).unwrap();

        assert_called_times!(double, 2);
    }
}
