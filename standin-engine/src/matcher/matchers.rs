use std::thread;
use std::time::Duration;

use futures::channel::oneshot;
use futures::future::{select, Either};
use slog::{debug, Logger};

use crate::double::Double;
use crate::entities::{CallRecord, FutureValue, Settlement, Value};
use crate::equality::EqualityEngine;
use crate::logging::{discard_logger, LoggerExtensions};

use super::{AssertionFailure, MatcherError};

/// Result of a matcher predicate
pub type MatchResult = Result<(), MatcherError>;

/// Assertion predicates over doubles, values and futures.
#[derive(Clone)]
pub struct Matchers {
    equality: EqualityEngine,
    settle_timeout: Option<Duration>,
    logger: Logger,
}

impl Matchers {
    /// Create matchers comparing values with the given engine
    pub fn new(equality: EqualityEngine, logger: &Logger) -> Self {
        Self {
            equality,
            settle_timeout: None,
            logger: logger.new_with_component_name::<Self>(),
        }
    }

    /// Bound used by asynchronous matchers called without one, `None` waits without bound
    pub fn with_settle_timeout(mut self, settle_timeout: Option<Duration>) -> Self {
        self.settle_timeout = settle_timeout;
        self
    }

    /// Bound used by asynchronous matchers called without one
    pub fn settle_timeout(&self) -> Option<Duration> {
        self.settle_timeout
    }

    /// Engine used for structural comparisons
    pub fn equality(&self) -> &EqualityEngine {
        &self.equality
    }

    fn failure(&self, failure: AssertionFailure) -> MatcherError {
        debug!(self.logger, "Assertion failed"; "operation" => failure.operation);
        failure.into()
    }

    fn fail(&self, failure: AssertionFailure) -> MatchResult {
        Err(self.failure(failure))
    }

    /// The double was called at least once
    pub fn was_called(&self, double: &Double) -> MatchResult {
        if double.count() > 0 {
            return Ok(());
        }
        self.fail(AssertionFailure::new(
            "was_called",
            format!("`{}` to have been called", double.name()),
            describe_history(&double.records()),
        ))
    }

    /// The double was called exactly `times` times
    pub fn was_called_times(&self, double: &Double, times: usize) -> MatchResult {
        let count = double.count();
        if count == times {
            return Ok(());
        }
        self.fail(AssertionFailure::new(
            "was_called_times",
            format!("`{}` to have been called {times} time(s)", double.name()),
            format!("{count} call(s): {}", describe_history(&double.records())),
        ))
    }

    /// Some call of the double was given arguments structurally equal to `args`
    pub fn was_called_with(&self, double: &Double, args: &[Value]) -> MatchResult {
        if double.any_call_matches(&self.equality, args)? {
            return Ok(());
        }
        self.fail(AssertionFailure::new(
            "was_called_with",
            format!("`{}` called with {}", double.name(), describe_args(args)),
            describe_history(&double.records()),
        ))
    }

    /// The most recent call of the double was given arguments structurally equal to `args`
    pub fn was_last_called_with(&self, double: &Double, args: &[Value]) -> MatchResult {
        let expected = format!("`{}` last called with {}", double.name(), describe_args(args));
        match double.last_record() {
            Ok(record) => self.compare_call("was_last_called_with", expected, args, &record),
            Err(error) => self.fail(AssertionFailure::new(
                "was_last_called_with",
                expected,
                error,
            )),
        }
    }

    /// The `nth` call (starting at 1) of the double was given arguments structurally equal
    /// to `args`
    pub fn was_nth_called_with(&self, double: &Double, nth: usize, args: &[Value]) -> MatchResult {
        let expected = format!(
            "`{}` call #{nth} with {}",
            double.name(),
            describe_args(args)
        );
        match nth.checked_sub(1).map(|index| double.record_at(index)) {
            Some(Ok(record)) => self.compare_call("was_nth_called_with", expected, args, &record),
            Some(Err(error)) => self.fail(AssertionFailure::new(
                "was_nth_called_with",
                expected,
                error,
            )),
            None => self.fail(AssertionFailure::new(
                "was_nth_called_with",
                expected,
                "calls are numbered from 1",
            )),
        }
    }

    fn compare_call(
        &self,
        operation: &'static str,
        expected: String,
        args: &[Value],
        record: &CallRecord,
    ) -> MatchResult {
        match self.equality.explain_all(args, &record.args)? {
            None => Ok(()),
            mismatch => self.fail(
                AssertionFailure::new(operation, expected, record).with_mismatch(mismatch),
            ),
        }
    }

    /// Some call of the double returned, or resolved to, a value structurally equal to
    /// `expected`
    pub fn returned_with(&self, double: &Double, expected: &Value) -> MatchResult {
        for outcome in double.results() {
            if let Some(value) = outcome.value() {
                if self.equality.equal_to(expected, value)? {
                    return Ok(());
                }
            }
        }
        self.fail(AssertionFailure::new(
            "returned_with",
            format!("`{}` to have returned {expected}", double.name()),
            describe_history(&double.records()),
        ))
    }

    /// The actual value is structurally equal to the expected one
    pub fn equals(&self, actual: &Value, expected: &Value) -> MatchResult {
        match self.equality.explain(expected, actual)? {
            None => Ok(()),
            mismatch => self.fail(
                AssertionFailure::new("equals", expected, actual).with_mismatch(mismatch),
            ),
        }
    }

    /// The actual value is the same as the expected one, by identity
    pub fn is_same_as(&self, actual: &Value, expected: &Value) -> MatchResult {
        if EqualityEngine::same_as(actual, expected) {
            return Ok(());
        }
        self.fail(AssertionFailure::new("is_same_as", expected, actual))
    }

    /// The future resolves to a value structurally equal to `expected`.
    ///
    /// `bound` falls back to the settle timeout of the matchers. Without any bound the wait is
    /// unbounded: a future that never settles blocks the caller. With a bound, the wait is
    /// abandoned once it elapses but the future itself keeps going.
    ///
    /// Any executor can drive the wait. Inside a Tokio runtime the bound is measured with the
    /// runtime timer, elsewhere with a sleeping thread.
    pub async fn resolves_to(
        &self,
        actual: Value,
        expected: &Value,
        bound: Option<Duration>,
    ) -> MatchResult {
        const OPERATION: &str = "resolves_to";
        let future = self.expect_future(OPERATION, actual)?;
        match self.settle(OPERATION, future, bound).await? {
            Ok(value) => match self.equality.explain(expected, &value)? {
                None => Ok(()),
                mismatch => self.fail(
                    AssertionFailure::new(OPERATION, expected, format!("resolved {value}"))
                        .with_mismatch(mismatch),
                ),
            },
            Err(error) => self.fail(AssertionFailure::new(
                OPERATION,
                format!("resolution to {expected}"),
                format!("rejected {error}"),
            )),
        }
    }

    /// The future rejects with an error whose message contains `message_fragment`.
    ///
    /// Bounding follows the same rules as [Matchers::resolves_to].
    pub async fn rejects_with(
        &self,
        actual: Value,
        message_fragment: &str,
        bound: Option<Duration>,
    ) -> MatchResult {
        const OPERATION: &str = "rejects_with";
        let future = self.expect_future(OPERATION, actual)?;
        match self.settle(OPERATION, future, bound).await? {
            Err(error) if error.message_contains(message_fragment) => Ok(()),
            Err(error) => self.fail(AssertionFailure::new(
                OPERATION,
                format!("rejection with a message containing {message_fragment:?}"),
                format!("rejected {error}"),
            )),
            Ok(value) => self.fail(AssertionFailure::new(
                OPERATION,
                format!("rejection with a message containing {message_fragment:?}"),
                format!("resolved {value}"),
            )),
        }
    }

    fn expect_future(
        &self,
        operation: &'static str,
        actual: Value,
    ) -> Result<FutureValue, MatcherError> {
        match actual {
            Value::Future(future) => Ok(future),
            other => Err(self.failure(AssertionFailure::new(operation, "a future", other))),
        }
    }

    async fn settle(
        &self,
        operation: &'static str,
        future: FutureValue,
        bound: Option<Duration>,
    ) -> Result<Settlement, MatcherError> {
        let Some(bound) = bound.or(self.settle_timeout) else {
            return Ok(future.await);
        };
        let settlement = if tokio::runtime::Handle::try_current().is_ok() {
            tokio::time::timeout(bound, future).await.ok()
        } else {
            match select(future, elapse_after(bound)).await {
                Either::Left((settlement, _)) => Some(settlement),
                Either::Right(_) => None,
            }
        };

        settlement.ok_or_else(|| {
            debug!(self.logger, "Assertion timed out"; "operation" => operation, "bound" => ?bound);
            MatcherError::Timeout { operation, bound }
        })
    }
}

/// Completes once `bound` elapsed, without relying on any runtime timer
fn elapse_after(bound: Duration) -> oneshot::Receiver<()> {
    let (sender, receiver) = oneshot::channel();
    thread::spawn(move || {
        thread::sleep(bound);
        let _ = sender.send(());
    });

    receiver
}

impl Default for Matchers {
    fn default() -> Self {
        Self::new(EqualityEngine::default(), &discard_logger())
    }
}

fn describe_args(args: &[Value]) -> String {
    Value::list(args.iter().cloned()).to_string()
}

fn describe_history(records: &[CallRecord]) -> String {
    if records.is_empty() {
        return "no call recorded".to_string();
    }
    records
        .iter()
        .map(|record| record.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use crate::args;
    use crate::entities::{ThrownError, ValueCell};
    use crate::equality::ComparisonError;

    use super::*;

    fn called_double() -> Double {
        let double = Double::with_implementation(|args| {
            Ok(Value::from(100 + args[0].as_i64().unwrap_or_default()))
        });
        for arg in [1, 2, 3] {
            double.invoke(args![arg]).unwrap();
        }
        double
    }

    #[test]
    fn was_called_fails_on_a_fresh_double() {
        let matchers = Matchers::default();
        let double = Double::named("fetch");

        let error = matchers.was_called(&double).unwrap_err();

        let failure = error.as_assertion().unwrap();
        assert_eq!("was_called", failure.operation);
        assert_eq!("no call recorded", failure.actual);

        double.invoke(args![]).unwrap();
        matchers.was_called(&double).unwrap();
    }

    #[test]
    fn was_called_times_requires_an_exact_count() {
        let matchers = Matchers::default();
        let double = called_double();

        matchers.was_called_times(&double, 3).unwrap();
        matchers.was_called_times(&double, 2).unwrap_err();
        matchers.was_called_times(&double, 4).unwrap_err();
    }

    #[test]
    fn was_called_with_matches_any_call() {
        let matchers = Matchers::default();
        let double = called_double();

        matchers.was_called_with(&double, &args![1]).unwrap();
        matchers.was_called_with(&double, &args![2]).unwrap();
        let error = matchers.was_called_with(&double, &args![4]).unwrap_err();

        let failure = error.as_assertion().unwrap();
        assert!(failure.actual.contains("#0 (1) returned 101"), "{failure}");
    }

    #[test]
    fn was_called_with_is_shape_sensitive() {
        let matchers = Matchers::default();
        let double = Double::new();
        double.invoke(args![1, json!({"a": 1})]).unwrap();

        matchers
            .was_called_with(&double, &args![1, json!({"a": 1})])
            .unwrap();
        matchers
            .was_called_with(&double, &args![1, json!({"a": "1"})])
            .unwrap_err();
        matchers
            .was_called_with(&double, &args![json!({"a": 1}), 1])
            .unwrap_err();
    }

    #[test]
    fn was_last_called_with_only_looks_at_the_last_call() {
        let matchers = Matchers::default();
        let double = called_double();

        matchers.was_last_called_with(&double, &args![3]).unwrap();
        let error = matchers
            .was_last_called_with(&double, &args![1])
            .unwrap_err();

        let failure = error.as_assertion().unwrap();
        assert_eq!(
            Some("at $[0]: expected 1, received 3".to_string()),
            failure.difference
        );
    }

    #[test]
    fn was_last_called_with_fails_without_history() {
        let matchers = Matchers::default();

        let error = matchers
            .was_last_called_with(&Double::new(), &args![])
            .unwrap_err();

        assert_eq!("No call recorded", error.as_assertion().unwrap().actual);
    }

    #[test]
    fn was_nth_called_with_counts_from_one() {
        let matchers = Matchers::default();
        let double = called_double();

        matchers.was_nth_called_with(&double, 1, &args![1]).unwrap();
        matchers.was_nth_called_with(&double, 3, &args![3]).unwrap();
        matchers.was_nth_called_with(&double, 0, &args![1]).unwrap_err();
        matchers.was_nth_called_with(&double, 4, &args![1]).unwrap_err();
    }

    #[test]
    fn returned_with_looks_at_every_result() {
        let matchers = Matchers::default();
        let double = called_double();

        matchers.returned_with(&double, &Value::from(102)).unwrap();
        matchers.returned_with(&double, &Value::from(104)).unwrap_err();
    }

    #[test]
    fn equals_is_structural() {
        let matchers = Matchers::default();
        let actual = Value::from(json!({"id": 1, "name": "xiejie"}));

        matchers
            .equals(&actual, &Value::from(json!({"id": 1, "name": "xiejie"})))
            .unwrap();
        let error = matchers
            .equals(&actual, &Value::from(json!({"id": 2, "name": "xiejie"})))
            .unwrap_err();

        let failure = error.as_assertion().unwrap();
        assert_eq!(
            Some("at $.id: expected 2, received 1".to_string()),
            failure.difference
        );
    }

    #[test]
    fn is_same_as_compares_references() {
        let matchers = Matchers::default();
        let list = Value::from(json!([1]));

        matchers.is_same_as(&list, &list.clone()).unwrap();
        matchers
            .is_same_as(&list, &Value::from(json!([1])))
            .unwrap_err();
    }

    #[test]
    fn comparison_errors_are_surfaced() {
        let matchers = Matchers::default();
        let cyclic = |seed: i64| {
            let cell = ValueCell::new(Value::Null);
            cell.set(Value::list([Value::from(seed), Value::Cell(cell.clone())]));
            Value::Cell(cell)
        };

        let error = matchers.equals(&cyclic(1), &cyclic(1)).unwrap_err();

        assert!(matches!(
            error,
            MatcherError::Comparison(ComparisonError::Cycle { .. })
        ));
    }

    #[tokio::test]
    async fn resolves_to_compares_the_settled_value() {
        let matchers = Matchers::default();
        let expected = Value::from(json!({"id": 1, "name": "xiejie"}));

        matchers
            .resolves_to(
                FutureValue::resolved(expected.clone()).into(),
                &Value::from(json!({"id": 1, "name": "xiejie"})),
                None,
            )
            .await
            .unwrap();
        matchers
            .resolves_to(
                FutureValue::rejected(ThrownError::new("network error")).into(),
                &expected,
                None,
            )
            .await
            .unwrap_err();
    }

    #[tokio::test]
    async fn rejects_with_matches_a_message_fragment() {
        let matchers = Matchers::default();

        matchers
            .rejects_with(
                FutureValue::rejected(ThrownError::new("network error")).into(),
                "network",
                None,
            )
            .await
            .unwrap();
        matchers
            .rejects_with(
                FutureValue::rejected(ThrownError::new("network error")).into(),
                "timeout",
                None,
            )
            .await
            .unwrap_err();
        matchers
            .rejects_with(FutureValue::resolved(1).into(), "network", None)
            .await
            .unwrap_err();
    }

    #[tokio::test]
    async fn async_matchers_require_a_future() {
        let matchers = Matchers::default();

        let error = matchers
            .resolves_to(Value::from(1), &Value::from(1), None)
            .await
            .unwrap_err();

        assert_eq!("a future", error.as_assertion().unwrap().expected);
    }

    #[test]
    fn bounded_wait_runs_outside_a_tokio_runtime() {
        let matchers = Matchers::default();
        let bound = Some(Duration::from_millis(50));

        futures::executor::block_on(matchers.resolves_to(
            FutureValue::resolved(1).into(),
            &Value::from(1),
            bound,
        ))
        .unwrap();
        let error = futures::executor::block_on(matchers.rejects_with(
            FutureValue::new(futures::future::pending()).into(),
            "network",
            bound,
        ))
        .unwrap_err();

        assert_eq!(
            MatcherError::Timeout {
                operation: "rejects_with",
                bound: Duration::from_millis(50)
            },
            error
        );
    }

    #[tokio::test]
    async fn settle_timeout_applies_when_no_bound_is_given() {
        let matchers = Matchers::default().with_settle_timeout(Some(Duration::from_millis(20)));
        let never = FutureValue::new(futures::future::pending());

        let error = matchers
            .resolves_to(never.into(), &Value::Absent, None)
            .await
            .unwrap_err();

        assert_eq!(
            MatcherError::Timeout {
                operation: "resolves_to",
                bound: Duration::from_millis(20)
            },
            error
        );
    }

    #[tokio::test]
    async fn bounded_wait_times_out_on_a_never_settling_future() {
        let matchers = Matchers::default();
        let never = FutureValue::new(futures::future::pending());

        let error = matchers
            .resolves_to(never.into(), &Value::Absent, Some(Duration::from_millis(20)))
            .await
            .unwrap_err();

        assert_eq!(
            MatcherError::Timeout {
                operation: "resolves_to",
                bound: Duration::from_millis(20)
            },
            error
        );
    }
}
