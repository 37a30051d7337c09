use std::fmt::{Debug, Formatter};
use std::sync::Arc;

use crate::entities::{FutureValue, ThrownError, Value};

/// Plain callable taking arguments and producing a value or a raised error.
///
/// Genuine module members, double implementations and callbacks given to code under test all
/// share this shape.
pub type Callable = Arc<dyn Fn(&[Value]) -> Result<Value, ThrownError> + Send + Sync>;

/// A configured outcome produced by a double on invocation.
#[derive(Clone)]
pub enum Behavior {
    /// Return the value; a [Value::Future] makes the invocation asynchronous
    ReturnValue(Value),

    /// Compute the result from the call arguments
    Implementation(Callable),

    /// Raise the error synchronously
    ThrowError(ThrownError),

    /// Return a future rejecting with the error
    RejectWith(ThrownError),
}

impl Behavior {
    /// Return the given value
    pub fn return_value<V: Into<Value>>(value: V) -> Self {
        Behavior::ReturnValue(value.into())
    }

    /// Return a future resolving to the given value
    pub fn resolve_with<V: Into<Value>>(value: V) -> Self {
        Behavior::ReturnValue(Value::Future(FutureValue::resolved(value)))
    }

    /// Run the given implementation
    pub fn implementation<F>(implementation: F) -> Self
    where
        F: Fn(&[Value]) -> Result<Value, ThrownError> + Send + Sync + 'static,
    {
        Behavior::Implementation(Arc::new(implementation))
    }

    /// Raise the given error
    pub fn throw_error(error: ThrownError) -> Self {
        Behavior::ThrowError(error)
    }

    /// Return a future rejecting with the given error
    pub fn reject_with(error: ThrownError) -> Self {
        Behavior::RejectWith(error)
    }

    /// Behavior used when neither a one-shot nor a default behavior is configured
    pub fn absent() -> Self {
        Behavior::ReturnValue(Value::Absent)
    }

    /// Compute the outcome for the given arguments
    pub(crate) fn perform(&self, args: &[Value]) -> Result<Value, ThrownError> {
        match self {
            Behavior::ReturnValue(value) => Ok(value.clone()),
            Behavior::Implementation(implementation) => implementation(args),
            Behavior::ThrowError(error) => Err(error.clone()),
            Behavior::RejectWith(error) => {
                Ok(Value::Future(FutureValue::rejected(error.clone())))
            }
        }
    }
}

impl Debug for Behavior {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Behavior::ReturnValue(value) => f.debug_tuple("ReturnValue").field(value).finish(),
            Behavior::Implementation(_) => write!(f, "Implementation(..)"),
            Behavior::ThrowError(error) => f.debug_tuple("ThrowError").field(error).finish(),
            Behavior::RejectWith(error) => f.debug_tuple("RejectWith").field(error).finish(),
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::args;

    use super::*;

    #[test]
    fn implementation_receives_call_arguments() {
        let behavior = Behavior::implementation(|args| {
            Ok(Value::from(100 + args[0].as_i64().unwrap_or_default()))
        });

        let value = behavior.perform(&args![5]).unwrap();

        assert_eq!(Some(105), value.as_i64());
    }

    #[test]
    fn throw_error_raises_synchronously() {
        let behavior = Behavior::throw_error(ThrownError::with_kind("RangeError", "too big"));

        let error = behavior.perform(&[]).unwrap_err();

        assert_eq!("RangeError", error.kind);
    }

    #[tokio::test]
    async fn reject_with_returns_a_rejecting_future() {
        let behavior = Behavior::reject_with(ThrownError::new("network error"));

        let value = behavior.perform(&[]).unwrap();
        let future = value.as_future().cloned().expect("a future");

        assert_eq!("network error", future.await.unwrap_err().message);
    }

    #[test]
    fn absent_behavior_returns_absent_value() {
        assert!(Behavior::absent().perform(&[]).unwrap().is_absent());
    }
}
