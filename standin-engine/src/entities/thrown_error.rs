use std::fmt::{Display, Formatter};

use crate::entities::Value;

/// An error raised by a callable, either a genuine implementation or a configured behavior.
///
/// This is not an engine failure: it is the outcome the callee produced and it reaches the
/// caller unchanged, kind and message included.
#[derive(Debug, Clone)]
pub struct ThrownError {
    /// Type information of the error, e.g. `Error` or `TypeError`
    pub kind: String,

    /// Human readable message
    pub message: String,

    /// Optional value attached to the error
    pub payload: Option<Value>,
}

impl ThrownError {
    /// Default kind used by [ThrownError::new]
    pub const DEFAULT_KIND: &'static str = "Error";

    /// Create a new error of kind `Error` with the given message
    pub fn new<M: Into<String>>(message: M) -> Self {
        Self::with_kind(Self::DEFAULT_KIND, message)
    }

    /// Create a new error with an explicit kind
    pub fn with_kind<K: Into<String>, M: Into<String>>(kind: K, message: M) -> Self {
        Self {
            kind: kind.into(),
            message: message.into(),
            payload: None,
        }
    }

    /// Attach a payload to this error
    pub fn with_payload<V: Into<Value>>(mut self, payload: V) -> Self {
        self.payload = Some(payload.into());
        self
    }

    /// Check if the message contains the given fragment
    pub fn message_contains(&self, fragment: &str) -> bool {
        self.message.contains(fragment)
    }
}

impl Display for ThrownError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

impl std::error::Error for ThrownError {}
