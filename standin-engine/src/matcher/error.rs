use std::fmt::{Display, Formatter};
use std::time::Duration;

use thiserror::Error;

use crate::equality::{ComparisonError, Mismatch};

/// A failed assertion, with what was expected and what was observed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssertionFailure {
    /// Name of the failing predicate
    pub operation: &'static str,

    /// Rendering of the expectation
    pub expected: String,

    /// Rendering of the observed value or call history
    pub actual: String,

    /// First structural difference, when one was computed
    pub difference: Option<String>,
}

impl AssertionFailure {
    pub(crate) fn new<E: Display, A: Display>(
        operation: &'static str,
        expected: E,
        actual: A,
    ) -> Self {
        Self {
            operation,
            expected: expected.to_string(),
            actual: actual.to_string(),
            difference: None,
        }
    }

    pub(crate) fn with_mismatch(mut self, mismatch: Option<Mismatch>) -> Self {
        self.difference = mismatch.map(|m| m.to_string());
        self
    }
}

impl Display for AssertionFailure {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "assertion `{}` failed", self.operation)?;
        writeln!(f, "  expected: {}", self.expected)?;
        write!(f, "  received: {}", self.actual)?;
        if let Some(difference) = &self.difference {
            write!(f, "\n  difference {difference}")?;
        }
        Ok(())
    }
}

impl std::error::Error for AssertionFailure {}

/// Matcher related errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MatcherError {
    /// The predicate does not hold
    #[error(transparent)]
    Assertion(#[from] AssertionFailure),

    /// The values could not be compared
    #[error("assertion could not compare values: {0}")]
    Comparison(#[from] ComparisonError),

    /// The future did not settle within the bound
    #[error("assertion `{operation}` timed out after {bound:?} waiting for the future to settle")]
    Timeout {
        /// Name of the waiting predicate
        operation: &'static str,
        /// Bound given by the caller
        bound: Duration,
    },
}

impl MatcherError {
    /// The assertion failure, if this error is one
    pub fn as_assertion(&self) -> Option<&AssertionFailure> {
        match self {
            MatcherError::Assertion(failure) => Some(failure),
            _ => None,
        }
    }
}
