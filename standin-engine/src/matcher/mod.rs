//! Assertion predicates over doubles, values and futures.
//!
//! Every failing predicate returns an [AssertionFailure] carrying the expectation, the
//! observation and an operation label. Comparison errors are never reported as mismatches.

mod error;
mod macros;
mod matchers;

pub use error::{AssertionFailure, MatcherError};
pub use matchers::{MatchResult, Matchers};
