#![warn(missing_docs)]

//! Programmable test doubles, call assertions and module substitution.
//!
//! Provide:
//! - [Doubles][Double] replaying configured behaviors and recording every call with its outcome.
//! - An [equality engine][equality] comparing dynamic [values][Value] by identity or structure.
//! - [Matchers] asserting on call histories, values and futures, plus `assert_*` macros.
//! - A [module registry][module_registry] handing out substitutes of genuine modules
//!   composed of overrides and passed-through members.
//! - The engine [configuration] and the [logging] helpers.

pub mod configuration;
pub mod double;
pub mod entities;
pub mod equality;
pub mod logging;
pub mod matcher;
pub mod module_registry;

#[cfg(any(test, feature = "test_tools"))]
pub mod test_tools;

pub use configuration::EngineConfiguration;
pub use double::Double;
pub use entities::{Behavior, CallOutcome, CallRecord, FutureValue, ThrownError, Value};
pub use equality::EqualityEngine;
pub use matcher::{MatcherError, Matchers};
pub use module_registry::{ModuleRegistry, Overrides, ScopePolicy};

/// Generic error type
pub type StdError = anyhow::Error;

/// Generic result type
pub type StdResult<T> = anyhow::Result<T, StdError>;
