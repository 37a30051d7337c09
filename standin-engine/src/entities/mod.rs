//! The entities used by doubles, matchers and substituted modules.

mod behavior;
mod call_record;
mod future_value;
mod thrown_error;
mod value;

pub use behavior::{Behavior, Callable};
pub use call_record::{CallOutcome, CallRecord};
pub(crate) use call_record::OutcomeSlot;
pub use future_value::{FutureValue, Settlement};
pub use thrown_error::ThrownError;
pub use value::{Value, ValueCell};
