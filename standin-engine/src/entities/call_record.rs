use std::fmt::{Display, Formatter};
use std::sync::{Arc, PoisonError, RwLock};

use futures::FutureExt;

use crate::entities::{FutureValue, Settlement, ThrownError, Value};

/// Outcome of one invocation of a double
#[derive(Debug, Clone)]
pub enum CallOutcome {
    /// The implementation is still running
    Incomplete,

    /// The invocation returned synchronously
    Returned(Value),

    /// The invocation raised synchronously
    Threw(ThrownError),

    /// The invocation returned a future which has not settled yet
    PendingAsync,

    /// The returned future resolved
    Resolved(Value),

    /// The returned future rejected
    Rejected(ThrownError),
}

impl CallOutcome {
    /// Value produced by the call, synchronously or after resolution
    pub fn value(&self) -> Option<&Value> {
        match self {
            CallOutcome::Returned(value) | CallOutcome::Resolved(value) => Some(value),
            _ => None,
        }
    }

    /// Error produced by the call, synchronously or after rejection
    pub fn error(&self) -> Option<&ThrownError> {
        match self {
            CallOutcome::Threw(error) | CallOutcome::Rejected(error) => Some(error),
            _ => None,
        }
    }

    /// Check if the outcome may still change
    pub fn is_pending(&self) -> bool {
        matches!(self, CallOutcome::Incomplete | CallOutcome::PendingAsync)
    }
}

impl From<Settlement> for CallOutcome {
    fn from(settlement: Settlement) -> Self {
        match settlement {
            Ok(value) => CallOutcome::Resolved(value),
            Err(error) => CallOutcome::Rejected(error),
        }
    }
}

impl Display for CallOutcome {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            CallOutcome::Incomplete => write!(f, "incomplete"),
            CallOutcome::Returned(value) => write!(f, "returned {value}"),
            CallOutcome::Threw(error) => write!(f, "threw {error}"),
            CallOutcome::PendingAsync => write!(f, "pending"),
            CallOutcome::Resolved(value) => write!(f, "resolved {value}"),
            CallOutcome::Rejected(error) => write!(f, "rejected {error}"),
        }
    }
}

#[derive(Debug, Clone)]
enum SlotState {
    Known(CallOutcome),
    Awaiting(FutureValue),
}

/// Slot holding the outcome of a call, shared between the recorder and the settling future.
///
/// While awaiting, the outcome follows the future the behavior produced: it is settled as soon
/// as that future is, whichever clone drove it.
#[derive(Debug, Clone)]
pub(crate) struct OutcomeSlot {
    state: Arc<RwLock<SlotState>>,
}

impl OutcomeSlot {
    pub(crate) fn incomplete() -> Self {
        Self {
            state: Arc::new(RwLock::new(SlotState::Known(CallOutcome::Incomplete))),
        }
    }

    pub(crate) fn get(&self) -> CallOutcome {
        let state = self
            .state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();

        match state {
            SlotState::Known(outcome) => outcome,
            // Polled outside the lock, settling may write back into this slot.
            SlotState::Awaiting(future) => future
                .peek()
                .or_else(|| future.clone().now_or_never())
                .map(CallOutcome::from)
                .unwrap_or(CallOutcome::PendingAsync),
        }
    }

    pub(crate) fn set(&self, outcome: CallOutcome) {
        *self.state.write().unwrap_or_else(PoisonError::into_inner) = SlotState::Known(outcome);
    }

    pub(crate) fn await_settlement(&self, future: FutureValue) {
        *self.state.write().unwrap_or_else(PoisonError::into_inner) = SlotState::Awaiting(future);
    }
}

/// Snapshot of one invocation of a double
#[derive(Debug, Clone)]
pub struct CallRecord {
    /// Position of the call since the last clear, starting at zero
    pub ordinal: usize,

    /// Arguments given to the call
    pub args: Vec<Value>,

    /// Outcome of the call when the snapshot was taken
    pub outcome: CallOutcome,
}

impl Display for CallRecord {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{} (", self.ordinal)?;
        for (index, arg) in self.args.iter().enumerate() {
            if index > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{arg}")?;
        }
        write!(f, ") {}", self.outcome)
    }
}

#[cfg(test)]
mod tests {
    use crate::args;

    use super::*;

    #[test]
    fn settlement_maps_to_async_outcomes() {
        let resolved = CallOutcome::from(Ok(Value::from(3)));
        let rejected = CallOutcome::from(Err(ThrownError::new("boom")));

        assert_eq!(Some(3), resolved.value().and_then(Value::as_i64));
        assert_eq!("boom", rejected.error().unwrap().message);
        assert!(!resolved.is_pending());
    }

    #[test]
    fn slot_updates_are_visible_to_every_clone() {
        let slot = OutcomeSlot::incomplete();
        let observer = slot.clone();

        slot.set(CallOutcome::PendingAsync);

        assert!(matches!(observer.get(), CallOutcome::PendingAsync));
    }

    #[test]
    fn awaiting_slot_follows_its_future() {
        let slot = OutcomeSlot::incomplete();
        let (sender, receiver) = futures::channel::oneshot::channel::<Settlement>();
        slot.await_settlement(FutureValue::new(async move {
            receiver
                .await
                .unwrap_or_else(|_| Err(ThrownError::new("sender dropped")))
        }));

        assert!(matches!(slot.get(), CallOutcome::PendingAsync));

        sender.send(Ok(Value::from(5))).unwrap();

        assert_eq!(Some(5), slot.get().value().and_then(Value::as_i64));
    }

    #[test]
    fn record_display_lists_arguments_and_outcome() {
        let record = CallRecord {
            ordinal: 2,
            args: args![9, 4],
            outcome: CallOutcome::Returned(Value::from(50)),
        };

        assert_eq!("#2 (9, 4) returned 50", record.to_string());
    }
}
