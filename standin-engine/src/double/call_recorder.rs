use thiserror::Error;

use crate::entities::{CallOutcome, CallRecord, OutcomeSlot, Value};
use crate::equality::{ComparisonError, EqualityEngine};

/// [CallRecorder] related errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RecorderError {
    /// The requested call does not exist
    #[error("No call recorded at index {index}, {count} call(s) recorded")]
    IndexOutOfRange {
        /// Requested index
        index: usize,
        /// Number of recorded calls
        count: usize,
    },

    /// No call was recorded at all
    #[error("No call recorded")]
    EmptyHistory,
}

#[derive(Debug, Clone)]
struct CallEntry {
    ordinal: usize,
    args: Vec<Value>,
    outcome: OutcomeSlot,
}

impl CallEntry {
    fn snapshot(&self) -> CallRecord {
        CallRecord {
            ordinal: self.ordinal,
            args: self.args.clone(),
            outcome: self.outcome.get(),
        }
    }
}

/// Append-only log of the invocations of one double.
#[derive(Debug, Clone, Default)]
pub struct CallRecorder {
    entries: Vec<CallEntry>,
}

impl CallRecorder {
    /// Create an empty recorder
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a call with an incomplete outcome, returning the slot to fill its outcome in.
    pub(crate) fn append(&mut self, args: Vec<Value>) -> (usize, OutcomeSlot) {
        let ordinal = self.entries.len();
        let outcome = OutcomeSlot::incomplete();
        self.entries.push(CallEntry {
            ordinal,
            args,
            outcome: outcome.clone(),
        });

        (ordinal, outcome)
    }

    /// Number of recorded calls
    pub fn count(&self) -> usize {
        self.entries.len()
    }

    /// Snapshot of the call at the given ordinal
    pub fn record_at(&self, index: usize) -> Result<CallRecord, RecorderError> {
        self.entries
            .get(index)
            .map(CallEntry::snapshot)
            .ok_or(RecorderError::IndexOutOfRange {
                index,
                count: self.count(),
            })
    }

    /// Snapshot of the most recent call
    pub fn last_record(&self) -> Result<CallRecord, RecorderError> {
        self.entries
            .last()
            .map(CallEntry::snapshot)
            .ok_or(RecorderError::EmptyHistory)
    }

    /// Snapshots of every call, oldest first
    pub fn records(&self) -> Vec<CallRecord> {
        self.entries.iter().map(CallEntry::snapshot).collect()
    }

    /// Current outcome of every call, oldest first
    pub fn outcomes(&self) -> Vec<CallOutcome> {
        self.entries.iter().map(|entry| entry.outcome.get()).collect()
    }

    /// Check if some call was given arguments structurally equal to `args`
    pub fn any_call_matches(
        &self,
        equality: &EqualityEngine,
        args: &[Value],
    ) -> Result<bool, ComparisonError> {
        for entry in &self.entries {
            if equality.all_equal_to(args, &entry.args)? {
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Forget every call, the next call gets ordinal zero
    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
