use std::collections::VecDeque;

use crate::entities::Behavior;

/// One-shot behaviors consumed in FIFO order, backed by a default behavior.
#[derive(Debug, Clone, Default)]
pub struct BehaviorQueue {
    once: VecDeque<Behavior>,
    default: Option<Behavior>,
}

impl BehaviorQueue {
    /// Create an empty queue without a default behavior
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the default behavior
    pub fn set_default(&mut self, behavior: Behavior) {
        self.default = Some(behavior);
    }

    /// Append a one-shot behavior
    pub fn enqueue_once(&mut self, behavior: Behavior) {
        self.once.push_back(behavior);
    }

    /// Behavior for the next invocation.
    ///
    /// The oldest one-shot behavior is consumed first, then the default is used, then the
    /// absent result.
    pub fn next_behavior(&mut self) -> Behavior {
        self.once
            .pop_front()
            .or_else(|| self.default.clone())
            .unwrap_or_else(Behavior::absent)
    }

    /// Number of one-shot behaviors not consumed yet
    pub fn pending_once(&self) -> usize {
        self.once.len()
    }

    /// Check if a default behavior is configured
    pub fn has_default(&self) -> bool {
        self.default.is_some()
    }

    /// Drop every behavior, default included
    pub fn clear(&mut self) {
        self.once.clear();
        self.default = None;
    }
}
