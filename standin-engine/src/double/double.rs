use std::fmt::{Debug, Formatter};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use slog::{debug, o, trace, Logger};

use crate::entities::{
    Behavior, CallOutcome, CallRecord, Callable, FutureValue, ThrownError, Value,
};
use crate::equality::{ComparisonError, EqualityEngine};
use crate::logging::LoggerExtensions;

use super::{BehaviorQueue, CallRecorder, RecorderError};

struct DoubleState {
    behaviors: BehaviorQueue,
    recorder: CallRecorder,
}

/// A programmable stand-in for a callable.
///
/// A double owns one [BehaviorQueue] and one [CallRecorder]. Cloning a double clones a handle:
/// every clone configures and observes the same state.
///
/// ```
/// use standin_engine::{args, double::Double};
///
/// let double = Double::named("sum");
/// double.returning(30).returning_once(10).returning_once(20);
///
/// let values: Vec<i64> = (0..4)
///     .map(|_| double.invoke(args![1, 2]).unwrap().as_i64().unwrap())
///     .collect();
///
/// assert_eq!(vec![10, 20, 30, 30], values);
/// assert_eq!(4, double.count());
/// ```
#[derive(Clone)]
pub struct Double {
    name: Arc<str>,
    state: Arc<Mutex<DoubleState>>,
    logger: Logger,
}

impl Double {
    /// Name given to doubles created without one
    pub const DEFAULT_NAME: &'static str = "double";

    /// Create an unnamed double without any behavior
    pub fn new() -> Self {
        Self::named(Self::DEFAULT_NAME)
    }

    /// Create a named double without any behavior
    pub fn named<N: Into<String>>(name: N) -> Self {
        let name: String = name.into();
        Self {
            logger: Self::component_logger(&Logger::root(slog::Discard, o!()), &name),
            name: name.into(),
            state: Arc::new(Mutex::new(DoubleState {
                behaviors: BehaviorQueue::new(),
                recorder: CallRecorder::new(),
            })),
        }
    }

    /// Create an unnamed double whose default behavior is the given implementation
    pub fn with_implementation<F>(implementation: F) -> Self
    where
        F: Fn(&[Value]) -> Result<Value, ThrownError> + Send + Sync + 'static,
    {
        let double = Self::new();
        double.configure_default(Behavior::implementation(implementation));
        double
    }

    /// Replace the logger used to trace configuration and invocations
    pub fn with_logger(mut self, logger: &Logger) -> Self {
        self.logger = Self::component_logger(logger, &self.name);
        self
    }

    fn component_logger(logger: &Logger, name: &str) -> Logger {
        logger
            .new_with_component_name::<Self>()
            .new(o!("double" => name.to_owned()))
    }

    fn lock_state(&self) -> MutexGuard<'_, DoubleState> {
        // A panicking implementation never runs under this lock, the state stays consistent.
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Name of the double
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Check if both handles drive the same double
    pub fn ptr_eq(&self, other: &Double) -> bool {
        Arc::ptr_eq(&self.state, &other.state)
    }

    /// Replace the default behavior
    pub fn configure_default(&self, behavior: Behavior) -> &Self {
        debug!(self.logger, "Configure default behavior"; "behavior" => ?behavior);
        self.lock_state().behaviors.set_default(behavior);
        self
    }

    /// Append a one-shot behavior, consumed after the ones already enqueued
    pub fn enqueue_once(&self, behavior: Behavior) -> &Self {
        debug!(self.logger, "Enqueue one-shot behavior"; "behavior" => ?behavior);
        self.lock_state().behaviors.enqueue_once(behavior);
        self
    }

    /// Return the given value by default
    pub fn returning<V: Into<Value>>(&self, value: V) -> &Self {
        self.configure_default(Behavior::return_value(value))
    }

    /// Return the given value on the next unconsumed one-shot slot
    pub fn returning_once<V: Into<Value>>(&self, value: V) -> &Self {
        self.enqueue_once(Behavior::return_value(value))
    }

    /// Return a future resolving to the given value by default
    pub fn resolving<V: Into<Value>>(&self, value: V) -> &Self {
        self.configure_default(Behavior::resolve_with(value))
    }

    /// Return a future resolving to the given value once
    pub fn resolving_once<V: Into<Value>>(&self, value: V) -> &Self {
        self.enqueue_once(Behavior::resolve_with(value))
    }

    /// Return a future rejecting with the given error by default
    pub fn rejecting(&self, error: ThrownError) -> &Self {
        self.configure_default(Behavior::reject_with(error))
    }

    /// Return a future rejecting with the given error once
    pub fn rejecting_once(&self, error: ThrownError) -> &Self {
        self.enqueue_once(Behavior::reject_with(error))
    }

    /// Raise the given error by default
    pub fn throwing(&self, error: ThrownError) -> &Self {
        self.configure_default(Behavior::throw_error(error))
    }

    /// Raise the given error once
    pub fn throwing_once(&self, error: ThrownError) -> &Self {
        self.enqueue_once(Behavior::throw_error(error))
    }

    /// Run the given implementation by default
    pub fn implementation<F>(&self, implementation: F) -> &Self
    where
        F: Fn(&[Value]) -> Result<Value, ThrownError> + Send + Sync + 'static,
    {
        self.configure_default(Behavior::implementation(implementation))
    }

    /// Run the given implementation once
    pub fn implementation_once<F>(&self, implementation: F) -> &Self
    where
        F: Fn(&[Value]) -> Result<Value, ThrownError> + Send + Sync + 'static,
    {
        self.enqueue_once(Behavior::implementation(implementation))
    }

    /// Invoke the double.
    ///
    /// The behavior is picked and the call recorded under one lock, so concurrent invocations
    /// never share a one-shot behavior and get gap-free ordinals in call order. The behavior
    /// itself runs outside the lock.
    ///
    /// When the behavior produces a [Value::Future], the call is recorded as pending until that
    /// future settles, then as resolved or rejected. Dropping the returned future does not keep
    /// the record pending.
    pub fn invoke(&self, args: Vec<Value>) -> Result<Value, ThrownError> {
        let (behavior, ordinal, outcome) = {
            let mut state = self.lock_state();
            let behavior = state.behaviors.next_behavior();
            let (ordinal, outcome) = state.recorder.append(args.clone());
            (behavior, ordinal, outcome)
        };
        trace!(self.logger, "Invoked"; "ordinal" => ordinal, "args" => ?args);

        match behavior.perform(&args) {
            Ok(Value::Future(future)) => {
                outcome.await_settlement(future.clone());
                let settled_outcome = outcome.clone();
                let logger = self.logger.clone();
                let future: FutureValue = future.inspect_settlement(move |settlement| {
                    trace!(logger, "Settled"; "ordinal" => ordinal, "ok" => settlement.is_ok());
                    settled_outcome.set(settlement.clone().into());
                });
                Ok(Value::Future(future))
            }
            Ok(value) => {
                outcome.set(CallOutcome::Returned(value.clone()));
                Ok(value)
            }
            Err(error) => {
                outcome.set(CallOutcome::Threw(error.clone()));
                Err(error)
            }
        }
    }

    /// Adapt this double to a plain [Callable], for code under test taking callbacks
    pub fn as_callable(&self) -> Callable {
        let double = self.clone();
        Arc::new(move |args: &[Value]| double.invoke(args.to_vec()))
    }

    /// Number of recorded calls
    pub fn count(&self) -> usize {
        self.lock_state().recorder.count()
    }

    /// Snapshot of the call at the given ordinal
    pub fn record_at(&self, index: usize) -> Result<CallRecord, RecorderError> {
        self.lock_state().recorder.record_at(index)
    }

    /// Snapshot of the most recent call
    pub fn last_record(&self) -> Result<CallRecord, RecorderError> {
        self.lock_state().recorder.last_record()
    }

    /// Snapshots of every call, oldest first
    pub fn records(&self) -> Vec<CallRecord> {
        self.lock_state().recorder.records()
    }

    /// Arguments of every call, oldest first
    pub fn calls(&self) -> Vec<Vec<Value>> {
        self.records().into_iter().map(|record| record.args).collect()
    }

    /// Current outcome of every call, oldest first
    pub fn results(&self) -> Vec<CallOutcome> {
        self.lock_state().recorder.outcomes()
    }

    /// Check if some call was given arguments structurally equal to `args`
    pub fn any_call_matches(
        &self,
        equality: &EqualityEngine,
        args: &[Value],
    ) -> Result<bool, ComparisonError> {
        // Compare on a snapshot: cells may be read while comparing.
        let recorder = self.lock_state().recorder.clone();
        recorder.any_call_matches(equality, args)
    }

    /// Number of one-shot behaviors not consumed yet
    pub fn pending_once(&self) -> usize {
        self.lock_state().behaviors.pending_once()
    }

    /// Forget every call, keeping the configured behaviors
    pub fn clear(&self) {
        debug!(self.logger, "Clear call history");
        self.lock_state().recorder.clear();
    }

    /// Forget every call and drop every behavior, the double then yields the absent result
    pub fn reset(&self) {
        debug!(self.logger, "Reset call history and behaviors");
        let mut state = self.lock_state();
        state.recorder.clear();
        state.behaviors.clear();
    }
}

impl Default for Double {
    fn default() -> Self {
        Self::new()
    }
}

impl Debug for Double {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Double")
            .field("name", &self.name)
            .field("calls", &self.count())
            .finish()
    }
}
