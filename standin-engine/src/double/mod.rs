//! Programmable doubles: behavior queue, call recorder and the double itself.

mod behavior_queue;
mod call_recorder;
#[allow(clippy::module_inception)]
mod double;

pub use behavior_queue::BehaviorQueue;
pub use call_recorder::{CallRecorder, RecorderError};
pub use double::Double;
