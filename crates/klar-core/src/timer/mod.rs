mod actor;
mod engine;
mod phase;

pub use actor::{spawn_timer, TimerCommand, TimerHandle, TimerStatus};
pub use engine::{ClockEngine, TimerSnapshot, TimerState};
pub use phase::{Durations, Phase, DEFAULT_BREAK_SECS, DEFAULT_WORK_SECS};
