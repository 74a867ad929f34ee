use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::timer::Phase;

/// Every clock transition produces an Event.
/// The session recorder consumes them; the CLI prints them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    /// Countdown started from a stopped state.
    TimerStarted {
        phase: Phase,
        duration_secs: u64,
        at: DateTime<Utc>,
    },
    TimerPaused {
        phase: Phase,
        elapsed_secs: u64,
        at: DateTime<Utc>,
    },
    TimerResumed {
        phase: Phase,
        elapsed_secs: u64,
        at: DateTime<Utc>,
    },
    /// Manual stop; the phase is unchanged and its countdown reset.
    TimerStopped {
        phase: Phase,
        elapsed_secs: u64,
        at: DateTime<Utc>,
    },
    /// The countdown of `phase` reached zero and the engine moved to `next_phase`.
    PhaseCompleted {
        phase: Phase,
        next_phase: Phase,
        duration_secs: u64,
        at: DateTime<Utc>,
    },
}

impl Event {
    pub fn phase(&self) -> Phase {
        match self {
            Event::TimerStarted { phase, .. }
            | Event::TimerPaused { phase, .. }
            | Event::TimerResumed { phase, .. }
            | Event::TimerStopped { phase, .. }
            | Event::PhaseCompleted { phase, .. } => *phase,
        }
    }
}
