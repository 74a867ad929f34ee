use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Default work phase length in seconds.
pub const DEFAULT_WORK_SECS: u64 = 25 * 60;
/// Default (short) break length in seconds.
pub const DEFAULT_BREAK_SECS: u64 = 5 * 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Work,
    Break,
}

impl Phase {
    pub fn toggled(self) -> Self {
        match self {
            Phase::Work => Phase::Break,
            Phase::Break => Phase::Work,
        }
    }

    /// Session type string understood by the backend.
    pub fn as_str(self) -> &'static str {
        match self {
            Phase::Work => "work",
            Phase::Break => "break",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Phase::Work => "Focus Session",
            Phase::Break => "Break Time",
        }
    }
}

/// Configured phase lengths.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Durations {
    pub work_secs: u64,
    pub break_secs: u64,
}

impl Durations {
    /// Build validated durations. Both lengths must be positive.
    pub fn new(work_secs: u64, break_secs: u64) -> Result<Self, ValidationError> {
        if work_secs == 0 {
            return Err(ValidationError::ZeroDuration {
                field: "work".into(),
            });
        }
        if break_secs == 0 {
            return Err(ValidationError::ZeroDuration {
                field: "break".into(),
            });
        }
        Ok(Self {
            work_secs,
            break_secs,
        })
    }

    pub fn for_phase(&self, phase: Phase) -> u64 {
        match phase {
            Phase::Work => self.work_secs,
            Phase::Break => self.break_secs,
        }
    }
}

impl Default for Durations {
    fn default() -> Self {
        Self {
            work_secs: DEFAULT_WORK_SECS,
            break_secs: DEFAULT_BREAK_SECS,
        }
    }
}
