//! Clock engine implementation.
//!
//! The clock engine is a tick-driven state machine. It does not own a thread
//! or a timer - the caller (the timer actor) invokes `tick()` once per elapsed
//! second while the countdown is running and unpaused.
//!
//! ## State Transitions
//!
//! ```text
//! Stopped -> Running <-> Paused
//!    ^          |
//!    +-- stop --+-- countdown reaches zero (phase toggles)
//! ```
//!
//! ## Usage
//!
//! ```ignore
//! let mut engine = ClockEngine::new(Durations::default(), DailyStats::today());
//! engine.start();
//! // once per second:
//! engine.tick(); // Returns Some(Event::PhaseCompleted) when the phase ends
//! ```

use chrono::Utc;
use serde::{Deserialize, Serialize};

use super::phase::{Durations, Phase};
use crate::events::Event;
use crate::stats::DailyStats;

/// Countdown state. `is_paused` implies `is_running`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimerState {
    pub phase: Phase,
    pub seconds_remaining: u64,
    pub is_running: bool,
    pub is_paused: bool,
    /// Backend session bound to the current phase instance, if any.
    pub session_id: Option<String>,
}

/// Immutable copy of the clock sent to timer widgets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimerSnapshot {
    pub time_left: u64,
    pub is_active: bool,
    pub is_paused: bool,
    pub is_break: bool,
    pub progress: f64,
    pub total_duration: u64,
    pub phase_label: String,
    pub session_id: Option<String>,
}

/// Core clock engine.
#[derive(Debug, Clone)]
pub struct ClockEngine {
    durations: Durations,
    /// Length of the current phase instance. Differs from `durations` only
    /// while a duration change made mid-run is pending.
    phase_total: u64,
    state: TimerState,
    stats: DailyStats,
}

impl ClockEngine {
    /// Create an engine in the stopped Work phase.
    pub fn new(durations: Durations, stats: DailyStats) -> Self {
        let phase_total = durations.for_phase(Phase::Work);
        Self {
            durations,
            phase_total,
            state: TimerState {
                phase: Phase::Work,
                seconds_remaining: phase_total,
                is_running: false,
                is_paused: false,
                session_id: None,
            },
            stats,
        }
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn state(&self) -> &TimerState {
        &self.state
    }

    pub fn durations(&self) -> Durations {
        self.durations
    }

    pub fn stats(&self) -> &DailyStats {
        &self.stats
    }

    pub fn phase_total(&self) -> u64 {
        self.phase_total
    }

    /// True while the countdown should be advanced once per second.
    pub fn is_ticking(&self) -> bool {
        self.state.is_running && !self.state.is_paused
    }

    pub fn elapsed_secs(&self) -> u64 {
        self.phase_total.saturating_sub(self.state.seconds_remaining)
    }

    /// 0.0 .. 100.0 progress within the current phase.
    pub fn progress(&self) -> f64 {
        if self.phase_total == 0 {
            return 0.0;
        }
        self.elapsed_secs() as f64 / self.phase_total as f64 * 100.0
    }

    pub fn snapshot(&self) -> TimerSnapshot {
        TimerSnapshot {
            time_left: self.state.seconds_remaining,
            is_active: self.state.is_running,
            is_paused: self.state.is_paused,
            is_break: self.state.phase == Phase::Break,
            progress: self.progress(),
            total_duration: self.phase_total,
            phase_label: self.state.phase.label().to_string(),
            session_id: self.state.session_id.clone(),
        }
    }

    // ── Commands ─────────────────────────────────────────────────────

    pub fn start(&mut self) -> Option<Event> {
        if self.state.is_running {
            if self.state.is_paused {
                self.state.is_paused = false;
                return Some(Event::TimerResumed {
                    phase: self.state.phase,
                    elapsed_secs: self.elapsed_secs(),
                    at: Utc::now(),
                });
            }
            return None; // Already running.
        }
        self.state.is_running = true;
        self.state.is_paused = false;
        Some(Event::TimerStarted {
            phase: self.state.phase,
            duration_secs: self.phase_total,
            at: Utc::now(),
        })
    }

    /// Toggle pause. No-op unless running.
    pub fn pause(&mut self) -> Option<Event> {
        if !self.state.is_running {
            return None;
        }
        self.state.is_paused = !self.state.is_paused;
        let phase = self.state.phase;
        let elapsed_secs = self.elapsed_secs();
        let at = Utc::now();
        Some(if self.state.is_paused {
            Event::TimerPaused {
                phase,
                elapsed_secs,
                at,
            }
        } else {
            Event::TimerResumed {
                phase,
                elapsed_secs,
                at,
            }
        })
    }

    /// Stop and reset the current phase. The phase itself is kept.
    ///
    /// Stopping a running break counts as a missed break.
    pub fn stop(&mut self) -> Option<Event> {
        let was_running = self.state.is_running;
        let elapsed_secs = self.elapsed_secs();
        let phase = self.state.phase;

        self.state.is_running = false;
        self.state.is_paused = false;
        self.state.session_id = None;
        self.reset_phase();

        if !was_running {
            return None;
        }
        if phase == Phase::Break {
            self.stats.record_break_missed();
        }
        Some(Event::TimerStopped {
            phase,
            elapsed_secs,
            at: Utc::now(),
        })
    }

    /// Advance by one second. Returns `Some(Event::PhaseCompleted)` on the
    /// tick that brings the countdown to zero.
    pub fn tick(&mut self) -> Option<Event> {
        if !self.is_ticking() {
            return None;
        }
        if self.state.seconds_remaining > 1 {
            self.state.seconds_remaining -= 1;
            return None;
        }
        Some(self.complete_phase())
    }

    /// Apply new durations. Takes effect immediately when stopped, otherwise
    /// at the next phase reset.
    pub fn set_durations(&mut self, durations: Durations) {
        self.durations = durations;
        if !self.state.is_running {
            self.reset_phase();
        }
    }

    pub fn bind_session(&mut self, session_id: Option<String>) {
        self.state.session_id = session_id;
    }

    pub fn replace_stats(&mut self, stats: DailyStats) {
        self.stats = stats;
    }

    /// Zero the stats when the calendar date changed. Returns true on reset.
    pub fn roll_over_stats(&mut self, today: chrono::NaiveDate) -> bool {
        self.stats.roll_over(today)
    }

    // ── Internal ─────────────────────────────────────────────────────

    fn complete_phase(&mut self) -> Event {
        let phase = self.state.phase;
        let duration_secs = self.phase_total;
        match phase {
            Phase::Work => self.stats.record_focus(duration_secs),
            Phase::Break => self.stats.record_break_taken(),
        }

        self.state.phase = phase.toggled();
        self.state.is_running = false;
        self.state.is_paused = false;
        self.state.session_id = None;
        self.reset_phase();

        Event::PhaseCompleted {
            phase,
            next_phase: self.state.phase,
            duration_secs,
            at: Utc::now(),
        }
    }

    fn reset_phase(&mut self) {
        self.phase_total = self.durations.for_phase(self.state.phase);
        self.state.seconds_remaining = self.phase_total;
    }
}
