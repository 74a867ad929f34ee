//! Session recorder.
//!
//! Turns clock events into backend session calls. Every phase instance gets
//! at most one backend session. Calls run on a `JoinSet` owned by the
//! recorder so the clock never waits on the network; their results come back
//! through [`SessionRecorder::next_outcome`].
//!
//! Anonymous users have no backend sessions. Their daily stats are written to
//! the local store instead whenever a phase ends.

use std::sync::Arc;

use tokio::task::JoinSet;

use crate::api::{ApiClient, SessionUpdate};
use crate::events::Event;
use crate::stats::{self, DailyStats};
use crate::storage::KeyValueStore;
use crate::timer::Phase;

/// Result of a spawned backend call.
#[derive(Debug)]
pub enum CallOutcome {
    Created { instance: u64, id: String },
    Done,
}

#[derive(Debug)]
struct OpenSession {
    instance: u64,
    phase: Phase,
    id: Option<String>,
}

pub struct SessionRecorder {
    client: Option<ApiClient>,
    store: Arc<dyn KeyValueStore>,
    open: Option<OpenSession>,
    next_instance: u64,
    inflight: JoinSet<CallOutcome>,
}

fn planned_minutes(duration_secs: u64) -> u64 {
    (duration_secs + 30) / 60
}

impl SessionRecorder {
    pub fn new(client: Option<ApiClient>, store: Arc<dyn KeyValueStore>) -> Self {
        Self {
            client,
            store,
            open: None,
            next_instance: 0,
            inflight: JoinSet::new(),
        }
    }

    /// Switch between authenticated and anonymous recording. An open phase
    /// instance keeps running but is no longer tied to a backend session.
    pub fn set_client(&mut self, client: Option<ApiClient>) {
        self.client = client;
        if let Some(open) = self.open.as_mut() {
            open.id = None;
        }
    }

    pub fn session_id(&self) -> Option<&str> {
        self.open.as_ref().and_then(|o| o.id.as_deref())
    }

    #[cfg(test)]
    pub(crate) fn has_open_session(&self) -> bool {
        self.open.is_some()
    }

    pub fn has_inflight(&self) -> bool {
        !self.inflight.is_empty()
    }

    /// React to a clock event. `stats` is the engine's state after the event.
    pub fn observe(&mut self, event: &Event, stats: &DailyStats) {
        match event {
            Event::TimerStarted {
                phase,
                duration_secs,
                ..
            } => self.open_session(*phase, *duration_secs),
            Event::TimerPaused { elapsed_secs, .. } | Event::TimerResumed { elapsed_secs, .. } => {
                self.update_open(*elapsed_secs, None);
            }
            Event::TimerStopped { elapsed_secs, .. } => {
                self.update_open(*elapsed_secs, Some(false));
                self.close_open();
                self.persist_local(stats);
            }
            Event::PhaseCompleted { .. } => {
                self.complete_open();
                self.close_open();
                self.persist_local(stats);
            }
        }
    }

    /// Wait for the next finished backend call.
    pub async fn next_outcome(&mut self) -> Option<CallOutcome> {
        match self.inflight.join_next().await? {
            Ok(outcome) => Some(outcome),
            Err(e) => {
                tracing::warn!("session call task failed: {e}");
                Some(CallOutcome::Done)
            }
        }
    }

    /// Apply a finished call. Returns the session id when it was bound to
    /// the still-current phase instance.
    pub fn apply(&mut self, outcome: CallOutcome) -> Option<String> {
        let CallOutcome::Created { instance, id } = outcome else {
            return None;
        };
        match self.open.as_mut() {
            Some(open) if open.instance == instance && self.client.is_some() => {
                tracing::debug!(session = %id, phase = open.phase.as_str(), "session bound");
                open.id = Some(id.clone());
                Some(id)
            }
            _ => {
                tracing::debug!(session = %id, "ignoring session created for a closed phase");
                None
            }
        }
    }

    /// Drain all in-flight calls. Returns the last id bound to the current
    /// phase instance, if any.
    pub async fn flush(&mut self) -> Option<String> {
        let mut bound = None;
        while let Some(outcome) = self.next_outcome().await {
            if let Some(id) = self.apply(outcome) {
                bound = Some(id);
            }
        }
        bound
    }

    fn open_session(&mut self, phase: Phase, duration_secs: u64) {
        if self.open.is_some() {
            return;
        }
        self.next_instance += 1;
        let instance = self.next_instance;
        self.open = Some(OpenSession {
            instance,
            phase,
            id: None,
        });

        let Some(client) = self.client.clone() else {
            return;
        };
        let minutes = planned_minutes(duration_secs);
        self.inflight.spawn(async move {
            match client.create_session(minutes, phase, None).await {
                Ok(id) => CallOutcome::Created { instance, id },
                Err(e) => {
                    tracing::warn!("failed to create {} session: {e}", phase.as_str());
                    CallOutcome::Done
                }
            }
        });
    }

    fn update_open(&mut self, elapsed_secs: u64, completed: Option<bool>) {
        let (Some(client), Some(id)) = (self.client.clone(), self.session_id()) else {
            return;
        };
        let id = id.to_string();
        let update = SessionUpdate {
            actual_duration_secs: elapsed_secs,
            completed,
        };
        self.inflight.spawn(async move {
            if let Err(e) = client.update_session(&id, &update).await {
                tracing::warn!(session = %id, "failed to update session: {e}");
            }
            CallOutcome::Done
        });
    }

    fn complete_open(&mut self) {
        let (Some(client), Some(id)) = (self.client.clone(), self.session_id()) else {
            return;
        };
        let id = id.to_string();
        self.inflight.spawn(async move {
            if let Err(e) = client.complete_session(&id).await {
                tracing::warn!(session = %id, "failed to complete session: {e}");
            }
            CallOutcome::Done
        });
    }

    fn close_open(&mut self) {
        self.open = None;
    }

    fn persist_local(&self, stats: &DailyStats) {
        if self.client.is_some() {
            return;
        }
        if let Err(e) = stats::save_local(self.store.as_ref(), stats) {
            tracing::warn!("failed to save local stats: {e}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;
    use chrono::Utc;

    fn started(phase: Phase, duration_secs: u64) -> Event {
        Event::TimerStarted {
            phase,
            duration_secs,
            at: Utc::now(),
        }
    }

    #[test]
    fn planned_minutes_rounds() {
        assert_eq!(planned_minutes(1500), 25);
        assert_eq!(planned_minutes(300), 5);
        assert_eq!(planned_minutes(89), 1);
        assert_eq!(planned_minutes(90), 2);
    }

    #[tokio::test]
    async fn anonymous_recorder_saves_stats_on_completion() {
        let store = Arc::new(MemoryStore::new());
        let mut recorder = SessionRecorder::new(None, store.clone());
        let mut stats = DailyStats::today();

        recorder.observe(&started(Phase::Work, 1500), &stats);
        assert!(recorder.has_open_session());
        assert!(!recorder.has_inflight());

        stats.record_focus(1500);
        recorder.observe(
            &Event::PhaseCompleted {
                phase: Phase::Work,
                next_phase: Phase::Break,
                duration_secs: 1500,
                at: Utc::now(),
            },
            &stats,
        );
        assert!(!recorder.has_open_session());
        assert_eq!(stats::load_local(store.as_ref(), stats.date), stats);
    }

    #[tokio::test]
    async fn second_start_does_not_open_another_session() {
        let store = Arc::new(MemoryStore::new());
        let mut recorder = SessionRecorder::new(None, store);
        let stats = DailyStats::today();
        recorder.observe(&started(Phase::Work, 1500), &stats);
        recorder.observe(&started(Phase::Work, 1500), &stats);
        assert_eq!(recorder.next_instance, 1);
    }

    #[tokio::test]
    async fn created_result_for_stale_instance_is_ignored() {
        let store = Arc::new(MemoryStore::new());
        let client =
            ApiClient::new("http://127.0.0.1:9", "t", std::time::Duration::from_millis(50)).unwrap();
        let mut recorder = SessionRecorder::new(Some(client), store);
        // Simulate the phase instance being closed before the call resolved.
        recorder.open = Some(OpenSession {
            instance: 2,
            phase: Phase::Work,
            id: None,
        });
        assert_eq!(
            recorder.apply(CallOutcome::Created {
                instance: 1,
                id: "old".into()
            }),
            None
        );
        assert_eq!(recorder.session_id(), None);
        assert_eq!(
            recorder.apply(CallOutcome::Created {
                instance: 2,
                id: "new".into()
            }),
            Some("new".into())
        );
        assert_eq!(recorder.session_id(), Some("new"));
    }
}
