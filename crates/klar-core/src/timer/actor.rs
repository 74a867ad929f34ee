//! Timer actor.
//!
//! Owns the [`ClockEngine`] and the [`SessionRecorder`]. Commands arrive on an
//! mpsc channel and are answered over oneshot replies. A single
//! `tokio::time::Interval` drives the countdown; it exists only while the
//! clock is ticking and is rebuilt whenever running, pause or duration inputs
//! change.

use std::time::Duration;

use serde::Serialize;
use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, Interval, MissedTickBehavior};

use super::engine::{ClockEngine, TimerSnapshot, TimerState};
use super::phase::Durations;
use crate::api::ApiClient;
use crate::bridge::{BridgeHandle, Snapshot};
use crate::error::CoreError;
use crate::events::Event;
use crate::session::SessionRecorder;
use crate::stats::{self, DailyStats};

const TIMER: &str = "timer";
const TICK: Duration = Duration::from_secs(1);

/// Everything the main window shows about the clock.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimerStatus {
    pub state: TimerState,
    pub durations: Durations,
    pub progress: f64,
    pub stats: DailyStats,
}

pub enum TimerCommand {
    Start(oneshot::Sender<TimerState>),
    Pause(oneshot::Sender<TimerState>),
    Stop(oneshot::Sender<TimerState>),
    Snapshot(oneshot::Sender<TimerSnapshot>),
    Status(oneshot::Sender<TimerStatus>),
    SetDurations(Durations, oneshot::Sender<()>),
    SetBackend {
        client: Option<ApiClient>,
        stats: DailyStats,
        durations: Durations,
        reply: oneshot::Sender<()>,
    },
    Flush(oneshot::Sender<()>),
}

#[derive(Clone)]
pub struct TimerHandle {
    tx: mpsc::Sender<TimerCommand>,
    events: broadcast::Sender<Event>,
}

impl TimerHandle {
    async fn call<T>(&self, make: impl FnOnce(oneshot::Sender<T>) -> TimerCommand) -> Result<T, CoreError> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(make(reply))
            .await
            .map_err(|_| CoreError::ActorStopped(TIMER))?;
        rx.await.map_err(|_| CoreError::ActorStopped(TIMER))
    }

    pub async fn start(&self) -> Result<TimerState, CoreError> {
        self.call(TimerCommand::Start).await
    }

    /// Toggle pause.
    pub async fn pause(&self) -> Result<TimerState, CoreError> {
        self.call(TimerCommand::Pause).await
    }

    pub async fn stop(&self) -> Result<TimerState, CoreError> {
        self.call(TimerCommand::Stop).await
    }

    pub async fn snapshot(&self) -> Result<TimerSnapshot, CoreError> {
        self.call(TimerCommand::Snapshot).await
    }

    pub async fn status(&self) -> Result<TimerStatus, CoreError> {
        self.call(TimerCommand::Status).await
    }

    pub async fn set_durations(&self, durations: Durations) -> Result<(), CoreError> {
        self.call(|reply| TimerCommand::SetDurations(durations, reply)).await
    }

    /// Switch session recording to `client` (or local) after login/logout.
    pub async fn set_backend(
        &self,
        client: Option<ApiClient>,
        stats: DailyStats,
        durations: Durations,
    ) -> Result<(), CoreError> {
        self.call(|reply| TimerCommand::SetBackend {
            client,
            stats,
            durations,
            reply,
        })
        .await
    }

    /// Wait until every backend session call has resolved.
    pub async fn flush(&self) -> Result<(), CoreError> {
        self.call(TimerCommand::Flush).await
    }

    /// Clock events from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.events.subscribe()
    }
}

struct TimerActor {
    engine: ClockEngine,
    recorder: SessionRecorder,
    bridge: BridgeHandle,
    events: broadcast::Sender<Event>,
}

fn new_ticker() -> Interval {
    let mut ticker = interval_at(Instant::now() + TICK, TICK);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    ticker
}

async fn next_tick(ticker: &mut Option<Interval>) {
    match ticker {
        Some(ticker) => {
            ticker.tick().await;
        }
        None => std::future::pending().await,
    }
}

impl TimerActor {
    fn publish(&self) {
        self.bridge.publish(Snapshot::Timer(self.engine.snapshot()));
    }

    fn emit(&mut self, event: Option<Event>) {
        let Some(event) = event else {
            return;
        };
        tracing::info!(phase = ?event.phase(), ?event, "timer event");
        self.recorder.observe(&event, self.engine.stats());
        self.engine
            .bind_session(self.recorder.session_id().map(str::to_string));
        // No subscribers is fine.
        let _ = self.events.send(event);
    }

    fn status(&self) -> TimerStatus {
        TimerStatus {
            state: self.engine.state().clone(),
            durations: self.engine.durations(),
            progress: self.engine.progress(),
            stats: self.engine.stats().clone(),
        }
    }

    fn roll_over(&mut self) {
        if self.engine.roll_over_stats(stats::local_today()) {
            tracing::info!("new day, daily stats reset");
        }
    }

    /// Returns true when the tick schedule must be rebuilt. State changes are
    /// published before the reply goes out.
    async fn handle(&mut self, command: TimerCommand) -> bool {
        match command {
            TimerCommand::Start(reply) => {
                self.roll_over();
                let event = self.engine.start();
                let changed = event.is_some();
                self.emit(event);
                self.publish();
                let _ = reply.send(self.engine.state().clone());
                changed
            }
            TimerCommand::Pause(reply) => {
                let event = self.engine.pause();
                let changed = event.is_some();
                self.emit(event);
                self.publish();
                let _ = reply.send(self.engine.state().clone());
                changed
            }
            TimerCommand::Stop(reply) => {
                self.roll_over();
                let event = self.engine.stop();
                self.emit(event);
                self.publish();
                let _ = reply.send(self.engine.state().clone());
                true
            }
            TimerCommand::Snapshot(reply) => {
                let _ = reply.send(self.engine.snapshot());
                false
            }
            TimerCommand::Status(reply) => {
                self.roll_over();
                let _ = reply.send(self.status());
                false
            }
            TimerCommand::SetDurations(durations, reply) => {
                self.engine.set_durations(durations);
                self.publish();
                let _ = reply.send(());
                true
            }
            TimerCommand::SetBackend {
                client,
                stats,
                durations,
                reply,
            } => {
                self.recorder.set_client(client);
                self.engine.bind_session(None);
                self.engine.replace_stats(stats);
                self.engine.set_durations(durations);
                self.publish();
                let _ = reply.send(());
                true
            }
            TimerCommand::Flush(reply) => {
                if let Some(id) = self.recorder.flush().await {
                    self.engine.bind_session(Some(id));
                    self.publish();
                }
                let _ = reply.send(());
                false
            }
        }
    }

    async fn run(mut self, mut commands: mpsc::Receiver<TimerCommand>) {
        let mut ticker: Option<Interval> = None;
        loop {
            tokio::select! {
                command = commands.recv() => {
                    let Some(command) = command else { break };
                    if self.handle(command).await {
                        ticker = self.engine.is_ticking().then(new_ticker);
                    }
                }
                _ = next_tick(&mut ticker) => {
                    self.roll_over();
                    let event = self.engine.tick();
                    if event.is_some() {
                        ticker = None;
                    }
                    self.emit(event);
                    self.publish();
                }
                Some(outcome) = self.recorder.next_outcome(), if self.recorder.has_inflight() => {
                    if let Some(id) = self.recorder.apply(outcome) {
                        self.engine.bind_session(Some(id));
                        self.publish();
                    }
                }
            }
        }
        self.recorder.flush().await;
        tracing::debug!("timer actor stopped");
    }
}

/// Start the timer actor on the current runtime.
pub fn spawn_timer(engine: ClockEngine, recorder: SessionRecorder, bridge: BridgeHandle) -> (TimerHandle, JoinHandle<()>) {
    let (tx, rx) = mpsc::channel(32);
    let (events, _) = broadcast::channel(64);
    let actor = TimerActor {
        engine,
        recorder,
        bridge,
        events: events.clone(),
    };
    let join = tokio::spawn(actor.run(rx));
    (TimerHandle { tx, events }, join)
}
