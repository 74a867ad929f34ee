//! Application runtime.
//!
//! Wires the timer, task and bridge actors together on the current tokio
//! runtime and exposes what the main window needs. Always end with
//! [`App::shutdown`] so widget windows are closed and pending session calls
//! are drained.

use std::sync::Arc;

use tokio::task::JoinHandle;

use crate::auth::{self, AuthState, User};
use crate::bridge::{spawn_bridge, BridgeActor, BridgeHandle};
use crate::bus::EventBus;
use crate::error::CoreError;
use crate::session::SessionRecorder;
use crate::settings::{self, UserSettings};
use crate::stats::{self, DailyStats};
use crate::storage::{Config, KeyValueStore};
use crate::task::{spawn_tasks, TaskHandle, TaskStore};
use crate::timer::{spawn_timer, ClockEngine, Durations, TimerHandle};
use crate::window::{OpenOutcome, WidgetKind, WindowLifecycle, WindowManager};

pub struct App {
    config: Config,
    store: Arc<dyn KeyValueStore>,
    auth: AuthState,
    settings: UserSettings,
    bus: EventBus,
    timer: TimerHandle,
    tasks: TaskHandle,
    bridge: BridgeHandle,
    joins: Vec<JoinHandle<()>>,
}

/// Phase lengths from settings, or the config file when settings are unusable.
fn durations_for(settings: &UserSettings, config: &Config) -> Durations {
    settings.durations().unwrap_or_else(|e| {
        tracing::warn!("ignoring settings durations: {e}");
        config.durations().unwrap_or_default()
    })
}

async fn load_profile(
    auth: &AuthState,
    config: &Config,
    store: &dyn KeyValueStore,
) -> (UserSettings, DailyStats) {
    let settings = settings::load(auth.client(), config, store).await;
    let stats = stats::load_today(auth.client(), store, stats::local_today()).await;
    (settings, stats)
}

impl App {
    /// Restore the session and start every actor.
    ///
    /// `windows` builds the window manager; it receives the event bus and the
    /// bridge handle so widget windows can subscribe and send commands.
    pub async fn launch<F>(config: Config, store: Arc<dyn KeyValueStore>, windows: F) -> Result<Self, CoreError>
    where
        F: FnOnce(&EventBus, &BridgeHandle) -> Arc<dyn WindowManager>,
    {
        let auth = auth::restore(&config, store.as_ref()).await;
        let (settings, stats) = load_profile(&auth, &config, store.as_ref()).await;
        let durations = durations_for(&settings, &config);

        let bus = EventBus::new();
        let (bridge, inbox) = BridgeHandle::channel();

        let engine = ClockEngine::new(durations, stats);
        let recorder = SessionRecorder::new(auth.client().cloned(), Arc::clone(&store));
        let (timer, timer_join) = spawn_timer(engine, recorder, bridge.clone());

        let (tasks, tasks_join) = spawn_tasks(TaskStore::new(Arc::clone(&store)), bridge.clone());
        tasks.switch_mode(auth.client().cloned()).await?;

        let manager = windows(&bus, &bridge);
        let lifecycle = WindowLifecycle::new(manager, Arc::clone(&store), config.widgets.always_on_top);
        let bridge_join = spawn_bridge(
            BridgeActor::new(lifecycle, bus.clone(), timer.clone(), tasks.clone()),
            inbox,
        );

        tracing::info!(
            authenticated = auth.user().is_some(),
            work_secs = durations.work_secs,
            break_secs = durations.break_secs,
            "app launched"
        );

        Ok(Self {
            config,
            store,
            auth,
            settings,
            bus,
            timer,
            tasks,
            bridge,
            joins: vec![timer_join, tasks_join, bridge_join],
        })
    }

    pub fn timer(&self) -> &TimerHandle {
        &self.timer
    }

    pub fn tasks(&self) -> &TaskHandle {
        &self.tasks
    }

    pub fn bridge(&self) -> &BridgeHandle {
        &self.bridge
    }

    pub fn bus(&self) -> &EventBus {
        &self.bus
    }

    pub fn user(&self) -> Option<&User> {
        self.auth.user()
    }

    pub fn settings(&self) -> &UserSettings {
        &self.settings
    }

    pub async fn open_widget(&self, kind: WidgetKind) -> Result<OpenOutcome, CoreError> {
        self.bridge.open(kind).await
    }

    pub async fn close_widget(&self, kind: WidgetKind) -> Result<bool, CoreError> {
        self.bridge.close(kind).await
    }

    /// Authenticate with `token` and switch every component to remote mode.
    pub async fn login(&mut self, token: &str) -> Result<(), CoreError> {
        let auth = auth::login(&self.config, self.store.as_ref(), token).await?;
        self.apply_auth(auth).await
    }

    /// Forget the credential and switch every component to local mode.
    pub async fn logout(&mut self) -> Result<(), CoreError> {
        auth::logout(&self.auth, self.store.as_ref()).await;
        self.apply_auth(AuthState::Anonymous).await
    }

    /// Save new settings (remotely when authenticated) and apply them.
    pub async fn update_settings(&mut self, settings: UserSettings) -> Result<(), CoreError> {
        settings.durations()?;
        let saved = match self.auth.client() {
            Some(client) => client.update_settings(&settings).await?,
            None => settings,
        };
        if let Err(e) = settings::save_theme(self.store.as_ref(), saved.theme) {
            tracing::warn!("failed to persist theme: {e}");
        }
        self.timer
            .set_durations(durations_for(&saved, &self.config))
            .await?;
        self.settings = saved;
        Ok(())
    }

    async fn apply_auth(&mut self, auth: AuthState) -> Result<(), CoreError> {
        let (settings, stats) = load_profile(&auth, &self.config, self.store.as_ref()).await;
        let durations = durations_for(&settings, &self.config);
        let client = auth.client().cloned();

        self.timer.set_backend(client.clone(), stats, durations).await?;
        self.tasks.switch_mode(client).await?;
        self.settings = settings;
        self.auth = auth;
        Ok(())
    }

    /// Close every widget window (best-effort), drain session calls and stop
    /// the actors.
    pub async fn shutdown(self) {
        match self.bridge.close_all().await {
            Ok(0) => {}
            Ok(failures) => tracing::warn!(failures, "some widget windows failed to close"),
            Err(e) => tracing::warn!("closing widgets failed: {e}"),
        }
        if let Err(e) = self.timer.flush().await {
            tracing::warn!("flushing session calls failed: {e}");
        }

        // The actors hold each other's handles, so they never stop on their own.
        for join in self.joins {
            join.abort();
        }
        tracing::info!("app shut down");
    }
}
