//! # Klar Core Library
//!
//! Core logic of the Klar Pomodoro timer. Every operation is reachable from
//! the `klar` CLI; a desktop shell only has to supply a [`WindowManager`].
//!
//! ## Architecture
//!
//! - **Clock Engine**: tick-driven Work/Break state machine, advanced once per
//!   second by the timer actor
//! - **Session Recorder**: maps clock events onto backend sessions, or local
//!   daily stats when nobody is signed in
//! - **Task Store**: task list persisted remotely or locally depending on
//!   authentication
//! - **Widget Bridge**: mirrors timer/task snapshots into widget windows and
//!   relays their commands
//! - **Storage**: SQLite key-value store and TOML configuration
//!
//! ## Key Components
//!
//! - [`App`]: starts the actors and exposes the main-window API
//! - [`ClockEngine`]: countdown state machine
//! - [`BridgeHandle`]: open/close widgets, publish snapshots, relay commands
//! - [`ApiClient`]: REST client for the backend

pub mod api;
pub mod app;
pub mod auth;
pub mod bridge;
pub mod bus;
pub mod error;
pub mod events;
pub mod session;
pub mod settings;
pub mod stats;
pub mod storage;
pub mod task;
pub mod timer;
pub mod window;

pub use api::ApiClient;
pub use app::App;
pub use auth::{AuthState, User};
pub use bridge::{BridgeHandle, Snapshot, WidgetCommand, WidgetPeer};
pub use bus::{EventBus, Subscription};
pub use error::{ApiError, ConfigError, CoreError, StorageError, ValidationError, WindowError};
pub use events::Event;
pub use session::SessionRecorder;
pub use settings::{Theme, UserSettings};
pub use stats::DailyStats;
pub use storage::{Config, KeyValueStore, MemoryStore, SqliteStore};
pub use task::{Task, TaskHandle, TaskStore, TasksSnapshot};
pub use timer::{ClockEngine, Durations, Phase, TimerHandle, TimerSnapshot, TimerState, TimerStatus};
pub use window::{HeadlessWindowManager, WidgetKind, WindowManager, WindowSpec};
