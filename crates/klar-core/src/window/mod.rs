//! Widget windows.
//!
//! The actual windowing system is behind [`WindowManager`]; this crate only
//! decides which windows exist, where they go and when they close.

mod headless;
mod lifecycle;

pub use headless::{HeadlessWindowManager, RenderFn};
pub use lifecycle::{OpenOutcome, WindowLifecycle};

use serde::{Deserialize, Serialize};

use crate::error::WindowError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WidgetKind {
    Timer,
    Tasks,
}

impl WidgetKind {
    pub const ALL: [WidgetKind; 2] = [WidgetKind::Timer, WidgetKind::Tasks];

    /// Window label, unique per kind.
    pub fn label(self) -> &'static str {
        match self {
            WidgetKind::Timer => "timer-widget",
            WidgetKind::Tasks => "tasks-widget",
        }
    }

    /// Name of the event carrying this widget's snapshots.
    pub fn event_name(self) -> &'static str {
        match self {
            WidgetKind::Timer => "timer-update",
            WidgetKind::Tasks => "tasks-update",
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            WidgetKind::Timer => "Timer",
            WidgetKind::Tasks => "Tasks",
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.label() == label)
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "timer" => Some(WidgetKind::Timer),
            "tasks" => Some(WidgetKind::Tasks),
            _ => Self::from_label(s),
        }
    }

    /// Size and default position.
    fn geometry(self) -> (u32, u32, Position) {
        match self {
            WidgetKind::Timer => (320, 350, Position { x: 100, y: 100 }),
            WidgetKind::Tasks => (320, 400, Position { x: 450, y: 100 }),
        }
    }
}

impl std::fmt::Display for WidgetKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    pub x: i32,
    pub y: i32,
}

/// Everything a window manager needs to create a widget window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WindowSpec {
    pub label: String,
    pub title: String,
    pub width: u32,
    pub height: u32,
    pub position: Position,
    pub always_on_top: bool,
    pub decorations: bool,
    pub resizable: bool,
}

/// Windowing primitives.
pub trait WindowManager: Send + Sync {
    fn create(&self, spec: &WindowSpec) -> Result<(), WindowError>;
    fn focus(&self, label: &str) -> Result<(), WindowError>;
    fn close(&self, label: &str) -> Result<(), WindowError>;

    /// Current on-screen position, when the manager can report one.
    fn position(&self, _label: &str) -> Option<Position> {
        None
    }
}
