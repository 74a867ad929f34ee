use std::collections::HashSet;
use std::sync::Arc;

use super::{Position, WidgetKind, WindowManager, WindowSpec};
use crate::error::WindowError;
use crate::storage::{keys, KeyValueStore};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenOutcome {
    Created,
    Focused,
}

/// Tracks at most one window per widget kind.
pub struct WindowLifecycle {
    manager: Arc<dyn WindowManager>,
    store: Arc<dyn KeyValueStore>,
    always_on_top: bool,
    open: HashSet<WidgetKind>,
}

impl WindowLifecycle {
    pub fn new(manager: Arc<dyn WindowManager>, store: Arc<dyn KeyValueStore>, always_on_top: bool) -> Self {
        Self {
            manager,
            store,
            always_on_top,
            open: HashSet::new(),
        }
    }

    pub fn is_tracked(&self, kind: WidgetKind) -> bool {
        self.open.contains(&kind)
    }

    /// Saved position for `kind`, or its default.
    pub fn position(&self, kind: WidgetKind) -> Position {
        let (_, _, default) = kind.geometry();
        match self.store.get(&keys::widget_position(kind.label())) {
            Ok(Some(raw)) => serde_json::from_str(&raw).unwrap_or_else(|e| {
                tracing::warn!(widget = %kind, "ignoring bad saved position: {e}");
                default
            }),
            Ok(None) => default,
            Err(e) => {
                tracing::warn!(widget = %kind, "failed to read saved position: {e}");
                default
            }
        }
    }

    /// Persist where the window for `kind` currently sits.
    fn remember_position(&self, kind: WidgetKind) {
        let Some(position) = self.manager.position(kind.label()) else {
            return;
        };
        let result = serde_json::to_string(&position)
            .map_err(|e| e.to_string())
            .and_then(|json| {
                self.store
                    .set(&keys::widget_position(kind.label()), &json)
                    .map_err(|e| e.to_string())
            });
        if let Err(e) = result {
            tracing::warn!(widget = %kind, "failed to save position: {e}");
        }
    }

    pub fn spec(&self, kind: WidgetKind) -> WindowSpec {
        let (width, height, _) = kind.geometry();
        WindowSpec {
            label: kind.label().to_string(),
            title: kind.title().to_string(),
            width,
            height,
            position: self.position(kind),
            always_on_top: self.always_on_top,
            decorations: false,
            resizable: false,
        }
    }

    /// Focus the window for `kind` if one is tracked, otherwise create it.
    /// A tracked window that cannot be focused is replaced.
    pub fn open(&mut self, kind: WidgetKind) -> Result<OpenOutcome, WindowError> {
        if self.open.contains(&kind) {
            match self.manager.focus(kind.label()) {
                Ok(()) => return Ok(OpenOutcome::Focused),
                Err(e) => {
                    tracing::warn!(widget = %kind, "dropping stale window handle: {e}");
                    self.open.remove(&kind);
                }
            }
        }
        self.manager.create(&self.spec(kind))?;
        self.open.insert(kind);
        tracing::info!(widget = %kind, "widget window created");
        Ok(OpenOutcome::Created)
    }

    /// Close the window for `kind`. Returns `Ok(false)` if none was tracked.
    /// The handle is dropped even when closing fails.
    pub fn close(&mut self, kind: WidgetKind) -> Result<bool, WindowError> {
        if !self.open.remove(&kind) {
            return Ok(false);
        }
        self.remember_position(kind);
        self.manager.close(kind.label())?;
        tracing::info!(widget = %kind, "widget window closed");
        Ok(true)
    }

    /// Close every tracked window, continuing past failures. Returns the
    /// number of windows that failed to close.
    pub fn close_all(&mut self) -> usize {
        let mut failures = 0;
        let kinds: Vec<WidgetKind> = self.open.drain().collect();
        for kind in kinds {
            self.remember_position(kind);
            if let Err(e) = self.manager.close(kind.label()) {
                tracing::warn!(widget = %kind, "failed to close widget window: {e}");
                failures += 1;
            }
        }
        failures
    }
}
