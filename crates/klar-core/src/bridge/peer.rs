use super::{BridgeHandle, Snapshot, WidgetCommand};
use crate::bus::{EventBus, Subscription};
use crate::error::{CoreError, WindowError};
use crate::window::WidgetKind;

/// The widget-window side of the bridge.
///
/// Keeps its own copy of the mirrored state. It subscribes on construction so
/// nothing published after that point is missed.
pub struct WidgetPeer {
    kind: WidgetKind,
    bridge: BridgeHandle,
    updates: Subscription,
    state: Option<Snapshot>,
}

impl WidgetPeer {
    pub fn new(kind: WidgetKind, bus: &EventBus, bridge: BridgeHandle) -> Result<Self, WindowError> {
        Ok(Self {
            kind,
            bridge,
            updates: bus.subscribe(kind.event_name())?,
            state: None,
        })
    }

    pub fn kind(&self) -> WidgetKind {
        self.kind
    }

    pub fn state(&self) -> Option<&Snapshot> {
        self.state.as_ref()
    }

    /// Pull the full current state.
    pub async fn sync(&mut self) -> Result<&Snapshot, CoreError> {
        let snapshot = self.bridge.query(self.kind).await?;
        Ok(self.state.insert(snapshot))
    }

    /// Wait for the next pushed snapshot. `None` once the bus is gone.
    pub async fn next_update(&mut self) -> Option<&Snapshot> {
        loop {
            let payload = self.updates.recv().await?;
            match Snapshot::from_payload(self.kind, payload) {
                Ok(snapshot) => return Some(self.state.insert(snapshot)),
                Err(e) => tracing::warn!(widget = %self.kind, "ignoring bad snapshot: {e}"),
            }
        }
    }

    pub async fn send(&self, command: WidgetCommand) -> Result<(), CoreError> {
        self.bridge.send_command(command).await
    }

    /// Sync once, then render every update until the bus closes.
    pub async fn run(mut self, mut render: impl FnMut(&Snapshot)) {
        match self.sync().await {
            Ok(snapshot) => render(snapshot),
            Err(e) => tracing::warn!(widget = %self.kind, "initial sync failed: {e}"),
        }
        while let Some(snapshot) = self.next_update().await {
            render(snapshot);
        }
    }
}
