//! Widget bridge.
//!
//! Mirrors timer and task state into widget windows and relays widget
//! commands back. Owners push snapshots with [`BridgeHandle::publish`]; the
//! bridge forwards them on the event bus only while that widget is open.
//! Widgets pull the current state once with [`BridgeHandle::query`] when they
//! start and send commands with [`BridgeHandle::send_command`].

mod actor;
mod peer;

pub use actor::{spawn_bridge, BridgeActor};
pub use peer::WidgetPeer;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::{mpsc, oneshot};

use crate::error::{CoreError, ValidationError};
use crate::task::TasksSnapshot;
use crate::timer::TimerSnapshot;
pub use crate::window::{OpenOutcome, WidgetKind};

#[derive(Debug, Clone, PartialEq)]
pub enum Snapshot {
    Timer(TimerSnapshot),
    Tasks(TasksSnapshot),
}

impl Snapshot {
    pub fn kind(&self) -> WidgetKind {
        match self {
            Snapshot::Timer(_) => WidgetKind::Timer,
            Snapshot::Tasks(_) => WidgetKind::Tasks,
        }
    }

    /// Event payload, the bare snapshot record.
    pub fn to_payload(&self) -> Result<Value, serde_json::Error> {
        match self {
            Snapshot::Timer(s) => serde_json::to_value(s),
            Snapshot::Tasks(s) => serde_json::to_value(s),
        }
    }

    pub fn from_payload(kind: WidgetKind, payload: Value) -> Result<Self, serde_json::Error> {
        Ok(match kind {
            WidgetKind::Timer => Snapshot::Timer(serde_json::from_value(payload)?),
            WidgetKind::Tasks => Snapshot::Tasks(serde_json::from_value(payload)?),
        })
    }

    pub fn as_timer(&self) -> Option<&TimerSnapshot> {
        match self {
            Snapshot::Timer(s) => Some(s),
            Snapshot::Tasks(_) => None,
        }
    }

    pub fn as_tasks(&self) -> Option<&TasksSnapshot> {
        match self {
            Snapshot::Tasks(s) => Some(s),
            Snapshot::Timer(_) => None,
        }
    }
}

/// Command issued by a widget window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum WidgetCommand {
    Start,
    Pause,
    Stop,
    ToggleTask { id: String },
    RemoveTask { id: String },
}

impl WidgetCommand {
    /// Widget kind that issues this command.
    pub fn target(&self) -> WidgetKind {
        match self {
            WidgetCommand::Start | WidgetCommand::Pause | WidgetCommand::Stop => WidgetKind::Timer,
            WidgetCommand::ToggleTask { .. } | WidgetCommand::RemoveTask { .. } => WidgetKind::Tasks,
        }
    }
}

pub(crate) enum BridgeMessage {
    Open {
        kind: WidgetKind,
        reply: oneshot::Sender<Result<OpenOutcome, CoreError>>,
    },
    Close {
        kind: WidgetKind,
        reply: oneshot::Sender<Result<bool, CoreError>>,
    },
    Publish(Snapshot),
    Command {
        command: WidgetCommand,
        reply: oneshot::Sender<Result<(), CoreError>>,
    },
    Query {
        kind: WidgetKind,
        reply: oneshot::Sender<Result<Snapshot, CoreError>>,
    },
    IsOpen {
        kind: WidgetKind,
        reply: oneshot::Sender<bool>,
    },
    CloseAll {
        reply: oneshot::Sender<usize>,
    },
}

/// Receiving end handed to [`spawn_bridge`].
pub struct BridgeInbox(pub(crate) mpsc::UnboundedReceiver<BridgeMessage>);

/// Cloneable handle to the bridge actor.
#[derive(Clone)]
pub struct BridgeHandle {
    tx: mpsc::UnboundedSender<BridgeMessage>,
}

const BRIDGE: &str = "widget bridge";

impl BridgeHandle {
    /// Create the handle before the actor so owners and windows can hold it.
    pub fn channel() -> (BridgeHandle, BridgeInbox) {
        let (tx, rx) = mpsc::unbounded_channel();
        (BridgeHandle { tx }, BridgeInbox(rx))
    }

    async fn call<T>(&self, make: impl FnOnce(oneshot::Sender<T>) -> BridgeMessage) -> Result<T, CoreError> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(make(reply))
            .map_err(|_| CoreError::ActorStopped(BRIDGE))?;
        rx.await.map_err(|_| CoreError::ActorStopped(BRIDGE))
    }

    /// Open (or focus) the widget window and start mirroring to it.
    pub async fn open(&self, kind: WidgetKind) -> Result<OpenOutcome, CoreError> {
        self.call(|reply| BridgeMessage::Open { kind, reply }).await?
    }

    /// Close the widget window. `Ok(false)` if it was not open.
    pub async fn close(&self, kind: WidgetKind) -> Result<bool, CoreError> {
        self.call(|reply| BridgeMessage::Close { kind, reply }).await?
    }

    /// Offer a new snapshot. Never blocks; dropped when the widget is closed.
    pub fn publish(&self, snapshot: Snapshot) {
        if self.tx.send(BridgeMessage::Publish(snapshot)).is_err() {
            tracing::debug!("bridge gone, snapshot dropped");
        }
    }

    pub async fn send_command(&self, command: WidgetCommand) -> Result<(), CoreError> {
        self.call(|reply| BridgeMessage::Command { command, reply }).await?
    }

    /// Relay a command given as JSON, e.g. `{"command":"toggle_task","id":"3"}`.
    pub async fn send_json(&self, payload: Value) -> Result<(), CoreError> {
        let command: WidgetCommand =
            serde_json::from_value(payload).map_err(|e| ValidationError::InvalidValue {
                field: "command".into(),
                message: e.to_string(),
            })?;
        self.send_command(command).await
    }

    /// Current full state for a widget.
    pub async fn query(&self, kind: WidgetKind) -> Result<Snapshot, CoreError> {
        self.call(|reply| BridgeMessage::Query { kind, reply }).await?
    }

    pub async fn is_open(&self, kind: WidgetKind) -> Result<bool, CoreError> {
        self.call(|reply| BridgeMessage::IsOpen { kind, reply }).await
    }

    /// Close every widget window. Returns how many closes failed.
    pub async fn close_all(&self) -> Result<usize, CoreError> {
        self.call(|reply| BridgeMessage::CloseAll { reply }).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn commands_use_command_tag() {
        let cmd: WidgetCommand =
            serde_json::from_value(json!({"command": "toggle_task", "id": "3"})).unwrap();
        assert_eq!(cmd, WidgetCommand::ToggleTask { id: "3".into() });
        assert_eq!(cmd.target(), WidgetKind::Tasks);
        assert_eq!(
            serde_json::to_value(WidgetCommand::Pause).unwrap(),
            json!({"command": "pause"})
        );
    }

    #[tokio::test]
    async fn calls_fail_once_bridge_is_gone() {
        let (handle, inbox) = BridgeHandle::channel();
        drop(inbox);
        assert!(matches!(
            handle.is_open(WidgetKind::Timer).await,
            Err(CoreError::ActorStopped(_))
        ));
        handle.publish(Snapshot::Tasks(TasksSnapshot {
            tasks: vec![],
            completed_tasks: 0,
            total_tasks: 0,
            completion_percentage: 0,
        }));
    }
}
