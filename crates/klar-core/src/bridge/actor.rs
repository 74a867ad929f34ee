use std::collections::HashMap;

use tokio::task::JoinHandle;

use super::{BridgeInbox, BridgeMessage, Snapshot, WidgetCommand};
use crate::bus::EventBus;
use crate::error::CoreError;
use crate::task::TaskHandle;
use crate::timer::TimerHandle;
use crate::window::{OpenOutcome, WidgetKind, WindowLifecycle};

#[derive(Debug, Default)]
struct ChannelState {
    is_open: bool,
}

/// Owns the widget channels and the window lifecycle.
pub struct BridgeActor {
    windows: WindowLifecycle,
    bus: EventBus,
    timer: TimerHandle,
    tasks: TaskHandle,
    channels: HashMap<WidgetKind, ChannelState>,
}

impl BridgeActor {
    pub fn new(windows: WindowLifecycle, bus: EventBus, timer: TimerHandle, tasks: TaskHandle) -> Self {
        Self {
            windows,
            bus,
            timer,
            tasks,
            channels: HashMap::new(),
        }
    }

    fn channel(&mut self, kind: WidgetKind) -> &mut ChannelState {
        self.channels.entry(kind).or_default()
    }

    fn is_open(&self, kind: WidgetKind) -> bool {
        self.channels.get(&kind).is_some_and(|c| c.is_open)
    }

    fn open(&mut self, kind: WidgetKind) -> Result<OpenOutcome, CoreError> {
        match self.windows.open(kind) {
            Ok(outcome) => {
                self.channel(kind).is_open = true;
                Ok(outcome)
            }
            Err(e) => {
                self.channel(kind).is_open = false;
                tracing::warn!(widget = %kind, "failed to open widget: {e}");
                Err(e.into())
            }
        }
    }

    fn close(&mut self, kind: WidgetKind) -> Result<bool, CoreError> {
        let channel = self.channel(kind);
        channel.is_open = false;
        Ok(self.windows.close(kind)?)
    }

    fn close_all(&mut self) -> usize {
        for channel in self.channels.values_mut() {
            channel.is_open = false;
        }
        self.windows.close_all()
    }

    fn broadcast(&mut self, snapshot: Snapshot) {
        let kind = snapshot.kind();
        if !self.is_open(kind) {
            return;
        }
        match snapshot.to_payload() {
            Ok(payload) => {
                if let Err(e) = self.bus.emit(kind.event_name(), payload) {
                    tracing::warn!(widget = %kind, "snapshot not delivered: {e}");
                }
            }
            Err(e) => tracing::warn!(widget = %kind, "failed to encode snapshot: {e}"),
        }
    }

    async fn relay(&self, command: WidgetCommand) -> Result<(), CoreError> {
        tracing::debug!(?command, "relaying widget command");
        match command {
            WidgetCommand::Start => self.timer.start().await.map(drop),
            WidgetCommand::Pause => self.timer.pause().await.map(drop),
            WidgetCommand::Stop => self.timer.stop().await.map(drop),
            WidgetCommand::ToggleTask { id } => self.tasks.toggle(&id).await.map(drop),
            WidgetCommand::RemoveTask { id } => self.tasks.remove(&id).await.map(drop),
        }
    }

    async fn query(&self, kind: WidgetKind) -> Result<Snapshot, CoreError> {
        match kind {
            WidgetKind::Timer => self.timer.snapshot().await.map(Snapshot::Timer),
            WidgetKind::Tasks => self.tasks.snapshot().await.map(Snapshot::Tasks),
        }
    }

    pub async fn run(mut self, BridgeInbox(mut inbox): BridgeInbox) {
        while let Some(message) = inbox.recv().await {
            match message {
                BridgeMessage::Open { kind, reply } => {
                    let _ = reply.send(self.open(kind));
                }
                BridgeMessage::Close { kind, reply } => {
                    let _ = reply.send(self.close(kind));
                }
                BridgeMessage::Publish(snapshot) => self.broadcast(snapshot),
                BridgeMessage::Command { command, reply } => {
                    let _ = reply.send(self.relay(command).await);
                }
                BridgeMessage::Query { kind, reply } => {
                    let _ = reply.send(self.query(kind).await);
                }
                BridgeMessage::IsOpen { kind, reply } => {
                    let _ = reply.send(self.is_open(kind));
                }
                BridgeMessage::CloseAll { reply } => {
                    let _ = reply.send(self.close_all());
                }
            }
        }
        let failures = self.close_all();
        tracing::debug!(failures, "bridge stopped");
    }
}

/// Start the bridge actor on the current runtime.
pub fn spawn_bridge(actor: BridgeActor, inbox: BridgeInbox) -> JoinHandle<()> {
    tokio::spawn(actor.run(inbox))
}
