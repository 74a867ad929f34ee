use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

use super::{TaskStore, TasksSnapshot};
use crate::api::ApiClient;
use crate::bridge::{BridgeHandle, Snapshot};
use crate::error::CoreError;

const TASKS: &str = "task store";

pub enum TaskCommand {
    Snapshot(oneshot::Sender<TasksSnapshot>),
    Add(String, oneshot::Sender<Result<bool, CoreError>>),
    Toggle(String, oneshot::Sender<Result<bool, CoreError>>),
    Remove(String, oneshot::Sender<Result<bool, CoreError>>),
    SwitchMode(Option<ApiClient>, oneshot::Sender<()>),
}

#[derive(Clone)]
pub struct TaskHandle {
    tx: mpsc::Sender<TaskCommand>,
}

impl TaskHandle {
    async fn call<T>(&self, make: impl FnOnce(oneshot::Sender<T>) -> TaskCommand) -> Result<T, CoreError> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(make(reply))
            .await
            .map_err(|_| CoreError::ActorStopped(TASKS))?;
        rx.await.map_err(|_| CoreError::ActorStopped(TASKS))
    }

    pub async fn snapshot(&self) -> Result<TasksSnapshot, CoreError> {
        self.call(TaskCommand::Snapshot).await
    }

    pub async fn add(&self, text: &str) -> Result<bool, CoreError> {
        let text = text.to_string();
        self.call(|reply| TaskCommand::Add(text, reply)).await?
    }

    pub async fn toggle(&self, id: &str) -> Result<bool, CoreError> {
        let id = id.to_string();
        self.call(|reply| TaskCommand::Toggle(id, reply)).await?
    }

    pub async fn remove(&self, id: &str) -> Result<bool, CoreError> {
        let id = id.to_string();
        self.call(|reply| TaskCommand::Remove(id, reply)).await?
    }

    /// Switch to remote (`Some`) or local mode and reload.
    pub async fn switch_mode(&self, client: Option<ApiClient>) -> Result<(), CoreError> {
        self.call(|reply| TaskCommand::SwitchMode(client, reply)).await
    }
}

fn publish(store: &TaskStore, bridge: &BridgeHandle) {
    bridge.publish(Snapshot::Tasks(store.snapshot()));
}

/// Mutation results are published before the reply goes out.
async fn run(mut store: TaskStore, bridge: BridgeHandle, mut commands: mpsc::Receiver<TaskCommand>) {
    while let Some(command) = commands.recv().await {
        match command {
            TaskCommand::Snapshot(reply) => {
                let _ = reply.send(store.snapshot());
            }
            TaskCommand::Add(text, reply) => {
                let result = store.add(&text).await;
                if matches!(result, Ok(true)) {
                    publish(&store, &bridge);
                }
                let _ = reply.send(result);
            }
            TaskCommand::Toggle(id, reply) => {
                let result = store.toggle(&id).await;
                if matches!(result, Ok(true)) {
                    publish(&store, &bridge);
                }
                let _ = reply.send(result);
            }
            TaskCommand::Remove(id, reply) => {
                let result = store.remove(&id).await;
                if matches!(result, Ok(true)) {
                    publish(&store, &bridge);
                }
                let _ = reply.send(result);
            }
            TaskCommand::SwitchMode(client, reply) => {
                store.switch_mode(client).await;
                publish(&store, &bridge);
                let _ = reply.send(());
            }
        }
    }
    tracing::debug!("task actor stopped");
}

/// Start the task actor on the current runtime.
pub fn spawn_tasks(store: TaskStore, bridge: BridgeHandle) -> (TaskHandle, JoinHandle<()>) {
    let (tx, rx) = mpsc::channel(32);
    let join = tokio::spawn(run(store, bridge, rx));
    (TaskHandle { tx }, join)
}
