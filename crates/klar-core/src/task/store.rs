use std::sync::Arc;

use super::{completion_percentage, seed_tasks, Task, TasksSnapshot};
use crate::api::ApiClient;
use crate::error::CoreError;
use crate::storage::{keys, KeyValueStore};

/// Task collection with dual-mode persistence.
///
/// With a client every mutation goes to the backend first and the collection
/// only changes once the server answered. Without one the collection is
/// mutated directly and the whole list is saved to the local store.
pub struct TaskStore {
    client: Option<ApiClient>,
    store: Arc<dyn KeyValueStore>,
    tasks: Vec<Task>,
}

impl TaskStore {
    /// Empty store in local mode. Call [`TaskStore::switch_mode`] to load.
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self {
            client: None,
            store,
            tasks: Vec::new(),
        }
    }

    pub fn is_remote(&self) -> bool {
        self.client.is_some()
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn completed_count(&self) -> usize {
        self.tasks.iter().filter(|t| t.completed).count()
    }

    pub fn total_count(&self) -> usize {
        self.tasks.len()
    }

    pub fn completion_percentage(&self) -> u32 {
        completion_percentage(self.completed_count(), self.total_count())
    }

    pub fn snapshot(&self) -> TasksSnapshot {
        TasksSnapshot {
            tasks: self.tasks.clone(),
            completed_tasks: self.completed_count(),
            total_tasks: self.total_count(),
            completion_percentage: self.completion_percentage(),
        }
    }

    /// Select remote (`Some`) or local mode and reload the collection once.
    pub async fn switch_mode(&mut self, client: Option<ApiClient>) {
        self.client = client;
        self.reload().await;
    }

    /// Replace the collection from the active source.
    ///
    /// A failing remote list leaves the collection empty; the local source
    /// falls back to the seed tasks.
    pub async fn reload(&mut self) {
        self.tasks = match &self.client {
            Some(client) => match client.list_tasks().await {
                Ok(tasks) => tasks,
                Err(e) => {
                    tracing::warn!("failed to load remote tasks: {e}");
                    Vec::new()
                }
            },
            None => self.load_local(),
        };
        tracing::debug!(count = self.tasks.len(), remote = self.is_remote(), "tasks loaded");
    }

    fn load_local(&self) -> Vec<Task> {
        match self.store.get(keys::TASKS) {
            Ok(Some(raw)) => match serde_json::from_str(&raw) {
                Ok(tasks) => tasks,
                Err(e) => {
                    tracing::warn!("discarding corrupt task snapshot: {e}");
                    seed_tasks()
                }
            },
            Ok(None) => seed_tasks(),
            Err(e) => {
                tracing::warn!("failed to read task snapshot: {e}");
                seed_tasks()
            }
        }
    }

    fn persist_local(&self) {
        let result = serde_json::to_string(&self.tasks)
            .map_err(CoreError::from)
            .and_then(|json| Ok(self.store.set(keys::TASKS, &json)?));
        if let Err(e) = result {
            tracing::warn!("failed to save task snapshot: {e}");
        }
    }

    fn position(&self, id: &str) -> Option<usize> {
        self.tasks.iter().position(|t| t.id == id)
    }

    /// Add a task. Returns `Ok(false)` for blank text.
    ///
    /// # Errors
    /// In remote mode, returns the backend error; the collection is unchanged.
    pub async fn add(&mut self, text: &str) -> Result<bool, CoreError> {
        let title = text.trim();
        if title.is_empty() {
            return Ok(false);
        }
        let task = match &self.client {
            Some(client) => client.create_task(title).await?,
            None => Task::new_local(title),
        };
        self.tasks.push(task);
        if !self.is_remote() {
            self.persist_local();
        }
        Ok(true)
    }

    /// Flip a task's completion. Returns `Ok(false)` for an unknown id.
    pub async fn toggle(&mut self, id: &str) -> Result<bool, CoreError> {
        let Some(index) = self.position(id) else {
            return Ok(false);
        };
        match &self.client {
            Some(client) => {
                let updated = client.toggle_task(&self.tasks[index]).await?;
                self.tasks[index] = updated;
            }
            None => {
                self.tasks[index].completed = !self.tasks[index].completed;
                self.persist_local();
            }
        }
        Ok(true)
    }

    /// Delete a task. Returns `Ok(false)` for an unknown id.
    pub async fn remove(&mut self, id: &str) -> Result<bool, CoreError> {
        let Some(index) = self.position(id) else {
            return Ok(false);
        };
        if let Some(client) = &self.client {
            client.delete_task(id).await?;
        }
        self.tasks.remove(index);
        if !self.is_remote() {
            self.persist_local();
        }
        Ok(true)
    }
}
