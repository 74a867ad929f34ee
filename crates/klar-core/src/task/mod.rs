//! Task list.
//!
//! `TaskStore` owns the collection and decides where mutations go (backend or
//! local store); the task actor serializes access to it.

mod actor;
mod store;

pub use actor::{spawn_tasks, TaskCommand, TaskHandle};
pub use store::TaskStore;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    pub title: String,
    pub completed: bool,
}

impl Task {
    /// A new local task with a random id.
    pub fn new_local(title: &str) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            title: title.to_string(),
            completed: false,
        }
    }
}

/// Tasks shown to anonymous users with no saved list.
pub fn seed_tasks() -> Vec<Task> {
    [
        ("1", "Review quarterly analytics report", true),
        ("2", "Prepare presentation slides", true),
        ("3", "Team standup meeting", false),
        ("4", "Code review for new feature", false),
        ("5", "Update project documentation", false),
    ]
    .into_iter()
    .map(|(id, title, completed)| Task {
        id: id.to_string(),
        title: title.to_string(),
        completed,
    })
    .collect()
}

/// Immutable copy of the task list sent to task widgets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TasksSnapshot {
    pub tasks: Vec<Task>,
    pub completed_tasks: usize,
    pub total_tasks: usize,
    pub completion_percentage: u32,
}

/// `round(completed / total * 100)`, 0 for an empty list.
pub fn completion_percentage(completed: usize, total: usize) -> u32 {
    if total == 0 {
        return 0;
    }
    (completed as f64 / total as f64 * 100.0).round() as u32
}
