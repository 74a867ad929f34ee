//! Task commands.
//!
//! Signed in, every command goes through the backend; otherwise the list
//! lives in the local store (seeded with sample tasks on first use).

use clap::Subcommand;
use klar_core::{auth, Config, TaskStore};

use super::{open_store, runtime, CliResult};

#[derive(Subcommand)]
pub enum TaskAction {
    /// List tasks
    List {
        /// Print the snapshot as JSON
        #[arg(long)]
        json: bool,
    },
    /// Add a task
    Add {
        /// Task text
        text: String,
    },
    /// Flip a task between open and done
    Toggle {
        /// Task ID
        id: String,
    },
    /// Delete a task
    Remove {
        /// Task ID
        id: String,
    },
}

async fn load() -> Result<TaskStore, Box<dyn std::error::Error>> {
    let config = Config::load_or_default();
    let store = open_store()?;
    let state = auth::restore(&config, store.as_ref()).await;
    let mut tasks = TaskStore::new(store);
    tasks.switch_mode(state.client().cloned()).await;
    Ok(tasks)
}

fn print_list(tasks: &TaskStore) {
    for task in tasks.tasks() {
        let mark = if task.completed { "x" } else { " " };
        println!("[{mark}] {:<38} {}", task.id, task.title);
    }
    println!(
        "{}/{} completed ({}%)",
        tasks.completed_count(),
        tasks.total_count(),
        tasks.completion_percentage()
    );
}

pub fn run(action: TaskAction) -> CliResult {
    runtime()?.block_on(async {
        let mut tasks = load().await?;

        match action {
            TaskAction::List { json } => {
                if json {
                    println!("{}", serde_json::to_string_pretty(&tasks.snapshot())?);
                } else {
                    print_list(&tasks);
                }
            }
            TaskAction::Add { text } => {
                if !tasks.add(&text).await? {
                    return Err("task text is empty".into());
                }
                if let Some(task) = tasks.tasks().last() {
                    println!("Task added: {}", task.id);
                }
            }
            TaskAction::Toggle { id } => {
                if !tasks.toggle(&id).await? {
                    return Err(format!("task not found: {id}").into());
                }
                let done = tasks.tasks().iter().any(|t| t.id == id && t.completed);
                println!("Task {id} {}", if done { "completed" } else { "reopened" });
            }
            TaskAction::Remove { id } => {
                if !tasks.remove(&id).await? {
                    return Err(format!("task not found: {id}").into());
                }
                println!("Task removed: {id}");
            }
        }
        Ok(())
    })
}
