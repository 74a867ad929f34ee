mod config;
pub mod database;
mod memory;

pub use config::{ApiConfig, Config, TimerConfig, WidgetsConfig};
pub use database::SqliteStore;
pub use memory::MemoryStore;

use std::path::PathBuf;

use crate::error::{ConfigError, StorageError};

/// Keys used in the local key-value store.
pub mod keys {
    pub const AUTH_TOKEN: &str = "auth_token";
    pub const THEME: &str = "theme";
    pub const TASKS: &str = "tasks";
    pub const DAILY_STATS: &str = "daily_stats";

    /// Saved window position for a widget label.
    pub fn widget_position(label: &str) -> String {
        format!("widget_position.{label}")
    }
}

/// Opaque key -> string persistence.
///
/// Implementations must be safe to share between actors.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;
    fn remove(&self, key: &str) -> Result<(), StorageError>;
}

/// Returns the data directory, creating it if needed.
///
/// `KLAR_DATA_DIR` wins when set. Otherwise `~/.config/klar`, or
/// `~/.config/klar-dev` with `KLAR_ENV=dev`.
///
/// # Errors
/// Returns an error if creating the directory fails.
pub fn data_dir() -> Result<PathBuf, ConfigError> {
    let dir = match std::env::var_os("KLAR_DATA_DIR") {
        Some(dir) if !dir.is_empty() => PathBuf::from(dir),
        _ => {
            let base_dir = dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".config");
            let env = std::env::var("KLAR_ENV").unwrap_or_else(|_| "production".to_string());
            if env == "dev" {
                base_dir.join("klar-dev")
            } else {
                base_dir.join("klar")
            }
        }
    };

    std::fs::create_dir_all(&dir)
        .map_err(|e| ConfigError::DataDir(format!("{}: {e}", dir.display())))?;
    Ok(dir)
}
