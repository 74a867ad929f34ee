//! User settings and the theme preference.
//!
//! Authenticated users get their settings from the backend. When that is not
//! possible (no credential, network failure, bad payload) the local values
//! are used: phase lengths from the config file and the stored theme.

use serde::{Deserialize, Serialize};

use crate::api::ApiClient;
use crate::error::{StorageError, ValidationError};
use crate::storage::{keys, Config, KeyValueStore};
use crate::timer::Durations;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

impl Theme {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "light" => Some(Theme::Light),
            "dark" => Some(Theme::Dark),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Theme::Light => "light",
            Theme::Dark => "dark",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserSettings {
    pub work_duration_secs: u64,
    pub short_break_duration_secs: u64,
    pub long_break_duration_secs: u64,
    pub sessions_until_long_break: u32,
    pub notifications_enabled: bool,
    pub theme: Theme,
}

impl Default for UserSettings {
    fn default() -> Self {
        Self {
            work_duration_secs: 1500,
            short_break_duration_secs: 300,
            long_break_duration_secs: 900,
            sessions_until_long_break: 4,
            notifications_enabled: true,
            theme: Theme::Light,
        }
    }
}

impl UserSettings {
    /// Settings built from local sources only.
    pub fn local(config: &Config, store: &dyn KeyValueStore) -> Self {
        Self {
            work_duration_secs: config.timer.work_duration_secs,
            short_break_duration_secs: config.timer.break_duration_secs,
            theme: load_theme(store),
            ..Self::default()
        }
    }

    /// Phase lengths for the clock. Long breaks are not scheduled.
    pub fn durations(&self) -> Result<Durations, ValidationError> {
        Durations::new(self.work_duration_secs, self.short_break_duration_secs)
    }
}

pub fn load_theme(store: &dyn KeyValueStore) -> Theme {
    match store.get(keys::THEME) {
        Ok(Some(raw)) => Theme::parse(&raw).unwrap_or_default(),
        Ok(None) => Theme::default(),
        Err(e) => {
            tracing::warn!("failed to read theme: {e}");
            Theme::default()
        }
    }
}

pub fn save_theme(store: &dyn KeyValueStore, theme: Theme) -> Result<(), StorageError> {
    store.set(keys::THEME, theme.as_str())
}

/// Resolve settings, falling back to local values on any backend failure.
pub async fn load(client: Option<&ApiClient>, config: &Config, store: &dyn KeyValueStore) -> UserSettings {
    let Some(client) = client else {
        return UserSettings::local(config, store);
    };
    match client.settings().await {
        Ok(settings) => {
            if let Err(e) = save_theme(store, settings.theme) {
                tracing::warn!("failed to persist theme: {e}");
            }
            settings
        }
        Err(e) => {
            tracing::warn!("loading settings failed, using local values: {e}");
            UserSettings::local(config, store)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;

    #[test]
    fn local_settings_use_config_and_stored_theme() {
        let store = MemoryStore::new();
        save_theme(&store, Theme::Dark).unwrap();
        let mut config = Config::default();
        config.timer.work_duration_secs = 600;

        let settings = UserSettings::local(&config, &store);
        assert_eq!(settings.work_duration_secs, 600);
        assert_eq!(settings.short_break_duration_secs, 300);
        assert_eq!(settings.theme, Theme::Dark);
    }

    #[test]
    fn unknown_stored_theme_defaults_to_light() {
        let store = MemoryStore::new();
        store.set(keys::THEME, "sepia").unwrap();
        assert_eq!(load_theme(&store), Theme::Light);
    }

    #[tokio::test]
    async fn anonymous_load_is_local() {
        let store = MemoryStore::new();
        let settings = load(None, &Config::default(), &store).await;
        assert_eq!(settings, UserSettings::default());
    }
}
