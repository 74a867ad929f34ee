//! Core error types for klar-core.
//!
//! This module defines the error hierarchy using thiserror. Failures that the
//! runtime swallows (session bookkeeping, broadcasts to a gone peer) still use
//! these types so they can be logged with context.

use std::path::PathBuf;
use thiserror::Error;

/// Core error type for klar-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Local key-value storage errors
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Backend (REST) errors
    #[error("Backend error: {0}")]
    Api(#[from] ApiError),

    /// Window manager errors
    #[error("Window error: {0}")]
    Window(#[from] WindowError),

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// An actor's mailbox is gone (runtime shut down).
    #[error("{0} is no longer running")]
    ActorStopped(&'static str),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Local store errors.
#[derive(Error, Debug)]
pub enum StorageError {
    /// Failed to open the database file
    #[error("Failed to open store at {path}: {source}")]
    OpenFailed {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    /// Query execution failed
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Database is locked
    #[error("Store is locked")]
    Locked,

    /// A stored value could not be decoded
    #[error("Corrupt value under '{key}': {message}")]
    Corrupt { key: String, message: String },
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to load configuration
    #[error("Failed to load configuration from {path}: {message}")]
    LoadFailed { path: PathBuf, message: String },

    /// Failed to save configuration
    #[error("Failed to save configuration to {path}: {message}")]
    SaveFailed { path: PathBuf, message: String },

    /// Unknown dot-path key
    #[error("Unknown configuration key: {0}")]
    UnknownKey(String),

    /// Invalid configuration value
    #[error("Invalid configuration value for '{key}': {message}")]
    InvalidValue { key: String, message: String },

    /// Home/data directory could not be resolved or created
    #[error("Data directory unavailable: {0}")]
    DataDir(String),
}

/// Backend errors.
#[derive(Error, Debug)]
pub enum ApiError {
    /// Transport-level failure (connect, timeout, body read)
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Non-2xx response
    #[error("HTTP {status}: {message}")]
    Status { status: u16, message: String },

    /// 401/403 or no credential configured
    #[error("Not authenticated")]
    Unauthorized,

    /// The response parsed but lacks a required field
    #[error("Invalid response from server: {0}")]
    InvalidResponse(String),

    /// Base URL could not be joined with an endpoint
    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),
}

/// Window manager errors.
#[derive(Error, Debug)]
pub enum WindowError {
    #[error("Failed to create window '{label}': {message}")]
    CreateFailed { label: String, message: String },

    #[error("Failed to focus window '{label}': {message}")]
    FocusFailed { label: String, message: String },

    #[error("Failed to close window '{label}': {message}")]
    CloseFailed { label: String, message: String },

    #[error("Window '{0}' not found")]
    NotFound(String),

    /// Nobody received a published event
    #[error("Failed to emit '{event}': {message}")]
    EmitFailed { event: String, message: String },
}

/// Validation errors.
#[derive(Error, Debug)]
pub enum ValidationError {
    /// Phase durations must be positive
    #[error("Duration for '{field}' must be greater than zero")]
    ZeroDuration { field: String },

    /// Invalid value
    #[error("Invalid value for '{field}': {message}")]
    InvalidValue { field: String, message: String },
}

impl From<rusqlite::Error> for StorageError {
    fn from(err: rusqlite::Error) -> Self {
        match &err {
            rusqlite::Error::SqliteFailure(e, _msg) => {
                if e.code == rusqlite::ErrorCode::DatabaseLocked {
                    StorageError::Locked
                } else {
                    StorageError::QueryFailed(err.to_string())
                }
            }
            _ => StorageError::QueryFailed(err.to_string()),
        }
    }
}

impl From<rusqlite::Error> for CoreError {
    fn from(err: rusqlite::Error) -> Self {
        CoreError::Storage(err.into())
    }
}

impl ApiError {
    /// True for failures where the server rejected the credential.
    pub fn is_auth_failure(&self) -> bool {
        match self {
            ApiError::Unauthorized => true,
            ApiError::Status { status, .. } => *status == 401 || *status == 403,
            _ => false,
        }
    }
}

/// Result type alias for CoreError
pub type Result<T, E = CoreError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_401_is_auth_failure() {
        let err = ApiError::Status {
            status: 401,
            message: "expired".into(),
        };
        assert!(err.is_auth_failure());
        assert!(!ApiError::InvalidResponse("x".into()).is_auth_failure());
    }

    #[test]
    fn core_error_wraps_validation() {
        let err: CoreError = ValidationError::ZeroDuration {
            field: "work".into(),
        }
        .into();
        assert_eq!(
            err.to_string(),
            "Validation error: Duration for 'work' must be greater than zero"
        );
    }
}
