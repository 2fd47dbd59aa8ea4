//! Core error types for pomobot-core.
//!
//! Most failures in the timing engine are recovered locally (clamping,
//! fallback audio, transient banners). The types here cover the places where
//! an error does travel: storage, configuration files and the audio backends.

use std::path::PathBuf;
use thiserror::Error;

/// Core error type for pomobot-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Database-related errors
    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Audio subsystem errors
    #[error("Audio error: {0}")]
    Audio(#[from] AudioError),

    /// Persistence collaborator errors
    #[error("Persistence error: {0}")]
    Persistence(#[from] PersistenceError),

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Database-specific errors.
#[derive(Error, Debug)]
pub enum DatabaseError {
    /// Failed to open database connection
    #[error("Failed to open database at {path}: {source}")]
    OpenFailed {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    /// Query execution failed
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Migration failed
    #[error("Database migration failed: {0}")]
    MigrationFailed(String),

    /// Database is locked
    #[error("Database is locked")]
    Locked,
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Data directory could not be resolved or created
    #[error("Data directory unavailable: {0}")]
    DataDir(String),

    /// Failed to load configuration
    #[error("Failed to load configuration from {path}: {message}")]
    LoadFailed { path: PathBuf, message: String },

    /// Failed to save configuration
    #[error("Failed to save configuration to {path}: {message}")]
    SaveFailed { path: PathBuf, message: String },

    /// Invalid configuration value
    #[error("Invalid configuration value for '{key}': {message}")]
    InvalidValue { key: String, message: String },

    /// Unknown configuration key
    #[error("Unknown configuration key: {0}")]
    UnknownKey(String),
}

/// Audio subsystem errors.
///
/// These never escape the synthesizer; they decide between the primary
/// path, the fallback beep and silence.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AudioError {
    /// No output device or the subsystem is blocked
    #[error("Audio output unavailable: {0}")]
    Unavailable(String),

    /// Playback requires a user-gesture unlock first
    #[error("Audio playback is locked until primed by a user gesture")]
    Locked,

    /// Playback started but failed
    #[error("Playback failed: {0}")]
    Playback(String),

    /// Embedded clip could not be decoded
    #[error("Invalid audio clip: {0}")]
    InvalidClip(String),
}

/// Errors reported by a persistence collaborator.
#[derive(Error, Debug)]
pub enum PersistenceError {
    /// Backing store cannot be reached
    #[error("Persistence service unavailable: {0}")]
    Unavailable(String),

    /// Local database failure
    #[error(transparent)]
    Database(#[from] DatabaseError),

    /// Stored document could not be (de)serialized
    #[error("Stored document is malformed: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// Validation errors.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    /// Empty collection
    #[error("Empty collection: {0}")]
    EmptyCollection(String),

    /// Invalid value
    #[error("Invalid value for '{field}': {message}")]
    InvalidValue { field: String, message: String },
}

impl From<rusqlite::Error> for DatabaseError {
    fn from(err: rusqlite::Error) -> Self {
        match &err {
            rusqlite::Error::SqliteFailure(code, _msg)
                if code.code == rusqlite::ErrorCode::DatabaseLocked =>
            {
                DatabaseError::Locked
            }
            _ => DatabaseError::QueryFailed(err.to_string()),
        }
    }
}

impl From<rusqlite::Error> for PersistenceError {
    fn from(err: rusqlite::Error) -> Self {
        PersistenceError::Database(err.into())
    }
}

/// Result type alias for CoreError
pub type Result<T, E = CoreError> = std::result::Result<T, E>;
