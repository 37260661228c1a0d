//! Error types for feedclock.
//!
//! This module defines all error types used throughout the feedclock crate.
//! Every failure mode in the timer subsystem degrades to "timer state
//! unchanged, user informed" — there are no fatal errors.

use std::path::PathBuf;
use thiserror::Error;

/// The main error type for feedclock operations.
#[derive(Error, Debug)]
pub enum Error {
    // === Storage Errors ===
    /// Failed to open or create the state database.
    #[error("failed to open state store at {path}: {source}")]
    StateOpen {
        /// Path to the database file.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: rusqlite::Error,
    },

    /// A state store query failed.
    #[error("state store query failed: {0}")]
    StateQuery(#[from] rusqlite::Error),

    /// Failed to create a required directory.
    #[error("failed to create directory {path}: {source}")]
    DirectoryCreate {
        /// Path that couldn't be created.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },

    // === Configuration Errors ===
    /// Failed to load configuration.
    #[error("failed to load configuration: {0}")]
    ConfigLoad(Box<figment::Error>),

    /// Configuration validation failed.
    #[error("invalid configuration: {message}")]
    ConfigValidation {
        /// Description of the validation failure.
        message: String,
    },

    // === Timer Errors ===
    /// A start was attempted while a timer is already running.
    #[error("a feeding timer is already running; end or cancel it first")]
    TimerActive,

    /// An end was confirmed but no timer exists.
    #[error("no active feeding timer")]
    NoActiveTimer,

    /// An end was confirmed without a prior end request.
    #[error("end has not been requested; request it before confirming")]
    EndNotRequested,

    // === Feeding Log API Errors ===
    /// The HTTP request itself failed (connection, timeout, decode).
    #[error("feeding log request failed: {0}")]
    ApiRequest(#[from] reqwest::Error),

    /// The feeding log rejected the request.
    #[error("feeding log returned {status}: {message}")]
    ApiStatus {
        /// HTTP status code.
        status: u16,
        /// Human-readable message from the server.
        message: String,
    },

    // === Serialization Errors ===
    /// JSON serialization/deserialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // === I/O Errors ===
    /// File system operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// A specialized Result type for feedclock operations.
pub type Result<T> = std::result::Result<T, Error>;

impl From<figment::Error> for Error {
    fn from(err: figment::Error) -> Self {
        Self::ConfigLoad(Box::new(err))
    }
}

impl Error {
    /// Create an API status error from a response code and message.
    #[must_use]
    pub fn api_status(status: u16, message: impl Into<String>) -> Self {
        Self::ApiStatus {
            status,
            message: message.into(),
        }
    }

    /// Check if this error came from the feeding log API.
    ///
    /// API failures leave the persisted timer intact, so callers can offer
    /// a retry instead of treating the state as lost.
    #[must_use]
    pub fn is_api_failure(&self) -> bool {
        matches!(self, Self::ApiRequest(_) | Self::ApiStatus { .. })
    }

    /// Check if this error indicates a timer is already running.
    #[must_use]
    pub fn is_timer_active(&self) -> bool {
        matches!(self, Self::TimerActive)
    }
}
