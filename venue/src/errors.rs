//! Error types for Venue

use thiserror::Error;

/// Main error type for Venue
#[derive(Error, Debug)]
pub enum VenueError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    HttpError(#[from] reqwest::Error),

    /// Non-success response from the remote API
    #[error("API error: {status} {message}")]
    ApiError { status: u16, message: String },

    #[error("Not authenticated: {0}")]
    NotAuthenticated(String),

    #[error("Storage error: {0}")]
    StorageError(String),

    #[error("Server error: {0}")]
    ServerError(String),

    #[error("Shutdown error: {0}")]
    ShutdownError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<anyhow::Error> for VenueError {
    fn from(err: anyhow::Error) -> Self {
        VenueError::Internal(err.to_string())
    }
}
