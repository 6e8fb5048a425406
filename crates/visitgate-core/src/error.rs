//! Error types for `visitgate` core library.

use thiserror::Error;

/// Result type alias using `visitgate` Error.
pub type Result<T> = std::result::Result<T, Error>;

/// Core error types for `visitgate` operations.
#[derive(Debug, Error)]
pub enum Error {
    /// Malformed recurrence, date, time or window bounds
    #[error("Invalid schedule: {0}")]
    InvalidSchedule(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
