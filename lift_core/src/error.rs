//! Error types for the lift_core library.

use std::io;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for lift_core operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// IO error occurred
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// CSV error
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// TOML parsing error
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Configuration validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Store constraint violation or poisoned store lock
    #[error("Store error: {0}")]
    Store(String),

    /// A screen was opened without an identifier it cannot work without
    #[error("Missing required argument: {0}")]
    MissingArgument(&'static str),

    /// A navigation argument was present but could not be parsed
    #[error("Invalid value {value:?} for argument {key}")]
    InvalidArgument { key: &'static str, value: String },

    /// Lookup by name or number found nothing
    #[error("Not found: {0}")]
    NotFound(String),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl<T> From<std::sync::PoisonError<T>> for Error {
    fn from(e: std::sync::PoisonError<T>) -> Self {
        Error::Store(format!("store lock poisoned: {}", e))
    }
}
