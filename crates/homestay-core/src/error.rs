//! Error types for Homestay core library.

use thiserror::Error;

/// Result type alias using Homestay Error.
pub type Result<T> = std::result::Result<T, Error>;

/// Core error types for Homestay operations.
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// A stored or supplied value does not name a known role or status
    #[error("Unknown {kind}: {value}")]
    UnknownValue {
        /// What was being parsed ("role", "property status", ...).
        kind: &'static str,
        /// The offending text.
        value: String,
    },

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
