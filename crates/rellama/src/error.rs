//! Error types for rellama

use thiserror::Error;

/// Main error type for rellama operations
#[derive(Error, Debug)]
pub enum RellamaError {
    /// Configuration errors (missing backend URL, unreadable config file)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Transport errors (connection refused, timeout, unexpected status)
    #[error("Network error: {0}")]
    Network(String),

    /// The backend reported 404 for a named resource
    #[error("{0} not found")]
    NotFound(String),

    /// A streamed ND-JSON record failed to decode; fatal to that stream
    #[error("Malformed stream record: {0}")]
    Stream(String),

    /// Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for rellama operations
pub type Result<T> = std::result::Result<T, RellamaError>;
