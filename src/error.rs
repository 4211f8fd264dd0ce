//! Error types for order-matview

use thiserror::Error;

/// Result type alias for order-matview operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for order-matview
#[derive(Error, Debug)]
pub enum Error {
    /// Backing-store errors (source or destination collection)
    #[error("Store error: {0}")]
    Store(String),

    /// Aggregation pipeline execution errors
    #[error("Pipeline error: {0}")]
    Pipeline(String),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Refresh scheduling errors
    #[error("Scheduler error: {0}")]
    Scheduler(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic error wrapper
    #[error("Error: {0}")]
    Other(String),
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}
