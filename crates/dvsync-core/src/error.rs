//! Error types for dvsync

use thiserror::Error;

/// Core error type for dvsync operations
#[derive(Error, Debug)]
pub enum SyncError {
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("DDL error: {0}")]
    Ddl(String),

    #[error("Unsupported type: {0}")]
    UnsupportedType(String),

    #[error("Metadata service unavailable: {0}")]
    Unavailable(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Not supported: {0}")]
    NotSupported(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Cancelled")]
    Cancelled,

    #[error("{0}")]
    Other(String),
}

/// Result type alias for dvsync operations
pub type Result<T> = std::result::Result<T, SyncError>;
