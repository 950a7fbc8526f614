use thiserror::Error;

/// Main error type for the replication layer.
///
/// Invalid moves are not errors anywhere in this crate — they are silent
/// no-ops at the engine boundary. This enum covers infrastructure faults
/// only: the shared store, serialization, configuration, and channels.
#[derive(Error, Debug)]
pub enum DropfourError {
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Shared store error: {0}")]
    Store(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

/// Result type alias for DropfourError
pub type Result<T> = std::result::Result<T, DropfourError>;
