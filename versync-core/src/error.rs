//! Error types for the sync core.

use thiserror::Error;

/// Failure of a single remote provider invocation.
#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("failed to start {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{operation} timed out after {secs}s")]
    Timeout { operation: &'static str, secs: u64 },

    #[error("{operation} exited with code {code}: {stderr}")]
    Failed {
        operation: &'static str,
        code: i32,
        stderr: String,
    },

    #[error("not found: {0}")]
    NotFound(String),
}

#[derive(Error, Debug)]
pub enum SyncError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    #[error("Invalid version stamp: {0}")]
    InvalidStamp(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
