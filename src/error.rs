//! Error types for the timeline data access layer

use thiserror::Error;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in the timeline data access layer
#[derive(Error, Debug)]
pub enum Error {
    /// Remote query source failure (network error, timeout, non-2xx)
    #[error("Remote query failed: {0}")]
    Remote(String),

    /// Durable key-value store failure
    #[error("Key-value store error: {0}")]
    Store(String),

    /// JSON serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Compression failed
    #[error("Compression failed: {reason}")]
    CompressionFailed { reason: String },

    /// Decompression failed
    #[error("Decompression failed: {reason}")]
    DecompressionFailed { reason: String },

    /// Compliance-driven user data erasure failed.
    ///
    /// Unlike opportunistic cleanup, partial erasure is a correctness
    /// violation, so this always propagates to the caller.
    #[error("User data erasure failed for {user_id}: {reason}")]
    UserDataErasure { user_id: String, reason: String },

    /// Operation referenced a query signature that was never initialized
    /// or has been disposed
    #[error("Unknown query signature: {0}")]
    UnknownQuery(String),

    /// Invalid configuration
    #[error("Configuration error: {0}")]
    Config(String),
}
