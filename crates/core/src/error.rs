//! Error types for the slotboard domain.
//!
//! Uses `thiserror` for ergonomic error definitions. Every error is scoped
//! to a single request; none of them is process-fatal.

use thiserror::Error;

/// The top-level error type for all slotboard operations.
#[derive(Debug, Error)]
pub enum Error {
    // --- Client errors ---
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Board '{scope}' is full ({capacity} slots)")]
    CapacityExceeded { scope: String, capacity: u32 },

    // --- Backend errors ---
    #[error("Backend error: {0}")]
    Backend(#[from] KvError),

    #[error("Operation cancelled")]
    Cancelled,

    // --- Serialization ---
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // --- Configuration errors ---
    #[error("Configuration error: {message}")]
    Config { message: String },

    // --- Generic ---
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Whether the caller may retry the whole logical operation.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::Backend(KvError::Unavailable(_)))
    }
}

/// Result type alias using our Error.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised by a key-value backend.
#[derive(Debug, Clone, Error)]
pub enum KvError {
    #[error("Backend unavailable: {0}")]
    Unavailable(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Operation not supported by backend: {0}")]
    Unsupported(String),
}
