//! Error types for the chatmem domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Each bounded context has its own error variant.

use thiserror::Error;

/// The top-level error type for all chatmem operations.
#[derive(Debug, Error)]
pub enum Error {
    // --- Completion service errors ---
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    // --- Session store errors ---
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    // --- Structured output errors ---
    #[error("Extraction error: {0}")]
    Extract(#[from] ExtractError),

    // --- Configuration errors ---
    #[error("Configuration error: {message}")]
    Config { message: String },
}

impl Error {
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }
}

/// Result type alias using our Error.
pub type Result<T> = std::result::Result<T, Error>;

// --- Bounded context errors ---

#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    #[error("API request failed: {message} (status: {status_code})")]
    ApiError {
        status_code: u16,
        message: String,
    },

    #[error("Rate limited by provider, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Provider not configured: {0}")]
    NotConfigured(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Network error: {0}")]
    Network(String),
}

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("I/O failure at {path}: {reason}")]
    Io { path: String, reason: String },

    #[error("Corrupt session record {session_id}: {reason}")]
    Corrupt { session_id: String, reason: String },

    #[error("Failed to serialize session record: {0}")]
    Serialization(String),
}

/// Failures of the structured-output extractor.
///
/// Malformed model output is not an error on its own: schemas with a fallback
/// absorb it. These variants cover the cases where no safe object exists.
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("No valid {schema} object in model output: {reason}")]
    NoFallback { schema: &'static str, reason: String },

    #[error("Fallback {schema} object could not be constructed: {reason}")]
    Fatal { schema: &'static str, reason: String },
}
