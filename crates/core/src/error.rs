//! Error types for the Reprompt domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Each bounded context has its own error variant.

use std::path::PathBuf;
use thiserror::Error;

/// The top-level error type for all Reprompt operations.
#[derive(Debug, Error)]
pub enum Error {
    // --- Provider errors ---
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    // --- Dataset errors ---
    #[error("Dataset error: {0}")]
    Dataset(#[from] DatasetError),

    // --- Tokenization errors ---
    #[error("Tokenization error: {0}")]
    Tokenize(#[from] TokenizeError),

    // --- Configuration errors ---
    #[error("Configuration error: {message}")]
    Config { message: String },

    // --- I/O ---
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // --- Serialization ---
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // --- Generic ---
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Shorthand for a configuration error.
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
    ApiError { status_code: u16, message: String },

    #[error("Rate limited by provider, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    /// The provider refused the request (content policy, malformed prompt).
    /// Never retried.
    #[error("Request rejected by provider: {0}")]
    Rejected(String),

    #[error("Provider not configured: {0}")]
    NotConfigured(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Invalid provider response: {0}")]
    InvalidResponse(String),
}

impl ProviderError {
    /// Whether a retry with backoff may succeed.
    ///
    /// Rate limits, timeouts, network failures, server-side 5xx errors and
    /// garbled responses are transient. Rejections, authentication problems,
    /// client-side 4xx errors and missing configuration are terminal.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::RateLimited { .. }
            | Self::Timeout(_)
            | Self::Network(_)
            | Self::InvalidResponse(_) => true,
            Self::ApiError { status_code, .. } => *status_code >= 500,
            Self::AuthenticationFailed(_) | Self::Rejected(_) | Self::NotConfigured(_) => false,
        }
    }

    /// Whether this error means the prompt itself was blocked.
    pub fn is_rejection(&self) -> bool {
        matches!(self, Self::Rejected(_))
    }
}

#[derive(Debug, Error)]
pub enum DatasetError {
    #[error("Unsupported dataset: {0}")]
    Unsupported(String),

    #[error("Dataset not found at {}", .path.display())]
    MissingData { path: PathBuf },

    #[error("Question id {question_id} out of range (dataset has {len} questions)")]
    InvalidIndex { question_id: usize, len: usize },

    #[error("Malformed dataset file {}: {reason}", .path.display())]
    Malformed { path: PathBuf, reason: String },
}

/// A passage the token counter could not encode.
#[derive(Debug, Clone, Error)]
#[error("could not tokenize {len} bytes of text for {model}: {reason}")]
pub struct TokenizeError {
    pub model: String,
    pub len: usize,
    pub reason: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_error_displays_correctly() {
        let err = Error::Provider(ProviderError::ApiError {
            status_code: 429,
            message: "Too many requests".into(),
        });
        assert!(err.to_string().contains("429"));
        assert!(err.to_string().contains("Too many requests"));
    }

    #[test]
    fn transient_errors_are_retryable() {
        assert!(ProviderError::RateLimited { retry_after_secs: 5 }.is_retryable());
        assert!(ProviderError::Timeout("slow".into()).is_retryable());
        assert!(ProviderError::Network("reset".into()).is_retryable());
        assert!(
            ProviderError::ApiError {
                status_code: 503,
                message: "overloaded".into()
            }
            .is_retryable()
        );
    }

    #[test]
    fn terminal_errors_are_not_retryable() {
        assert!(!ProviderError::Rejected("policy".into()).is_retryable());
        assert!(!ProviderError::AuthenticationFailed("bad key".into()).is_retryable());
        assert!(
            !ProviderError::ApiError {
                status_code: 404,
                message: "no such model".into()
            }
            .is_retryable()
        );
        assert!(ProviderError::Rejected("policy".into()).is_rejection());
    }

    #[test]
    fn dataset_error_mentions_path() {
        let err = DatasetError::MissingData {
            path: PathBuf::from("data/nq/missing.jsonl.gz"),
        };
        assert!(err.to_string().contains("data/nq/missing.jsonl.gz"));
    }

    #[test]
    fn invalid_index_reports_bounds() {
        let err = DatasetError::InvalidIndex {
            question_id: 300,
            len: 250,
        };
        let text = err.to_string();
        assert!(text.contains("300"));
        assert!(text.contains("250"));
    }
}
