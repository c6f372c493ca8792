use thiserror::Error;

/// Application-wide error types for hnjobs.
#[derive(Error, Debug)]
pub enum AppError {
    /// Required configuration is missing or invalid.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// HTTP request failed with a non-retryable status or a protocol error.
    #[error("HTTP error: {0}")]
    HttpError(String),

    /// Upstream answered with a transient server error (500/502/503/504).
    #[error("Upstream returned HTTP {status} for {url}")]
    UpstreamStatus { status: u16, url: String },

    /// Network/connection error.
    #[error("Network error: {0}")]
    NetworkError(String),

    /// Request timed out.
    #[error("Request timed out after {0} seconds")]
    Timeout(u64),

    /// Transient failures persisted past the retry bound.
    #[error("Remote unavailable after {attempts} attempts for {url}: {message}")]
    RemoteUnavailable {
        url: String,
        attempts: u32,
        message: String,
    },

    /// LLM API call failed.
    #[error("LLM error (HTTP {status_code}): {message}")]
    LlmError {
        message: String,
        status_code: u16,
        retryable: bool,
    },

    /// JSON serialization/deserialization failed.
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    /// No "Who is hiring?" thread matched the current month.
    #[error("No hiring thread found for {0}")]
    ThreadNotFound(String),

    /// Database operation failed.
    #[error("Database error: {0}")]
    DatabaseError(String),

    /// Generic error.
    #[error("{0}")]
    Generic(String),
}

impl AppError {
    /// Returns true if this error is transient and worth retrying.
    pub fn is_retryable(&self) -> bool {
        match self {
            AppError::NetworkError(_) | AppError::Timeout(_) => true,
            AppError::UpstreamStatus { status, .. } => matches!(status, 500 | 502 | 503 | 504),
            AppError::LlmError { retryable, .. } => *retryable,
            _ => false,
        }
    }
}
