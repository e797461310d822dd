//! Error types for the cloud document store client.

use thiserror::Error;
use tutorhub_core::errors::Error as CoreError;

/// Result type alias for cloud store operations.
pub type Result<T> = std::result::Result<T, CloudStoreError>;

/// Retry policy class for API failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiRetryClass {
    Retryable,
    Permanent,
    ReauthRequired,
}

/// Errors that can occur while talking to the document API.
#[derive(Debug, Error)]
pub enum CloudStoreError {
    /// HTTP client error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// API error response from the document store
    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    /// Invalid request (missing required data, etc.)
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Authentication error (missing or invalid token)
    #[error("Authentication error: {0}")]
    Auth(String),
}

impl CloudStoreError {
    /// Create an API error from status and message.
    pub fn api(status: u16, message: impl Into<String>) -> Self {
        Self::Api {
            status,
            message: message.into(),
        }
    }

    /// Create an invalid request error.
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::InvalidRequest(message.into())
    }

    /// Create an auth error.
    pub fn auth(message: impl Into<String>) -> Self {
        Self::Auth(message.into())
    }

    /// Classify error for retry policy.
    pub fn retry_class(&self) -> ApiRetryClass {
        match self {
            Self::Api { status, .. } => match *status {
                401 | 403 => ApiRetryClass::ReauthRequired,
                408 | 409 | 423 | 425 | 429 => ApiRetryClass::Retryable,
                500..=599 => ApiRetryClass::Retryable,
                _ => ApiRetryClass::Permanent,
            },
            Self::Http(_) => ApiRetryClass::Retryable,
            Self::Json(_) => ApiRetryClass::Permanent,
            Self::InvalidRequest(_) => ApiRetryClass::Permanent,
            Self::Auth(_) => ApiRetryClass::ReauthRequired,
        }
    }
}

impl From<CloudStoreError> for CoreError {
    fn from(err: CloudStoreError) -> Self {
        match err {
            CloudStoreError::Auth(_) => CoreError::Unauthenticated,
            CloudStoreError::Api { status, message } => CoreError::Remote {
                status: Some(status),
                message,
            },
            CloudStoreError::Http(e) => CoreError::Remote {
                status: e.status().map(|s| s.as_u16()),
                message: e.to_string(),
            },
            CloudStoreError::Json(e) => CoreError::SerdeJson(e),
            CloudStoreError::InvalidRequest(message) => CoreError::Validation(message),
        }
    }
}
