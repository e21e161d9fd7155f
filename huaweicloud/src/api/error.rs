use thiserror::Error;

use super::common::ApiErrorDetails;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("HTTP request failed: {0}")]
    RequestError(#[from] reqwest::Error),

    #[error("resource not found: {path}")]
    NotFound {
        path: String,
        #[source]
        details: Option<Box<ApiErrorDetails>>,
    },

    #[error("API returned error (HTTP {status}): {message}")]
    ApiError {
        status: u16,
        message: String,
        #[source]
        details: Option<Box<ApiErrorDetails>>,
    },

    #[error("Failed to parse response: {0}")]
    ParseError(String),

    #[error("Authentication failed (HTTP {0})")]
    AuthError(u16),

    #[error("Request timeout after {0} seconds")]
    Timeout(u64),

    #[error("Too many requests, rate limited")]
    RateLimited,

    #[error("Service unavailable, retry later")]
    ServiceUnavailable,

    #[error("Failed to sign request: {0}")]
    SigningError(String),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
}

impl ApiError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, ApiError::NotFound { .. })
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::NotFound { .. } => Some(404),
            ApiError::ApiError { status, .. } => Some(*status),
            ApiError::AuthError(status) => Some(*status),
            ApiError::RateLimited => Some(429),
            ApiError::RequestError(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    /// HuaweiCloud error code such as "VPC.0202", when the body carried one
    pub fn error_code(&self) -> Option<&str> {
        match self {
            ApiError::NotFound { details, .. } | ApiError::ApiError { details, .. } => {
                details.as_ref().map(|d| d.code.as_str())
            }
            _ => None,
        }
    }

    /// Errors worth another probe: server-side trouble, throttling,
    /// conflicts with an in-flight operation, and connection failures
    pub fn is_retryable(&self) -> bool {
        match self {
            ApiError::RateLimited | ApiError::ServiceUnavailable | ApiError::Timeout(_) => true,
            ApiError::ApiError { status, .. } => *status >= 500 || *status == 409,
            ApiError::RequestError(e) => e.is_timeout() || e.is_connect(),
            _ => false,
        }
    }
}
