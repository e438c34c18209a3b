//! Error taxonomy for provider calls and the streaming relay

use std::time::Duration;
use thiserror::Error;

/// Result type for provider and relay operations
pub type RelayResult<T> = Result<T, RelayError>;

/// Classified errors for provider calls
///
/// Rate limits, server errors, timeouts, and undecodable bodies are
/// retryable; everything else terminates the attempt immediately.
/// Display output is safe to show to an end user.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RelayError {
    /// Caller error; no network call was attempted
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Provider is missing a credential or disabled by configuration
    #[error("provider unavailable: {0}")]
    ProviderUnavailable(String),

    /// Upstream rate limit (HTTP 429)
    #[error("rate limited by provider")]
    RateLimited { retry_after: Option<Duration> },

    /// Upstream 5xx or transport failure (`status` is `None` when the
    /// request never produced an HTTP status)
    #[error("provider server error: {message}")]
    ProviderServerError {
        status: Option<u16>,
        message: String,
    },

    /// Request or stream timed out
    #[error("request timed out")]
    Timeout,

    /// Well-formed upstream 4xx other than rate limit; not retried
    #[error("provider rejected the request ({status}): {message}")]
    ProviderRejected { status: u16, message: String },

    /// User-initiated cancellation; not an error to the user
    #[error("cancelled")]
    Cancelled,

    /// Upstream body could not be decoded; retried like a server error
    #[error("could not decode provider response: {0}")]
    DecodeError(String),
}

impl RelayError {
    /// Whether the retry policy may apply to this error
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::RateLimited { .. }
                | Self::ProviderServerError { .. }
                | Self::Timeout
                | Self::DecodeError(_)
        )
    }

    /// Upstream-suggested retry delay, when one was provided
    pub fn retry_delay(&self) -> Option<Duration> {
        match self {
            Self::RateLimited { retry_after } => *retry_after,
            _ => None,
        }
    }

    /// Stable kind tag carried on client error frames
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidRequest(_) => "invalid_request",
            Self::ProviderUnavailable(_) => "provider_unavailable",
            Self::RateLimited { .. } => "rate_limited",
            Self::ProviderServerError { .. } => "provider_server_error",
            Self::Timeout => "timeout",
            Self::ProviderRejected { .. } => "provider_rejected",
            Self::Cancelled => "cancelled",
            Self::DecodeError(_) => "decode_error",
        }
    }

    /// Message safe for the client connection: no credential values,
    /// internal paths, or stack traces ever appear in Display output
    pub fn user_message(&self) -> String {
        self.to_string()
    }
}

impl From<reqwest::Error> for RelayError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            RelayError::Timeout
        } else if let Some(status) = err.status() {
            classify_status(status.as_u16(), format!("HTTP {status}"), None)
        } else if err.is_connect() {
            RelayError::ProviderServerError {
                status: None,
                message: "upstream connection failed".to_string(),
            }
        } else {
            RelayError::ProviderServerError {
                status: None,
                message: "upstream request failed".to_string(),
            }
        }
    }
}

/// Classify a non-success HTTP status into a `RelayError`
pub fn classify_status(status: u16, message: String, retry_after: Option<Duration>) -> RelayError {
    match status {
        408 | 504 => RelayError::Timeout,
        429 => RelayError::RateLimited { retry_after },
        s if s >= 500 => RelayError::ProviderServerError {
            status: Some(s),
            message,
        },
        s => RelayError::ProviderRejected { status: s, message },
    }
}
