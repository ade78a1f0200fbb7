//! Error types for directory connectors.
//!
//! Errors are categorized so the caller can tell a dead network from a bad
//! credential or a payload it could not understand.

use std::fmt;

/// Result type alias for connector operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Categories of connector errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Transport failure or unexpected HTTP status.
    Network,
    /// Missing, malformed or rejected credentials.
    Auth,
    /// Response body could not be understood.
    Format,
    /// Resource not found.
    NotFound,
    /// Other/unknown errors.
    Other,
}

impl ErrorCategory {
    /// Get a user-friendly description of this error category.
    #[must_use]
    pub fn description(&self) -> &'static str {
        match self {
            Self::Network => "Network or HTTP failure",
            Self::Auth => "Authentication failure",
            Self::Format => "Unexpected response format",
            Self::NotFound => "Resource not found",
            Self::Other => "Unexpected error",
        }
    }

    /// Get actionable advice for resolving this error category.
    #[must_use]
    pub fn advice(&self) -> &'static str {
        match self {
            Self::Network => "Check connectivity and the configured API URLs",
            Self::Auth => "Check the access token and API key",
            Self::Format => "The remote API may have changed, rerun with -vv for details",
            Self::NotFound => "The resource may have been removed concurrently, sync again",
            Self::Other => "Check the error details for more information",
        }
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.description())
    }
}

/// Errors that can occur while talking to a directory.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// HTTP request failed or returned an unexpected status.
    #[error("HTTP request failed: {message}")]
    Http {
        /// Error message.
        message: String,
        /// HTTP status code if available.
        status: Option<u16>,
    },

    /// Invalid response from the API.
    #[error("invalid API response: {0}")]
    InvalidResponse(String),

    /// Access token could not be obtained or decoded.
    #[error("invalid access token: {0}")]
    InvalidToken(String),

    /// Resource missing from the directory.
    #[error("not found: {0}")]
    NotFound(String),

    /// Connector misconfigured.
    #[error("configuration error: {0}")]
    Config(String),
}

impl Error {
    /// Create an HTTP error.
    pub fn http(message: impl Into<String>, status: Option<u16>) -> Self {
        Self::Http {
            message: message.into(),
            status,
        }
    }

    /// Get the error category.
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        match self {
            Error::Http {
                status: Some(401 | 403),
                ..
            }
            | Error::InvalidToken(_) => ErrorCategory::Auth,
            Error::Http {
                status: Some(404), ..
            }
            | Error::NotFound(_) => ErrorCategory::NotFound,
            Error::Http { .. } => ErrorCategory::Network,
            Error::InvalidResponse(_) => ErrorCategory::Format,
            Error::Config(_) => ErrorCategory::Other,
        }
    }
}

impl From<ureq::Error> for Error {
    fn from(err: ureq::Error) -> Self {
        match err {
            ureq::Error::StatusCode(code) => Self::Http {
                message: format!("HTTP {code}"),
                status: Some(code),
            },
            other => Self::Http {
                message: other.to_string(),
                status: None,
            },
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::InvalidResponse(err.to_string())
    }
}
