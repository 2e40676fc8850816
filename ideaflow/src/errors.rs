//! Error types for the ideaflow tracker.
//!
//! Errors below the tracker surface are typed; the caller only ever sees a
//! terminal message string through its error callback. The fixed messages
//! delivered that way are defined here.

use std::time::Duration;
use thiserror::Error;

/// Message reported when the final result cannot be fetched.
pub const FETCH_FAILED_MESSAGE: &str = "failed to fetch results";

/// Message reported when reconnection attempts are exhausted.
pub const CONNECTION_LOST_MESSAGE: &str = "connection lost";

/// Message reported when the pipeline fails without a readable reason.
pub const GENERIC_FAILURE_MESSAGE: &str = "Pipeline failed";

/// The main error type for ideaflow operations.
#[derive(Debug, Error)]
pub enum TrackerError {
    /// An HTTP collaborator call failed.
    #[error("{0}")]
    Http(#[from] HttpError),

    /// The event stream could not be opened or broke.
    #[error("{0}")]
    Stream(#[from] StreamError),

    /// Configuration was invalid.
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Errors from the shared request layer.
#[derive(Debug, Clone, Error)]
pub enum HttpError {
    /// The request did not finish within the timeout.
    #[error("Request timed out after {}s", timeout.as_secs())]
    Timeout {
        /// The timeout that elapsed.
        timeout: Duration,
    },

    /// The server rejected the credentials, even after a session refresh.
    #[error("Unauthorized")]
    Unauthorized,

    /// The server answered with a non-success status.
    #[error("Request failed with status {status}: {message}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Error detail from the body, if any.
        message: String,
    },

    /// The request could not be sent or the body could not be read.
    #[error("Transport error: {0}")]
    Transport(String),

    /// The response body did not match the expected shape.
    #[error("Invalid response body: {0}")]
    Decode(String),

    /// A URL could not be built.
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
}

impl HttpError {
    /// Creates a status error.
    #[must_use]
    pub fn status(status: u16, message: impl Into<String>) -> Self {
        Self::Status {
            status,
            message: message.into(),
        }
    }

    /// Returns true if the error is a timeout.
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }
}

impl From<reqwest::Error> for HttpError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            Self::Decode(err.to_string())
        } else if let Some(status) = err.status() {
            Self::status(status.as_u16(), err.to_string())
        } else {
            Self::Transport(err.to_string())
        }
    }
}

/// Errors from the server-push connection.
#[derive(Debug, Clone, Error)]
pub enum StreamError {
    /// The stream endpoint could not be resolved.
    #[error("Failed to resolve stream endpoint: {0}")]
    Endpoint(#[from] HttpError),

    /// The stream request was answered with a non-success status.
    #[error("Stream subscription failed with status {0}")]
    Status(u16),

    /// The transport failed while connecting or reading.
    #[error("Stream transport error: {0}")]
    Transport(String),

    /// A line or frame exceeded the decoder's size limit.
    #[error("Stream frame exceeds {limit} bytes")]
    Oversized {
        /// The limit in bytes.
        limit: usize,
    },
}

impl From<reqwest::Error> for StreamError {
    fn from(err: reqwest::Error) -> Self {
        Self::Transport(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_http_error_display() {
        let err = HttpError::Timeout {
            timeout: Duration::from_secs(15),
        };
        assert_eq!(err.to_string(), "Request timed out after 15s");
        assert!(err.is_timeout());

        let err = HttpError::status(404, "not found");
        assert_eq!(err.to_string(), "Request failed with status 404: not found");
        assert!(!err.is_timeout());
    }

    #[test]
    fn test_tracker_error_from_http() {
        let err: TrackerError = HttpError::Unauthorized.into();
        assert!(matches!(err, TrackerError::Http(HttpError::Unauthorized)));
        assert_eq!(err.to_string(), "Unauthorized");
    }

    #[test]
    fn test_stream_error_wraps_endpoint_failure() {
        let err: StreamError = HttpError::Transport("reset".to_string()).into();
        assert_eq!(
            err.to_string(),
            "Failed to resolve stream endpoint: Transport error: reset"
        );
    }

    #[test]
    fn test_fixed_messages() {
        assert_eq!(FETCH_FAILED_MESSAGE, "failed to fetch results");
        assert!(!CONNECTION_LOST_MESSAGE.is_empty());
        assert!(!GENERIC_FAILURE_MESSAGE.is_empty());
    }
}
