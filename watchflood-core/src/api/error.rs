//! Error types for calls against the video-serving API.

use std::time::Duration;

use thiserror::Error;

use super::Endpoint;

/// Failures at the API boundary.
///
/// Status-code assertions are not errors at this layer: a 500 is a
/// successful HTTP exchange and is surfaced to the caller as a response.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Connection-level failure (refused, reset, DNS, body read).
    #[error("Transport failure on {endpoint}: {reason}")]
    Transport {
        /// Endpoint that was being called
        endpoint: Endpoint,
        /// Underlying transport error
        reason: String,
    },

    /// The call did not complete within the configured per-call timeout.
    #[error("{endpoint} timed out after {timeout:?}")]
    Timeout {
        /// Endpoint that was being called
        endpoint: Endpoint,
        /// Configured per-call timeout
        timeout: Duration,
    },

    /// Response body did not match the expected schema.
    #[error("Failed to decode {endpoint} response: {reason}")]
    Decode {
        /// Endpoint whose response failed to decode
        endpoint: Endpoint,
        /// What was wrong with the payload
        reason: String,
    },

    /// Request URL could not be built from the base URL.
    #[error("Invalid request URL: {reason}")]
    InvalidUrl {
        /// Parse failure details
        reason: String,
    },

    /// HTTP client could not be constructed.
    #[error("HTTP client setup failed: {reason}")]
    ClientSetup {
        /// Builder failure details
        reason: String,
    },
}

impl ApiError {
    /// Checks if this error is a transport-level failure (including timeouts).
    pub fn is_transport(&self) -> bool {
        matches!(self, ApiError::Transport { .. } | ApiError::Timeout { .. })
    }
}
