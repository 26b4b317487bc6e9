//! Simulation error types.

use std::fmt;

use watchflood_core::{ApiError, Endpoint};

/// Longest body excerpt kept in an `UnexpectedStatus` error.
const MAX_BODY_EXCERPT: usize = 200;

/// Status codes an external call was allowed to answer with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpectedStatus {
    /// Exactly this status
    Exact(u16),
    /// Any 2xx
    Success,
    /// Any 3xx
    Redirect,
}

impl ExpectedStatus {
    /// Whether `status` is accepted.
    pub fn accepts(self, status: u16) -> bool {
        match self {
            ExpectedStatus::Exact(expected) => status == expected,
            ExpectedStatus::Success => (200..300).contains(&status),
            ExpectedStatus::Redirect => (300..400).contains(&status),
        }
    }
}

impl fmt::Display for ExpectedStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExpectedStatus::Exact(status) => write!(f, "{status}"),
            ExpectedStatus::Success => write!(f, "2xx"),
            ExpectedStatus::Redirect => write!(f, "3xx"),
        }
    }
}

/// Failure of one agent's or instance's turn.
///
/// Always local to the entity that hit it. The simulator logs it and carries
/// on with the next tick.
#[derive(Debug, thiserror::Error)]
pub enum SimulationError {
    /// External call answered outside the accepted status set
    #[error("{endpoint} returned {actual}, expected {expected}: {body}")]
    UnexpectedStatus {
        /// Endpoint that answered
        endpoint: Endpoint,
        /// Accepted status set
        expected: ExpectedStatus,
        /// Status actually received
        actual: u16,
        /// Response body excerpt
        body: String,
    },

    /// Slot redirect does not point at the requested video
    #[error("Redirect for video {expected_id} points at {location:?}")]
    RedirectMismatch {
        /// `youtube_id` the redirect should end with
        expected_id: String,
        /// `Location` the server sent, if any
        location: Option<String>,
    },

    /// Transport, timeout or decode failure
    #[error("API error: {0}")]
    Api(#[from] ApiError),
}

impl SimulationError {
    /// Builds an `UnexpectedStatus` error, truncating the body for logs.
    pub fn unexpected_status(
        endpoint: Endpoint,
        expected: ExpectedStatus,
        actual: u16,
        body: &str,
    ) -> Self {
        let body = match body.char_indices().nth(MAX_BODY_EXCERPT) {
            Some((cut, _)) => format!("{}...", &body[..cut]),
            None => body.to_string(),
        };
        SimulationError::UnexpectedStatus {
            endpoint,
            expected,
            actual,
            body,
        }
    }
}

/// Checks `status` against `expected`.
///
/// # Errors
/// - `SimulationError::UnexpectedStatus` - Status is outside the accepted set
pub(crate) fn expect_status(
    endpoint: Endpoint,
    expected: ExpectedStatus,
    response: &watchflood_core::ApiResponse,
) -> Result<(), SimulationError> {
    if expected.accepts(response.status) {
        Ok(())
    } else {
        Err(SimulationError::unexpected_status(
            endpoint,
            expected,
            response.status,
            &response.body,
        ))
    }
}
