//! Video-serving API abstractions and the HTTP implementation.
//!
//! The simulator only talks to the API through [`ApiClient`], so tests can
//! substitute a scripted client and the load generator can target either
//! protocol version without changes to agent logic.

pub mod client;
pub mod error;
pub mod routes;
pub mod types;

use std::fmt;

use async_trait::async_trait;

pub use client::HttpApiClient;
pub use error::ApiError;
pub use routes::ApiProtocol;
pub use types::{ApiResponse, RedirectOutcome, SearchResponse, Video};

/// External API operation, used for routing and error context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Endpoint {
    Hello,
    Search,
    Atlas,
    Slot,
    QueueRefresh,
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Endpoint::Hello => write!(f, "hello"),
            Endpoint::Search => write!(f, "search"),
            Endpoint::Atlas => write!(f, "atlas"),
            Endpoint::Slot => write!(f, "slot"),
            Endpoint::QueueRefresh => write!(f, "queue-refresh"),
        }
    }
}

/// Client identity presented through the `User-Agent` header.
///
/// The API answers slot resolves differently per identity, which is how
/// the load generator exercises the redirect paths of different players.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ClientIdentity {
    /// The in-world client itself
    Generic,
    /// Standalone headset media player
    Quest,
    /// Desktop media player
    Standard,
}

/// Abstract interface to the video-serving API.
///
/// Every method performs exactly one HTTP exchange. Status codes are
/// surfaced in [`ApiResponse`] and judged by the caller.
#[async_trait]
pub trait ApiClient: Send + Sync {
    /// Protocol version this client speaks.
    fn protocol(&self) -> ApiProtocol;

    /// Announces a participant using `token`.
    ///
    /// # Errors
    /// - `ApiError::Transport` - Connection-level failure
    /// - `ApiError::Timeout` - Call exceeded the per-call timeout
    async fn hello(&self, token: &str) -> Result<ApiResponse, ApiError>;

    /// Searches for videos matching `query`.
    ///
    /// # Errors
    /// - `ApiError::Transport` - Connection-level failure
    /// - `ApiError::Timeout` - Call exceeded the per-call timeout
    async fn search(&self, query: &str, identity: ClientIdentity)
    -> Result<ApiResponse, ApiError>;

    /// Resolves the thumbnail atlas of a V5 search response.
    ///
    /// # Errors
    /// - `ApiError::Transport` - Connection-level failure
    /// - `ApiError::Timeout` - Call exceeded the per-call timeout
    async fn resolve_atlas(&self, atlas_slot_id: &str) -> Result<ApiResponse, ApiError>;

    /// Resolves a video slot as `identity` without following redirects.
    ///
    /// # Errors
    /// - `ApiError::Transport` - Connection-level failure
    /// - `ApiError::Timeout` - Call exceeded the per-call timeout
    async fn resolve_slot(
        &self,
        slot_id: &str,
        identity: ClientIdentity,
    ) -> Result<ApiResponse, ApiError>;

    /// Keeps a queued video's server-side entry alive.
    ///
    /// # Errors
    /// - `ApiError::Transport` - Connection-level failure
    /// - `ApiError::Timeout` - Call exceeded the per-call timeout
    async fn refresh_queue(&self, slot_id: &str) -> Result<ApiResponse, ApiError>;
}
