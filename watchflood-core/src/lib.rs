//! Watchflood Core - Configuration, API client and wire types
//!
//! This crate provides the building blocks the load generator needs to talk
//! to a video-serving API: the typed request/response values, the protocol
//! route layout, the `ApiClient` seam with its reqwest implementation,
//! configuration and tracing setup.

pub mod api;
pub mod config;
pub mod tracing_setup;

// Re-export main types for convenient access
pub use api::{
    ApiClient, ApiError, ApiProtocol, ApiResponse, ClientIdentity, Endpoint, HttpApiClient,
    RedirectOutcome, SearchResponse, Video,
};
pub use config::{ApiConfig, SimulationConfig, WatchfloodConfig};
