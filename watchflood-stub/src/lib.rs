//! Watchflood Stub - Mock video-serving API for local load tests
//!
//! Fabricates randomized but schema-valid responses so the simulator has
//! something to consume without a real backend. Slots handed out by search
//! are remembered, which lets redirects reference the right video.

pub mod fixtures;
pub mod handlers;
pub mod server;

// Re-export main types
pub use server::{StubState, router, spawn};
