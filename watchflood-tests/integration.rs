//! Integration tests
//!
//! Every test starts its own stub server on a free local port and drives it
//! through the real HTTP client.

#[path = "integration/common.rs"]
mod common;

#[path = "integration/api_client.rs"]
mod api_client;

#[path = "integration/simulation.rs"]
mod simulation;
