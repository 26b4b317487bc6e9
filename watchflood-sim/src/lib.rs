//! Watchflood Simulation - Tick-driven load generation for a video-serving API.

#![warn(missing_docs)]
#![warn(clippy::missing_errors_doc)]
#![deny(clippy::missing_panics_doc)]
#![warn(clippy::too_many_lines)]
//!
//! This crate emulates a churning population of watch parties. Each
//! instance groups agents that share one watch state and pending queue, and
//! every tick the simulator resizes the population, then lets a random
//! subset of instances advance their state machines concurrently.
//!
//! # Features
//!
//! - **Reproducible Runs**: One root seed drives every random decision
//! - **Structured Concurrency**: One join per phase, no shared locks
//! - **Failure Isolation**: A failing instance never stops its siblings
//! - **Invariant Checking**: Queue capacity and population rules checked per tick
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use watchflood_core::{HttpApiClient, WatchfloodConfig};
//! use watchflood_sim::{SimContext, Simulator};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = WatchfloodConfig::default();
//! let api = Arc::new(HttpApiClient::new(&config.api)?);
//! let ctx = SimContext::new(api, config.simulation, 12345);
//!
//! let mut simulator = Simulator::new(ctx, 10, 4);
//! let report = simulator.run_for(100).await;
//! println!("{}", report.summary());
//! # Ok(())
//! # }
//! ```

pub mod agent;
pub mod context;
pub mod error;
pub mod instance;
pub mod invariants;
pub mod metrics;
pub mod mock_api;
pub mod population;
pub mod rng;
pub mod simulator;

pub use agent::{Agent, AgentKind};
pub use context::SimContext;
pub use error::{ExpectedStatus, SimulationError};
pub use instance::{Instance, InstanceState, TickOutcome, WatchOutcome};
pub use invariants::{
    Invariant, InvariantViolation, MinimumAgentsInvariant, QueueCapacityInvariant,
    SingleActiveVideoInvariant, default_invariants,
};
pub use metrics::{SimulationMetrics, SimulationReport};
pub use mock_api::{MockApiClient, RecordedCall};
pub use population::{ChurnOutcome, Population};
pub use rng::RandomSource;
pub use simulator::Simulator;
