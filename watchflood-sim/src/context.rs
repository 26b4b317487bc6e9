//! Run-wide context threaded through every simulated call.

use std::sync::Arc;

use watchflood_core::{ApiClient, SimulationConfig};

/// Immutable run context: API handle, policy and the root seed.
///
/// Built once at startup and borrowed by every instance and agent turn.
/// Nothing in here changes while the run is in progress.
#[derive(Clone)]
pub struct SimContext {
    /// Client for the API under load
    pub api: Arc<dyn ApiClient>,
    /// Simulation policy
    pub config: SimulationConfig,
    /// Root seed of the run
    pub run_seed: u64,
}

impl SimContext {
    /// Creates a run context.
    pub fn new(api: Arc<dyn ApiClient>, config: SimulationConfig, run_seed: u64) -> Self {
        Self {
            api,
            config,
            run_seed,
        }
    }

    /// Token agents announce themselves with.
    pub fn heartbeat_token(&self) -> String {
        format!("stress_test-{}", self.run_seed)
    }
}

impl std::fmt::Debug for SimContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SimContext")
            .field("protocol", &self.api.protocol())
            .field("config", &self.config)
            .field("run_seed", &self.run_seed)
            .finish()
    }
}
