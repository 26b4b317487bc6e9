//! Centralized configuration for Watchflood.
//!
//! All tunable parameters are defined here to avoid hard-coded values
//! scattered through the simulator and the API client.

use std::path::PathBuf;
use std::time::Duration;

use crate::api::ApiProtocol;

/// Central configuration for all Watchflood components.
///
/// Groups related settings into logical sections. Supports environment
/// variable overrides so the simulator binary needs no flags.
#[derive(Debug, Clone, Default)]
pub struct WatchfloodConfig {
    pub api: ApiConfig,
    pub simulation: SimulationConfig,
    /// Directory for the full-trace log file (None = `./logs`)
    pub logs_dir: Option<PathBuf>,
}

/// External API connection settings.
///
/// Controls where requests go, which protocol version is spoken, how long
/// a single call may take, and which client identities are presented.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Base URL of the video-serving API under test
    pub base_url: String,
    /// Route layout and search semantics of the API
    pub protocol: ApiProtocol,
    /// Upper bound for one HTTP call, including reading the body
    pub request_timeout: Duration,
    /// User agent of the in-world client (search, metadata follow-up)
    pub generic_user_agent: String,
    /// User agent presented by Quest agents when resolving slots
    pub quest_user_agent: String,
    /// User agent presented by Standard agents when resolving slots
    pub standard_user_agent: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:4000".to_string(),
            protocol: ApiProtocol::V4,
            request_timeout: Duration::from_secs(10),
            generic_user_agent: "UnityWebRequest".to_string(),
            quest_user_agent: "stagefright/1.2 (Linux;Android 12)".to_string(),
            standard_user_agent: "AVProVideo/2.8 (Windows)".to_string(),
        }
    }
}

/// Simulation policy for the tick loop, churn and per-entity behavior.
#[derive(Debug, Clone)]
pub struct SimulationConfig {
    /// Root seed for the run (None = derived from wall-clock time)
    pub seed: Option<u64>,
    /// Real-time pause between ticks
    pub tick_interval: Duration,
    /// Probability that a new agent is a Quest agent
    pub quest_ratio: f64,
    /// Per-tick probability that a watching agent searches for something new
    pub search_probability: f64,
    /// Agents heartbeat every this many local ticks
    pub heartbeat_interval_ticks: u64,
    /// Instances refresh queued videos every this many local ticks
    pub queue_refresh_interval_ticks: u64,
    /// Capacity of an instance's pending-video queue
    pub max_queue_len: usize,
    /// Churn jitter is drawn uniformly from `-churn_jitter..=churn_jitter`
    pub churn_jitter: i64,
    /// Per-tick removal probability for each instance while shrinking
    pub instance_removal_probability: f64,
    /// Fraction of instances that execute their tick in a given global tick
    pub tick_participation: f64,
    /// Length of the random search query
    pub search_query_len: usize,
    /// Log a metrics summary every this many global ticks (0 = never)
    pub report_interval_ticks: u64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            seed: None,
            tick_interval: Duration::from_millis(100),
            quest_ratio: 0.2, // 80/20 Standard/Quest
            search_probability: 0.03,
            heartbeat_interval_ticks: 10,
            queue_refresh_interval_ticks: 30,
            max_queue_len: 30,
            churn_jitter: 5,
            instance_removal_probability: 0.03,
            tick_participation: 0.7,
            search_query_len: 100,
            report_interval_ticks: 50,
        }
    }
}

impl SimulationConfig {
    /// Creates a configuration for deterministic, fast tests.
    ///
    /// Fixed seed, no pacing, and no random search or partial participation
    /// so state machine transitions are driven only by the test.
    pub fn deterministic_testing() -> Self {
        Self {
            seed: Some(42),
            tick_interval: Duration::ZERO,
            search_probability: 0.0,
            tick_participation: 1.0,
            search_query_len: 16,
            report_interval_ticks: 0,
            ..Default::default()
        }
    }
}

impl WatchfloodConfig {
    /// Creates configuration with environment variable overrides.
    ///
    /// Unparsable values are ignored and the default is kept.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(base_url) = std::env::var("WATCHFLOOD_BASE_URL") {
            config.api.base_url = base_url;
        }

        if let Ok(protocol) = std::env::var("WATCHFLOOD_PROTOCOL") {
            if let Ok(protocol) = protocol.parse::<ApiProtocol>() {
                config.api.protocol = protocol;
            }
        }

        if let Ok(timeout) = std::env::var("WATCHFLOOD_REQUEST_TIMEOUT_MS") {
            if let Ok(millis) = timeout.parse::<u64>() {
                config.api.request_timeout = Duration::from_millis(millis);
            }
        }

        if let Ok(seed) = std::env::var("WATCHFLOOD_SEED") {
            if let Ok(seed_value) = seed.parse::<u64>() {
                config.simulation.seed = Some(seed_value);
            }
        }

        if let Ok(interval) = std::env::var("WATCHFLOOD_TICK_INTERVAL_MS") {
            if let Ok(millis) = interval.parse::<u64>() {
                config.simulation.tick_interval = Duration::from_millis(millis);
            }
        }

        if let Some(ratio) = probability_from_env("WATCHFLOOD_QUEST_RATIO") {
            config.simulation.quest_ratio = ratio;
        }

        if let Some(probability) = probability_from_env("WATCHFLOOD_SEARCH_PROBABILITY") {
            config.simulation.search_probability = probability;
        }

        if let Some(participation) = probability_from_env("WATCHFLOOD_TICK_PARTICIPATION") {
            config.simulation.tick_participation = participation;
        }

        if let Ok(dir) = std::env::var("WATCHFLOOD_LOG_DIR") {
            config.logs_dir = Some(PathBuf::from(dir));
        }

        config
    }

    /// Creates a configuration optimized for testing against `base_url`.
    pub fn for_testing(base_url: impl Into<String>) -> Self {
        Self {
            api: ApiConfig {
                base_url: base_url.into(),
                request_timeout: Duration::from_secs(5),
                ..Default::default()
            },
            simulation: SimulationConfig::deterministic_testing(),
            logs_dir: None,
        }
    }
}

/// Reads a probability in `[0.0, 1.0]` from the environment.
fn probability_from_env(key: &str) -> Option<f64> {
    let value = std::env::var(key).ok()?.parse::<f64>().ok()?;
    (0.0..=1.0).contains(&value).then_some(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_values() {
        let config = WatchfloodConfig::default();

        assert_eq!(config.api.base_url, "http://localhost:4000");
        assert_eq!(config.api.protocol, ApiProtocol::V4);
        assert_eq!(config.api.request_timeout, Duration::from_secs(10));
        assert_eq!(config.api.generic_user_agent, "UnityWebRequest");
        assert!(config.api.quest_user_agent.contains("stagefright"));
        assert_eq!(config.simulation.seed, None);
        assert_eq!(config.simulation.tick_interval, Duration::from_millis(100));
        assert_eq!(config.simulation.max_queue_len, 30);
        assert_eq!(config.simulation.heartbeat_interval_ticks, 10);
        assert_eq!(config.simulation.queue_refresh_interval_ticks, 30);
        assert_eq!(config.simulation.churn_jitter, 5);
        assert_eq!(config.simulation.quest_ratio, 0.2);
    }

    #[test]
    fn test_testing_preset() {
        let config = WatchfloodConfig::for_testing("http://127.0.0.1:9999");

        assert_eq!(config.api.base_url, "http://127.0.0.1:9999");
        assert_eq!(config.simulation.seed, Some(42));
        assert_eq!(config.simulation.tick_interval, Duration::ZERO);
        assert_eq!(config.simulation.search_probability, 0.0);
        assert_eq!(config.simulation.tick_participation, 1.0);
    }

    #[test]
    fn test_env_override() {
        unsafe {
            std::env::set_var("WATCHFLOOD_BASE_URL", "http://stub.local:8080");
            std::env::set_var("WATCHFLOOD_PROTOCOL", "v5");
            std::env::set_var("WATCHFLOOD_REQUEST_TIMEOUT_MS", "2500");
            std::env::set_var("WATCHFLOOD_SEED", "12345");
            std::env::set_var("WATCHFLOOD_QUEST_RATIO", "0.5");
            std::env::set_var("WATCHFLOOD_SEARCH_PROBABILITY", "7.0");
        }

        let config = WatchfloodConfig::from_env();

        assert_eq!(config.api.base_url, "http://stub.local:8080");
        assert_eq!(config.api.protocol, ApiProtocol::V5);
        assert_eq!(config.api.request_timeout, Duration::from_millis(2500));
        assert_eq!(config.simulation.seed, Some(12345));
        assert_eq!(config.simulation.quest_ratio, 0.5);
        // Out-of-range probabilities keep the default
        assert_eq!(config.simulation.search_probability, 0.03);

        unsafe {
            std::env::remove_var("WATCHFLOOD_BASE_URL");
            std::env::remove_var("WATCHFLOOD_PROTOCOL");
            std::env::remove_var("WATCHFLOOD_REQUEST_TIMEOUT_MS");
            std::env::remove_var("WATCHFLOOD_SEED");
            std::env::remove_var("WATCHFLOOD_QUEST_RATIO");
            std::env::remove_var("WATCHFLOOD_SEARCH_PROBABILITY");
        }
    }
}
