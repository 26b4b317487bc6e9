//! Top-level tick loop.

use futures::future::join_all;

use crate::context::SimContext;
use crate::invariants::{Invariant, default_invariants};
use crate::metrics::{SimulationMetrics, SimulationReport};
use crate::population::Population;
use crate::rng::RandomSource;

/// Drives the population tick by tick.
///
/// Each tick runs two phases one after the other: churn, then a concurrent
/// tick of the eligible instances. Both phases are fully joined before the
/// next starts, so an instance is never ticked and removed in the same
/// iteration.
pub struct Simulator {
    ctx: SimContext,
    population: Population,
    invariants: Vec<Box<dyn Invariant>>,
    metrics: SimulationMetrics,
    current_tick: u64,
}

impl Simulator {
    /// Creates a simulator seeded from the context's run seed.
    pub fn new(
        ctx: SimContext,
        target_instance_count: usize,
        target_agents_per_instance: usize,
    ) -> Self {
        tracing::info!(
            "Starting simulation: seed={}, protocol={}, targets={} instances x {} agents",
            ctx.run_seed,
            ctx.api.protocol(),
            target_instance_count,
            target_agents_per_instance
        );

        let population = Population::new(
            target_instance_count,
            target_agents_per_instance,
            RandomSource::from_seed(ctx.run_seed),
        );
        let invariants = default_invariants(ctx.config.max_queue_len);

        Self {
            ctx,
            population,
            invariants,
            metrics: SimulationMetrics::new(),
            current_tick: 0,
        }
    }

    /// Adds an invariant checked after every tick.
    pub fn add_invariant(&mut self, invariant: Box<dyn Invariant>) {
        self.invariants.push(invariant);
    }

    /// Global tick the next step will run.
    pub fn current_tick(&self) -> u64 {
        self.current_tick
    }

    /// Population under simulation.
    pub fn population(&self) -> &Population {
        &self.population
    }

    /// Metrics collected so far.
    pub fn metrics(&self) -> &SimulationMetrics {
        &self.metrics
    }

    /// Run context.
    pub fn context(&self) -> &SimContext {
        &self.ctx
    }

    /// Runs one tick: churn, then the eligible instance ticks.
    ///
    /// Instance failures are logged and counted; they never stop the loop.
    pub async fn step(&mut self) {
        let tick = self.current_tick;
        tracing::debug!("tick {}...", tick);

        let churn = self.population.apply_churn(&self.ctx).await;
        self.metrics.record_churn(&churn);

        let eligible = self
            .population
            .select_eligible(self.ctx.config.tick_participation);

        let ctx = &self.ctx;
        let results = join_all(
            self.population
                .instances_mut()
                .iter_mut()
                .zip(eligible)
                .filter(|(_, eligible)| *eligible)
                .map(|(instance, _)| async move {
                    let id = instance.id();
                    (id, instance.tick(ctx, tick).await)
                }),
        )
        .await;

        for (instance_id, result) in results {
            match result {
                Ok(outcome) => self.metrics.record_instance_tick(&outcome),
                Err(e) => {
                    self.metrics.record_instance_failure();
                    tracing::warn!("Instance {} failed at tick {}: {}", instance_id, tick, e);
                }
            }
        }

        self.check_invariants(tick);
        self.metrics
            .update_peaks(self.population.len(), self.population.total_agents());
        self.metrics.ticks += 1;

        let interval = self.ctx.config.report_interval_ticks;
        if interval > 0 && (tick + 1) % interval == 0 {
            tracing::info!(
                "{} instances, {} agents | {}",
                self.population.len(),
                self.population.total_agents(),
                self.metrics.summary()
            );
        }

        self.current_tick += 1;
    }

    /// Runs `ticks` iterations with pacing and returns the report.
    pub async fn run_for(&mut self, ticks: u64) -> SimulationReport {
        for _ in 0..ticks {
            self.step().await;
            self.pace().await;
        }
        self.report()
    }

    /// Runs until the future is dropped.
    pub async fn run(&mut self) {
        loop {
            self.step().await;
            self.pace().await;
        }
    }

    /// Snapshot of the run so far.
    pub fn report(&self) -> SimulationReport {
        SimulationReport {
            seed: self.ctx.run_seed,
            duration: self.metrics.duration(),
            metrics: self.metrics.clone(),
            final_instances: self.population.len(),
            final_agents: self.population.total_agents(),
        }
    }

    async fn pace(&self) {
        let interval = self.ctx.config.tick_interval;
        if !interval.is_zero() {
            tokio::time::sleep(interval).await;
        }
    }

    fn check_invariants(&mut self, tick: u64) {
        for invariant in &self.invariants {
            if let Err(violation) = invariant.check(&self.population, tick) {
                tracing::error!("{}", violation);
                self.metrics.record_invariant_violation(violation);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use watchflood_core::{ApiProtocol, Endpoint, SimulationConfig, Video};

    use super::*;
    use crate::invariants::InvariantViolation;
    use crate::mock_api::MockApiClient;

    fn videos() -> Vec<Video> {
        (0..5)
            .map(|n| Video::new(format!("slot-{n}"), format!("yt-{n}"), 3 + n))
            .collect()
    }

    fn simulator(mock: &Arc<MockApiClient>, config: SimulationConfig) -> Simulator {
        let ctx = SimContext::new(mock.clone(), config, 42);
        Simulator::new(ctx, 5, 3)
    }

    #[tokio::test]
    async fn test_run_for_builds_population() {
        let mock = Arc::new(MockApiClient::with_search_results(ApiProtocol::V4, videos()));
        let mut sim = simulator(&mock, SimulationConfig::deterministic_testing());

        let report = sim.run_for(30).await;

        assert_eq!(report.metrics.ticks, 30);
        assert_eq!(sim.current_tick(), 30);
        assert!(report.final_instances > 0);
        assert!(report.metrics.videos_started > 0);
        assert!(report.success(), "{}", report.summary());
        assert!(report.metrics.instances_created <= 30);
        assert!(
            sim.population()
                .instances()
                .iter()
                .all(|instance| instance.agent_count() >= 1)
        );
    }

    #[tokio::test]
    async fn test_same_seed_same_run() {
        let first_mock = Arc::new(MockApiClient::with_search_results(ApiProtocol::V5, videos()));
        let second_mock = Arc::new(MockApiClient::with_search_results(ApiProtocol::V5, videos()));
        let config = SimulationConfig {
            search_probability: 0.2,
            tick_participation: 0.7,
            ..SimulationConfig::deterministic_testing()
        };

        let first = simulator(&first_mock, config.clone()).run_for(25).await;
        let second = simulator(&second_mock, config).run_for(25).await;

        assert_eq!(first.final_instances, second.final_instances);
        assert_eq!(first.final_agents, second.final_agents);
        assert_eq!(first.metrics.videos_started, second.metrics.videos_started);
        assert_eq!(first.metrics.videos_queued, second.metrics.videos_queued);
        assert_eq!(
            first_mock.calls_for(Endpoint::Search),
            second_mock.calls_for(Endpoint::Search)
        );
    }

    #[tokio::test]
    async fn test_instance_failures_do_not_stop_loop() {
        let mock = Arc::new(MockApiClient::with_search_results(ApiProtocol::V4, videos()));
        mock.set_status(Endpoint::Search, 500);
        let mut sim = simulator(&mock, SimulationConfig::deterministic_testing());

        let report = sim.run_for(10).await;

        assert_eq!(report.metrics.ticks, 10);
        assert!(report.metrics.instance_failures > 0);
        assert_eq!(report.metrics.videos_started, 0);
    }

    #[tokio::test]
    async fn test_custom_invariant_violations_are_recorded() {
        struct NeverEmpty;

        impl Invariant for NeverEmpty {
            fn check(
                &self,
                population: &Population,
                tick: u64,
            ) -> Result<(), InvariantViolation> {
                if population.len() < 100 {
                    return Err(self.violation(tick, "too small".to_string()));
                }
                Ok(())
            }

            fn name(&self) -> &str {
                "NeverEmpty"
            }
        }

        let mock = Arc::new(MockApiClient::with_search_results(ApiProtocol::V4, videos()));
        let mut sim = simulator(&mock, SimulationConfig::deterministic_testing());
        sim.add_invariant(Box::new(NeverEmpty));

        let report = sim.run_for(3).await;

        assert_eq!(report.metrics.invariant_violations.len(), 3);
        assert!(!report.success());
    }

    #[tokio::test(start_paused = true)]
    async fn test_ticks_are_paced() {
        let mock = Arc::new(MockApiClient::with_search_results(ApiProtocol::V4, videos()));
        let config = SimulationConfig {
            tick_interval: Duration::from_millis(100),
            ..SimulationConfig::deterministic_testing()
        };
        let mut sim = simulator(&mock, config);

        let start = tokio::time::Instant::now();
        sim.run_for(5).await;

        assert!(start.elapsed() >= Duration::from_millis(500));
    }

    #[tokio::test]
    async fn test_run_stops_when_dropped() {
        let mock = Arc::new(MockApiClient::with_search_results(ApiProtocol::V4, videos()));
        let config = SimulationConfig {
            tick_interval: Duration::from_millis(1),
            ..SimulationConfig::deterministic_testing()
        };
        let mut sim = simulator(&mock, config);

        let outcome = tokio::time::timeout(Duration::from_millis(50), sim.run()).await;

        assert!(outcome.is_err());
        assert!(sim.current_tick() > 0);
    }
}
