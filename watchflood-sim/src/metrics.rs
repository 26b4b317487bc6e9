//! Run metrics and the final report.

use std::time::{Duration, Instant};

use crate::instance::TickOutcome;
use crate::invariants::InvariantViolation;
use crate::population::ChurnOutcome;

/// Counters accumulated across the run.
#[derive(Debug, Clone)]
pub struct SimulationMetrics {
    /// Global ticks completed
    pub ticks: u64,
    /// Instance ticks executed
    pub instance_ticks: u64,
    /// Instance ticks that ended in an error
    pub instance_failures: u64,
    /// Agent turns that ended in an error
    pub agent_failures: u64,
    /// Videos that became active
    pub videos_started: u64,
    /// Videos appended to a queue
    pub videos_queued: u64,
    /// Videos dropped at queue capacity
    pub videos_dropped: u64,
    /// Queue-refresh calls issued
    pub queue_refreshes: u64,
    /// Instances created by churn
    pub instances_created: u64,
    /// Instances removed by churn
    pub instances_removed: u64,
    /// Agents added by churn
    pub agents_added: u64,
    /// Agents removed by churn
    pub agents_removed: u64,
    /// Churn creations that failed
    pub churn_failures: u64,
    /// Highest instance count seen
    pub peak_instances: usize,
    /// Highest agent count seen
    pub peak_agents: usize,
    /// All recorded invariant violations
    pub invariant_violations: Vec<InvariantViolation>,
    start_time: Instant,
}

impl Default for SimulationMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl SimulationMetrics {
    /// Creates empty metrics starting now.
    pub fn new() -> Self {
        Self {
            ticks: 0,
            instance_ticks: 0,
            instance_failures: 0,
            agent_failures: 0,
            videos_started: 0,
            videos_queued: 0,
            videos_dropped: 0,
            queue_refreshes: 0,
            instances_created: 0,
            instances_removed: 0,
            agents_added: 0,
            agents_removed: 0,
            churn_failures: 0,
            peak_instances: 0,
            peak_agents: 0,
            invariant_violations: Vec::new(),
            start_time: Instant::now(),
        }
    }

    /// Folds one churn phase into the totals.
    pub fn record_churn(&mut self, churn: &ChurnOutcome) {
        self.instances_created += churn.instances_created as u64;
        self.instances_removed += churn.instances_removed as u64;
        self.agents_added += churn.agents_added as u64;
        self.agents_removed += churn.agents_removed as u64;
        self.churn_failures += churn.failures as u64;
    }

    /// Folds one successful instance tick into the totals.
    pub fn record_instance_tick(&mut self, tick: &TickOutcome) {
        self.instance_ticks += 1;
        self.videos_started += tick.videos_started as u64;
        self.videos_queued += tick.videos_queued as u64;
        self.videos_dropped += tick.videos_dropped as u64;
        self.agent_failures += tick.agent_failures as u64;
        self.queue_refreshes += tick.queue_refreshes as u64;
    }

    /// Records an instance tick that failed.
    pub fn record_instance_failure(&mut self) {
        self.instance_ticks += 1;
        self.instance_failures += 1;
    }

    /// Updates peak population counts.
    pub fn update_peaks(&mut self, instances: usize, agents: usize) {
        self.peak_instances = self.peak_instances.max(instances);
        self.peak_agents = self.peak_agents.max(agents);
    }

    /// Records an invariant violation.
    pub fn record_invariant_violation(&mut self, violation: InvariantViolation) {
        self.invariant_violations.push(violation);
    }

    /// Wall-clock time since the metrics were created.
    pub fn duration(&self) -> Duration {
        self.start_time.elapsed()
    }

    /// One-line summary for periodic logging.
    pub fn summary(&self) -> String {
        format!(
            "ticks={} instance_ticks={} started={} queued={} dropped={} \
             instance_failures={} agent_failures={} instances +{}/-{} agents +{}/-{} \
             violations={}",
            self.ticks,
            self.instance_ticks,
            self.videos_started,
            self.videos_queued,
            self.videos_dropped,
            self.instance_failures,
            self.agent_failures,
            self.instances_created,
            self.instances_removed,
            self.agents_added,
            self.agents_removed,
            self.invariant_violations.len()
        )
    }
}

/// Final state of a run.
#[derive(Debug, Clone)]
pub struct SimulationReport {
    /// Seed used for reproduction
    pub seed: u64,
    /// Wall-clock duration of the run
    pub duration: Duration,
    /// Collected metrics
    pub metrics: SimulationMetrics,
    /// Instances alive at the end
    pub final_instances: usize,
    /// Agents alive at the end
    pub final_agents: usize,
}

impl SimulationReport {
    /// Whether no invariant was violated.
    pub fn success(&self) -> bool {
        self.metrics.invariant_violations.is_empty()
    }

    /// Generates human-readable summary.
    pub fn summary(&self) -> String {
        let mut summary = String::new();
        summary.push_str(&format!("Simulation Report (seed: {})\n", self.seed));
        summary.push_str(&format!("Duration: {:?}\n", self.duration));
        summary.push_str(&format!("Ticks: {}\n", self.metrics.ticks));
        summary.push_str(&format!(
            "Instance ticks: {} ({} failed)\n",
            self.metrics.instance_ticks, self.metrics.instance_failures
        ));
        summary.push_str(&format!(
            "Videos: {} started, {} queued, {} dropped\n",
            self.metrics.videos_started, self.metrics.videos_queued, self.metrics.videos_dropped
        ));
        summary.push_str(&format!(
            "Peak population: {} instances, {} agents\n",
            self.metrics.peak_instances, self.metrics.peak_agents
        ));

        if !self.metrics.invariant_violations.is_empty() {
            summary.push_str("\nInvariant violations:\n");
            for violation in &self.metrics.invariant_violations {
                summary.push_str(&format!("  - {violation}\n"));
            }
        }

        summary.push_str(&format!(
            "\nFinal state:\n  Instances: {}\n  Agents: {}\n",
            self.final_instances, self.final_agents
        ));

        summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_fold_outcomes() {
        let mut metrics = SimulationMetrics::new();

        metrics.record_churn(&ChurnOutcome {
            instances_created: 1,
            agents_added: 2,
            ..ChurnOutcome::default()
        });
        metrics.record_instance_tick(&TickOutcome {
            videos_started: 1,
            videos_queued: 3,
            ..TickOutcome::default()
        });
        metrics.record_instance_failure();

        assert_eq!(metrics.instances_created, 1);
        assert_eq!(metrics.agents_added, 2);
        assert_eq!(metrics.instance_ticks, 2);
        assert_eq!(metrics.instance_failures, 1);
        assert_eq!(metrics.videos_queued, 3);
    }

    #[test]
    fn test_peaks_only_grow() {
        let mut metrics = SimulationMetrics::new();
        metrics.update_peaks(5, 20);
        metrics.update_peaks(3, 30);

        assert_eq!(metrics.peak_instances, 5);
        assert_eq!(metrics.peak_agents, 30);
    }

    #[test]
    fn test_report_summary_lists_violations() {
        let mut metrics = SimulationMetrics::new();
        metrics.record_invariant_violation(InvariantViolation {
            invariant: "MinimumAgents".to_string(),
            description: "Instance 3 has 0 agents, minimum 1".to_string(),
            tick: 9,
        });
        let report = SimulationReport {
            seed: 42,
            duration: Duration::from_secs(1),
            metrics,
            final_instances: 1,
            final_agents: 0,
        };

        assert!(!report.success());
        let summary = report.summary();
        assert!(summary.contains("seed: 42"));
        assert!(summary.contains("MinimumAgents"));
    }
}
