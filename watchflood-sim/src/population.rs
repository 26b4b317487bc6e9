//! Population of instances and the churn policy that resizes it.

use futures::future::join_all;

use crate::context::SimContext;
use crate::instance::Instance;
use crate::rng::RandomSource;

/// Counters for one churn phase.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChurnOutcome {
    /// New instances that joined the population
    pub instances_created: usize,
    /// Instances torn down
    pub instances_removed: usize,
    /// Agents added to existing instances
    pub agents_added: usize,
    /// Agents removed from existing instances
    pub agents_removed: usize,
    /// Agent additions or creations that failed and were discarded
    pub failures: usize,
}

/// Per-instance agent decision for one churn phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AgentChurn {
    Grow,
    Shrink,
}

/// Every instance in the run.
///
/// Only the tick loop mutates the population, between tick phases.
#[derive(Debug)]
pub struct Population {
    instances: Vec<Instance>,
    target_instance_count: usize,
    target_agents_per_instance: usize,
    next_instance_id: u64,
    rng: RandomSource,
}

impl Population {
    /// Creates an empty population aiming at the given targets.
    pub fn new(
        target_instance_count: usize,
        target_agents_per_instance: usize,
        rng: RandomSource,
    ) -> Self {
        Self {
            instances: Vec::new(),
            target_instance_count,
            target_agents_per_instance,
            next_instance_id: 0,
            rng,
        }
    }

    /// Live instances.
    pub fn instances(&self) -> &[Instance] {
        &self.instances
    }

    /// Live instances, for the tick fan-out.
    pub fn instances_mut(&mut self) -> &mut [Instance] {
        &mut self.instances
    }

    /// Number of live instances.
    pub fn len(&self) -> usize {
        self.instances.len()
    }

    /// Whether no instance is alive.
    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }

    /// Agents across every instance.
    pub fn total_agents(&self) -> usize {
        self.instances.iter().map(Instance::agent_count).sum()
    }

    /// Instance count the churn policy aims for.
    pub fn target_instance_count(&self) -> usize {
        self.target_instance_count
    }

    /// Per-instance agent count the churn policy aims for.
    pub fn target_agents_per_instance(&self) -> usize {
        self.target_agents_per_instance
    }

    /// Grows or shrinks the population toward its targets.
    ///
    /// Random decisions are drawn up front from the population stream, then
    /// the network-bound work (new agents, the new instance's master) runs
    /// as one concurrent group. Failures are logged and counted; a failed
    /// creation is discarded and never joins the population.
    pub async fn apply_churn(&mut self, ctx: &SimContext) -> ChurnOutcome {
        let mut outcome = ChurnOutcome::default();
        let jitter = ctx.config.churn_jitter;

        let delta = deficit(self.target_instance_count, self.instances.len())
            + self.rng.next_int(-jitter, jitter);

        let new_instance = if delta >= 0 {
            let id = self.next_instance_id;
            self.next_instance_id += 1;
            Some(Instance::new(id, self.rng.fork()))
        } else {
            let removal_probability = ctx.config.instance_removal_probability;
            let rng = &mut self.rng;
            let before = self.instances.len();
            self.instances.retain(|instance| {
                let remove = rng.random_bool(removal_probability);
                if remove {
                    tracing::info!("Removing instance {}", instance.id());
                }
                !remove
            });
            outcome.instances_removed = before - self.instances.len();
            None
        };

        let mut plans = Vec::with_capacity(self.instances.len());
        for instance in &self.instances {
            let agent_delta = deficit(self.target_agents_per_instance, instance.agent_count())
                + self.rng.next_int(-jitter, jitter);
            plans.push(if agent_delta >= 0 {
                AgentChurn::Grow
            } else {
                AgentChurn::Shrink
            });
        }

        let mut growing = Vec::new();
        for (instance, plan) in self.instances.iter_mut().zip(&plans) {
            match plan {
                AgentChurn::Grow => growing.push(instance),
                AgentChurn::Shrink => {
                    if instance.remove_agent().is_some() {
                        outcome.agents_removed += 1;
                    }
                }
            }
        }

        let additions = join_all(growing.into_iter().map(|instance| async move {
            let id = instance.id();
            (id, instance.add_agent(ctx).await)
        }));
        let creation = async move {
            match new_instance {
                Some(mut instance) => {
                    let result = instance.add_agent(ctx).await;
                    Some(result.map(|_| instance))
                }
                None => None,
            }
        };
        let (added, created) = futures::join!(additions, creation);

        for (instance_id, result) in added {
            match result {
                Ok(_) => outcome.agents_added += 1,
                Err(e) => {
                    outcome.failures += 1;
                    tracing::warn!("Adding agent to instance {} failed: {}", instance_id, e);
                }
            }
        }

        match created {
            Some(Ok(instance)) => {
                tracing::info!("Created instance {}", instance.id());
                self.instances.push(instance);
                outcome.instances_created += 1;
            }
            // A fresh instance is idle, so add_agent skips catch-up and this
            // arm only fires if creation ever starts from a watching state
            Some(Err(e)) => {
                outcome.failures += 1;
                tracing::warn!("Creating instance failed: {}", e);
            }
            None => {}
        }

        outcome
    }

    /// Draws which instances tick this round, one flag per instance.
    pub fn select_eligible(&mut self, participation: f64) -> Vec<bool> {
        self.instances
            .iter()
            .map(|_| self.rng.random_bool(participation))
            .collect()
    }
}

/// Signed distance from `current` to `target`.
fn deficit(target: usize, current: usize) -> i64 {
    i64::try_from(target).unwrap_or(i64::MAX) - i64::try_from(current).unwrap_or(i64::MAX)
}
