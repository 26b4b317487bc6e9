//! Invariant checking framework for simulation validation.

use std::fmt;

use crate::population::Population;

/// Violation of a simulation invariant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvariantViolation {
    /// Name of the violated invariant
    pub invariant: String,
    /// Detailed description of the violation
    pub description: String,
    /// Global tick the violation was observed at
    pub tick: u64,
}

impl fmt::Display for InvariantViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Invariant '{}' violated at tick {}: {}",
            self.invariant, self.tick, self.description
        )
    }
}

/// Trait for checking simulation invariants.
pub trait Invariant: Send + Sync {
    /// Checks if invariant holds for the population between ticks.
    ///
    /// # Errors
    /// Returns `InvariantViolation` if the invariant condition is not met.
    fn check(&self, population: &Population, tick: u64) -> Result<(), InvariantViolation>;

    /// Returns name of this invariant.
    fn name(&self) -> &str;

    /// Builds a violation of this invariant.
    fn violation(&self, tick: u64, description: String) -> InvariantViolation {
        InvariantViolation {
            invariant: self.name().to_string(),
            description,
            tick,
        }
    }
}

/// Ensures no pending queue exceeds its capacity.
pub struct QueueCapacityInvariant {
    max_queue_len: usize,
}

impl QueueCapacityInvariant {
    /// Creates invariant with the given queue capacity.
    pub fn new(max_queue_len: usize) -> Self {
        Self { max_queue_len }
    }
}

impl Invariant for QueueCapacityInvariant {
    fn check(&self, population: &Population, tick: u64) -> Result<(), InvariantViolation> {
        for instance in population.instances() {
            let len = instance.pending_queue().len();
            if len > self.max_queue_len {
                return Err(self.violation(
                    tick,
                    format!(
                        "Instance {} queue holds {} videos, capacity {}",
                        instance.id(),
                        len,
                        self.max_queue_len
                    ),
                ));
            }
        }
        Ok(())
    }

    fn name(&self) -> &str {
        "QueueCapacity"
    }
}

/// Ensures the active video of every instance started in the past.
///
/// Start ticks come from the caller of `Instance::watch` and `Instance::tick`,
/// so this catches a driver that hands instances ticks out of order.
pub struct SingleActiveVideoInvariant;

impl Invariant for SingleActiveVideoInvariant {
    fn check(&self, population: &Population, tick: u64) -> Result<(), InvariantViolation> {
        for instance in population.instances() {
            if instance.watching().is_some() && instance.watching_since_tick() > tick {
                return Err(self.violation(
                    tick,
                    format!(
                        "Instance {} started its video at future tick {}",
                        instance.id(),
                        instance.watching_since_tick()
                    ),
                ));
            }
        }
        Ok(())
    }

    fn name(&self) -> &str {
        "SingleActiveVideo"
    }
}

/// Ensures every live instance has at least `min_agents` agents.
pub struct MinimumAgentsInvariant {
    min_agents: usize,
}

impl MinimumAgentsInvariant {
    /// Creates invariant requiring minimum agent count per instance.
    pub fn new(min_agents: usize) -> Self {
        Self { min_agents }
    }
}

impl Invariant for MinimumAgentsInvariant {
    fn check(&self, population: &Population, tick: u64) -> Result<(), InvariantViolation> {
        for instance in population.instances() {
            if instance.agent_count() < self.min_agents {
                return Err(self.violation(
                    tick,
                    format!(
                        "Instance {} has {} agents, minimum {}",
                        instance.id(),
                        instance.agent_count(),
                        self.min_agents
                    ),
                ));
            }
        }
        Ok(())
    }

    fn name(&self) -> &str {
        "MinimumAgents"
    }
}

/// Invariants every run checks.
pub fn default_invariants(max_queue_len: usize) -> Vec<Box<dyn Invariant>> {
    vec![
        Box::new(QueueCapacityInvariant::new(max_queue_len)),
        Box::new(SingleActiveVideoInvariant),
        Box::new(MinimumAgentsInvariant::new(1)),
    ]
}
