//! Watch party: a group of agents sharing one watch state and queue.

use std::collections::VecDeque;
use std::fmt;

use futures::future::{join_all, try_join_all};
use watchflood_core::Video;

use crate::agent::{Agent, AgentKind};
use crate::context::SimContext;
use crate::error::SimulationError;
use crate::rng::RandomSource;

/// Observable state of an instance's watch state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstanceState {
    /// Nothing playing, nothing queued
    Idle,
    /// A video is playing and the queue is empty
    Watching,
    /// A video is playing and more are queued
    Queueing,
}

impl fmt::Display for InstanceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InstanceState::Idle => write!(f, "idle"),
            InstanceState::Watching => write!(f, "watching"),
            InstanceState::Queueing => write!(f, "queueing"),
        }
    }
}

/// What [`Instance::watch`] did with a video.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchOutcome {
    /// Became the active video
    Started,
    /// Appended to the pending queue
    Queued,
    /// Queue was full
    Dropped,
}

/// Counters for one instance tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickOutcome {
    /// Videos that became active
    pub videos_started: usize,
    /// Candidates appended to the queue
    pub videos_queued: usize,
    /// Candidates dropped because the queue was full
    pub videos_dropped: usize,
    /// Agent turns that ended in an error
    pub agent_failures: usize,
    /// Queue-refresh calls issued
    pub queue_refreshes: usize,
}

/// A simulated viewing session.
///
/// Owns its agents, the active video and the pending queue. Structural
/// changes only happen on the single task that drives the instance, after
/// every concurrent agent call has been joined.
#[derive(Debug)]
pub struct Instance {
    id: u64,
    agents: Vec<Agent>,
    watching: Option<Video>,
    watching_since_tick: u64,
    pending_queue: VecDeque<Video>,
    local_tick: u64,
    next_agent_id: u64,
    rng: RandomSource,
}

impl Instance {
    /// Creates an instance without agents.
    ///
    /// Callers must add the instance master with [`Instance::add_agent`]
    /// before the instance joins a population.
    pub fn new(id: u64, rng: RandomSource) -> Self {
        Self {
            id,
            agents: Vec::new(),
            watching: None,
            watching_since_tick: 0,
            pending_queue: VecDeque::new(),
            local_tick: 0,
            next_agent_id: 0,
            rng,
        }
    }

    /// Instance id, unique within the run.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Seed of this instance's random stream.
    pub fn seed(&self) -> u64 {
        self.rng.seed()
    }

    /// Member agents, in their current (shuffled) order.
    pub fn agents(&self) -> &[Agent] {
        &self.agents
    }

    /// Number of member agents.
    pub fn agent_count(&self) -> usize {
        self.agents.len()
    }

    /// Video currently playing.
    pub fn watching(&self) -> Option<&Video> {
        self.watching.as_ref()
    }

    /// Global tick the active video started at. Meaningless while idle.
    pub fn watching_since_tick(&self) -> u64 {
        self.watching_since_tick
    }

    /// Videos waiting to play, head first.
    pub fn pending_queue(&self) -> &VecDeque<Video> {
        &self.pending_queue
    }

    /// Number of ticks this instance has taken.
    pub fn local_tick(&self) -> u64 {
        self.local_tick
    }

    /// Current watch state.
    pub fn state(&self) -> InstanceState {
        match (&self.watching, self.pending_queue.is_empty()) {
            (None, _) => InstanceState::Idle,
            (Some(_), true) => InstanceState::Watching,
            (Some(_), false) => InstanceState::Queueing,
        }
    }

    /// Adds one agent and returns its id.
    ///
    /// The new agent heartbeats, then replays the active video's watch
    /// protocol so it joins in the same state as everyone else. The agent
    /// is only appended once that catch-up succeeded.
    ///
    /// # Errors
    /// - `SimulationError` - Catch-up watch failed; the agent is discarded
    pub async fn add_agent(&mut self, ctx: &SimContext) -> Result<u64, SimulationError> {
        let kind = AgentKind::random(&mut self.rng, ctx.config.quest_ratio);
        let agent_id = self.next_agent_id;
        self.next_agent_id += 1;
        let agent = Agent::new(agent_id, self.id, kind, self.rng.fork());

        agent.heartbeat(ctx).await;

        if let Some(video) = &self.watching {
            agent.watch(ctx, video).await?;
            tracing::debug!(
                "Agent {}/{} caught up on {}",
                self.id,
                agent_id,
                video.slot_id
            );
        }

        tracing::debug!(
            "Instance {} added {} agent {} ({})",
            self.id,
            kind,
            agent_id,
            agent.name()
        );
        self.agents.push(agent);
        Ok(agent_id)
    }

    /// Removes a random agent, unless it is the last one.
    ///
    /// No call is made to the API; the agent simply stops.
    pub fn remove_agent(&mut self) -> Option<Agent> {
        if self.agents.len() <= 1 {
            return None;
        }
        let index = self.rng.next_index(self.agents.len());
        let agent = self.agents.remove(index);
        tracing::debug!("Instance {} removed agent {}", self.id, agent.id());
        Some(agent)
    }

    /// Watches `video` or queues it behind the active one.
    ///
    /// When idle, the video becomes active at `current_tick` and every agent
    /// runs its watch protocol concurrently. The first agent failure aborts
    /// the fan-out; the video stays active since notification was attempted.
    /// When already watching, the video is queued, or dropped if the queue
    /// is at capacity.
    ///
    /// # Errors
    /// - `SimulationError` - An agent's watch protocol failed
    pub async fn watch(
        &mut self,
        ctx: &SimContext,
        video: Video,
        current_tick: u64,
    ) -> Result<WatchOutcome, SimulationError> {
        if self.watching.is_some() {
            if self.pending_queue.len() >= ctx.config.max_queue_len {
                tracing::debug!(
                    "Instance {} queue full, dropping {}",
                    self.id,
                    video.slot_id
                );
                return Ok(WatchOutcome::Dropped);
            }
            tracing::info!("Instance {} add to queue {}", self.id, video.slot_id);
            self.pending_queue.push_back(video);
            return Ok(WatchOutcome::Queued);
        }

        tracing::info!(
            "Instance {} watching {} ({} ticks) at tick {}",
            self.id,
            video.slot_id,
            video.duration,
            current_tick
        );
        self.watching = Some(video.clone());
        self.watching_since_tick = current_tick;

        try_join_all(self.agents.iter().map(|agent| agent.watch(ctx, &video))).await?;
        Ok(WatchOutcome::Started)
    }

    /// Runs one tick of the watch state machine.
    ///
    /// The local tick counter advances even when the tick fails.
    ///
    /// # Errors
    /// - `SimulationError` - Search or watch fan-out failed while idle
    pub async fn tick(
        &mut self,
        ctx: &SimContext,
        current_tick: u64,
    ) -> Result<TickOutcome, SimulationError> {
        let result = self.advance(ctx, current_tick).await;
        self.local_tick += 1;
        result
    }

    async fn advance(
        &mut self,
        ctx: &SimContext,
        current_tick: u64,
    ) -> Result<TickOutcome, SimulationError> {
        let mut outcome = TickOutcome {
            queue_refreshes: self.refresh_queue_if_due(ctx).await,
            ..TickOutcome::default()
        };

        self.rng.shuffle(&mut self.agents);

        if self.watching.is_none() {
            self.start_next(ctx, current_tick, &mut outcome).await?;
            return Ok(outcome);
        }

        let results = join_all(
            self.agents
                .iter_mut()
                .map(|agent| agent.tick(ctx, current_tick)),
        )
        .await;

        let mut candidates = Vec::new();
        for (agent, result) in self.agents.iter().zip(results) {
            match result {
                Ok(Some(video)) => candidates.push(video),
                Ok(None) => {}
                Err(e) => {
                    outcome.agent_failures += 1;
                    tracing::warn!(
                        "Instance {} agent {} failed at tick {}: {}",
                        self.id,
                        agent.id(),
                        current_tick,
                        e
                    );
                }
            }
        }

        for candidate in candidates {
            match self.watch(ctx, candidate, current_tick).await? {
                WatchOutcome::Started => outcome.videos_started += 1,
                WatchOutcome::Queued => outcome.videos_queued += 1,
                WatchOutcome::Dropped => outcome.videos_dropped += 1,
            }
        }

        self.finish_if_elapsed(current_tick);
        Ok(outcome)
    }

    /// Idle transition: play the queue head, or search for something new.
    async fn start_next(
        &mut self,
        ctx: &SimContext,
        current_tick: u64,
        outcome: &mut TickOutcome,
    ) -> Result<(), SimulationError> {
        if let Some(next) = self.pending_queue.pop_front() {
            self.watch(ctx, next, current_tick).await?;
            outcome.videos_started += 1;
            return Ok(());
        }

        let Some(searcher) = self.agents.first_mut() else {
            tracing::warn!("Instance {} has no agents to search with", self.id);
            return Ok(());
        };
        let videos = searcher.search(ctx).await?;

        match self.rng.choose(&videos).cloned() {
            Some(video) => {
                self.watch(ctx, video, current_tick).await?;
                outcome.videos_started += 1;
            }
            None => tracing::warn!(
                "Instance {} search returned no videos at tick {}",
                self.id,
                current_tick
            ),
        }
        Ok(())
    }

    fn finish_if_elapsed(&mut self, current_tick: u64) {
        let Some(video) = &self.watching else {
            return;
        };
        let end_tick = self.watching_since_tick.saturating_add(video.duration);
        if current_tick > end_tick {
            tracing::info!("Instance {} finished {}", self.id, video.slot_id);
            self.watching = None;
        } else {
            tracing::debug!(
                "Instance {} still watching {} for {} more ticks",
                self.id,
                video.slot_id,
                end_tick - current_tick
            );
        }
    }

    /// Keeps queued entries alive on the server. Failures are only logged.
    ///
    /// Returns the number of refresh calls issued.
    async fn refresh_queue_if_due(&self, ctx: &SimContext) -> usize {
        let interval = ctx.config.queue_refresh_interval_ticks;
        if interval == 0 || self.local_tick == 0 || self.local_tick % interval != 0 {
            return 0;
        }

        let results = join_all(
            self.pending_queue
                .iter()
                .map(|video| ctx.api.refresh_queue(&video.slot_id)),
        )
        .await;

        for (video, result) in self.pending_queue.iter().zip(&results) {
            match result {
                Ok(response) if response.is_success() => {}
                Ok(response) => tracing::warn!(
                    "Instance {} queue refresh of {} returned {}",
                    self.id,
                    video.slot_id,
                    response.status
                ),
                Err(e) => tracing::warn!(
                    "Instance {} queue refresh of {} failed: {}",
                    self.id,
                    video.slot_id,
                    e
                ),
            }
        }
        results.len()
    }
}
