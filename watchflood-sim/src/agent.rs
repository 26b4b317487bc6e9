//! Simulated end-user belonging to one instance.

use std::fmt;

use watchflood_core::{ClientIdentity, Endpoint, RedirectOutcome, SearchResponse, Video};

use crate::context::SimContext;
use crate::error::{ExpectedStatus, SimulationError, expect_status};
use crate::rng::{ALPHANUMERIC, RandomSource};

const NAME_LEN: usize = 8;

/// Player family an agent emulates.
///
/// Decides the identity presented on the first slot resolve of a watch,
/// which is what makes the server answer with different redirects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AgentKind {
    /// Standalone headset player
    Quest,
    /// Desktop player
    Standard,
}

impl AgentKind {
    /// Draws a kind, Quest with probability `quest_ratio`.
    pub fn random(rng: &mut RandomSource, quest_ratio: f64) -> Self {
        if rng.random_bool(quest_ratio) {
            AgentKind::Quest
        } else {
            AgentKind::Standard
        }
    }

    /// Identity presented when resolving a slot.
    pub fn identity(self) -> ClientIdentity {
        match self {
            AgentKind::Quest => ClientIdentity::Quest,
            AgentKind::Standard => ClientIdentity::Standard,
        }
    }
}

impl fmt::Display for AgentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AgentKind::Quest => write!(f, "quest"),
            AgentKind::Standard => write!(f, "standard"),
        }
    }
}

/// Smallest simulated entity.
///
/// Owned by exactly one instance. Its kind never changes after creation.
#[derive(Debug)]
pub struct Agent {
    id: u64,
    instance_id: u64,
    kind: AgentKind,
    name: String,
    local_tick: u64,
    rng: RandomSource,
}

impl Agent {
    /// Creates an agent with its own random stream.
    pub fn new(id: u64, instance_id: u64, kind: AgentKind, mut rng: RandomSource) -> Self {
        let name = rng.next_string(NAME_LEN, ALPHANUMERIC);
        Self {
            id,
            instance_id,
            kind,
            name,
            local_tick: 0,
            rng,
        }
    }

    /// Agent id, unique within its instance.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Id of the owning instance.
    pub fn instance_id(&self) -> u64 {
        self.instance_id
    }

    /// Player family.
    pub fn kind(&self) -> AgentKind {
        self.kind
    }

    /// Random display name, used in logs only.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Number of ticks this agent has taken.
    pub fn local_tick(&self) -> u64 {
        self.local_tick
    }

    /// Takes one turn.
    ///
    /// Occasionally searches and returns a candidate the instance should
    /// watch or queue. Otherwise heartbeats on its cadence. The local tick
    /// counter advances even when the turn fails.
    ///
    /// # Errors
    /// - `SimulationError::UnexpectedStatus` - Search or atlas resolve refused
    /// - `SimulationError::Api` - Transport, timeout or decode failure
    pub async fn tick(
        &mut self,
        ctx: &SimContext,
        current_tick: u64,
    ) -> Result<Option<Video>, SimulationError> {
        let result = self.take_turn(ctx, current_tick).await;
        self.local_tick += 1;
        result
    }

    async fn take_turn(
        &mut self,
        ctx: &SimContext,
        current_tick: u64,
    ) -> Result<Option<Video>, SimulationError> {
        if self.rng.random_bool(ctx.config.search_probability) {
            let videos = self.search(ctx).await?;
            let candidate = self.rng.choose(&videos).cloned();
            match &candidate {
                Some(video) => tracing::debug!(
                    "Agent {}/{} wants {} at tick {}",
                    self.instance_id,
                    self.id,
                    video.slot_id,
                    current_tick
                ),
                None => tracing::debug!(
                    "Agent {}/{} search returned nothing",
                    self.instance_id,
                    self.id
                ),
            }
            return Ok(candidate);
        }

        if self.heartbeat_due(ctx.config.heartbeat_interval_ticks) {
            self.heartbeat(ctx).await;
        }
        Ok(None)
    }

    fn heartbeat_due(&self, interval: u64) -> bool {
        interval > 0 && self.local_tick > 0 && self.local_tick % interval == 0
    }

    /// Searches with a random query and returns the results.
    ///
    /// Atlas slots of the later protocol are resolved before returning.
    ///
    /// # Errors
    /// - `SimulationError::UnexpectedStatus` - Search was not 200, or the
    ///   atlas resolve was not 2xx
    /// - `SimulationError::Api` - Transport, timeout or decode failure
    pub async fn search(&mut self, ctx: &SimContext) -> Result<Vec<Video>, SimulationError> {
        let query = self
            .rng
            .next_string(ctx.config.search_query_len, ALPHANUMERIC);
        let protocol = ctx.api.protocol();

        let response = ctx.api.search(&query, ClientIdentity::Generic).await?;
        expect_status(Endpoint::Search, ExpectedStatus::Exact(200), &response)?;

        let results = SearchResponse::decode(&response.body, protocol)?;

        if protocol.requires_atlas_resolve() {
            if let Some(atlas_slot) = results.atlas_slot() {
                let atlas = ctx.api.resolve_atlas(atlas_slot).await?;
                expect_status(Endpoint::Atlas, ExpectedStatus::Success, &atlas)?;
            }
        }

        tracing::trace!(
            "Agent {}/{} found {} videos",
            self.instance_id,
            self.id,
            results.search_results.len()
        );
        Ok(results.search_results)
    }

    /// Requests playback metadata for `video` the way a real player does.
    ///
    /// First resolve presents this agent's identity and must redirect; a
    /// Standard agent's redirect must end with the video's `youtube_id`.
    /// Second resolve presents the generic identity and must succeed.
    ///
    /// # Errors
    /// - `SimulationError::RedirectMismatch` - Redirect points elsewhere
    /// - `SimulationError::UnexpectedStatus` - Either resolve answered
    ///   outside its accepted status set
    /// - `SimulationError::Api` - Transport or timeout failure
    pub async fn watch(&self, ctx: &SimContext, video: &Video) -> Result<(), SimulationError> {
        let first = ctx
            .api
            .resolve_slot(&video.slot_id, self.kind.identity())
            .await?;

        match first.redirect_outcome() {
            outcome @ RedirectOutcome::Redirect { .. } => {
                if self.kind == AgentKind::Standard && !outcome.references(&video.youtube_id) {
                    return Err(SimulationError::RedirectMismatch {
                        expected_id: video.youtube_id.clone(),
                        location: first.location,
                    });
                }
            }
            RedirectOutcome::Resolved { .. } | RedirectOutcome::Rejected { .. } => {
                return Err(SimulationError::unexpected_status(
                    Endpoint::Slot,
                    ExpectedStatus::Redirect,
                    first.status,
                    &first.body,
                ));
            }
        }

        let second = ctx
            .api
            .resolve_slot(&video.slot_id, ClientIdentity::Generic)
            .await?;
        expect_status(Endpoint::Slot, ExpectedStatus::Success, &second)?;

        tracing::trace!(
            "Agent {}/{} ({}) resolved {}",
            self.instance_id,
            self.id,
            self.kind,
            video.slot_id
        );
        Ok(())
    }

    /// Announces this agent with the run token. Never fails the caller.
    pub async fn heartbeat(&self, ctx: &SimContext) {
        match ctx.api.hello(&ctx.heartbeat_token()).await {
            Ok(response) if response.is_success() => {
                tracing::trace!("Agent {}/{} heartbeat ok", self.instance_id, self.id);
            }
            Ok(response) => tracing::warn!(
                "Agent {}/{} ({}) heartbeat returned {}",
                self.instance_id,
                self.id,
                self.name,
                response.status
            ),
            Err(e) => tracing::warn!(
                "Agent {}/{} ({}) heartbeat failed: {}",
                self.instance_id,
                self.id,
                self.name,
                e
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use watchflood_core::{ApiProtocol, SimulationConfig};

    use super::*;
    use crate::mock_api::MockApiClient;

    fn context(mock: &Arc<MockApiClient>, config: SimulationConfig) -> SimContext {
        SimContext::new(mock.clone(), config, 7)
    }

    fn agent(kind: AgentKind) -> Agent {
        Agent::new(1, 1, kind, RandomSource::from_seed(99))
    }

    #[tokio::test]
    async fn test_standard_watch_follows_two_step_protocol() {
        let video = Video::new("slot-a", "yt-a", 5);
        let mock = Arc::new(MockApiClient::new(ApiProtocol::V4));
        mock.register_video(video.clone());
        let ctx = context(&mock, SimulationConfig::deterministic_testing());

        agent(AgentKind::Standard).watch(&ctx, &video).await.unwrap();

        let calls = mock.calls_for(Endpoint::Slot);
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].identity, ClientIdentity::Standard);
        assert_eq!(calls[1].identity, ClientIdentity::Generic);
        assert!(calls.iter().all(|call| call.argument == "slot-a"));
    }

    #[tokio::test]
    async fn test_redirect_mismatch_for_standard_agent() {
        let video = Video::new("slot-a", "yt-a", 5);
        let mock = Arc::new(MockApiClient::new(ApiProtocol::V4));
        mock.register_video(video.clone());
        mock.set_redirect_location("https://www.youtube.com/watch?v=something-else");
        let ctx = context(&mock, SimulationConfig::deterministic_testing());

        let error = agent(AgentKind::Standard)
            .watch(&ctx, &video)
            .await
            .unwrap_err();

        assert!(matches!(
            error,
            SimulationError::RedirectMismatch { ref expected_id, .. } if expected_id == "yt-a"
        ));
        // No generic follow-up after a failed assertion
        assert_eq!(mock.call_count(Endpoint::Slot), 1);
    }

    #[tokio::test]
    async fn test_quest_agent_accepts_any_redirect() {
        let video = Video::new("slot-a", "yt-a", 5);
        let mock = Arc::new(MockApiClient::new(ApiProtocol::V4));
        mock.register_video(video.clone());
        mock.set_redirect_location("https://cdn.example/playlist.m3u8");
        let ctx = context(&mock, SimulationConfig::deterministic_testing());

        agent(AgentKind::Quest).watch(&ctx, &video).await.unwrap();
    }

    #[tokio::test]
    async fn test_watch_rejects_non_redirect() {
        let video = Video::new("slot-a", "yt-a", 5);
        let mock = Arc::new(MockApiClient::new(ApiProtocol::V4));
        mock.set_status(Endpoint::Slot, 200);
        let ctx = context(&mock, SimulationConfig::deterministic_testing());

        let error = agent(AgentKind::Quest).watch(&ctx, &video).await.unwrap_err();
        assert!(matches!(
            error,
            SimulationError::UnexpectedStatus {
                actual: 200,
                expected: ExpectedStatus::Redirect,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_search_failure_status() {
        let mock = Arc::new(MockApiClient::new(ApiProtocol::V4));
        mock.set_status(Endpoint::Search, 503);
        let ctx = context(&mock, SimulationConfig::deterministic_testing());

        let error = agent(AgentKind::Standard).search(&ctx).await.unwrap_err();
        assert!(matches!(
            error,
            SimulationError::UnexpectedStatus { actual: 503, .. }
        ));
    }

    #[tokio::test]
    async fn test_v5_search_resolves_atlas() {
        let videos = vec![Video::new("s1", "y1", 3), Video::new("s2", "y2", 4)];
        let mock = Arc::new(MockApiClient::with_search_results(
            ApiProtocol::V5,
            videos.clone(),
        ));
        let ctx = context(&mock, SimulationConfig::deterministic_testing());

        let results = agent(AgentKind::Standard).search(&ctx).await.unwrap();

        assert_eq!(results, videos);
        assert_eq!(mock.call_count(Endpoint::Atlas), 1);
        let query = &mock.calls_for(Endpoint::Search)[0].argument;
        assert_eq!(query.len(), ctx.config.search_query_len);
    }

    #[tokio::test]
    async fn test_v4_search_skips_atlas() {
        let mock = Arc::new(MockApiClient::with_search_results(
            ApiProtocol::V4,
            vec![Video::new("s1", "y1", 3)],
        ));
        let ctx = context(&mock, SimulationConfig::deterministic_testing());

        agent(AgentKind::Standard).search(&ctx).await.unwrap();
        assert_eq!(mock.call_count(Endpoint::Atlas), 0);
    }

    #[tokio::test]
    async fn test_tick_heartbeats_on_cadence() {
        let mock = Arc::new(MockApiClient::new(ApiProtocol::V4));
        let config = SimulationConfig {
            heartbeat_interval_ticks: 3,
            ..SimulationConfig::deterministic_testing()
        };
        let ctx = context(&mock, config);
        let mut agent = agent(AgentKind::Standard);

        for tick in 0..7 {
            assert_eq!(agent.tick(&ctx, tick).await.unwrap(), None);
        }

        // Local ticks 3 and 6
        assert_eq!(mock.call_count(Endpoint::Hello), 2);
        assert_eq!(agent.local_tick(), 7);
        assert_eq!(mock.calls_for(Endpoint::Hello)[0].argument, "stress_test-7");
    }

    #[tokio::test]
    async fn test_tick_search_returns_candidate() {
        let videos = vec![Video::new("s1", "y1", 3)];
        let mock = Arc::new(MockApiClient::with_search_results(
            ApiProtocol::V4,
            videos.clone(),
        ));
        let config = SimulationConfig {
            search_probability: 1.0,
            ..SimulationConfig::deterministic_testing()
        };
        let ctx = context(&mock, config);

        let candidate = agent(AgentKind::Quest).tick(&ctx, 0).await.unwrap();
        assert_eq!(candidate, Some(videos[0].clone()));
    }

    #[tokio::test]
    async fn test_failed_tick_still_advances_counter() {
        let mock = Arc::new(MockApiClient::new(ApiProtocol::V4));
        mock.fail_transport(Endpoint::Search);
        let config = SimulationConfig {
            search_probability: 1.0,
            ..SimulationConfig::deterministic_testing()
        };
        let ctx = context(&mock, config);
        let mut agent = agent(AgentKind::Standard);

        assert!(agent.tick(&ctx, 0).await.is_err());
        assert_eq!(agent.local_tick(), 1);
    }

    #[tokio::test]
    async fn test_heartbeat_failure_is_swallowed() {
        let mock = Arc::new(MockApiClient::new(ApiProtocol::V4));
        mock.fail_transport(Endpoint::Hello);
        let ctx = context(&mock, SimulationConfig::deterministic_testing());

        agent(AgentKind::Standard).heartbeat(&ctx).await;
        assert_eq!(mock.call_count(Endpoint::Hello), 1);
    }

    #[test]
    fn test_kind_split_extremes() {
        let mut rng = RandomSource::from_seed(1);
        assert_eq!(AgentKind::random(&mut rng, 1.0), AgentKind::Quest);
        assert_eq!(AgentKind::random(&mut rng, 0.0), AgentKind::Standard);
        assert_eq!(AgentKind::Quest.identity(), ClientIdentity::Quest);
    }
}
