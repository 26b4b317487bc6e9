//! Scripted API client for simulator tests.

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use parking_lot::Mutex;
use watchflood_core::{
    ApiClient, ApiError, ApiProtocol, ApiResponse, ClientIdentity, Endpoint, SearchResponse,
    Video,
};

/// Redirect target prefix for Standard identities.
pub const WATCH_URL_PREFIX: &str = "https://www.youtube.com/watch?v=";

/// Atlas slot returned by V5 searches.
pub const MOCK_ATLAS_SLOT: &str = "atlas-mock";

/// One call observed by the mock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedCall {
    /// Endpoint that was called
    pub endpoint: Endpoint,
    /// Token, query or slot id the call carried
    pub argument: String,
    /// Identity presented
    pub identity: ClientIdentity,
}

#[derive(Debug, Default)]
struct MockState {
    search_results: Vec<Video>,
    known_slots: HashMap<String, Video>,
    status_overrides: HashMap<Endpoint, u16>,
    transport_failures: HashSet<Endpoint>,
    location_override: Option<String>,
    calls: Vec<RecordedCall>,
}

/// Mock API client for testing.
///
/// Answers like a well-behaved server by default: searches return the
/// scripted videos, slot resolves redirect non-generic identities to the
/// watch URL of the video and answer 200 to the generic identity. Status
/// codes, transport failures and redirect targets can be overridden per
/// endpoint. Every call is recorded.
#[derive(Debug)]
pub struct MockApiClient {
    protocol: ApiProtocol,
    state: Mutex<MockState>,
}

impl Default for MockApiClient {
    fn default() -> Self {
        Self::new(ApiProtocol::V4)
    }
}

impl MockApiClient {
    /// Creates a mock speaking `protocol` with no search results.
    pub fn new(protocol: ApiProtocol) -> Self {
        Self {
            protocol,
            state: Mutex::new(MockState::default()),
        }
    }

    /// Creates a mock whose searches return `videos`.
    pub fn with_search_results(protocol: ApiProtocol, videos: Vec<Video>) -> Self {
        let mock = Self::new(protocol);
        mock.set_search_results(videos);
        mock
    }

    /// Replaces the videos returned by search and registers their slots.
    pub fn set_search_results(&self, videos: Vec<Video>) {
        let mut state = self.state.lock();
        for video in &videos {
            state
                .known_slots
                .insert(video.slot_id.clone(), video.clone());
        }
        state.search_results = videos;
    }

    /// Makes `video` resolvable without returning it from search.
    pub fn register_video(&self, video: Video) {
        self.state
            .lock()
            .known_slots
            .insert(video.slot_id.clone(), video);
    }

    /// Forces `endpoint` to answer with `status`.
    pub fn set_status(&self, endpoint: Endpoint, status: u16) {
        self.state.lock().status_overrides.insert(endpoint, status);
    }

    /// Makes calls to `endpoint` fail at the transport level.
    pub fn fail_transport(&self, endpoint: Endpoint) {
        self.state.lock().transport_failures.insert(endpoint);
    }

    /// Overrides the `Location` of every slot redirect.
    pub fn set_redirect_location(&self, location: impl Into<String>) {
        self.state.lock().location_override = Some(location.into());
    }

    /// Restores default answers for every endpoint.
    pub fn clear_failures(&self) {
        let mut state = self.state.lock();
        state.status_overrides.clear();
        state.transport_failures.clear();
        state.location_override = None;
    }

    /// All calls observed so far, in order.
    pub fn calls(&self) -> Vec<RecordedCall> {
        self.state.lock().calls.clone()
    }

    /// Calls observed for `endpoint`, in order.
    pub fn calls_for(&self, endpoint: Endpoint) -> Vec<RecordedCall> {
        self.state
            .lock()
            .calls
            .iter()
            .filter(|call| call.endpoint == endpoint)
            .cloned()
            .collect()
    }

    /// Number of calls observed for `endpoint`.
    pub fn call_count(&self, endpoint: Endpoint) -> usize {
        self.state
            .lock()
            .calls
            .iter()
            .filter(|call| call.endpoint == endpoint)
            .count()
    }

    /// Forgets recorded calls.
    pub fn clear_calls(&self) {
        self.state.lock().calls.clear();
    }

    /// Records the call and applies transport or status overrides.
    ///
    /// Returns `Ok(Some(response))` when an override decides the answer.
    fn intercept(
        &self,
        endpoint: Endpoint,
        argument: &str,
        identity: ClientIdentity,
    ) -> Result<Option<ApiResponse>, ApiError> {
        let mut state = self.state.lock();
        state.calls.push(RecordedCall {
            endpoint,
            argument: argument.to_string(),
            identity,
        });

        if state.transport_failures.contains(&endpoint) {
            return Err(ApiError::Transport {
                endpoint,
                reason: "connection refused (mock)".to_string(),
            });
        }

        Ok(state
            .status_overrides
            .get(&endpoint)
            .map(|status| ApiResponse::with_status(*status)))
    }
}

#[async_trait]
impl ApiClient for MockApiClient {
    fn protocol(&self) -> ApiProtocol {
        self.protocol
    }

    async fn hello(&self, token: &str) -> Result<ApiResponse, ApiError> {
        if let Some(response) = self.intercept(Endpoint::Hello, token, ClientIdentity::Generic)? {
            return Ok(response);
        }
        Ok(ApiResponse::with_status(200))
    }

    async fn search(
        &self,
        query: &str,
        identity: ClientIdentity,
    ) -> Result<ApiResponse, ApiError> {
        if let Some(response) = self.intercept(Endpoint::Search, query, identity)? {
            return Ok(response);
        }

        let response = SearchResponse {
            search_results: self.state.lock().search_results.clone(),
            slot_id: self
                .protocol
                .requires_atlas_resolve()
                .then(|| MOCK_ATLAS_SLOT.to_string()),
        };
        let body = serde_json::to_string(&response).map_err(|e| ApiError::Decode {
            endpoint: Endpoint::Search,
            reason: e.to_string(),
        })?;
        Ok(ApiResponse::ok(body))
    }

    async fn resolve_atlas(&self, atlas_slot_id: &str) -> Result<ApiResponse, ApiError> {
        if let Some(response) =
            self.intercept(Endpoint::Atlas, atlas_slot_id, ClientIdentity::Generic)?
        {
            return Ok(response);
        }
        Ok(ApiResponse::with_status(200))
    }

    async fn resolve_slot(
        &self,
        slot_id: &str,
        identity: ClientIdentity,
    ) -> Result<ApiResponse, ApiError> {
        if let Some(response) = self.intercept(Endpoint::Slot, slot_id, identity)? {
            return Ok(response);
        }

        let state = self.state.lock();
        let Some(video) = state.known_slots.get(slot_id) else {
            return Ok(ApiResponse::with_status(404));
        };

        match identity {
            ClientIdentity::Generic => Ok(ApiResponse::ok("{}")),
            ClientIdentity::Quest | ClientIdentity::Standard => {
                let location = state
                    .location_override
                    .clone()
                    .unwrap_or_else(|| format!("{WATCH_URL_PREFIX}{}", video.youtube_id));
                Ok(ApiResponse::redirect(location))
            }
        }
    }

    async fn refresh_queue(&self, slot_id: &str) -> Result<ApiResponse, ApiError> {
        if let Some(response) =
            self.intercept(Endpoint::QueueRefresh, slot_id, ClientIdentity::Generic)?
        {
            return Ok(response);
        }
        Ok(ApiResponse::with_status(200))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_redirects_by_identity() {
        let mock = MockApiClient::new(ApiProtocol::V4);
        mock.register_video(Video::new("s1", "yt1", 10));

        let standard = mock
            .resolve_slot("s1", ClientIdentity::Standard)
            .await
            .unwrap();
        assert_eq!(standard.status, 302);
        assert!(standard.redirect_outcome().references("yt1"));

        let generic = mock
            .resolve_slot("s1", ClientIdentity::Generic)
            .await
            .unwrap();
        assert_eq!(generic.status, 200);

        let unknown = mock
            .resolve_slot("nope", ClientIdentity::Quest)
            .await
            .unwrap();
        assert_eq!(unknown.status, 404);
    }

    #[tokio::test]
    async fn test_mock_records_and_fails() {
        let mock = MockApiClient::new(ApiProtocol::V5);
        mock.fail_transport(Endpoint::Hello);

        assert!(mock.hello("stress_test-1").await.is_err());
        assert_eq!(mock.call_count(Endpoint::Hello), 1);
        assert_eq!(mock.calls()[0].argument, "stress_test-1");

        let search = mock.search("q", ClientIdentity::Generic).await.unwrap();
        let decoded = SearchResponse::decode(&search.body, ApiProtocol::V5).unwrap();
        assert_eq!(decoded.atlas_slot(), Some(MOCK_ATLAS_SLOT));
    }
}
