//! Stub server state and routing.

use std::collections::{HashMap, HashSet};
use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use axum::routing::get;
use parking_lot::Mutex;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use watchflood_core::Video;

use crate::handlers::{
    api_atlas, api_hello, api_queue_refresh, api_search, api_slot, piped_channel, piped_playlist,
    piped_search, piped_skip_segments, piped_streams, piped_subtitles, piped_trending,
};

/// Shared state of the stub.
///
/// One seeded generator feeds every fixture, and every video handed out by
/// search is remembered so slot and queue calls can be answered
/// consistently.
#[derive(Clone)]
pub struct StubState {
    pub(crate) rng: Arc<Mutex<ChaCha8Rng>>,
    pub(crate) slots: Arc<Mutex<HashMap<String, Video>>>,
    pub(crate) atlases: Arc<Mutex<HashSet<String>>>,
    pub(crate) public_url: String,
}

impl StubState {
    /// Creates state seeded with `seed`, advertising `public_url` in fixtures.
    pub fn new(seed: u64, public_url: impl Into<String>) -> Self {
        Self {
            rng: Arc::new(Mutex::new(ChaCha8Rng::seed_from_u64(seed))),
            slots: Arc::new(Mutex::new(HashMap::new())),
            atlases: Arc::new(Mutex::new(HashSet::new())),
            public_url: public_url.into(),
        }
    }

    /// Number of slots issued so far.
    pub fn issued_slots(&self) -> usize {
        self.slots.lock().len()
    }

    /// Remembers `videos` as resolvable slots.
    pub(crate) fn register_slots(&self, videos: &[Video]) {
        let mut slots = self.slots.lock();
        for video in videos {
            slots.insert(video.slot_id.clone(), video.clone());
        }
    }

    /// Looks up an issued slot.
    pub(crate) fn slot(&self, slot_id: &str) -> Option<Video> {
        self.slots.lock().get(slot_id).cloned()
    }
}

/// Builds the stub router.
///
/// Piped-style fixture routes plus the simulator-facing API for every
/// protocol version (`/api/v{n}/...` and `/a/{n}/sl/...`).
pub fn router(state: StubState) -> Router {
    Router::new()
        // Piped-style fixtures
        .route("/search", get(piped_search))
        .route("/channel/{channel_id}", get(piped_channel))
        .route("/playlists/{playlist_id}", get(piped_playlist))
        .route("/_subtitles", get(piped_subtitles))
        .route("/streams/{stream_id}", get(piped_streams))
        .route("/trending", get(piped_trending))
        .route("/api/skipSegments", get(piped_skip_segments))
        // Simulator-facing API
        .route("/api/{version}/hello/{token}", get(api_hello))
        .route("/api/{version}/search", get(api_search))
        .route("/api/{version}/atlas/{atlas_id}", get(api_atlas))
        .route("/api/{version}/queue-refresh/{slot_id}", get(api_queue_refresh))
        .route("/a/{version}/sl/{slot_id}", get(api_slot))
        .with_state(state)
}

/// Binds `addr`, then serves the stub in a background task.
///
/// Returns the bound address, which differs from `addr` when port 0 was
/// requested, and the server task.
///
/// # Errors
///
/// - `std::io::Error` - If binding fails
pub async fn spawn(
    addr: SocketAddr,
    seed: u64,
) -> std::io::Result<(SocketAddr, JoinHandle<std::io::Result<()>>)> {
    let listener = TcpListener::bind(addr).await?;
    let local_addr = listener.local_addr()?;
    let state = StubState::new(seed, format!("http://{local_addr}"));

    tracing::info!("Watchflood stub listening on http://{}", local_addr);
    let handle = tokio::spawn(async move { axum::serve(listener, router(state)).await });

    Ok((local_addr, handle))
}

#[cfg(test)]
mod tests {
    use std::net::{Ipv4Addr, SocketAddrV4};

    use watchflood_core::{ApiProtocol, SearchResponse};

    use super::*;
    use crate::handlers::api::WATCH_URL_PREFIX;

    async fn start() -> (String, reqwest::Client) {
        let addr = SocketAddr::V4(SocketAddrV4::new(Ipv4Addr::LOCALHOST, 0));
        let (local_addr, _handle) = spawn(addr, 7).await.unwrap();
        let client = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .unwrap();
        (format!("http://{local_addr}"), client)
    }

    async fn search(base: &str, client: &reqwest::Client, protocol: ApiProtocol) -> SearchResponse {
        let body = client
            .get(format!("{base}/{}", protocol.search_path("query")))
            .send()
            .await
            .unwrap()
            .text()
            .await
            .unwrap();
        SearchResponse::decode(&body, protocol).unwrap()
    }

    #[tokio::test]
    async fn test_slot_answers_depend_on_user_agent() {
        let (base, client) = start().await;
        let results = search(&base, &client, ApiProtocol::V4).await;
        assert_eq!(results.search_results.len(), 10);
        let video = &results.search_results[0];
        let slot_url = format!("{base}/{}", ApiProtocol::V4.slot_path(&video.slot_id));

        let standard = client
            .get(&slot_url)
            .header("User-Agent", "AVProVideo/2.8 (Windows)")
            .send()
            .await
            .unwrap();
        assert_eq!(standard.status().as_u16(), 302);
        assert_eq!(
            standard.headers()["location"].to_str().unwrap(),
            format!("{WATCH_URL_PREFIX}{}", video.youtube_id)
        );

        let quest = client
            .get(&slot_url)
            .header("User-Agent", "stagefright/1.2 (Linux;Android 12)")
            .send()
            .await
            .unwrap();
        assert_eq!(quest.status().as_u16(), 302);
        assert!(
            quest.headers()["location"]
                .to_str()
                .unwrap()
                .contains("/_hls/")
        );

        let generic = client
            .get(&slot_url)
            .header("User-Agent", "UnityWebRequest")
            .send()
            .await
            .unwrap();
        assert_eq!(generic.status().as_u16(), 200);
        let details: serde_json::Value = generic.json().await.unwrap();
        assert_eq!(details["videoStreams"][0]["quality"], "720p");
    }

    #[tokio::test]
    async fn test_unknown_slots_and_atlases_are_404() {
        let (base, client) = start().await;

        for path in [
            ApiProtocol::V4.slot_path("missing"),
            ApiProtocol::V5.atlas_path("missing"),
            ApiProtocol::V4.queue_refresh_path("missing"),
            "api/v9/hello/x".to_string(),
        ] {
            let response = client.get(format!("{base}/{path}")).send().await.unwrap();
            assert_eq!(response.status().as_u16(), 404, "{path}");
        }
    }

    #[tokio::test]
    async fn test_v5_search_issues_resolvable_atlas() {
        let (base, client) = start().await;
        let results = search(&base, &client, ApiProtocol::V5).await;
        let atlas = results.atlas_slot().unwrap();

        let response = client
            .get(format!("{base}/{}", ApiProtocol::V5.atlas_path(atlas)))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status().as_u16(), 200);

        let refresh = client
            .get(format!(
                "{base}/{}",
                ApiProtocol::V5.queue_refresh_path(&results.search_results[0].slot_id)
            ))
            .send()
            .await
            .unwrap();
        assert_eq!(refresh.status().as_u16(), 200);
    }

    #[tokio::test]
    async fn test_piped_fixture_routes() {
        let (base, client) = start().await;

        for path in [
            "search?q=x",
            "channel/abc",
            "playlists/abc",
            "_subtitles",
            "streams/abc",
            "trending",
            "api/skipSegments",
        ] {
            let response = client.get(format!("{base}/{path}")).send().await.unwrap();
            assert_eq!(response.status().as_u16(), 200, "{path}");
        }

        let trending: Vec<serde_json::Value> = client
            .get(format!("{base}/trending"))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(trending.len(), 10);
    }

    #[test]
    fn test_state_registers_slots() {
        let state = StubState::new(1, "http://localhost");
        state.register_slots(&[Video::new("s", "y", 1)]);

        assert_eq!(state.issued_slots(), 1);
        assert_eq!(state.slot("s").map(|v| v.youtube_id), Some("y".to_string()));
        assert!(state.slot("t").is_none());
    }
}
