//! Simulator-facing API handlers
//!
//! Version segments accept `v4`/`v5` on JSON routes and `4`/`5` on slot
//! routes. Unknown versions answer 404.

use axum::extract::{Path, Query, State};
use axum::http::header::{LOCATION, USER_AGENT};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Json, Response};
use serde::Deserialize;
use watchflood_core::{ApiProtocol, SearchResponse};

use crate::fixtures;
use crate::server::StubState;

/// Videos returned per search.
const SEARCH_RESULT_COUNT: usize = 10;

/// User agent prefix of the in-world client.
const GENERIC_AGENT: &str = "UnityWebRequest";

/// Substring identifying headset media players.
const QUEST_AGENT_MARKER: &str = "stagefright";

/// Redirect target prefix for desktop players.
pub const WATCH_URL_PREFIX: &str = "https://www.youtube.com/watch?v=";

#[derive(Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub q: String,
}

fn parse_protocol(version: &str) -> Result<ApiProtocol, StatusCode> {
    version.parse().map_err(|_| StatusCode::NOT_FOUND)
}

fn found(location: String) -> Response {
    (StatusCode::FOUND, [(LOCATION, location)]).into_response()
}

pub async fn api_hello(
    Path((version, token)): Path<(String, String)>,
) -> Result<StatusCode, StatusCode> {
    parse_protocol(&version)?;
    tracing::trace!("hello from {}", token);
    Ok(StatusCode::OK)
}

pub async fn api_search(
    State(state): State<StubState>,
    Path(version): Path<String>,
    Query(query): Query<SearchQuery>,
) -> Result<Json<SearchResponse>, StatusCode> {
    let protocol = parse_protocol(&version)?;

    let (videos, atlas) = {
        let mut rng = state.rng.lock();
        let videos = fixtures::videos(&mut *rng, SEARCH_RESULT_COUNT);
        let atlas = protocol
            .requires_atlas_resolve()
            .then(|| fixtures::random_string(&mut *rng, 24));
        (videos, atlas)
    };

    state.register_slots(&videos);
    if let Some(atlas) = &atlas {
        state.atlases.lock().insert(atlas.clone());
    }

    tracing::debug!(
        "{} search for {} chars issued {} slots",
        protocol,
        query.q.len(),
        videos.len()
    );

    Ok(Json(SearchResponse {
        search_results: videos,
        slot_id: atlas,
    }))
}

pub async fn api_atlas(
    State(state): State<StubState>,
    Path((version, atlas_id)): Path<(String, String)>,
) -> StatusCode {
    if parse_protocol(&version).is_err() {
        return StatusCode::NOT_FOUND;
    }
    if state.atlases.lock().contains(&atlas_id) {
        StatusCode::OK
    } else {
        StatusCode::NOT_FOUND
    }
}

pub async fn api_queue_refresh(
    State(state): State<StubState>,
    Path((version, slot_id)): Path<(String, String)>,
) -> StatusCode {
    if parse_protocol(&version).is_err() || state.slot(&slot_id).is_none() {
        return StatusCode::NOT_FOUND;
    }
    StatusCode::OK
}

/// Answers depend on the player identity in `User-Agent`: the in-world
/// client gets stream metadata, headset players an HLS redirect and
/// everything else a redirect to the canonical watch URL.
pub async fn api_slot(
    State(state): State<StubState>,
    Path((version, slot_id)): Path<(String, String)>,
    headers: HeaderMap,
) -> Response {
    if parse_protocol(&version).is_err() {
        return StatusCode::NOT_FOUND.into_response();
    }
    let Some(video) = state.slot(&slot_id) else {
        return StatusCode::NOT_FOUND.into_response();
    };

    let user_agent = headers
        .get(USER_AGENT)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default();

    if user_agent.starts_with(GENERIC_AGENT) {
        let details = fixtures::stream_details(
            &mut *state.rng.lock(),
            &video.youtube_id,
            &state.public_url,
        );
        Json(details).into_response()
    } else if user_agent.contains(QUEST_AGENT_MARKER) {
        found(format!(
            "{}{}",
            state.public_url,
            fixtures::hls_path(&video.youtube_id)
        ))
    } else {
        found(format!("{WATCH_URL_PREFIX}{}", video.youtube_id))
    }
}
