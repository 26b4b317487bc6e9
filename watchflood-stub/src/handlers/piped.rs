//! Piped-style fixture handlers

use axum::extract::{Path, State};
use axum::response::Json;

use crate::fixtures::{
    self, Channel, Playlist, SearchPage, SkipSegment, StreamDetails, StreamItem,
};
use crate::server::StubState;

pub async fn piped_search(State(state): State<StubState>) -> Json<SearchPage> {
    Json(fixtures::search_page(&mut *state.rng.lock()))
}

pub async fn piped_channel(
    State(state): State<StubState>,
    Path(channel_id): Path<String>,
) -> Json<Channel> {
    Json(fixtures::channel(&mut *state.rng.lock(), &channel_id))
}

pub async fn piped_playlist(
    State(state): State<StubState>,
    Path(playlist_id): Path<String>,
) -> Json<Playlist> {
    Json(fixtures::playlist(&mut *state.rng.lock(), &playlist_id))
}

/// Subtitle body is just random text.
pub async fn piped_subtitles(State(state): State<StubState>) -> String {
    fixtures::random_string(&mut *state.rng.lock(), 100)
}

pub async fn piped_streams(
    State(state): State<StubState>,
    Path(stream_id): Path<String>,
) -> Json<StreamDetails> {
    Json(fixtures::stream_details(
        &mut *state.rng.lock(),
        &stream_id,
        &state.public_url,
    ))
}

pub async fn piped_trending(State(state): State<StubState>) -> Json<Vec<StreamItem>> {
    Json(fixtures::trending(&mut *state.rng.lock()))
}

pub async fn piped_skip_segments(State(state): State<StubState>) -> Json<Vec<SkipSegment>> {
    Json(fixtures::skip_segments(&mut *state.rng.lock()))
}
