//! Randomized, schema-valid response fixtures.
//!
//! Shapes follow the Piped-style API the video service proxies. Every value
//! is random but every field is present with the right type.

use std::time::{SystemTime, UNIX_EPOCH};

use rand::Rng;
use rand::distr::Alphanumeric;
use serde::{Deserialize, Serialize};
use watchflood_core::Video;

/// Proxy host used in thumbnail URLs.
const THUMBNAIL_HOST: &str = "http://example-proxy.com";

/// Stream entry as it appears in search, channel, playlist and trending lists.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StreamItem {
    pub url: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub title: String,
    pub uploader_url: String,
    pub thumbnail_url: String,
    pub uploader_name: String,
    pub uploader_avatar: Option<String>,
    pub uploaded_date: String,
    pub short_description: String,
    pub duration: u64,
    pub views: u64,
    pub uploaded: u64,
    pub uploader_verified: bool,
    pub is_short: bool,
}

/// `/search` page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchPage {
    pub items: Vec<StreamItem>,
    pub nextpage: String,
    pub suggestion: Option<String>,
    pub corrected: bool,
}

/// `/channel/{id}` payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Channel {
    pub id: String,
    pub name: String,
    pub avatar_url: String,
    pub banner_url: String,
    pub description: String,
    pub nextpage: Option<String>,
    pub subscriber_count: u64,
    pub tabs: Vec<String>,
    pub related_streams: Vec<StreamItem>,
}

/// `/playlists/{id}` payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Playlist {
    pub name: String,
    pub thumbnail_url: String,
    pub description: String,
    pub banner_url: String,
    pub nextpage: String,
    pub uploader: String,
    pub uploader_url: String,
    pub uploader_avatar: String,
    pub videos: u32,
    pub related_streams: Vec<StreamItem>,
}

/// One playable variant of a stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoVariant {
    pub url: String,
    pub format: String,
    pub quality: String,
    pub mime_type: String,
    pub codec: Option<String>,
    pub video_only: bool,
    pub itag: u32,
    pub bitrate: u64,
    pub width: u32,
    pub height: u32,
    pub fps: u32,
    pub content_length: i64,
}

/// Subtitle track of a stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Subtitle {
    pub url: String,
    pub mime_type: String,
    pub name: String,
    pub code: String,
    pub auto_generated: bool,
}

/// `/streams/{id}` payload, also served to generic slot resolves.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StreamDetails {
    pub title: String,
    pub description: String,
    pub uploader: String,
    pub uploader_url: String,
    pub thumbnail_url: String,
    pub hls: String,
    pub dash: Option<String>,
    pub lbry_id: Option<String>,
    pub category: String,
    pub visibility: String,
    pub duration: u64,
    pub views: u64,
    pub likes: u64,
    pub dislikes: u64,
    pub audio_streams: Vec<VideoVariant>,
    pub video_streams: Vec<VideoVariant>,
    pub related_streams: Vec<StreamItem>,
    pub subtitles: Vec<Subtitle>,
    pub livestream: bool,
    pub proxy_url: String,
    pub chapters: Vec<String>,
    pub preview_frames: Vec<String>,
}

/// SponsorBlock-style skip segment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SkipSegment {
    pub category: String,
    pub action_type: String,
    pub segment: [f64; 2],
    #[serde(rename = "UUID")]
    pub uuid: String,
    pub video_duration: u64,
    pub locked: u8,
    pub votes: u32,
    pub description: String,
}

/// Random alphanumeric string.
pub fn random_string<R: Rng>(rng: &mut R, length: usize) -> String {
    (0..length)
        .map(|_| char::from(rng.sample(Alphanumeric)))
        .collect()
}

/// Random canonical video id.
pub fn random_video_id<R: Rng>(rng: &mut R) -> String {
    random_string(rng, 16)
}

fn random_channel_id<R: Rng>(rng: &mut R) -> String {
    random_string(rng, 32)
}

fn thumbnail_for(id: &str) -> String {
    format!("{THUMBNAIL_HOST}/vi/{id}/hq720.jpg?host=localhost:8080")
}

fn channel_for(id: &str) -> String {
    format!("/channel/{id}")
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default()
}

/// Random stream list entry.
pub fn stream_item<R: Rng>(rng: &mut R) -> StreamItem {
    let channel_id = random_channel_id(rng);
    let youtube_id = random_video_id(rng);
    StreamItem {
        url: format!("/watch?v={youtube_id}"),
        kind: "stream".to_string(),
        title: random_string(rng, 100),
        uploader_url: channel_for(&channel_id),
        thumbnail_url: thumbnail_for(&channel_id),
        uploader_name: random_string(rng, 100),
        uploader_avatar: None,
        uploaded_date: "1 day ago".to_string(),
        short_description: random_string(rng, 40),
        duration: rng.random_range(1..=999),
        views: 1337,
        uploaded: unix_now(),
        uploader_verified: false,
        is_short: false,
    }
}

fn stream_items<R: Rng>(rng: &mut R, count: usize) -> Vec<StreamItem> {
    (0..count).map(|_| stream_item(rng)).collect()
}

/// Random `/search` page with ten entries.
pub fn search_page<R: Rng>(rng: &mut R) -> SearchPage {
    SearchPage {
        items: stream_items(rng, 10),
        nextpage: String::new(),
        suggestion: None,
        corrected: false,
    }
}

/// Random channel named `channel_id`.
pub fn channel<R: Rng>(rng: &mut R, channel_id: &str) -> Channel {
    Channel {
        id: channel_id.to_string(),
        name: random_string(rng, 100),
        avatar_url: random_string(rng, 100),
        banner_url: random_string(rng, 100),
        description: random_string(rng, 100),
        nextpage: None,
        subscriber_count: rng.random_range(1..=100_000),
        tabs: Vec::new(),
        related_streams: stream_items(rng, 10),
    }
}

/// Random playlist named `playlist_id`.
pub fn playlist<R: Rng>(rng: &mut R, playlist_id: &str) -> Playlist {
    let uploader_id = random_channel_id(rng);
    Playlist {
        name: random_string(rng, 100),
        thumbnail_url: thumbnail_for(playlist_id),
        description: random_string(rng, 100),
        banner_url: String::new(),
        nextpage: String::new(),
        uploader: random_string(rng, 100),
        uploader_url: channel_for(&uploader_id),
        uploader_avatar: random_string(rng, 100),
        videos: 10,
        related_streams: stream_items(rng, 10),
    }
}

/// Random stream details with one 720p MPEG-4 variant and English subtitles.
pub fn stream_details<R: Rng>(rng: &mut R, stream_id: &str, public_url: &str) -> StreamDetails {
    let channel_id = random_channel_id(rng);
    StreamDetails {
        title: random_string(rng, 100),
        description: random_string(rng, 100),
        uploader: random_string(rng, 100),
        uploader_url: channel_for(&channel_id),
        thumbnail_url: thumbnail_for(stream_id),
        hls: hls_path(stream_id),
        dash: None,
        lbry_id: None,
        category: random_string(rng, 12),
        visibility: "public".to_string(),
        duration: rng.random_range(1..=999),
        views: rng.random_range(1..=99_999),
        likes: rng.random_range(1..=99_999),
        dislikes: rng.random_range(1..=99_999),
        audio_streams: Vec::new(),
        video_streams: vec![VideoVariant {
            url: format!("{public_url}/videoplayback?id={stream_id}&itag=22&mime=video%2Fmp4"),
            format: "MPEG_4".to_string(),
            quality: "720p".to_string(),
            mime_type: "video/mp4".to_string(),
            codec: None,
            video_only: false,
            itag: 22,
            bitrate: 0,
            width: 0,
            height: 0,
            fps: 0,
            content_length: -1,
        }],
        related_streams: Vec::new(),
        subtitles: vec![Subtitle {
            url: format!("{public_url}/_subtitles?v={stream_id}"),
            mime_type: "text/vtt".to_string(),
            name: "English".to_string(),
            code: "en".to_string(),
            auto_generated: false,
        }],
        livestream: false,
        proxy_url: random_string(rng, 8),
        chapters: Vec::new(),
        preview_frames: Vec::new(),
    }
}

/// HLS playlist path of a stream.
pub fn hls_path(stream_id: &str) -> String {
    format!("/_hls/{stream_id}")
}

/// Ten random trending entries.
pub fn trending<R: Rng>(rng: &mut R) -> Vec<StreamItem> {
    stream_items(rng, 10)
}

/// One to ten random sponsor segments.
pub fn skip_segments<R: Rng>(rng: &mut R) -> Vec<SkipSegment> {
    let count = rng.random_range(1..=10);
    (0..count)
        .map(|_| SkipSegment {
            category: "sponsor".to_string(),
            action_type: "skip".to_string(),
            segment: [90.343, 132.37],
            uuid: random_string(rng, 100),
            video_duration: rng.random_range(1..=999),
            locked: 1,
            votes: 10,
            description: random_string(rng, 100),
        })
        .collect()
}

/// Random playable videos for the simulator-facing search.
pub fn videos<R: Rng>(rng: &mut R, count: usize) -> Vec<Video> {
    (0..count)
        .map(|_| {
            Video::new(
                random_string(rng, 24),
                random_video_id(rng),
                rng.random_range(1..=999),
            )
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    use super::*;

    #[test]
    fn test_stream_item_uses_camel_case() {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let json = serde_json::to_value(stream_item(&mut rng)).unwrap();

        assert_eq!(json["type"], "stream");
        assert!(json.get("uploaderUrl").is_some());
        assert!(json.get("isShort").is_some());
        assert!(json["uploaderAvatar"].is_null());
    }

    #[test]
    fn test_stream_details_has_playable_variant() {
        let mut rng = ChaCha8Rng::seed_from_u64(2);
        let details = stream_details(&mut rng, "abc", "http://127.0.0.1:8080");

        assert_eq!(details.video_streams.len(), 1);
        assert_eq!(details.video_streams[0].quality, "720p");
        assert_eq!(details.subtitles[0].code, "en");
        assert_eq!(details.hls, "/_hls/abc");

        let json = serde_json::to_value(&details).unwrap();
        assert_eq!(json["videoStreams"][0]["mimeType"], "video/mp4");
    }

    #[test]
    fn test_skip_segment_count_and_uuid_key() {
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        for _ in 0..20 {
            let segments = skip_segments(&mut rng);
            assert!((1..=10).contains(&segments.len()));
        }

        let json = serde_json::to_value(&skip_segments(&mut rng)[0]).unwrap();
        assert!(json.get("UUID").is_some());
        assert!(json.get("actionType").is_some());
    }

    #[test]
    fn test_videos_are_valid() {
        let mut rng = ChaCha8Rng::seed_from_u64(4);
        let videos = videos(&mut rng, 10);

        assert_eq!(videos.len(), 10);
        for video in &videos {
            assert!(video.validate(watchflood_core::Endpoint::Search).is_ok());
            assert!((1..=999).contains(&video.duration));
        }
    }
}
