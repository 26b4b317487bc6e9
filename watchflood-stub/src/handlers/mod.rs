//! HTTP request handlers organized by functionality

pub mod api;
pub mod piped;

// Re-export handler functions
pub use api::{api_atlas, api_hello, api_queue_refresh, api_search, api_slot};
pub use piped::{
    piped_channel, piped_playlist, piped_search, piped_skip_segments, piped_streams,
    piped_subtitles, piped_trending,
};
