//! Protocol versions and the request paths they imply.

use std::fmt;
use std::str::FromStr;

/// Version of the video-serving API protocol.
///
/// V4 returns search results directly. V5 additionally returns a thumbnail
/// atlas slot that must be resolved before the results are used.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ApiProtocol {
    #[default]
    V4,
    V5,
}

impl ApiProtocol {
    /// All supported protocol versions.
    pub const ALL: [ApiProtocol; 2] = [ApiProtocol::V4, ApiProtocol::V5];

    /// Numeric protocol version as it appears in paths.
    pub fn version(self) -> u8 {
        match self {
            ApiProtocol::V4 => 4,
            ApiProtocol::V5 => 5,
        }
    }

    /// Whether search responses carry an atlas slot needing a follow-up resolve.
    pub fn requires_atlas_resolve(self) -> bool {
        matches!(self, ApiProtocol::V5)
    }

    /// Prefix of the JSON API routes, e.g. `api/v4`.
    pub fn api_prefix(self) -> String {
        format!("api/v{}", self.version())
    }

    /// Prefix of the slot-resolve routes, e.g. `a/4/sl`.
    pub fn slot_prefix(self) -> String {
        format!("a/{}/sl", self.version())
    }

    /// Relative path of the announce/heartbeat call.
    pub fn hello_path(self, token: &str) -> String {
        format!("{}/hello/{}", self.api_prefix(), urlencoding::encode(token))
    }

    /// Relative path (with query) of the search call.
    pub fn search_path(self, query: &str) -> String {
        format!("{}/search?q={}", self.api_prefix(), urlencoding::encode(query))
    }

    /// Relative path of the atlas resolve call.
    pub fn atlas_path(self, atlas_slot_id: &str) -> String {
        format!(
            "{}/atlas/{}",
            self.api_prefix(),
            urlencoding::encode(atlas_slot_id)
        )
    }

    /// Relative path of the slot resolve call.
    pub fn slot_path(self, slot_id: &str) -> String {
        format!("{}/{}", self.slot_prefix(), urlencoding::encode(slot_id))
    }

    /// Relative path of the queue keep-alive call.
    pub fn queue_refresh_path(self, slot_id: &str) -> String {
        format!(
            "{}/queue-refresh/{}",
            self.api_prefix(),
            urlencoding::encode(slot_id)
        )
    }
}

impl fmt::Display for ApiProtocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}", self.version())
    }
}

impl FromStr for ApiProtocol {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().trim_start_matches('v') {
            "4" => Ok(ApiProtocol::V4),
            "5" => Ok(ApiProtocol::V5),
            _ => Err(format!("Unknown API protocol: {s}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_v4_paths() {
        let protocol = ApiProtocol::V4;

        assert_eq!(protocol.hello_path("stress_test-7"), "api/v4/hello/stress_test-7");
        assert_eq!(protocol.search_path("abc"), "api/v4/search?q=abc");
        assert_eq!(protocol.slot_path("slot1"), "a/4/sl/slot1");
        assert_eq!(
            protocol.queue_refresh_path("slot1"),
            "api/v4/queue-refresh/slot1"
        );
        assert!(!protocol.requires_atlas_resolve());
    }

    #[test]
    fn test_v5_requires_atlas() {
        let protocol = ApiProtocol::V5;

        assert_eq!(protocol.atlas_path("atl"), "api/v5/atlas/atl");
        assert_eq!(protocol.slot_path("s"), "a/5/sl/s");
        assert!(protocol.requires_atlas_resolve());
    }

    #[test]
    fn test_query_is_percent_encoded() {
        assert_eq!(
            ApiProtocol::V4.search_path("a b&c"),
            "api/v4/search?q=a%20b%26c"
        );
    }

    #[test]
    fn test_protocol_parsing() {
        assert_eq!("v4".parse::<ApiProtocol>(), Ok(ApiProtocol::V4));
        assert_eq!("V5".parse::<ApiProtocol>(), Ok(ApiProtocol::V5));
        assert_eq!("5".parse::<ApiProtocol>(), Ok(ApiProtocol::V5));
        assert!("v3".parse::<ApiProtocol>().is_err());
        assert_eq!(ApiProtocol::V5.to_string(), "v5");
    }
}
