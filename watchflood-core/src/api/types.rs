//! Typed wire values exchanged with the video-serving API.
//!
//! Payloads are decoded into explicit structs with required fields and then
//! validated, so a malformed response fails at the boundary instead of
//! surfacing later as a confusing state machine error.

use serde::{Deserialize, Serialize};

use super::{ApiError, ApiProtocol, Endpoint};

/// A playable video as returned by search.
///
/// Immutable once fetched. Identity is `slot_id`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Video {
    /// API identifier of the playable resource
    pub slot_id: String,
    /// Canonical upstream video id, referenced by slot redirects
    pub youtube_id: String,
    /// Playback length in simulation ticks
    pub duration: u64,
}

impl Video {
    /// Creates a video value.
    pub fn new(slot_id: impl Into<String>, youtube_id: impl Into<String>, duration: u64) -> Self {
        Self {
            slot_id: slot_id.into(),
            youtube_id: youtube_id.into(),
            duration,
        }
    }

    /// Validates fields serde cannot express.
    ///
    /// # Errors
    /// - `ApiError::Decode` - `slot_id` or `youtube_id` is empty
    pub fn validate(&self, endpoint: Endpoint) -> Result<(), ApiError> {
        if self.slot_id.is_empty() {
            return Err(ApiError::Decode {
                endpoint,
                reason: "video has empty slot_id".to_string(),
            });
        }
        if self.youtube_id.is_empty() {
            return Err(ApiError::Decode {
                endpoint,
                reason: format!("video {} has empty youtube_id", self.slot_id),
            });
        }
        Ok(())
    }
}

/// Search response body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchResponse {
    /// Videos matching the query, in server order
    pub search_results: Vec<Video>,
    /// Thumbnail atlas slot, present from protocol V5 on
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slot_id: Option<String>,
}

impl SearchResponse {
    /// Decodes and validates a search response body for `protocol`.
    ///
    /// # Errors
    /// - `ApiError::Decode` - Body is not valid JSON of the expected shape,
    ///   a video fails validation, or a V5 response lacks its atlas slot
    pub fn decode(body: &str, protocol: ApiProtocol) -> Result<Self, ApiError> {
        let response: SearchResponse =
            serde_json::from_str(body).map_err(|e| ApiError::Decode {
                endpoint: Endpoint::Search,
                reason: e.to_string(),
            })?;

        for video in &response.search_results {
            video.validate(Endpoint::Search)?;
        }

        if protocol.requires_atlas_resolve() && response.atlas_slot().is_none() {
            return Err(ApiError::Decode {
                endpoint: Endpoint::Search,
                reason: format!("protocol {protocol} search response is missing slot_id"),
            });
        }

        Ok(response)
    }

    /// Returns the atlas slot id if one was sent and is non-empty.
    pub fn atlas_slot(&self) -> Option<&str> {
        self.slot_id.as_deref().filter(|slot| !slot.is_empty())
    }
}

/// Raw outcome of one HTTP exchange.
///
/// Redirects are never followed, so `location` is the server's own answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiResponse {
    pub status: u16,
    pub location: Option<String>,
    pub body: String,
}

impl ApiResponse {
    /// Creates a response with an empty body and no location.
    pub fn with_status(status: u16) -> Self {
        Self {
            status,
            location: None,
            body: String::new(),
        }
    }

    /// Creates a 302 response pointing at `location`.
    pub fn redirect(location: impl Into<String>) -> Self {
        Self {
            status: 302,
            location: Some(location.into()),
            body: String::new(),
        }
    }

    /// Creates a 200 response carrying `body`.
    pub fn ok(body: impl Into<String>) -> Self {
        Self {
            status: 200,
            location: None,
            body: body.into(),
        }
    }

    /// Any 2xx status.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Any 3xx status.
    pub fn is_redirect(&self) -> bool {
        (300..400).contains(&self.status)
    }

    /// Classifies a slot-resolve response.
    pub fn redirect_outcome(&self) -> RedirectOutcome {
        if self.is_redirect() {
            RedirectOutcome::Redirect {
                status: self.status,
                location: self.location.clone(),
            }
        } else if self.is_success() {
            RedirectOutcome::Resolved {
                status: self.status,
            }
        } else {
            RedirectOutcome::Rejected {
                status: self.status,
            }
        }
    }
}

/// Classified answer of a slot-resolve call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RedirectOutcome {
    /// 3xx with the `Location` header, if the server sent one
    Redirect {
        status: u16,
        location: Option<String>,
    },
    /// 2xx, served directly
    Resolved { status: u16 },
    /// Anything else
    Rejected { status: u16 },
}

impl RedirectOutcome {
    /// Whether this is a redirect whose target ends with `youtube_id`.
    pub fn references(&self, youtube_id: &str) -> bool {
        match self {
            RedirectOutcome::Redirect {
                location: Some(location),
                ..
            } => !youtube_id.is_empty() && location.ends_with(youtube_id),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_search_decode_ignores_unknown_fields() {
        let body = r#"{
            "search_results": [
                {"slot_id": "s1", "youtube_id": "yt1", "duration": 12, "title": "x"}
            ],
            "nextpage": ""
        }"#;

        let response = SearchResponse::decode(body, ApiProtocol::V4).unwrap();
        assert_eq!(response.search_results, vec![Video::new("s1", "yt1", 12)]);
        assert_eq!(response.atlas_slot(), None);
    }

    #[test]
    fn test_search_decode_rejects_missing_field() {
        let body = r#"{"search_results": [{"slot_id": "s1", "duration": 12}]}"#;

        let result = SearchResponse::decode(body, ApiProtocol::V4);
        assert!(matches!(
            result,
            Err(ApiError::Decode {
                endpoint: Endpoint::Search,
                ..
            })
        ));
    }

    #[test]
    fn test_search_decode_rejects_empty_ids() {
        let body = r#"{"search_results": [{"slot_id": "", "youtube_id": "y", "duration": 1}]}"#;
        assert!(SearchResponse::decode(body, ApiProtocol::V4).is_err());
    }

    #[test]
    fn test_v5_search_requires_atlas_slot() {
        let without = r#"{"search_results": []}"#;
        let with = r#"{"search_results": [], "slot_id": "atlas-1"}"#;

        assert!(SearchResponse::decode(without, ApiProtocol::V5).is_err());
        let response = SearchResponse::decode(with, ApiProtocol::V5).unwrap();
        assert_eq!(response.atlas_slot(), Some("atlas-1"));
    }

    #[test]
    fn test_redirect_outcome_classification() {
        let redirect = ApiResponse::redirect("https://www.youtube.com/watch?v=abc123");
        assert!(redirect.redirect_outcome().references("abc123"));
        assert!(!redirect.redirect_outcome().references("zzz"));

        assert_eq!(
            ApiResponse::ok("{}").redirect_outcome(),
            RedirectOutcome::Resolved { status: 200 }
        );
        assert_eq!(
            ApiResponse::with_status(404).redirect_outcome(),
            RedirectOutcome::Rejected { status: 404 }
        );

        let no_location = ApiResponse::with_status(302).redirect_outcome();
        assert!(!no_location.references("abc123"));
    }
}
