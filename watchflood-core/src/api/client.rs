//! HTTP implementation of the video-serving API client

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{ACCEPT, HeaderMap, HeaderValue, LOCATION, USER_AGENT};
use url::Url;

use super::{ApiClient, ApiError, ApiProtocol, ApiResponse, ClientIdentity, Endpoint};
use crate::config::ApiConfig;

/// HTTP API client backed by a shared `reqwest::Client`.
///
/// Redirects are disabled so slot resolves surface the raw 3xx and its
/// `Location`. Every call is bounded by the configured per-call timeout.
pub struct HttpApiClient {
    pub(super) base_url: Url,
    protocol: ApiProtocol,
    request_timeout: Duration,
    generic_user_agent: String,
    quest_user_agent: String,
    standard_user_agent: String,
    client: reqwest::Client,
}

impl HttpApiClient {
    /// Creates an API client from connection settings.
    ///
    /// # Errors
    /// - `ApiError::InvalidUrl` - `base_url` is not an absolute URL
    /// - `ApiError::ClientSetup` - TLS backend or client builder failed
    pub fn new(config: &ApiConfig) -> Result<Self, ApiError> {
        // Url::join replaces the last segment unless the base ends in '/'
        let mut base = config.base_url.clone();
        if !base.ends_with('/') {
            base.push('/');
        }
        let base_url = Url::parse(&base).map_err(|e| ApiError::InvalidUrl {
            reason: format!("{}: {e}", config.base_url),
        })?;

        let mut default_headers = HeaderMap::new();
        default_headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .redirect(reqwest::redirect::Policy::none())
            .default_headers(default_headers)
            .build()
            .map_err(|e| ApiError::ClientSetup {
                reason: e.to_string(),
            })?;

        Ok(Self {
            base_url,
            protocol: config.protocol,
            request_timeout: config.request_timeout,
            generic_user_agent: config.generic_user_agent.clone(),
            quest_user_agent: config.quest_user_agent.clone(),
            standard_user_agent: config.standard_user_agent.clone(),
            client,
        })
    }

    /// Base URL every request path is resolved against.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Resolve a relative request path against the base URL.
    pub(super) fn build_url(&self, path: &str) -> Result<Url, ApiError> {
        self.base_url.join(path).map_err(|e| ApiError::InvalidUrl {
            reason: format!("{path}: {e}"),
        })
    }

    /// User agent string presented for `identity`.
    pub(super) fn user_agent(&self, identity: ClientIdentity) -> &str {
        match identity {
            ClientIdentity::Generic => &self.generic_user_agent,
            ClientIdentity::Quest => &self.quest_user_agent,
            ClientIdentity::Standard => &self.standard_user_agent,
        }
    }

    /// Map a reqwest failure to a transport-level API error.
    fn classify_failure(&self, endpoint: Endpoint, error: reqwest::Error) -> ApiError {
        if error.is_timeout() {
            ApiError::Timeout {
                endpoint,
                timeout: self.request_timeout,
            }
        } else {
            ApiError::Transport {
                endpoint,
                reason: error.to_string(),
            }
        }
    }

    /// Perform one GET and capture status, location and body.
    async fn get(
        &self,
        endpoint: Endpoint,
        path: &str,
        identity: ClientIdentity,
    ) -> Result<ApiResponse, ApiError> {
        let url = self.build_url(path)?;
        tracing::trace!("GET {} ({})", url, endpoint);

        let response = self
            .client
            .get(url)
            .header(USER_AGENT, self.user_agent(identity))
            .send()
            .await
            .map_err(|e| {
                tracing::debug!("{} request failed: {}", endpoint, e);
                self.classify_failure(endpoint, e)
            })?;

        let status = response.status().as_u16();
        let location = response
            .headers()
            .get(LOCATION)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);

        let body = response
            .text()
            .await
            .map_err(|e| self.classify_failure(endpoint, e))?;

        tracing::trace!("{} answered {} ({} bytes)", endpoint, status, body.len());

        Ok(ApiResponse {
            status,
            location,
            body,
        })
    }
}

#[async_trait]
impl ApiClient for HttpApiClient {
    fn protocol(&self) -> ApiProtocol {
        self.protocol
    }

    async fn hello(&self, token: &str) -> Result<ApiResponse, ApiError> {
        let path = self.protocol.hello_path(token);
        self.get(Endpoint::Hello, &path, ClientIdentity::Generic)
            .await
    }

    async fn search(
        &self,
        query: &str,
        identity: ClientIdentity,
    ) -> Result<ApiResponse, ApiError> {
        let path = self.protocol.search_path(query);
        self.get(Endpoint::Search, &path, identity).await
    }

    async fn resolve_atlas(&self, atlas_slot_id: &str) -> Result<ApiResponse, ApiError> {
        let path = self.protocol.atlas_path(atlas_slot_id);
        self.get(Endpoint::Atlas, &path, ClientIdentity::Generic)
            .await
    }

    async fn resolve_slot(
        &self,
        slot_id: &str,
        identity: ClientIdentity,
    ) -> Result<ApiResponse, ApiError> {
        let path = self.protocol.slot_path(slot_id);
        self.get(Endpoint::Slot, &path, identity).await
    }

    async fn refresh_queue(&self, slot_id: &str) -> Result<ApiResponse, ApiError> {
        let path = self.protocol.queue_refresh_path(slot_id);
        self.get(Endpoint::QueueRefresh, &path, ClientIdentity::Generic)
            .await
    }
}
