//! Shared helpers for integration tests

use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4};

use watchflood_core::{ApiConfig, ApiProtocol, HttpApiClient, WatchfloodConfig};

/// Starts a stub server on a free local port and returns its base URL.
pub async fn start_stub(seed: u64) -> String {
    let addr = SocketAddr::V4(SocketAddrV4::new(Ipv4Addr::LOCALHOST, 0));
    let (local_addr, _handle) = watchflood_stub::spawn(addr, seed)
        .await
        .expect("stub should bind a local port");
    format!("http://{local_addr}")
}

/// Test configuration pointed at `base_url` speaking `protocol`.
pub fn test_config(base_url: &str, protocol: ApiProtocol) -> WatchfloodConfig {
    let mut config = WatchfloodConfig::for_testing(base_url);
    config.api.protocol = protocol;
    config
}

/// HTTP client for `config`.
pub fn http_client(config: &ApiConfig) -> HttpApiClient {
    HttpApiClient::new(config).expect("test config should build a client")
}
