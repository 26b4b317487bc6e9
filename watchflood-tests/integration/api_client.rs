//! HTTP client against the stub server

use std::time::Duration;

use watchflood_core::{
    ApiClient, ApiConfig, ApiError, ApiProtocol, ClientIdentity, Endpoint, HttpApiClient,
    RedirectOutcome, SearchResponse,
};

use crate::common::{http_client, start_stub, test_config};

async fn client_for(protocol: ApiProtocol) -> HttpApiClient {
    let base_url = start_stub(11).await;
    http_client(&test_config(&base_url, protocol).api)
}

async fn search(client: &HttpApiClient) -> SearchResponse {
    let response = client
        .search("integration", ClientIdentity::Generic)
        .await
        .unwrap();
    assert_eq!(response.status, 200);
    SearchResponse::decode(&response.body, client.protocol()).unwrap()
}

#[tokio::test]
async fn test_hello_succeeds_for_every_protocol() {
    for protocol in ApiProtocol::ALL {
        let client = client_for(protocol).await;
        let response = client.hello("stress_test-1").await.unwrap();
        assert!(response.is_success(), "{protocol}: {}", response.status);
    }
}

#[tokio::test]
async fn test_v4_search_decodes_valid_videos() {
    let client = client_for(ApiProtocol::V4).await;
    let results = search(&client).await;

    assert_eq!(results.search_results.len(), 10);
    assert!(results.atlas_slot().is_none());
    for video in &results.search_results {
        video.validate(Endpoint::Search).unwrap();
    }
}

#[tokio::test]
async fn test_v5_search_atlas_resolves() {
    let client = client_for(ApiProtocol::V5).await;
    let results = search(&client).await;

    let atlas = results.atlas_slot().expect("V5 search carries an atlas");
    let response = client.resolve_atlas(atlas).await.unwrap();
    assert!(response.is_success());

    let missing = client.resolve_atlas("not-an-atlas").await.unwrap();
    assert_eq!(missing.status, 404);
}

#[tokio::test]
async fn test_slot_answers_per_identity() {
    for protocol in ApiProtocol::ALL {
        let client = client_for(protocol).await;
        let results = search(&client).await;
        let video = &results.search_results[0];

        let standard = client
            .resolve_slot(&video.slot_id, ClientIdentity::Standard)
            .await
            .unwrap();
        assert_eq!(standard.status, 302);
        assert!(standard.redirect_outcome().references(&video.youtube_id));

        let quest = client
            .resolve_slot(&video.slot_id, ClientIdentity::Quest)
            .await
            .unwrap();
        assert!(quest.is_redirect());

        let generic = client
            .resolve_slot(&video.slot_id, ClientIdentity::Generic)
            .await
            .unwrap();
        assert_eq!(
            generic.redirect_outcome(),
            RedirectOutcome::Resolved { status: 200 }
        );
        let details: serde_json::Value = serde_json::from_str(&generic.body).unwrap();
        assert!(details["videoStreams"].is_array());
    }
}

#[tokio::test]
async fn test_queue_refresh_tracks_issued_slots() {
    let client = client_for(ApiProtocol::V4).await;
    let results = search(&client).await;

    let known = client
        .refresh_queue(&results.search_results[0].slot_id)
        .await
        .unwrap();
    assert!(known.is_success());

    let unknown = client.refresh_queue("never-issued").await.unwrap();
    assert_eq!(unknown.status, 404);
}

#[tokio::test]
async fn test_unknown_slot_is_rejected() {
    let client = client_for(ApiProtocol::V4).await;
    let response = client
        .resolve_slot("never-issued", ClientIdentity::Standard)
        .await
        .unwrap();

    assert_eq!(
        response.redirect_outcome(),
        RedirectOutcome::Rejected { status: 404 }
    );
}

#[tokio::test]
async fn test_concurrent_searches_issue_distinct_slots() {
    let client = client_for(ApiProtocol::V4).await;
    let responses = futures::future::join_all((0..4).map(|_| search(&client))).await;

    let mut slots: Vec<&str> = responses
        .iter()
        .flat_map(|r| r.search_results.iter().map(|v| v.slot_id.as_str()))
        .collect();
    let issued = slots.len();
    slots.sort_unstable();
    slots.dedup();
    assert_eq!(slots.len(), issued);
}

#[tokio::test]
async fn test_unreachable_server_is_transport_error() {
    // Bind then drop to get a port nothing listens on
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let config = ApiConfig {
        base_url: format!("http://{addr}"),
        ..ApiConfig::default()
    };
    let client = http_client(&config);

    let err = client.hello("stress_test-1").await.unwrap_err();
    assert!(err.is_transport());
    assert!(matches!(
        err,
        ApiError::Transport {
            endpoint: Endpoint::Hello,
            ..
        }
    ));
}

#[tokio::test]
async fn test_silent_server_times_out() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    // Accept and hold connections without ever answering
    let _server = tokio::spawn(async move {
        let mut held = Vec::new();
        while let Ok((socket, _)) = listener.accept().await {
            held.push(socket);
        }
    });

    let config = ApiConfig {
        base_url: format!("http://{addr}"),
        request_timeout: Duration::from_millis(200),
        ..ApiConfig::default()
    };
    let client = http_client(&config);

    let err = client.hello("stress_test-1").await.unwrap_err();
    assert!(
        matches!(
            err,
            ApiError::Timeout {
                endpoint: Endpoint::Hello,
                ..
            }
        ),
        "{err:?}"
    );
    assert!(err.is_transport());
}
