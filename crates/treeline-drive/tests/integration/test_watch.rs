//! Integration tests for webhook channel create/stop

use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use treeline_core::domain::newtypes::{ChannelId, ConnectorId};
use treeline_core::ports::ProviderError;
use treeline_drive::{watch, DriveClient};

#[tokio::test]
async fn test_create_channel_returns_grant() {
    let server = MockServer::start().await;
    let client = DriveClient::with_base_url("token", server.uri());

    Mock::given(method("POST"))
        .and(path("/changes/watch"))
        .and(body_partial_json(serde_json::json!({
            "type": "web_hook",
            "address": "https://connectors.example.com/notifications"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "kind": "api#channel",
            "id": "ignored-echo",
            "resourceId": "res-777",
            "expiration": "1767225600000"
        })))
        .mount(&server)
        .await;

    let connector_id = ConnectorId::new();
    let grant = watch::create_channel(
        &client,
        &connector_id,
        "https://connectors.example.com/notifications",
    )
    .await
    .expect("Channel creation failed");

    assert_eq!(grant.resource_id, "res-777");
    assert_eq!(grant.expires_at.timestamp_millis(), 1767225600000);
}

#[tokio::test]
async fn test_create_channel_failure_propagates() {
    let server = MockServer::start().await;
    let client = DriveClient::with_base_url("token", server.uri());

    Mock::given(method("POST"))
        .and(path("/changes/watch"))
        .respond_with(ResponseTemplate::new(403).set_body_json(serde_json::json!({
            "error": { "code": 403, "message": "webhook domain not verified" }
        })))
        .mount(&server)
        .await;

    let err = watch::create_channel(&client, &ConnectorId::new(), "https://bad.example.com")
        .await
        .unwrap_err();
    assert!(matches!(err, ProviderError::Unavailable(_)));
}

#[tokio::test]
async fn test_stop_channel_posts_resource_handle() {
    let server = MockServer::start().await;
    let client = DriveClient::with_base_url("token", server.uri());

    Mock::given(method("POST"))
        .and(path("/channels/stop"))
        .and(body_partial_json(serde_json::json!({
            "id": "chan-9",
            "resourceId": "res-9"
        })))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let channel_id = ChannelId::new("chan-9".to_string()).unwrap();
    watch::stop_channel(&client, &channel_id, "res-9")
        .await
        .expect("Stop failed");
}
