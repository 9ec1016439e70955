//! Shared test helpers for Drive API integration tests
//!
//! wiremock-based mock server setup for the Drive v3 endpoints. Each
//! helper mounts a mock and returns a client pointing at the server.

use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use treeline_drive::DriveClient;

/// Starts a mock server and a client pointed at it
pub async fn setup() -> (MockServer, DriveClient) {
    let server = MockServer::start().await;
    let client = DriveClient::with_base_url("test-access-token", server.uri());
    (server, client)
}

/// Mounts a single-page `/files` listing for a parent query
pub async fn mount_children_single_page(server: &MockServer, files: serde_json::Value) {
    Mock::given(method("GET"))
        .and(path("/files"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "files": files
        })))
        .mount(server)
        .await;
}

/// Mounts a two-page `/files` listing distinguished by pageToken
pub async fn mount_children_paginated(
    server: &MockServer,
    page1: serde_json::Value,
    page2: serde_json::Value,
) {
    Mock::given(method("GET"))
        .and(path("/files"))
        .and(query_param("pageToken", "page-2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "files": page2
        })))
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/files"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "files": page1,
            "nextPageToken": "page-2"
        })))
        .mount(server)
        .await;
}

/// Mounts a single file resource at `/files/{id}`
pub async fn mount_file(server: &MockServer, id: &str, body: serde_json::Value) {
    Mock::given(method("GET"))
        .and(path(format!("/files/{id}")))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}

/// Mounts a 404 for `/files/{id}`
pub async fn mount_file_not_found(server: &MockServer, id: &str) {
    Mock::given(method("GET"))
        .and(path(format!("/files/{id}")))
        .respond_with(ResponseTemplate::new(404).set_body_json(serde_json::json!({
            "error": { "code": 404, "message": "File not found" }
        })))
        .mount(server)
        .await;
}

/// Mounts a 429 with a Retry-After header for every `/files` request
pub async fn mount_rate_limited(server: &MockServer, retry_after: &str) {
    Mock::given(method("GET"))
        .and(path("/files"))
        .respond_with(
            ResponseTemplate::new(429)
                .append_header("Retry-After", retry_after)
                .set_body_json(serde_json::json!({
                    "error": { "code": 429, "message": "Rate limit exceeded" }
                })),
        )
        .mount(server)
        .await;
}
