//! Integration tests for file and drive listing
//!
//! Verifies end-to-end behavior against the mock Drive server:
//! - Children listing with normalized descriptors
//! - Pagination tokens surfaced page by page
//! - Folders-only MIME filtering in the query
//! - Not-found and rate-limit mapping

use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use treeline_core::domain::newtypes::NodeId;
use treeline_core::domain::node::NodeKind;
use treeline_core::ports::ProviderError;
use treeline_drive::files;

use crate::common;

fn node_id(s: &str) -> NodeId {
    NodeId::new(s.to_string()).unwrap()
}

#[tokio::test]
async fn test_list_children_normalizes_descriptors() {
    let (server, client) = common::setup().await;
    common::mount_children_single_page(
        &server,
        serde_json::json!([
            {
                "id": "sub-1",
                "name": "Reports",
                "mimeType": "application/vnd.google-apps.folder",
                "parents": ["F1"],
                "modifiedTime": "2026-02-10T09:30:00Z"
            },
            {
                "id": "doc-1",
                "name": "summary.pdf",
                "mimeType": "application/pdf",
                "parents": ["F1"],
                "webViewLink": "https://drive.google.com/file/d/doc-1"
            }
        ]),
    )
    .await;

    let page = files::list_children(&client, &node_id("F1"), None, false)
        .await
        .expect("Listing failed");

    assert_eq!(page.nodes.len(), 2);
    assert!(page.next_page.is_none());

    let folder = &page.nodes[0];
    assert_eq!(folder.id.as_str(), "sub-1");
    assert_eq!(folder.kind, NodeKind::Folder);
    assert_eq!(folder.parent_id.as_ref().unwrap().as_str(), "F1");
    assert!(folder.modified_at.is_some());

    let file = &page.nodes[1];
    assert_eq!(file.kind, NodeKind::File);
    assert_eq!(
        file.web_url.as_deref(),
        Some("https://drive.google.com/file/d/doc-1")
    );
}

#[tokio::test]
async fn test_list_children_pagination_tokens() {
    let (server, client) = common::setup().await;
    common::mount_children_paginated(
        &server,
        serde_json::json!([{ "id": "a", "name": "one" }]),
        serde_json::json!([{ "id": "b", "name": "two" }]),
    )
    .await;

    let first = files::list_children(&client, &node_id("F1"), None, false)
        .await
        .expect("First page failed");
    assert_eq!(first.nodes.len(), 1);
    let cursor = first.next_page.expect("Expected a next-page cursor");

    let second = files::list_children(&client, &node_id("F1"), Some(&cursor), false)
        .await
        .expect("Second page failed");
    assert_eq!(second.nodes.len(), 1);
    assert_eq!(second.nodes[0].id.as_str(), "b");
    assert!(second.next_page.is_none());
}

#[tokio::test]
async fn test_folders_only_filters_by_mime_type() {
    let server = MockServer::start().await;
    let client = treeline_drive::DriveClient::with_base_url("token", server.uri());

    // Only a query carrying the folder MIME filter gets an answer
    Mock::given(method("GET"))
        .and(path("/files"))
        .and(query_param(
            "q",
            "'F1' in parents and trashed = false and mimeType = 'application/vnd.google-apps.folder'",
        ))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "files": [{
                "id": "sub-1",
                "name": "Reports",
                "mimeType": "application/vnd.google-apps.folder"
            }]
        })))
        .mount(&server)
        .await;

    let page = files::list_children(&client, &node_id("F1"), None, true)
        .await
        .expect("Folders-only listing failed");
    assert_eq!(page.nodes.len(), 1);
    assert_eq!(page.nodes[0].kind, NodeKind::Folder);
}

#[tokio::test]
async fn test_get_node_found() {
    let (server, client) = common::setup().await;
    common::mount_file(
        &server,
        "F1",
        serde_json::json!({
            "id": "F1",
            "name": "Docs v2",
            "mimeType": "application/vnd.google-apps.folder"
        }),
    )
    .await;

    let node = files::get_node(&client, &node_id("F1"))
        .await
        .expect("Lookup failed")
        .expect("Expected the node to exist");
    assert_eq!(node.name, "Docs v2");
}

#[tokio::test]
async fn test_get_node_not_found_is_none() {
    let (server, client) = common::setup().await;
    common::mount_file_not_found(&server, "gone").await;

    let node = files::get_node(&client, &node_id("gone"))
        .await
        .expect("Lookup failed");
    assert!(node.is_none());
}

#[tokio::test]
async fn test_rate_limit_maps_with_retry_after() {
    let (server, client) = common::setup().await;
    common::mount_rate_limited(&server, "42").await;

    let err = files::list_children(&client, &node_id("F1"), None, false)
        .await
        .unwrap_err();
    match err {
        ProviderError::RateLimited { retry_after_secs } => {
            assert_eq!(retry_after_secs, Some(42));
        }
        other => panic!("Expected RateLimited, got {other:?}"),
    }
}

#[tokio::test]
async fn test_server_error_maps_to_unavailable() {
    let server = MockServer::start().await;
    let client = treeline_drive::DriveClient::with_base_url("token", server.uri());
    Mock::given(method("GET"))
        .and(path("/files"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let err = files::list_children(&client, &node_id("F1"), None, false)
        .await
        .unwrap_err();
    assert!(matches!(err, ProviderError::Unavailable(_)));
}

#[tokio::test]
async fn test_list_drives() {
    let server = MockServer::start().await;
    let client = treeline_drive::DriveClient::with_base_url("token", server.uri());
    Mock::given(method("GET"))
        .and(path("/drives"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "drives": [
                { "id": "D1", "name": "Engineering" },
                { "id": "D2", "name": "Sales" }
            ]
        })))
        .mount(&server)
        .await;

    let page = files::list_drives(&client, None).await.expect("Drive listing failed");
    assert_eq!(page.nodes.len(), 2);
    assert!(page.nodes.iter().all(|n| n.kind == NodeKind::Folder));
    assert!(page.nodes.iter().all(|n| n.parent_id.is_none()));
}
