//! Drive file and drive listing endpoints
//!
//! Maps the raw Drive v3 JSON into the normalized [`RemoteNode`]
//! descriptors the core consumes. Listing returns one page per call;
//! merge loops belong to the use cases.

use chrono::{DateTime, Utc};
use reqwest::{Method, StatusCode};
use serde::Deserialize;
use tracing::debug;

use treeline_core::domain::newtypes::{NodeId, PageCursor};
use treeline_core::domain::node::{NodeKind, RemoteNode};
use treeline_core::ports::{NodePage, ProviderError};

use crate::client::DriveClient;

/// MIME type Drive uses for folder nodes
pub const FOLDER_MIME_TYPE: &str = "application/vnd.google-apps.folder";

/// Fields requested for every file resource
const FILE_FIELDS: &str = "id,name,mimeType,parents,modifiedTime,webViewLink";

/// Page size for listing requests
const PAGE_SIZE: &str = "100";

// ============================================================================
// Drive API response types (JSON deserialization)
// ============================================================================

/// Raw response from `GET /files`
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FileListResponse {
    /// Matching file resources
    #[serde(default)]
    files: Vec<DriveFile>,
    /// Token for the next page (absent on the last page)
    next_page_token: Option<String>,
}

/// A file resource from the Drive API
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DriveFile {
    /// Unique identifier of the file within the drive
    id: String,
    /// Display name
    #[serde(default)]
    name: String,
    /// MIME type; folders carry [`FOLDER_MIME_TYPE`]
    mime_type: Option<String>,
    /// Parent ids (Drive v3 reports at most one)
    parents: Option<Vec<String>>,
    /// Last modification time in RFC 3339
    modified_time: Option<DateTime<Utc>>,
    /// Browser view URL
    web_view_link: Option<String>,
}

/// Raw response from `GET /drives`
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DriveListResponse {
    /// Shared drive resources
    #[serde(default)]
    drives: Vec<SharedDrive>,
    /// Token for the next page (absent on the last page)
    next_page_token: Option<String>,
}

/// A shared drive resource
#[derive(Debug, Deserialize)]
struct SharedDrive {
    /// Unique identifier of the drive
    id: String,
    /// Display name
    #[serde(default)]
    name: String,
}

// ============================================================================
// Parsing into normalized descriptors
// ============================================================================

fn parse_file(file: DriveFile) -> Result<RemoteNode, ProviderError> {
    let kind = match file.mime_type.as_deref() {
        Some(FOLDER_MIME_TYPE) => NodeKind::Folder,
        _ => NodeKind::File,
    };

    let id = NodeId::new(file.id)
        .map_err(|e| ProviderError::Unavailable(format!("Malformed file id: {e}")))?;

    let parent_id = match file.parents.as_ref().and_then(|p| p.first()) {
        Some(parent) => Some(
            NodeId::new(parent.clone())
                .map_err(|e| ProviderError::Unavailable(format!("Malformed parent id: {e}")))?,
        ),
        None => None,
    };

    Ok(RemoteNode {
        id,
        parent_id,
        name: file.name,
        kind,
        modified_at: file.modified_time,
        web_url: file.web_view_link,
    })
}

fn parse_drive(drive: SharedDrive) -> Result<RemoteNode, ProviderError> {
    let id = NodeId::new(drive.id)
        .map_err(|e| ProviderError::Unavailable(format!("Malformed drive id: {e}")))?;

    Ok(RemoteNode {
        id,
        parent_id: None,
        name: drive.name,
        kind: NodeKind::Folder,
        modified_at: None,
        web_url: None,
    })
}

fn parse_cursor(token: Option<String>) -> Result<Option<PageCursor>, ProviderError> {
    match token {
        Some(token) => PageCursor::new(token)
            .map(Some)
            .map_err(|e| ProviderError::Unavailable(format!("Malformed page token: {e}"))),
        None => Ok(None),
    }
}

// ============================================================================
// Endpoints
// ============================================================================

/// Lists one page of children of `parent`
///
/// Uses a `'<parent>' in parents` query, excluding trashed items, with
/// an optional folders-only MIME filter.
pub async fn list_children(
    client: &DriveClient,
    parent: &NodeId,
    page: Option<&PageCursor>,
    folders_only: bool,
) -> Result<NodePage, ProviderError> {
    let mut query = format!("'{}' in parents and trashed = false", parent.as_str());
    if folders_only {
        query.push_str(&format!(" and mimeType = '{FOLDER_MIME_TYPE}'"));
    }

    let fields = format!("nextPageToken,files({FILE_FIELDS})");
    let mut request = client.request(Method::GET, "/files").query(&[
        ("q", query.as_str()),
        ("fields", fields.as_str()),
        ("pageSize", PAGE_SIZE),
        ("includeItemsFromAllDrives", "true"),
        ("supportsAllDrives", "true"),
    ]);
    if let Some(page) = page {
        request = request.query(&[("pageToken", page.as_str())]);
    }

    let response: FileListResponse = client
        .send(request)
        .await?
        .json()
        .await
        .map_err(|e| ProviderError::Unavailable(format!("Failed to parse file list: {e}")))?;

    debug!(
        parent = %parent,
        count = response.files.len(),
        has_next = response.next_page_token.is_some(),
        "Listed children page"
    );

    let nodes = response
        .files
        .into_iter()
        .map(parse_file)
        .collect::<Result<Vec<_>, _>>()?;

    Ok(NodePage {
        nodes,
        next_page: parse_cursor(response.next_page_token)?,
    })
}

/// Lists one page of shared drives
pub async fn list_drives(
    client: &DriveClient,
    page: Option<&PageCursor>,
) -> Result<NodePage, ProviderError> {
    let mut request = client.request(Method::GET, "/drives").query(&[
        ("fields", "nextPageToken,drives(id,name)"),
        ("pageSize", PAGE_SIZE),
    ]);
    if let Some(page) = page {
        request = request.query(&[("pageToken", page.as_str())]);
    }

    let response: DriveListResponse = client
        .send(request)
        .await?
        .json()
        .await
        .map_err(|e| ProviderError::Unavailable(format!("Failed to parse drive list: {e}")))?;

    let nodes = response
        .drives
        .into_iter()
        .map(parse_drive)
        .collect::<Result<Vec<_>, _>>()?;

    Ok(NodePage {
        nodes,
        next_page: parse_cursor(response.next_page_token)?,
    })
}

/// Fetches a single node by id
///
/// Returns `Ok(None)` on 404: the node was deleted or access was
/// revoked, which callers treat as "gone", not as a failure.
pub async fn get_node(
    client: &DriveClient,
    id: &NodeId,
) -> Result<Option<RemoteNode>, ProviderError> {
    let path = format!("/files/{}", id.as_str());
    let request = client.request(Method::GET, &path).query(&[
        ("fields", FILE_FIELDS),
        ("supportsAllDrives", "true"),
    ]);

    let response = client.send(request).await?;
    if response.status() == StatusCode::NOT_FOUND {
        debug!(id = %id, "Node not found remotely");
        return Ok(None);
    }

    let file: DriveFile = response
        .json()
        .await
        .map_err(|e| ProviderError::Unavailable(format!("Failed to parse file resource: {e}")))?;

    parse_file(file).map(Some)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_folder_file() {
        let json = r#"{
            "id": "F1",
            "name": "Docs",
            "mimeType": "application/vnd.google-apps.folder",
            "parents": ["root-1"],
            "modifiedTime": "2026-03-01T10:00:00Z",
            "webViewLink": "https://drive.google.com/drive/folders/F1"
        }"#;
        let file: DriveFile = serde_json::from_str(json).unwrap();
        let node = parse_file(file).unwrap();

        assert_eq!(node.id.as_str(), "F1");
        assert_eq!(node.kind, NodeKind::Folder);
        assert_eq!(node.parent_id.as_ref().unwrap().as_str(), "root-1");
        assert!(node.modified_at.is_some());
    }

    #[test]
    fn test_parse_plain_file() {
        let json = r#"{"id": "X9", "name": "report.pdf", "mimeType": "application/pdf"}"#;
        let file: DriveFile = serde_json::from_str(json).unwrap();
        let node = parse_file(file).unwrap();

        assert_eq!(node.kind, NodeKind::File);
        assert!(node.parent_id.is_none());
        assert!(node.web_url.is_none());
    }

    #[test]
    fn test_parse_malformed_id_rejected() {
        let json = r#"{"id": "bad id with spaces", "name": "x"}"#;
        let file: DriveFile = serde_json::from_str(json).unwrap();
        assert!(parse_file(file).is_err());
    }

    #[test]
    fn test_parse_drive_is_folder() {
        let drive = SharedDrive {
            id: "D1".to_string(),
            name: "Shared".to_string(),
        };
        let node = parse_drive(drive).unwrap();
        assert_eq!(node.kind, NodeKind::Folder);
        assert!(node.parent_id.is_none());
    }

    #[test]
    fn test_file_list_deserialization() {
        let json = r#"{
            "files": [{"id": "a", "name": "one"}, {"id": "b", "name": "two"}],
            "nextPageToken": "tok-2"
        }"#;
        let list: FileListResponse = serde_json::from_str(json).unwrap();
        assert_eq!(list.files.len(), 2);
        assert_eq!(list.next_page_token.as_deref(), Some("tok-2"));
    }

    #[test]
    fn test_file_list_empty_response() {
        let list: FileListResponse = serde_json::from_str("{}").unwrap();
        assert!(list.files.is_empty());
        assert!(list.next_page_token.is_none());
    }
}
