//! Integration tests for SqliteMirrorStore
//!
//! Verifies all IMirrorStore methods using an in-memory SQLite
//! database. Each test function creates a fresh database to ensure
//! test isolation.

use chrono::{Duration, Utc};

use treeline_core::domain::{
    channel::WebhookChannel,
    connector::{Connector, ConnectorState, ProviderKind},
    mirror::{FolderSyncState, MirroredFile, MirroredFolder},
    newtypes::{ChannelId, ConnectorId, NodeId},
    node::NodeKind,
    sync_config::SyncConfig,
};
use treeline_core::ports::IMirrorStore;
use treeline_store::{DatabasePool, SqliteMirrorStore};

// ============================================================================
// Test helpers
// ============================================================================

/// Create a fresh in-memory store for each test
async fn setup() -> SqliteMirrorStore {
    let pool = DatabasePool::in_memory()
        .await
        .expect("Failed to create in-memory database");
    SqliteMirrorStore::new(pool.pool().clone())
}

/// Create a test connector and save it to the store
async fn create_test_connector(store: &SqliteMirrorStore) -> Connector {
    let connector = Connector::new(ProviderKind::GoogleDrive);
    store.save_connector(&connector).await.unwrap();
    connector
}

fn node_id(s: &str) -> NodeId {
    NodeId::new(s.to_string()).unwrap()
}

fn test_file(connector_id: ConnectorId, id: &str, parent: &str, name: &str) -> MirroredFile {
    MirroredFile::new(
        connector_id,
        node_id(id),
        node_id(parent),
        name,
        NodeKind::File,
        Utc::now(),
    )
}

// ============================================================================
// Connector tests
// ============================================================================

#[tokio::test]
async fn test_save_and_get_connector() {
    let store = setup().await;
    let connector = create_test_connector(&store).await;

    let retrieved = store.get_connector(connector.id()).await.unwrap().unwrap();
    assert_eq!(retrieved.id(), connector.id());
    assert_eq!(retrieved.provider(), ProviderKind::GoogleDrive);
    assert_eq!(retrieved.state(), ConnectorState::Active);
    assert!(retrieved.last_synced_at().is_none());
}

#[tokio::test]
async fn test_get_connector_not_found() {
    let store = setup().await;
    let result = store.get_connector(&ConnectorId::new()).await.unwrap();
    assert!(result.is_none());
}

#[tokio::test]
async fn test_update_connector() {
    let store = setup().await;
    let mut connector = create_test_connector(&store).await;

    connector.pause().unwrap();
    let sync_time = Utc::now();
    connector.record_sync(sync_time);
    store.save_connector(&connector).await.unwrap();

    let retrieved = store.get_connector(connector.id()).await.unwrap().unwrap();
    assert_eq!(retrieved.state(), ConnectorState::Paused);
    let stored_time = retrieved.last_synced_at().unwrap();
    assert_eq!(stored_time.timestamp(), sync_time.timestamp());
}

#[tokio::test]
async fn test_delete_connector_removes_owned_rows() {
    let store = setup().await;
    let connector = create_test_connector(&store).await;
    let id = *connector.id();

    store
        .upsert_folder(&MirroredFolder::new(id, node_id("F1")))
        .await
        .unwrap();
    store.upsert_file(&test_file(id, "a", "F1", "a.txt")).await.unwrap();
    store
        .save_channel(&WebhookChannel::new(
            id,
            ChannelId::new("chan-1".to_string()).unwrap(),
            "res-1",
            Utc::now() + Duration::days(7),
        ))
        .await
        .unwrap();
    store.save_sync_config(&SyncConfig::new(id)).await.unwrap();

    store.delete_connector(&id).await.unwrap();

    assert!(store.get_connector(&id).await.unwrap().is_none());
    assert!(store.list_folders(&id).await.unwrap().is_empty());
    assert!(store.find_file(&id, &node_id("a")).await.unwrap().is_none());
    assert!(store
        .find_channel_for_connector(&id)
        .await
        .unwrap()
        .is_none());
    assert!(store.get_sync_config(&id).await.unwrap().is_none());
}

// ============================================================================
// MirroredFolder tests
// ============================================================================

#[tokio::test]
async fn test_upsert_folder_is_idempotent() {
    let store = setup().await;
    let connector = create_test_connector(&store).await;
    let folder = MirroredFolder::new(*connector.id(), node_id("F1"));

    let created = store.upsert_folder(&folder).await.unwrap();
    assert!(created);

    // A second upsert leaves the existing row untouched
    let created_again = store.upsert_folder(&folder).await.unwrap();
    assert!(!created_again);

    let folders = store.list_folders(connector.id()).await.unwrap();
    assert_eq!(folders.len(), 1);
    assert_eq!(folders[0].folder_id(), &node_id("F1"));
}

#[tokio::test]
async fn test_delete_folder_reports_missing() {
    let store = setup().await;
    let connector = create_test_connector(&store).await;

    let deleted = store
        .delete_folder(connector.id(), &node_id("F1"))
        .await
        .unwrap();
    assert!(!deleted);

    store
        .upsert_folder(&MirroredFolder::new(*connector.id(), node_id("F1")))
        .await
        .unwrap();
    let deleted = store
        .delete_folder(connector.id(), &node_id("F1"))
        .await
        .unwrap();
    assert!(deleted);
}

#[tokio::test]
async fn test_folder_exists_and_sync_state() {
    let store = setup().await;
    let connector = create_test_connector(&store).await;
    let id = connector.id();

    assert!(!store.folder_exists(id, &node_id("F1")).await.unwrap());

    store
        .upsert_folder(&MirroredFolder::new(*id, node_id("F1")))
        .await
        .unwrap();
    assert!(store.folder_exists(id, &node_id("F1")).await.unwrap());

    store
        .set_folder_sync_state(id, &node_id("F1"), FolderSyncState::Synced)
        .await
        .unwrap();
    let folders = store.list_folders(id).await.unwrap();
    assert_eq!(folders[0].sync_state(), FolderSyncState::Synced);
}

#[tokio::test]
async fn test_folders_partitioned_by_connector() {
    let store = setup().await;
    let first = create_test_connector(&store).await;
    let second = create_test_connector(&store).await;

    store
        .upsert_folder(&MirroredFolder::new(*first.id(), node_id("F1")))
        .await
        .unwrap();

    assert!(store.list_folders(second.id()).await.unwrap().is_empty());
    assert!(!store
        .folder_exists(second.id(), &node_id("F1"))
        .await
        .unwrap());
}

// ============================================================================
// MirroredFile tests
// ============================================================================

#[tokio::test]
async fn test_batch_upsert_visible_after_commit() {
    let store = setup().await;
    let connector = create_test_connector(&store).await;
    let id = *connector.id();

    let batch = vec![
        test_file(id, "a", "F1", "a.txt"),
        test_file(id, "b", "F1", "b.txt"),
        test_file(id, "c", "F1", "c.txt"),
    ];
    store.upsert_files(&batch).await.unwrap();

    let children = store.find_children(&id, &node_id("F1")).await.unwrap();
    assert_eq!(children.len(), 3);
}

#[tokio::test]
async fn test_upsert_file_updates_name_and_stamp() {
    let store = setup().await;
    let connector = create_test_connector(&store).await;
    let id = *connector.id();

    store.upsert_file(&test_file(id, "a", "F1", "old.txt")).await.unwrap();

    let later = Utc::now() + Duration::minutes(5);
    let renamed = MirroredFile::new(
        id,
        node_id("a"),
        node_id("F1"),
        "new.txt",
        NodeKind::File,
        later,
    );
    store.upsert_file(&renamed).await.unwrap();

    let stored = store.find_file(&id, &node_id("a")).await.unwrap().unwrap();
    assert_eq!(stored.name(), "new.txt");
    assert_eq!(stored.last_upserted_at().timestamp(), later.timestamp());

    // Still one row for the node
    let children = store.find_children(&id, &node_id("F1")).await.unwrap();
    assert_eq!(children.len(), 1);
}

#[tokio::test]
async fn test_find_files_by_ids_skips_unknown() {
    let store = setup().await;
    let connector = create_test_connector(&store).await;
    let id = *connector.id();

    store.upsert_file(&test_file(id, "a", "F1", "a.txt")).await.unwrap();

    let found = store
        .find_files_by_ids(&id, &[node_id("a"), node_id("missing")])
        .await
        .unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found.get(&node_id("a")).unwrap().name(), "a.txt");
}

#[tokio::test]
async fn test_has_children() {
    let store = setup().await;
    let connector = create_test_connector(&store).await;
    let id = *connector.id();

    assert!(!store.has_children(&id, &node_id("F1")).await.unwrap());
    store.upsert_file(&test_file(id, "a", "F1", "a.txt")).await.unwrap();
    assert!(store.has_children(&id, &node_id("F1")).await.unwrap());
}

#[tokio::test]
async fn test_garbage_collection_cutoff() {
    let store = setup().await;
    let connector = create_test_connector(&store).await;
    let id = *connector.id();

    let pass = Utc::now();
    let stale = MirroredFile::new(
        id,
        node_id("stale"),
        node_id("F1"),
        "stale.txt",
        NodeKind::File,
        pass - Duration::hours(3),
    );
    let fresh = MirroredFile::new(
        id,
        node_id("fresh"),
        node_id("F1"),
        "fresh.txt",
        NodeKind::File,
        pass + Duration::seconds(1),
    );
    store.upsert_files(&[stale, fresh]).await.unwrap();

    let removed = store.delete_files_not_upserted_since(&id, pass).await.unwrap();
    assert_eq!(removed, 1);
    assert!(store.find_file(&id, &node_id("stale")).await.unwrap().is_none());
    assert!(store.find_file(&id, &node_id("fresh")).await.unwrap().is_some());
}

// ============================================================================
// WebhookChannel tests
// ============================================================================

#[tokio::test]
async fn test_save_and_find_channel() {
    let store = setup().await;
    let connector = create_test_connector(&store).await;
    let channel = WebhookChannel::new(
        *connector.id(),
        ChannelId::new("chan-1".to_string()).unwrap(),
        "res-1",
        Utc::now() + Duration::days(7),
    );

    store.save_channel(&channel).await.unwrap();

    let by_id = store
        .find_channel(&ChannelId::new("chan-1".to_string()).unwrap())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(by_id.connector_id(), connector.id());
    assert_eq!(by_id.resource_id(), "res-1");

    let by_connector = store
        .find_channel_for_connector(connector.id())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(by_connector.channel_id().as_str(), "chan-1");
}

#[tokio::test]
async fn test_save_channel_replaces_previous() {
    let store = setup().await;
    let connector = create_test_connector(&store).await;
    let id = *connector.id();

    let first = WebhookChannel::new(
        id,
        ChannelId::new("chan-1".to_string()).unwrap(),
        "res-1",
        Utc::now() + Duration::days(7),
    );
    let second = WebhookChannel::new(
        id,
        ChannelId::new("chan-2".to_string()).unwrap(),
        "res-2",
        Utc::now() + Duration::days(7),
    );

    store.save_channel(&first).await.unwrap();
    store.save_channel(&second).await.unwrap();

    // The old channel id no longer resolves; only one row per connector
    assert!(store
        .find_channel(&ChannelId::new("chan-1".to_string()).unwrap())
        .await
        .unwrap()
        .is_none());
    let tracked = store
        .find_channel_for_connector(&id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(tracked.channel_id().as_str(), "chan-2");
}

#[tokio::test]
async fn test_delete_channel() {
    let store = setup().await;
    let connector = create_test_connector(&store).await;
    let channel = WebhookChannel::new(
        *connector.id(),
        ChannelId::new("chan-1".to_string()).unwrap(),
        "res-1",
        Utc::now() + Duration::days(7),
    );
    store.save_channel(&channel).await.unwrap();

    store.delete_channel(connector.id()).await.unwrap();
    assert!(store
        .find_channel_for_connector(connector.id())
        .await
        .unwrap()
        .is_none());
}

// ============================================================================
// SyncConfig tests
// ============================================================================

#[tokio::test]
async fn test_sync_config_roundtrip() {
    let store = setup().await;
    let connector = create_test_connector(&store).await;

    assert!(store
        .get_sync_config(connector.id())
        .await
        .unwrap()
        .is_none());

    let mut config = SyncConfig::new(*connector.id());
    config.set_csv_enabled(true);
    store.save_sync_config(&config).await.unwrap();

    let stored = store
        .get_sync_config(connector.id())
        .await
        .unwrap()
        .unwrap();
    assert!(stored.csv_enabled());
    assert!(!stored.pdf_enabled());

    config.set_pdf_enabled(true);
    store.save_sync_config(&config).await.unwrap();
    let stored = store
        .get_sync_config(connector.id())
        .await
        .unwrap()
        .unwrap();
    assert!(stored.pdf_enabled());
}
