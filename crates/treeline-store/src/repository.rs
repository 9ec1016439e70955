//! SQLite implementation of IMirrorStore
//!
//! Concrete SQLite-based implementation of the mirror store port
//! defined in treeline-core. Handles domain type serialization and SQL
//! query construction.
//!
//! ## Type Mapping
//!
//! | Domain Type       | SQL Type | Strategy                                  |
//! |-------------------|----------|-------------------------------------------|
//! | ConnectorId       | TEXT     | UUID string via `.to_string()` / `FromStr` |
//! | NodeId, ChannelId | TEXT     | String via `.as_str()` / `new()`           |
//! | DocumentId        | TEXT     | String via `.as_str()` / `parse()`         |
//! | DateTime<Utc>     | TEXT     | ISO 8601 via `to_rfc3339()`                |
//! | enums (states)    | TEXT     | snake_case strings                         |
//! | bool toggles      | INTEGER  | 0/1                                        |

use std::collections::HashMap;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};

use treeline_core::domain::{
    channel::WebhookChannel,
    connector::{Connector, ConnectorState, ProviderKind},
    mirror::{FolderSyncState, MirroredFile, MirroredFolder},
    newtypes::{ChannelId, ConnectorId, DocumentId, NodeId},
    node::NodeKind,
    sync_config::SyncConfig,
};
use treeline_core::ports::IMirrorStore;

use crate::StoreError;

/// SQLite-based implementation of the mirror store port
///
/// All operations go through a connection pool; batch upserts run in a
/// single transaction so readers never observe a partial subtree.
pub struct SqliteMirrorStore {
    pool: SqlitePool,
}

impl SqliteMirrorStore {
    /// Creates a new store instance with the given connection pool
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

// ============================================================================
// Helper functions for type conversion
// ============================================================================

/// Serialize a ConnectorState to a string for storage
fn connector_state_to_string(state: ConnectorState) -> &'static str {
    match state {
        ConnectorState::Active => "active",
        ConnectorState::Paused => "paused",
    }
}

/// Deserialize a ConnectorState from its stored string representation
fn connector_state_from_string(s: &str) -> Result<ConnectorState, StoreError> {
    match s {
        "active" => Ok(ConnectorState::Active),
        "paused" => Ok(ConnectorState::Paused),
        other => Err(StoreError::SerializationError(format!(
            "Unknown connector state: {other}"
        ))),
    }
}

/// Serialize a FolderSyncState to a string for storage
fn folder_state_to_string(state: FolderSyncState) -> &'static str {
    match state {
        FolderSyncState::Selected => "selected",
        FolderSyncState::SyncPending => "sync_pending",
        FolderSyncState::Synced => "synced",
    }
}

/// Deserialize a FolderSyncState from its stored string representation
fn folder_state_from_string(s: &str) -> Result<FolderSyncState, StoreError> {
    match s {
        "selected" => Ok(FolderSyncState::Selected),
        "sync_pending" => Ok(FolderSyncState::SyncPending),
        "synced" => Ok(FolderSyncState::Synced),
        other => Err(StoreError::SerializationError(format!(
            "Unknown folder sync state: {other}"
        ))),
    }
}

/// Serialize a NodeKind to a string for storage
fn node_kind_to_string(kind: NodeKind) -> &'static str {
    match kind {
        NodeKind::Folder => "folder",
        NodeKind::File => "file",
    }
}

/// Deserialize a NodeKind from its stored string representation
fn node_kind_from_string(s: &str) -> Result<NodeKind, StoreError> {
    match s {
        "folder" => Ok(NodeKind::Folder),
        "file" => Ok(NodeKind::File),
        other => Err(StoreError::SerializationError(format!(
            "Unknown node kind: {other}"
        ))),
    }
}

/// Parse a DateTime<Utc> from an ISO 8601 string
fn parse_datetime(s: &str) -> Result<DateTime<Utc>, StoreError> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| {
            StoreError::SerializationError(format!("Failed to parse datetime '{s}': {e}"))
        })
}

/// Parse an optional DateTime<Utc> from an optional string
fn parse_optional_datetime(s: Option<String>) -> Result<Option<DateTime<Utc>>, StoreError> {
    match s {
        Some(ref val) if !val.is_empty() => parse_datetime(val).map(Some),
        _ => Ok(None),
    }
}

fn parse_connector_id(s: &str) -> Result<ConnectorId, StoreError> {
    ConnectorId::from_str(s)
        .map_err(|e| StoreError::SerializationError(format!("Invalid connector id: {e}")))
}

fn parse_node_id(s: String) -> Result<NodeId, StoreError> {
    NodeId::new(s).map_err(|e| StoreError::SerializationError(format!("Invalid node id: {e}")))
}

// ============================================================================
// Row mapping functions
// ============================================================================

fn connector_from_row(row: &SqliteRow) -> Result<Connector, StoreError> {
    let id: String = row.get("id");
    let provider: String = row.get("provider");
    let state: String = row.get("state");
    let last_synced_at: Option<String> = row.get("last_synced_at");
    let created_at: String = row.get("created_at");

    Ok(Connector::from_parts(
        parse_connector_id(&id)?,
        ProviderKind::from_name(&provider)
            .map_err(|e| StoreError::SerializationError(e.to_string()))?,
        connector_state_from_string(&state)?,
        parse_optional_datetime(last_synced_at)?,
        parse_datetime(&created_at)?,
    ))
}

fn folder_from_row(row: &SqliteRow) -> Result<MirroredFolder, StoreError> {
    let connector_id: String = row.get("connector_id");
    let folder_id: String = row.get("folder_id");
    let explicitly_selected: i64 = row.get("explicitly_selected");
    let sync_state: String = row.get("sync_state");
    let created_at: String = row.get("created_at");

    Ok(MirroredFolder::from_parts(
        parse_connector_id(&connector_id)?,
        parse_node_id(folder_id)?,
        explicitly_selected != 0,
        folder_state_from_string(&sync_state)?,
        parse_datetime(&created_at)?,
    ))
}

fn file_from_row(row: &SqliteRow) -> Result<MirroredFile, StoreError> {
    let connector_id: String = row.get("connector_id");
    let file_id: String = row.get("file_id");
    let parent_id: String = row.get("parent_id");
    let name: String = row.get("name");
    let kind: String = row.get("kind");
    let document_id: String = row.get("document_id");
    let last_upserted_at: String = row.get("last_upserted_at");

    Ok(MirroredFile::from_parts(
        parse_connector_id(&connector_id)?,
        parse_node_id(file_id)?,
        parse_node_id(parent_id)?,
        name,
        node_kind_from_string(&kind)?,
        DocumentId::parse(document_id)
            .map_err(|e| StoreError::SerializationError(e.to_string()))?,
        parse_datetime(&last_upserted_at)?,
    ))
}

fn channel_from_row(row: &SqliteRow) -> Result<WebhookChannel, StoreError> {
    let connector_id: String = row.get("connector_id");
    let channel_id: String = row.get("channel_id");
    let resource_id: String = row.get("resource_id");
    let expires_at: String = row.get("expires_at");
    let renewed_at: String = row.get("renewed_at");

    Ok(WebhookChannel::from_parts(
        parse_connector_id(&connector_id)?,
        ChannelId::new(channel_id)
            .map_err(|e| StoreError::SerializationError(e.to_string()))?,
        resource_id,
        parse_datetime(&expires_at)?,
        parse_datetime(&renewed_at)?,
    ))
}

fn sync_config_from_row(row: &SqliteRow) -> Result<SyncConfig, StoreError> {
    let connector_id: String = row.get("connector_id");
    let csv_enabled: i64 = row.get("csv_enabled");
    let pdf_enabled: i64 = row.get("pdf_enabled");

    Ok(SyncConfig::from_parts(
        parse_connector_id(&connector_id)?,
        csv_enabled != 0,
        pdf_enabled != 0,
    ))
}

// ============================================================================
// IMirrorStore implementation
// ============================================================================

#[async_trait::async_trait]
impl IMirrorStore for SqliteMirrorStore {
    // --- Connector operations ---

    async fn get_connector(&self, id: &ConnectorId) -> anyhow::Result<Option<Connector>> {
        let row = sqlx::query("SELECT * FROM connectors WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(StoreError::from)?;

        row.map(|r| connector_from_row(&r)).transpose().map_err(Into::into)
    }

    async fn list_connectors(&self) -> anyhow::Result<Vec<Connector>> {
        let rows = sqlx::query("SELECT * FROM connectors ORDER BY created_at")
            .fetch_all(&self.pool)
            .await
            .map_err(StoreError::from)?;

        rows.iter()
            .map(|r| connector_from_row(r).map_err(Into::into))
            .collect()
    }

    async fn save_connector(&self, connector: &Connector) -> anyhow::Result<()> {
        sqlx::query(
            "INSERT INTO connectors (id, provider, state, last_synced_at, created_at)
             VALUES (?, ?, ?, ?, ?)
             ON CONFLICT(id) DO UPDATE SET
                provider = excluded.provider,
                state = excluded.state,
                last_synced_at = excluded.last_synced_at",
        )
        .bind(connector.id().to_string())
        .bind(connector.provider().name())
        .bind(connector_state_to_string(connector.state()))
        .bind(connector.last_synced_at().map(|t| t.to_rfc3339()))
        .bind(connector.created_at().to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(StoreError::from)?;

        Ok(())
    }

    async fn delete_connector(&self, id: &ConnectorId) -> anyhow::Result<()> {
        let mut tx = self.pool.begin().await.map_err(StoreError::from)?;
        let id_str = id.to_string();

        // Explicit deletes keep teardown correct even when foreign-key
        // enforcement is off for a connection.
        for table in [
            "mirrored_files",
            "mirrored_folders",
            "webhook_channels",
            "sync_configs",
        ] {
            sqlx::query(&format!("DELETE FROM {table} WHERE connector_id = ?"))
                .bind(&id_str)
                .execute(&mut *tx)
                .await
                .map_err(StoreError::from)?;
        }

        sqlx::query("DELETE FROM connectors WHERE id = ?")
            .bind(&id_str)
            .execute(&mut *tx)
            .await
            .map_err(StoreError::from)?;

        tx.commit().await.map_err(StoreError::from)?;
        Ok(())
    }

    // --- MirroredFolder operations ---

    async fn upsert_folder(&self, folder: &MirroredFolder) -> anyhow::Result<bool> {
        let result = sqlx::query(
            "INSERT INTO mirrored_folders
                (connector_id, folder_id, explicitly_selected, sync_state, created_at)
             VALUES (?, ?, ?, ?, ?)
             ON CONFLICT(connector_id, folder_id) DO NOTHING",
        )
        .bind(folder.connector_id().to_string())
        .bind(folder.folder_id().as_str())
        .bind(folder.explicitly_selected() as i64)
        .bind(folder_state_to_string(folder.sync_state()))
        .bind(folder.created_at().to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(StoreError::from)?;

        Ok(result.rows_affected() > 0)
    }

    async fn delete_folder(
        &self,
        connector_id: &ConnectorId,
        folder_id: &NodeId,
    ) -> anyhow::Result<bool> {
        let result =
            sqlx::query("DELETE FROM mirrored_folders WHERE connector_id = ? AND folder_id = ?")
                .bind(connector_id.to_string())
                .bind(folder_id.as_str())
                .execute(&self.pool)
                .await
                .map_err(StoreError::from)?;

        Ok(result.rows_affected() > 0)
    }

    async fn list_folders(
        &self,
        connector_id: &ConnectorId,
    ) -> anyhow::Result<Vec<MirroredFolder>> {
        let rows = sqlx::query(
            "SELECT * FROM mirrored_folders WHERE connector_id = ? ORDER BY folder_id",
        )
        .bind(connector_id.to_string())
        .fetch_all(&self.pool)
        .await
        .map_err(StoreError::from)?;

        rows.iter()
            .map(|r| folder_from_row(r).map_err(Into::into))
            .collect()
    }

    async fn folder_exists(
        &self,
        connector_id: &ConnectorId,
        folder_id: &NodeId,
    ) -> anyhow::Result<bool> {
        let row = sqlx::query(
            "SELECT 1 FROM mirrored_folders WHERE connector_id = ? AND folder_id = ?",
        )
        .bind(connector_id.to_string())
        .bind(folder_id.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(StoreError::from)?;

        Ok(row.is_some())
    }

    async fn set_folder_sync_state(
        &self,
        connector_id: &ConnectorId,
        folder_id: &NodeId,
        state: FolderSyncState,
    ) -> anyhow::Result<()> {
        sqlx::query(
            "UPDATE mirrored_folders SET sync_state = ?
             WHERE connector_id = ? AND folder_id = ?",
        )
        .bind(folder_state_to_string(state))
        .bind(connector_id.to_string())
        .bind(folder_id.as_str())
        .execute(&self.pool)
        .await
        .map_err(StoreError::from)?;

        Ok(())
    }

    // --- MirroredFile operations ---

    async fn upsert_file(&self, file: &MirroredFile) -> anyhow::Result<()> {
        self.upsert_files(std::slice::from_ref(file)).await
    }

    async fn upsert_files(&self, files: &[MirroredFile]) -> anyhow::Result<()> {
        if files.is_empty() {
            return Ok(());
        }

        let mut tx = self.pool.begin().await.map_err(StoreError::from)?;

        for file in files {
            sqlx::query(
                "INSERT INTO mirrored_files
                    (connector_id, file_id, parent_id, name, kind, document_id, last_upserted_at)
                 VALUES (?, ?, ?, ?, ?, ?, ?)
                 ON CONFLICT(connector_id, file_id) DO UPDATE SET
                    parent_id = excluded.parent_id,
                    name = excluded.name,
                    kind = excluded.kind,
                    last_upserted_at = excluded.last_upserted_at",
            )
            .bind(file.connector_id().to_string())
            .bind(file.file_id().as_str())
            .bind(file.parent_id().as_str())
            .bind(file.name())
            .bind(node_kind_to_string(file.kind()))
            .bind(file.document_id().as_str())
            .bind(file.last_upserted_at().to_rfc3339())
            .execute(&mut *tx)
            .await
            .map_err(StoreError::from)?;
        }

        tx.commit().await.map_err(StoreError::from)?;
        Ok(())
    }

    async fn find_file(
        &self,
        connector_id: &ConnectorId,
        file_id: &NodeId,
    ) -> anyhow::Result<Option<MirroredFile>> {
        let row = sqlx::query(
            "SELECT * FROM mirrored_files WHERE connector_id = ? AND file_id = ?",
        )
        .bind(connector_id.to_string())
        .bind(file_id.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(StoreError::from)?;

        row.map(|r| file_from_row(&r)).transpose().map_err(Into::into)
    }

    async fn find_files_by_ids(
        &self,
        connector_id: &ConnectorId,
        ids: &[NodeId],
    ) -> anyhow::Result<HashMap<NodeId, MirroredFile>> {
        let mut found = HashMap::with_capacity(ids.len());
        for id in ids {
            if let Some(file) = self.find_file(connector_id, id).await? {
                found.insert(id.clone(), file);
            }
        }
        Ok(found)
    }

    async fn find_children(
        &self,
        connector_id: &ConnectorId,
        parent_id: &NodeId,
    ) -> anyhow::Result<Vec<MirroredFile>> {
        let rows = sqlx::query(
            "SELECT * FROM mirrored_files
             WHERE connector_id = ? AND parent_id = ?
             ORDER BY file_id",
        )
        .bind(connector_id.to_string())
        .bind(parent_id.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(StoreError::from)?;

        rows.iter()
            .map(|r| file_from_row(r).map_err(Into::into))
            .collect()
    }

    async fn has_children(
        &self,
        connector_id: &ConnectorId,
        parent_id: &NodeId,
    ) -> anyhow::Result<bool> {
        let row = sqlx::query(
            "SELECT 1 FROM mirrored_files WHERE connector_id = ? AND parent_id = ? LIMIT 1",
        )
        .bind(connector_id.to_string())
        .bind(parent_id.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(StoreError::from)?;

        Ok(row.is_some())
    }

    async fn delete_files_not_upserted_since(
        &self,
        connector_id: &ConnectorId,
        cutoff: DateTime<Utc>,
    ) -> anyhow::Result<u64> {
        let result = sqlx::query(
            "DELETE FROM mirrored_files WHERE connector_id = ? AND last_upserted_at < ?",
        )
        .bind(connector_id.to_string())
        .bind(cutoff.to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(StoreError::from)?;

        Ok(result.rows_affected())
    }

    // --- WebhookChannel operations ---

    async fn save_channel(&self, channel: &WebhookChannel) -> anyhow::Result<()> {
        sqlx::query(
            "INSERT INTO webhook_channels
                (connector_id, channel_id, resource_id, expires_at, renewed_at)
             VALUES (?, ?, ?, ?, ?)
             ON CONFLICT(connector_id) DO UPDATE SET
                channel_id = excluded.channel_id,
                resource_id = excluded.resource_id,
                expires_at = excluded.expires_at,
                renewed_at = excluded.renewed_at",
        )
        .bind(channel.connector_id().to_string())
        .bind(channel.channel_id().as_str())
        .bind(channel.resource_id())
        .bind(channel.expires_at().to_rfc3339())
        .bind(channel.renewed_at().to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(StoreError::from)?;

        Ok(())
    }

    async fn find_channel(
        &self,
        channel_id: &ChannelId,
    ) -> anyhow::Result<Option<WebhookChannel>> {
        let row = sqlx::query("SELECT * FROM webhook_channels WHERE channel_id = ?")
            .bind(channel_id.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(StoreError::from)?;

        row.map(|r| channel_from_row(&r)).transpose().map_err(Into::into)
    }

    async fn find_channel_for_connector(
        &self,
        connector_id: &ConnectorId,
    ) -> anyhow::Result<Option<WebhookChannel>> {
        let row = sqlx::query("SELECT * FROM webhook_channels WHERE connector_id = ?")
            .bind(connector_id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(StoreError::from)?;

        row.map(|r| channel_from_row(&r)).transpose().map_err(Into::into)
    }

    async fn delete_channel(&self, connector_id: &ConnectorId) -> anyhow::Result<()> {
        sqlx::query("DELETE FROM webhook_channels WHERE connector_id = ?")
            .bind(connector_id.to_string())
            .execute(&self.pool)
            .await
            .map_err(StoreError::from)?;

        Ok(())
    }

    // --- SyncConfig operations ---

    async fn get_sync_config(
        &self,
        connector_id: &ConnectorId,
    ) -> anyhow::Result<Option<SyncConfig>> {
        let row = sqlx::query("SELECT * FROM sync_configs WHERE connector_id = ?")
            .bind(connector_id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(StoreError::from)?;

        row.map(|r| sync_config_from_row(&r)).transpose().map_err(Into::into)
    }

    async fn save_sync_config(&self, config: &SyncConfig) -> anyhow::Result<()> {
        sqlx::query(
            "INSERT INTO sync_configs (connector_id, csv_enabled, pdf_enabled)
             VALUES (?, ?, ?)
             ON CONFLICT(connector_id) DO UPDATE SET
                csv_enabled = excluded.csv_enabled,
                pdf_enabled = excluded.pdf_enabled",
        )
        .bind(config.connector_id().to_string())
        .bind(config.csv_enabled() as i64)
        .bind(config.pdf_enabled() as i64)
        .execute(&self.pool)
        .await
        .map_err(StoreError::from)?;

        Ok(())
    }
}
