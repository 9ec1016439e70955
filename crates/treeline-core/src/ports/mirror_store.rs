//! Local mirror store port (driven/secondary port)
//!
//! Interface for persisting and querying the mirrored permission
//! forest. The store is shared across connectors but partitioned by
//! connector id; no operation ever spans two connectors.
//!
//! ## Design Notes
//!
//! - Uses `anyhow::Result` because storage errors are adapter-specific
//!   (SQLite, in-memory) and don't need domain-level classification.
//! - Writes take references to domain entities, letting the caller
//!   retain ownership.
//! - `upsert_files` applies the whole batch in one transaction so a
//!   reconciliation pass never exposes a partial subtree to readers.

use chrono::{DateTime, Utc};
use std::collections::HashMap;

use crate::domain::{
    channel::WebhookChannel,
    connector::Connector,
    mirror::{FolderSyncState, MirroredFile, MirroredFolder},
    newtypes::{ChannelId, ConnectorId, NodeId},
    sync_config::SyncConfig,
};

/// Port trait for mirror persistence
#[async_trait::async_trait]
pub trait IMirrorStore: Send + Sync {
    // --- Connector operations ---

    /// Retrieves a connector by id
    async fn get_connector(&self, id: &ConnectorId) -> anyhow::Result<Option<Connector>>;

    /// Lists every configured connector
    async fn list_connectors(&self) -> anyhow::Result<Vec<Connector>>;

    /// Saves a connector (insert or update)
    async fn save_connector(&self, connector: &Connector) -> anyhow::Result<()>;

    /// Deletes a connector and every row it owns (folders, files,
    /// channel, sync config)
    async fn delete_connector(&self, id: &ConnectorId) -> anyhow::Result<()>;

    // --- MirroredFolder operations ---

    /// Idempotently creates a selected folder root
    ///
    /// A second upsert for the same (connector, folder) leaves the
    /// existing row untouched and returns false.
    async fn upsert_folder(&self, folder: &MirroredFolder) -> anyhow::Result<bool>;

    /// Deletes a folder root; returns true if a row existed
    async fn delete_folder(
        &self,
        connector_id: &ConnectorId,
        folder_id: &NodeId,
    ) -> anyhow::Result<bool>;

    /// Lists every selected folder root for a connector
    async fn list_folders(&self, connector_id: &ConnectorId)
        -> anyhow::Result<Vec<MirroredFolder>>;

    /// Returns true if a folder root exists for (connector, folder)
    async fn folder_exists(
        &self,
        connector_id: &ConnectorId,
        folder_id: &NodeId,
    ) -> anyhow::Result<bool>;

    /// Updates the sync state of a folder root (no-op if the row is gone)
    async fn set_folder_sync_state(
        &self,
        connector_id: &ConnectorId,
        folder_id: &NodeId,
        state: FolderSyncState,
    ) -> anyhow::Result<()>;

    // --- MirroredFile operations ---

    /// Upserts a single mirrored node
    async fn upsert_file(&self, file: &MirroredFile) -> anyhow::Result<()>;

    /// Upserts a batch of mirrored nodes in one transaction
    async fn upsert_files(&self, files: &[MirroredFile]) -> anyhow::Result<()>;

    /// Finds one mirrored node by id
    async fn find_file(
        &self,
        connector_id: &ConnectorId,
        file_id: &NodeId,
    ) -> anyhow::Result<Option<MirroredFile>>;

    /// Finds mirrored nodes by id, returning only the ones that exist
    async fn find_files_by_ids(
        &self,
        connector_id: &ConnectorId,
        ids: &[NodeId],
    ) -> anyhow::Result<HashMap<NodeId, MirroredFile>>;

    /// Lists the mirrored children of a node
    async fn find_children(
        &self,
        connector_id: &ConnectorId,
        parent_id: &NodeId,
    ) -> anyhow::Result<Vec<MirroredFile>>;

    /// Returns true if a node has at least one mirrored child
    async fn has_children(
        &self,
        connector_id: &ConnectorId,
        parent_id: &NodeId,
    ) -> anyhow::Result<bool>;

    /// Deletes mirrored nodes last touched before `cutoff`; returns the
    /// number of rows removed (garbage collection)
    async fn delete_files_not_upserted_since(
        &self,
        connector_id: &ConnectorId,
        cutoff: DateTime<Utc>,
    ) -> anyhow::Result<u64>;

    // --- WebhookChannel operations ---

    /// Saves the connector's channel, replacing any previous one
    ///
    /// The store enforces at most one tracked channel per connector.
    async fn save_channel(&self, channel: &WebhookChannel) -> anyhow::Result<()>;

    /// Finds a channel by its provider-assigned id
    async fn find_channel(&self, channel_id: &ChannelId)
        -> anyhow::Result<Option<WebhookChannel>>;

    /// Finds the channel tracked for a connector
    async fn find_channel_for_connector(
        &self,
        connector_id: &ConnectorId,
    ) -> anyhow::Result<Option<WebhookChannel>>;

    /// Deletes the channel tracked for a connector
    async fn delete_channel(&self, connector_id: &ConnectorId) -> anyhow::Result<()>;

    // --- SyncConfig operations ---

    /// Retrieves the connector's sync config
    async fn get_sync_config(
        &self,
        connector_id: &ConnectorId,
    ) -> anyhow::Result<Option<SyncConfig>>;

    /// Saves the connector's sync config (insert or update)
    async fn save_sync_config(&self, config: &SyncConfig) -> anyhow::Result<()>;
}
