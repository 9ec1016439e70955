//! Mirrored folder and file entities
//!
//! The local mirror is a forest rooted at explicitly selected folders.
//! A `MirroredFolder` row is the sole source of truth for "this subtree
//! is in scope"; `MirroredFile` rows are the nodes discovered under
//! those roots during reconciliation passes (folders included, so
//! child listings and title lookups never need a remote call).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{
    errors::DomainError,
    newtypes::{ConnectorId, DocumentId, NodeId},
    node::NodeKind,
};

/// Sync progress of a selected folder subtree
///
/// `Unselected` is represented by the absence of the row; revoking
/// permission deletes the folder rather than transitioning it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FolderSyncState {
    /// Permission granted, no sync scheduled yet
    #[default]
    Selected,
    /// A resync covering this subtree has been handed to the orchestrator
    SyncPending,
    /// The subtree mirror agrees with remote state as of the last pass
    Synced,
}

impl FolderSyncState {
    /// Returns true if the transition to `target` is legal
    fn can_transition_to(self, target: FolderSyncState) -> bool {
        use FolderSyncState::*;
        matches!(
            (self, target),
            (Selected, SyncPending) | (SyncPending, Synced) | (Synced, SyncPending)
                // A second trigger while a pass is already pending is a no-op
                | (SyncPending, SyncPending)
        )
    }
}

impl std::fmt::Display for FolderSyncState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FolderSyncState::Selected => write!(f, "selected"),
            FolderSyncState::SyncPending => write!(f, "sync_pending"),
            FolderSyncState::Synced => write!(f, "synced"),
        }
    }
}

/// A folder subtree the user granted read permission on
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MirroredFolder {
    /// Owning connector
    connector_id: ConnectorId,
    /// Remote folder identifier
    folder_id: NodeId,
    /// True when the user selected this folder directly (as opposed to
    /// it being implied by an ancestor selection)
    explicitly_selected: bool,
    /// Sync progress of the subtree
    sync_state: FolderSyncState,
    /// When permission was granted
    created_at: DateTime<Utc>,
}

impl MirroredFolder {
    /// Creates a newly selected folder root
    pub fn new(connector_id: ConnectorId, folder_id: NodeId) -> Self {
        Self {
            connector_id,
            folder_id,
            explicitly_selected: true,
            sync_state: FolderSyncState::Selected,
            created_at: Utc::now(),
        }
    }

    /// Reconstitutes a folder from storage
    pub fn from_parts(
        connector_id: ConnectorId,
        folder_id: NodeId,
        explicitly_selected: bool,
        sync_state: FolderSyncState,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            connector_id,
            folder_id,
            explicitly_selected,
            sync_state,
            created_at,
        }
    }

    /// Returns the owning connector id
    pub fn connector_id(&self) -> &ConnectorId {
        &self.connector_id
    }

    /// Returns the remote folder identifier
    pub fn folder_id(&self) -> &NodeId {
        &self.folder_id
    }

    /// Returns true if the user selected this folder directly
    pub fn explicitly_selected(&self) -> bool {
        self.explicitly_selected
    }

    /// Returns the subtree's sync state
    pub fn sync_state(&self) -> FolderSyncState {
        self.sync_state
    }

    /// Returns when permission was granted
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Marks the subtree as handed off for resync
    ///
    /// # Errors
    /// Returns `DomainError::InvalidState` for an illegal transition
    pub fn mark_sync_pending(&mut self) -> Result<(), DomainError> {
        self.transition(FolderSyncState::SyncPending)
    }

    /// Marks the subtree as in agreement with remote state
    ///
    /// # Errors
    /// Returns `DomainError::InvalidState` for an illegal transition
    pub fn mark_synced(&mut self) -> Result<(), DomainError> {
        self.transition(FolderSyncState::Synced)
    }

    fn transition(&mut self, target: FolderSyncState) -> Result<(), DomainError> {
        if !self.sync_state.can_transition_to(target) {
            return Err(DomainError::InvalidState {
                from: self.sync_state.to_string(),
                to: target.to_string(),
            });
        }
        self.sync_state = target;
        Ok(())
    }
}

/// A node discovered under a selected root during a reconciliation pass
///
/// Folder nodes are mirrored too; `kind` preserves the remote
/// classification so listings can annotate expandability without a
/// remote call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MirroredFile {
    /// Owning connector
    connector_id: ConnectorId,
    /// Remote node identifier
    file_id: NodeId,
    /// Remote parent identifier
    parent_id: NodeId,
    /// Cached display name
    name: String,
    /// Folder or file
    kind: NodeKind,
    /// Derived ingestion document id
    document_id: DocumentId,
    /// When a reconciliation pass last touched this row
    last_upserted_at: DateTime<Utc>,
}

impl MirroredFile {
    /// Creates a mirrored node stamped with the given pass timestamp
    pub fn new(
        connector_id: ConnectorId,
        file_id: NodeId,
        parent_id: NodeId,
        name: impl Into<String>,
        kind: NodeKind,
        seen_at: DateTime<Utc>,
    ) -> Self {
        let document_id = DocumentId::for_node(&file_id);
        Self {
            connector_id,
            file_id,
            parent_id,
            name: name.into(),
            kind,
            document_id,
            last_upserted_at: seen_at,
        }
    }

    /// Reconstitutes a mirrored node from storage
    #[allow(clippy::too_many_arguments)]
    pub fn from_parts(
        connector_id: ConnectorId,
        file_id: NodeId,
        parent_id: NodeId,
        name: String,
        kind: NodeKind,
        document_id: DocumentId,
        last_upserted_at: DateTime<Utc>,
    ) -> Self {
        Self {
            connector_id,
            file_id,
            parent_id,
            name,
            kind,
            document_id,
            last_upserted_at,
        }
    }

    /// Returns the owning connector id
    pub fn connector_id(&self) -> &ConnectorId {
        &self.connector_id
    }

    /// Returns the remote node identifier
    pub fn file_id(&self) -> &NodeId {
        &self.file_id
    }

    /// Returns the remote parent identifier
    pub fn parent_id(&self) -> &NodeId {
        &self.parent_id
    }

    /// Returns the cached display name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the node classification
    pub fn kind(&self) -> NodeKind {
        self.kind
    }

    /// Returns the derived document id
    pub fn document_id(&self) -> &DocumentId {
        &self.document_id
    }

    /// Returns when a pass last touched this row
    pub fn last_upserted_at(&self) -> DateTime<Utc> {
        self.last_upserted_at
    }

    /// Refreshes the cached name and stamp from a new remote snapshot
    pub fn touch(&mut self, name: impl Into<String>, seen_at: DateTime<Utc>) {
        self.name = name.into();
        self.last_upserted_at = seen_at;
    }
}
