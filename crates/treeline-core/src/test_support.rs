//! Shared fakes for use-case tests
//!
//! An in-memory mirror store, a scripted directory provider, and a
//! recording workflow engine. Only compiled for tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use chrono::{DateTime, Utc};

use crate::domain::{
    Connector, FolderSyncState, MirroredFile, MirroredFolder, RemoteNode, SyncConfig,
    WebhookChannel,
};
use crate::domain::newtypes::{ChannelId, ConnectorId, NodeId, PageCursor};
use crate::ports::{
    ChannelGrant, IDirectoryProvider, IMirrorStore, IWorkflowEngine, LaunchOutcome, NodePage,
    ProviderError, WorkflowKind,
};

// ============================================================================
// In-memory mirror store
// ============================================================================

#[derive(Default)]
struct StoreState {
    connectors: HashMap<ConnectorId, Connector>,
    folders: HashMap<(ConnectorId, String), MirroredFolder>,
    files: HashMap<(ConnectorId, String), MirroredFile>,
    channels: HashMap<ConnectorId, WebhookChannel>,
    configs: HashMap<ConnectorId, SyncConfig>,
}

/// HashMap-backed `IMirrorStore` for tests
#[derive(Default)]
pub struct InMemoryMirrorStore {
    state: Mutex<StoreState>,
}

impl InMemoryMirrorStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of mirrored file rows currently held
    pub fn file_count(&self) -> usize {
        self.state.lock().unwrap().files.len()
    }

    /// Folder roots currently held for a connector, as raw ids
    pub fn folder_ids(&self, connector_id: &ConnectorId) -> Vec<String> {
        let state = self.state.lock().unwrap();
        let mut ids: Vec<String> = state
            .folders
            .keys()
            .filter(|(c, _)| c == connector_id)
            .map(|(_, f)| f.clone())
            .collect();
        ids.sort();
        ids
    }
}

#[async_trait::async_trait]
impl IMirrorStore for InMemoryMirrorStore {
    async fn get_connector(&self, id: &ConnectorId) -> anyhow::Result<Option<Connector>> {
        Ok(self.state.lock().unwrap().connectors.get(id).cloned())
    }

    async fn list_connectors(&self) -> anyhow::Result<Vec<Connector>> {
        Ok(self.state.lock().unwrap().connectors.values().cloned().collect())
    }

    async fn save_connector(&self, connector: &Connector) -> anyhow::Result<()> {
        self.state
            .lock()
            .unwrap()
            .connectors
            .insert(*connector.id(), connector.clone());
        Ok(())
    }

    async fn delete_connector(&self, id: &ConnectorId) -> anyhow::Result<()> {
        let mut state = self.state.lock().unwrap();
        state.connectors.remove(id);
        state.folders.retain(|(c, _), _| c != id);
        state.files.retain(|(c, _), _| c != id);
        state.channels.remove(id);
        state.configs.remove(id);
        Ok(())
    }

    async fn upsert_folder(&self, folder: &MirroredFolder) -> anyhow::Result<bool> {
        let mut state = self.state.lock().unwrap();
        let key = (
            *folder.connector_id(),
            folder.folder_id().as_str().to_string(),
        );
        if state.folders.contains_key(&key) {
            return Ok(false);
        }
        state.folders.insert(key, folder.clone());
        Ok(true)
    }

    async fn delete_folder(
        &self,
        connector_id: &ConnectorId,
        folder_id: &NodeId,
    ) -> anyhow::Result<bool> {
        let mut state = self.state.lock().unwrap();
        Ok(state
            .folders
            .remove(&(*connector_id, folder_id.as_str().to_string()))
            .is_some())
    }

    async fn list_folders(
        &self,
        connector_id: &ConnectorId,
    ) -> anyhow::Result<Vec<MirroredFolder>> {
        let state = self.state.lock().unwrap();
        let mut folders: Vec<MirroredFolder> = state
            .folders
            .iter()
            .filter(|((c, _), _)| c == connector_id)
            .map(|(_, f)| f.clone())
            .collect();
        folders.sort_by(|a, b| a.folder_id().as_str().cmp(b.folder_id().as_str()));
        Ok(folders)
    }

    async fn folder_exists(
        &self,
        connector_id: &ConnectorId,
        folder_id: &NodeId,
    ) -> anyhow::Result<bool> {
        let state = self.state.lock().unwrap();
        Ok(state
            .folders
            .contains_key(&(*connector_id, folder_id.as_str().to_string())))
    }

    async fn set_folder_sync_state(
        &self,
        connector_id: &ConnectorId,
        folder_id: &NodeId,
        new_state: FolderSyncState,
    ) -> anyhow::Result<()> {
        let mut state = self.state.lock().unwrap();
        if let Some(folder) = state
            .folders
            .get_mut(&(*connector_id, folder_id.as_str().to_string()))
        {
            *folder = MirroredFolder::from_parts(
                *folder.connector_id(),
                folder.folder_id().clone(),
                folder.explicitly_selected(),
                new_state,
                folder.created_at(),
            );
        }
        Ok(())
    }

    async fn upsert_file(&self, file: &MirroredFile) -> anyhow::Result<()> {
        let mut state = self.state.lock().unwrap();
        state.files.insert(
            (*file.connector_id(), file.file_id().as_str().to_string()),
            file.clone(),
        );
        Ok(())
    }

    async fn upsert_files(&self, files: &[MirroredFile]) -> anyhow::Result<()> {
        let mut state = self.state.lock().unwrap();
        for file in files {
            state.files.insert(
                (*file.connector_id(), file.file_id().as_str().to_string()),
                file.clone(),
            );
        }
        Ok(())
    }

    async fn find_file(
        &self,
        connector_id: &ConnectorId,
        file_id: &NodeId,
    ) -> anyhow::Result<Option<MirroredFile>> {
        let state = self.state.lock().unwrap();
        Ok(state
            .files
            .get(&(*connector_id, file_id.as_str().to_string()))
            .cloned())
    }

    async fn find_files_by_ids(
        &self,
        connector_id: &ConnectorId,
        ids: &[NodeId],
    ) -> anyhow::Result<HashMap<NodeId, MirroredFile>> {
        let state = self.state.lock().unwrap();
        let mut found = HashMap::new();
        for id in ids {
            if let Some(file) = state.files.get(&(*connector_id, id.as_str().to_string())) {
                found.insert(id.clone(), file.clone());
            }
        }
        Ok(found)
    }

    async fn find_children(
        &self,
        connector_id: &ConnectorId,
        parent_id: &NodeId,
    ) -> anyhow::Result<Vec<MirroredFile>> {
        let state = self.state.lock().unwrap();
        let mut children: Vec<MirroredFile> = state
            .files
            .iter()
            .filter(|((c, _), f)| c == connector_id && f.parent_id() == parent_id)
            .map(|(_, f)| f.clone())
            .collect();
        children.sort_by(|a, b| a.file_id().as_str().cmp(b.file_id().as_str()));
        Ok(children)
    }

    async fn has_children(
        &self,
        connector_id: &ConnectorId,
        parent_id: &NodeId,
    ) -> anyhow::Result<bool> {
        let state = self.state.lock().unwrap();
        Ok(state
            .files
            .iter()
            .any(|((c, _), f)| c == connector_id && f.parent_id() == parent_id))
    }

    async fn delete_files_not_upserted_since(
        &self,
        connector_id: &ConnectorId,
        cutoff: DateTime<Utc>,
    ) -> anyhow::Result<u64> {
        let mut state = self.state.lock().unwrap();
        let before = state.files.len();
        state
            .files
            .retain(|(c, _), f| c != connector_id || f.last_upserted_at() >= cutoff);
        Ok((before - state.files.len()) as u64)
    }

    async fn save_channel(&self, channel: &WebhookChannel) -> anyhow::Result<()> {
        self.state
            .lock()
            .unwrap()
            .channels
            .insert(*channel.connector_id(), channel.clone());
        Ok(())
    }

    async fn find_channel(
        &self,
        channel_id: &ChannelId,
    ) -> anyhow::Result<Option<WebhookChannel>> {
        let state = self.state.lock().unwrap();
        Ok(state
            .channels
            .values()
            .find(|c| c.channel_id() == channel_id)
            .cloned())
    }

    async fn find_channel_for_connector(
        &self,
        connector_id: &ConnectorId,
    ) -> anyhow::Result<Option<WebhookChannel>> {
        Ok(self.state.lock().unwrap().channels.get(connector_id).cloned())
    }

    async fn delete_channel(&self, connector_id: &ConnectorId) -> anyhow::Result<()> {
        self.state.lock().unwrap().channels.remove(connector_id);
        Ok(())
    }

    async fn get_sync_config(
        &self,
        connector_id: &ConnectorId,
    ) -> anyhow::Result<Option<SyncConfig>> {
        Ok(self.state.lock().unwrap().configs.get(connector_id).cloned())
    }

    async fn save_sync_config(&self, config: &SyncConfig) -> anyhow::Result<()> {
        self.state
            .lock()
            .unwrap()
            .configs
            .insert(*config.connector_id(), config.clone());
        Ok(())
    }
}

// ============================================================================
// Scripted directory provider
// ============================================================================

/// How the fake provider should fail
#[derive(Debug, Clone, Copy)]
pub enum FailureMode {
    RateLimited,
    Unavailable,
}

impl FailureMode {
    fn to_error(self) -> ProviderError {
        match self {
            FailureMode::RateLimited => ProviderError::RateLimited {
                retry_after_secs: Some(30),
            },
            FailureMode::Unavailable => ProviderError::Unavailable("scripted failure".to_string()),
        }
    }
}

/// Scripted `IDirectoryProvider` with fixed-size pages
pub struct FakeDirectoryProvider {
    /// Nodes resolvable by `get_node`
    nodes: Mutex<HashMap<String, RemoteNode>>,
    /// Children listings keyed by parent id
    children: Mutex<HashMap<String, Vec<RemoteNode>>>,
    /// Top-level shared drives
    drives: Mutex<Vec<RemoteNode>>,
    /// Page size applied to every listing
    page_size: usize,
    /// When set, every call fails this way
    failure: Mutex<Option<FailureMode>>,
    /// Count of `get_node` calls
    pub get_node_calls: AtomicUsize,
    /// Count of `list_children` calls (pages, not logical listings)
    pub list_calls: AtomicUsize,
}

impl FakeDirectoryProvider {
    pub fn new(page_size: usize) -> Self {
        Self {
            nodes: Mutex::new(HashMap::new()),
            children: Mutex::new(HashMap::new()),
            drives: Mutex::new(Vec::new()),
            page_size: page_size.max(1),
            failure: Mutex::new(None),
            get_node_calls: AtomicUsize::new(0),
            list_calls: AtomicUsize::new(0),
        }
    }

    pub fn add_node(&self, node: RemoteNode) {
        self.nodes
            .lock()
            .unwrap()
            .insert(node.id.as_str().to_string(), node);
    }

    pub fn add_child(&self, parent: &NodeId, node: RemoteNode) {
        self.add_node(node.clone());
        self.children
            .lock()
            .unwrap()
            .entry(parent.as_str().to_string())
            .or_default()
            .push(node);
    }

    pub fn add_drive(&self, node: RemoteNode) {
        self.drives.lock().unwrap().push(node);
    }

    pub fn fail_with(&self, mode: FailureMode) {
        *self.failure.lock().unwrap() = Some(mode);
    }

    fn check_failure(&self) -> Result<(), ProviderError> {
        match *self.failure.lock().unwrap() {
            Some(mode) => Err(mode.to_error()),
            None => Ok(()),
        }
    }

    fn paginate(&self, all: Vec<RemoteNode>, page: Option<&PageCursor>) -> NodePage {
        let offset = page
            .and_then(|p| p.as_str().parse::<usize>().ok())
            .unwrap_or(0);
        let nodes: Vec<RemoteNode> =
            all.iter().skip(offset).take(self.page_size).cloned().collect();
        let next = offset + nodes.len();
        let next_page = if next < all.len() {
            Some(PageCursor::new(next.to_string()).unwrap())
        } else {
            None
        };
        NodePage { nodes, next_page }
    }
}

#[async_trait::async_trait]
impl IDirectoryProvider for FakeDirectoryProvider {
    async fn list_children(
        &self,
        parent: &NodeId,
        page: Option<&PageCursor>,
        folders_only: bool,
    ) -> Result<NodePage, ProviderError> {
        self.check_failure()?;
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        let all: Vec<RemoteNode> = self
            .children
            .lock()
            .unwrap()
            .get(parent.as_str())
            .cloned()
            .unwrap_or_default()
            .into_iter()
            .filter(|n| !folders_only || n.kind == crate::domain::NodeKind::Folder)
            .collect();
        Ok(self.paginate(all, page))
    }

    async fn list_drives(&self, page: Option<&PageCursor>) -> Result<NodePage, ProviderError> {
        self.check_failure()?;
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        let all = self.drives.lock().unwrap().clone();
        Ok(self.paginate(all, page))
    }

    async fn get_node(&self, id: &NodeId) -> Result<Option<RemoteNode>, ProviderError> {
        self.check_failure()?;
        self.get_node_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.nodes.lock().unwrap().get(id.as_str()).cloned())
    }

    async fn create_channel(
        &self,
        connector_id: &ConnectorId,
        _callback_url: &str,
    ) -> Result<ChannelGrant, ProviderError> {
        self.check_failure()?;
        Ok(ChannelGrant {
            channel_id: ChannelId::new(format!("chan-{connector_id}")).unwrap(),
            resource_id: "res-1".to_string(),
            expires_at: Utc::now() + chrono::Duration::days(7),
        })
    }

    async fn stop_channel(
        &self,
        _channel_id: &ChannelId,
        _resource_id: &str,
    ) -> Result<(), ProviderError> {
        self.check_failure()?;
        Ok(())
    }
}

// ============================================================================
// Recording workflow engine
// ============================================================================

/// `IWorkflowEngine` that records launches and returns a fixed outcome
pub struct RecordingWorkflowEngine {
    outcome: LaunchOutcome,
    launches: Mutex<Vec<(ConnectorId, WorkflowKind)>>,
}

impl RecordingWorkflowEngine {
    pub fn new() -> Self {
        Self::with_outcome(LaunchOutcome::Triggered)
    }

    pub fn with_outcome(outcome: LaunchOutcome) -> Self {
        Self {
            outcome,
            launches: Mutex::new(Vec::new()),
        }
    }

    pub fn launches(&self) -> Vec<(ConnectorId, WorkflowKind)> {
        self.launches.lock().unwrap().clone()
    }
}

impl Default for RecordingWorkflowEngine {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl IWorkflowEngine for RecordingWorkflowEngine {
    async fn launch(
        &self,
        kind: &WorkflowKind,
        connector_id: &ConnectorId,
    ) -> anyhow::Result<LaunchOutcome> {
        self.launches
            .lock()
            .unwrap()
            .push((*connector_id, kind.clone()));
        Ok(self.outcome)
    }
}

// ============================================================================
// Builders
// ============================================================================

/// Builds a remote folder node
pub fn remote_folder(id: &str, parent: Option<&str>, name: &str) -> RemoteNode {
    RemoteNode {
        id: NodeId::new(id.to_string()).unwrap(),
        parent_id: parent.map(|p| NodeId::new(p.to_string()).unwrap()),
        name: name.to_string(),
        kind: crate::domain::NodeKind::Folder,
        modified_at: Some(Utc::now()),
        web_url: None,
    }
}

/// Builds a remote file node
pub fn remote_file(id: &str, parent: &str, name: &str) -> RemoteNode {
    RemoteNode {
        id: NodeId::new(id.to_string()).unwrap(),
        parent_id: Some(NodeId::new(parent.to_string()).unwrap()),
        name: name.to_string(),
        kind: crate::domain::NodeKind::File,
        modified_at: Some(Utc::now()),
        web_url: None,
    }
}

/// Builds a node id from a literal
pub fn node_id(id: &str) -> NodeId {
    NodeId::new(id.to_string()).unwrap()
}
