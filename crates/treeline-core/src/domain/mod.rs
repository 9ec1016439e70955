//! Domain entities and value types
//!
//! Pure business types with no I/O: validated identifiers, the mirrored
//! permission forest, the webhook channel, and the connector aggregate.

pub mod channel;
pub mod connector;
pub mod errors;
pub mod mirror;
pub mod newtypes;
pub mod node;
pub mod sync_config;

pub use channel::WebhookChannel;
pub use connector::{Connector, ConnectorState, ProviderKind};
pub use errors::{ConnectorError, DomainError};
pub use mirror::{FolderSyncState, MirroredFile, MirroredFolder};
pub use newtypes::{ChannelId, ConnectorId, DocumentId, NodeId, PageCursor};
pub use node::{sort_visible, NodeKind, Permission, RemoteNode, VisibleNode};
pub use sync_config::SyncConfig;
