//! Use cases orchestrating domain entities through the ports
//!
//! - Permission tree: [`ListNodesUseCase`], [`ApplyPermissionChangesUseCase`],
//!   [`ResolveTitlesUseCase`], [`ResolveParentChainUseCase`]
//! - Reconciliation: [`ReconcileConnectorUseCase`], [`GarbageCollectUseCase`]
//! - Webhooks: [`RegisterChannelUseCase`], [`HandleNotificationUseCase`]
//! - Lifecycle: [`ConnectorLifecycle`], [`ProviderRegistry`]

pub mod apply_permissions;
pub mod configure_sync;
pub mod garbage_collect;
pub mod handle_notification;
pub mod lifecycle;
pub mod list_nodes;
pub mod parent_chain;
pub mod reconcile;
pub mod register_channel;
pub mod resolve_titles;

pub use apply_permissions::{ApplyPermissionChangesUseCase, PermissionChangeReport};
pub use configure_sync::ConfigureSyncUseCase;
pub use garbage_collect::GarbageCollectUseCase;
pub use handle_notification::{HandleNotificationUseCase, NotificationOutcome};
pub use lifecycle::{ConnectorLifecycle, DriveConnectorLifecycle, ProviderRegistry};
pub use list_nodes::{ListFilter, ListNodesUseCase};
pub use parent_chain::{ChainCache, ResolveParentChainUseCase};
pub use reconcile::{ReconcileConnectorUseCase, ReconcileStats, SyncMode};
pub use register_channel::RegisterChannelUseCase;
pub use resolve_titles::ResolveTitlesUseCase;
