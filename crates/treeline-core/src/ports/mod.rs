//! Port definitions (hexagonal architecture interfaces)
//!
//! Ports are the trait boundaries the domain core depends on; their
//! implementations live in adapter crates.
//!
//! ## Ports Overview
//!
//! - [`IDirectoryProvider`] - Remote directory listing and webhook channels
//! - [`IMirrorStore`] - Persistent storage for the mirrored permission forest
//! - [`IWorkflowEngine`] - Launch-only handle to the external workflow engine

pub mod directory_provider;
pub mod mirror_store;
pub mod workflow_engine;

pub use directory_provider::{ChannelGrant, IDirectoryProvider, NodePage, ProviderError};
pub use mirror_store::IMirrorStore;
pub use workflow_engine::{IWorkflowEngine, LaunchOutcome, WorkflowKind};
