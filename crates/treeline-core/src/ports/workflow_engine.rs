//! External workflow engine port (driven/secondary port)
//!
//! The workflow engine owns durability, retries, and scheduling of sync
//! work; this system only launches workflows and never assumes
//! synchronous completion.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::newtypes::{ConnectorId, PageCursor};

/// The kinds of workflow this system launches
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum WorkflowKind {
    /// Re-walk every selected root from scratch
    FullSync {
        /// Resume cursor from an interrupted pass, if any
        cursor: Option<PageCursor>,
    },
    /// Sync only what changed since the last pass
    IncrementalSync,
    /// Remove mirrored rows no longer reachable from a selected root
    GarbageCollect {
        /// Rows last touched before this instant are collected
        active_before: DateTime<Utc>,
    },
}

impl WorkflowKind {
    /// Stable workflow name used in launch requests and logs
    pub fn name(&self) -> &'static str {
        match self {
            WorkflowKind::FullSync { .. } => "full_sync",
            WorkflowKind::IncrementalSync => "incremental_sync",
            WorkflowKind::GarbageCollect { .. } => "garbage_collect",
        }
    }
}

/// Outcome of a launch request (of the trigger only, never of the sync)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LaunchOutcome {
    /// The workflow was accepted
    Triggered,
    /// An equivalent workflow is already running; not an error
    AlreadyRunning,
    /// The engine refused the launch due to rate limiting
    RateLimited,
}

/// Port trait for launching workflows
#[async_trait::async_trait]
pub trait IWorkflowEngine: Send + Sync {
    /// Launches a workflow for a connector
    ///
    /// Returns the outcome of the trigger; the workflow itself runs
    /// asynchronously in the engine.
    async fn launch(
        &self,
        kind: &WorkflowKind,
        connector_id: &ConnectorId,
    ) -> anyhow::Result<LaunchOutcome>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_workflow_names() {
        assert_eq!(WorkflowKind::FullSync { cursor: None }.name(), "full_sync");
        assert_eq!(WorkflowKind::IncrementalSync.name(), "incremental_sync");
        assert_eq!(
            WorkflowKind::GarbageCollect {
                active_before: Utc::now()
            }
            .name(),
            "garbage_collect"
        );
    }

    #[test]
    fn test_kind_serializes_with_tag() {
        let kind = WorkflowKind::IncrementalSync;
        let json = serde_json::to_string(&kind).unwrap();
        assert_eq!(json, r#"{"kind":"incremental_sync"}"#);
    }
}
