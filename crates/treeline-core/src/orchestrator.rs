//! Sync orchestrator trigger layer
//!
//! Resync and garbage-collection triggers are one-way message sends to
//! a bounded inbox; the orchestrator task drains the inbox and calls
//! the external workflow engine. Senders get back the fate of the
//! *trigger* only, never of the sync itself, and must not assume any
//! ordering between a trigger and its effects.
//!
//! A full inbox is the rate-limit backpressure signal: `try_send`
//! failure maps to [`TriggerError::Saturated`], which callers on the
//! webhook path acknowledge and log rather than fail on.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use thiserror::Error;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::domain::newtypes::{ConnectorId, PageCursor};
use crate::ports::workflow_engine::{IWorkflowEngine, LaunchOutcome, WorkflowKind};

/// Default inbox capacity when none is configured
pub const DEFAULT_INBOX_CAPACITY: usize = 32;

/// A queued sync trigger
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncCommand {
    /// The connector to sync
    pub connector_id: ConnectorId,
    /// Which workflow to launch
    pub kind: WorkflowKind,
}

/// Why a trigger was not enqueued
#[derive(Debug, Error)]
pub enum TriggerError {
    /// The inbox is full; the system is shedding load
    #[error("Sync inbox saturated")]
    Saturated,

    /// The orchestrator task has shut down
    #[error("Sync orchestrator is not running")]
    Closed,
}

/// Cloneable sending half of the orchestrator inbox
#[derive(Clone)]
pub struct OrchestratorHandle {
    tx: mpsc::Sender<SyncCommand>,
}

impl OrchestratorHandle {
    /// Creates a handle and the raw receiving half without an engine
    ///
    /// [`SyncOrchestrator::new`] is the normal entry point; this exists
    /// for callers that drain the inbox themselves.
    pub fn pair(capacity: usize) -> (Self, mpsc::Receiver<SyncCommand>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (Self { tx }, rx)
    }

    /// Requests a full resync of every selected root
    ///
    /// Returns before the sync runs; success means the trigger was
    /// enqueued, nothing more.
    pub fn request_full_sync(
        &self,
        connector_id: ConnectorId,
        cursor: Option<PageCursor>,
    ) -> Result<(), TriggerError> {
        self.send(SyncCommand {
            connector_id,
            kind: WorkflowKind::FullSync { cursor },
        })
    }

    /// Requests an incremental sync
    pub fn request_incremental_sync(&self, connector_id: ConnectorId) -> Result<(), TriggerError> {
        self.send(SyncCommand {
            connector_id,
            kind: WorkflowKind::IncrementalSync,
        })
    }

    /// Requests garbage collection of rows last touched before `active_before`
    pub fn request_garbage_collect(
        &self,
        connector_id: ConnectorId,
        active_before: DateTime<Utc>,
    ) -> Result<(), TriggerError> {
        self.send(SyncCommand {
            connector_id,
            kind: WorkflowKind::GarbageCollect { active_before },
        })
    }

    fn send(&self, command: SyncCommand) -> Result<(), TriggerError> {
        self.tx.try_send(command).map_err(|e| match e {
            mpsc::error::TrySendError::Full(cmd) => {
                warn!(
                    connector_id = %cmd.connector_id,
                    workflow = cmd.kind.name(),
                    "Sync inbox saturated, trigger dropped"
                );
                TriggerError::Saturated
            }
            mpsc::error::TrySendError::Closed(_) => TriggerError::Closed,
        })
    }
}

/// Background task draining the inbox into workflow launches
///
/// Launch failures are logged and never propagated: by the time the
/// orchestrator runs, the original caller has already been answered.
pub struct SyncOrchestrator {
    rx: mpsc::Receiver<SyncCommand>,
    engine: Arc<dyn IWorkflowEngine>,
}

impl SyncOrchestrator {
    /// Creates an orchestrator and its sending handle
    pub fn new(engine: Arc<dyn IWorkflowEngine>, capacity: usize) -> (Self, OrchestratorHandle) {
        let (handle, rx) = OrchestratorHandle::pair(capacity);
        (Self { rx, engine }, handle)
    }

    /// Drains the inbox until cancellation
    ///
    /// Should be spawned as a background task.
    pub async fn run(mut self, shutdown: CancellationToken) {
        info!("Sync orchestrator started");

        loop {
            tokio::select! {
                command = self.rx.recv() => {
                    match command {
                        Some(command) => self.dispatch(command).await,
                        None => break,
                    }
                }
                _ = shutdown.cancelled() => {
                    info!("Sync orchestrator shutting down");
                    break;
                }
            }
        }
    }

    async fn dispatch(&self, command: SyncCommand) {
        let workflow = command.kind.name();
        match self.engine.launch(&command.kind, &command.connector_id).await {
            Ok(LaunchOutcome::Triggered) => {
                debug!(
                    connector_id = %command.connector_id,
                    workflow,
                    "Workflow launched"
                );
            }
            Ok(LaunchOutcome::AlreadyRunning) => {
                debug!(
                    connector_id = %command.connector_id,
                    workflow,
                    "Workflow already running, trigger coalesced"
                );
            }
            Ok(LaunchOutcome::RateLimited) => {
                warn!(
                    connector_id = %command.connector_id,
                    workflow,
                    "Workflow engine rate limited the launch"
                );
            }
            Err(e) => {
                warn!(
                    connector_id = %command.connector_id,
                    workflow,
                    error = %format!("{e:#}"),
                    "Workflow launch failed"
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Records every launch it receives
    struct RecordingEngine {
        launches: Mutex<Vec<(ConnectorId, WorkflowKind)>>,
    }

    impl RecordingEngine {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                launches: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait::async_trait]
    impl IWorkflowEngine for RecordingEngine {
        async fn launch(
            &self,
            kind: &WorkflowKind,
            connector_id: &ConnectorId,
        ) -> anyhow::Result<LaunchOutcome> {
            self.launches
                .lock()
                .unwrap()
                .push((*connector_id, kind.clone()));
            Ok(LaunchOutcome::Triggered)
        }
    }

    #[tokio::test]
    async fn test_trigger_reaches_engine() {
        let engine = RecordingEngine::new();
        let (orchestrator, handle) = SyncOrchestrator::new(engine.clone(), 8);
        let shutdown = CancellationToken::new();
        let task = tokio::spawn(orchestrator.run(shutdown.clone()));

        let connector = ConnectorId::new();
        handle.request_full_sync(connector, None).unwrap();
        handle.request_incremental_sync(connector).unwrap();

        // Give the drain task a chance to run, then stop it
        tokio::task::yield_now().await;
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        shutdown.cancel();
        task.await.unwrap();

        let launches = engine.launches.lock().unwrap();
        assert_eq!(launches.len(), 2);
        assert_eq!(launches[0].1, WorkflowKind::FullSync { cursor: None });
        assert_eq!(launches[1].1, WorkflowKind::IncrementalSync);
    }

    #[tokio::test]
    async fn test_saturated_inbox_reports_rejection() {
        let engine = RecordingEngine::new();
        // Capacity 1 and no drain task running: the second send must fail
        let (_orchestrator, handle) = SyncOrchestrator::new(engine, 1);

        let connector = ConnectorId::new();
        handle.request_incremental_sync(connector).unwrap();
        let err = handle.request_incremental_sync(connector).unwrap_err();
        assert!(matches!(err, TriggerError::Saturated));
    }

    #[tokio::test]
    async fn test_closed_inbox_reports_closed() {
        let engine = RecordingEngine::new();
        let (orchestrator, handle) = SyncOrchestrator::new(engine, 4);
        drop(orchestrator);

        let err = handle
            .request_incremental_sync(ConnectorId::new())
            .unwrap_err();
        assert!(matches!(err, TriggerError::Closed));
    }
}
