//! Treeline Daemon - Connector synchronization service
//!
//! This binary runs as a background service and handles:
//! - Inbound webhook notifications from the content provider
//! - The connector admin surface (create/pause/resume/sync/teardown)
//! - The sync orchestrator inbox feeding the workflow engine
//! - A periodic webhook-channel renewal sweep
//! - Graceful shutdown on SIGTERM/SIGINT
//!
//! # Architecture
//!
//! The daemon wires the adapters (Drive client, SQLite store, workflow
//! engine client) into the core use cases, spawns the orchestrator and
//! the renewal sweep as background tasks, and serves HTTP until the
//! `CancellationToken` is triggered by a signal.

mod server;

use std::{sync::Arc, time::Duration};

use anyhow::{Context, Result};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use treeline_core::{
    config::Config,
    domain::ProviderKind,
    orchestrator::SyncOrchestrator,
    ports::{IDirectoryProvider, IMirrorStore, IWorkflowEngine},
    usecases::{
        DriveConnectorLifecycle, HandleNotificationUseCase, ProviderRegistry,
        RegisterChannelUseCase,
    },
};
use treeline_drive::{DriveClient, DriveDirectoryProvider};
use treeline_store::{DatabasePool, SqliteMirrorStore};
use treeline_workflow::HttpWorkflowEngine;

use server::{ServerState, WebhookServer};

/// How often the channel renewal sweep runs
const RENEWAL_SWEEP_INTERVAL: Duration = Duration::from_secs(3600);

/// Environment variable consulted when the config has no provider token
const PROVIDER_TOKEN_ENV: &str = "TREELINE_PROVIDER_TOKEN";

/// Main daemon service wiring adapters into the core
struct DaemonService {
    config: Config,
    store: Arc<dyn IMirrorStore>,
    provider: Arc<dyn IDirectoryProvider>,
    shutdown: CancellationToken,
}

impl DaemonService {
    /// Creates a new DaemonService
    ///
    /// Loads configuration, opens the database, and builds the Drive
    /// adapter.
    async fn new(shutdown: CancellationToken) -> Result<Self> {
        let config_path = Config::default_path();
        let config = Config::load_or_default(&config_path);
        info!(config_path = %config_path.display(), "Loaded configuration");

        let pool = DatabasePool::new(&config.database.path)
            .await
            .context("Failed to open mirror database")?;
        let store: Arc<dyn IMirrorStore> = Arc::new(SqliteMirrorStore::new(pool.pool().clone()));

        let access_token = config
            .provider
            .access_token
            .clone()
            .or_else(|| std::env::var(PROVIDER_TOKEN_ENV).ok())
            .with_context(|| {
                format!(
                    "No provider access token: set provider.access_token or {PROVIDER_TOKEN_ENV}"
                )
            })?;

        let client = DriveClient::with_base_url(access_token, config.provider.base_url.clone());
        let provider: Arc<dyn IDirectoryProvider> = Arc::new(DriveDirectoryProvider::new(client));

        Ok(Self {
            config,
            store,
            provider,
            shutdown,
        })
    }

    /// Runs the daemon until shutdown
    async fn run(&self) -> Result<()> {
        let engine: Arc<dyn IWorkflowEngine> =
            Arc::new(HttpWorkflowEngine::new(self.config.workflow.base_url.clone()));

        // Orchestrator inbox and drain task
        let (orchestrator, handle) =
            SyncOrchestrator::new(Arc::clone(&engine), self.config.sync.inbox_capacity);
        let orchestrator_task = tokio::spawn(orchestrator.run(self.shutdown.clone()));

        let callback_url = format!("{}/notifications", self.config.server.public_base_url);

        // Provider registry, resolved once at startup
        let mut registry = ProviderRegistry::new();
        registry.register(
            ProviderKind::GoogleDrive,
            Arc::new(DriveConnectorLifecycle::new(
                Arc::clone(&self.store),
                Arc::clone(&self.provider),
                handle.clone(),
                callback_url.clone(),
            )),
        );

        let notifications =
            HandleNotificationUseCase::new(Arc::clone(&self.store), handle.clone());

        let state = Arc::new(ServerState {
            store: Arc::clone(&self.store),
            registry,
            notifications,
        });

        // Channel renewal sweep
        let renewal_task = tokio::spawn(renewal_sweep(
            Arc::clone(&self.store),
            Arc::clone(&self.provider),
            callback_url,
            self.shutdown.clone(),
        ));

        // Webhook + admin HTTP endpoint (runs in the foreground)
        let server = WebhookServer::new(state, &self.config.server.bind_addr)?;
        let result = server.run(self.shutdown.clone()).await;

        // Idempotent: stops the background tasks when the server exited
        // on its own error rather than via the signal handler.
        self.shutdown.cancel();
        let _ = renewal_task.await;
        let _ = orchestrator_task.await;

        result
    }
}

/// Periodically re-registers channels that are close to expiry
///
/// The channel entity only exposes the expiry predicate; this sweep is
/// the scheduler that acts on it.
async fn renewal_sweep(
    store: Arc<dyn IMirrorStore>,
    provider: Arc<dyn IDirectoryProvider>,
    callback_url: String,
    shutdown: CancellationToken,
) {
    let register = RegisterChannelUseCase::new(provider, Arc::clone(&store), callback_url);
    let mut interval = tokio::time::interval(RENEWAL_SWEEP_INTERVAL);

    loop {
        tokio::select! {
            _ = interval.tick() => {}
            _ = shutdown.cancelled() => {
                info!("Renewal sweep shutting down");
                return;
            }
        }

        let connectors = match store.list_connectors().await {
            Ok(connectors) => connectors,
            Err(e) => {
                warn!(error = %format!("{e:#}"), "Renewal sweep failed to list connectors");
                continue;
            }
        };

        let now = chrono::Utc::now();
        for connector in connectors {
            let channel = match store.find_channel_for_connector(connector.id()).await {
                Ok(Some(channel)) => channel,
                Ok(None) => continue,
                Err(e) => {
                    warn!(
                        connector_id = %connector.id(),
                        error = %format!("{e:#}"),
                        "Renewal sweep failed to load channel"
                    );
                    continue;
                }
            };

            if !channel.is_expiring_soon(now) {
                continue;
            }

            info!(
                connector_id = %connector.id(),
                channel_id = %channel.channel_id(),
                expires_at = %channel.expires_at(),
                "Renewing expiring webhook channel"
            );

            if let Err(e) = register.execute(connector.id()).await {
                // Registration failure is retried on the next sweep
                warn!(
                    connector_id = %connector.id(),
                    error = %e,
                    "Channel renewal failed"
                );
            }
        }
    }
}

/// Waits for SIGTERM or SIGINT and triggers the cancellation token
async fn shutdown_signal(token: CancellationToken) {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received SIGINT (Ctrl+C)");
        }
        _ = terminate => {
            info!("Received SIGTERM");
        }
    }

    token.cancel();
}

#[tokio::main]
async fn main() -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(true)
        .init();

    info!("Treeline daemon starting (treelined)");

    let shutdown_token = CancellationToken::new();

    let signal_token = shutdown_token.clone();
    tokio::spawn(async move {
        shutdown_signal(signal_token).await;
    });

    let service = DaemonService::new(shutdown_token.clone()).await?;

    let result = service.run().await;

    match &result {
        Ok(()) => info!("Treeline daemon shut down gracefully"),
        Err(e) => error!(error = %e, "Treeline daemon exiting with error"),
    }

    result
}
