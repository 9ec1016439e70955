//! HTTP launch client
//!
//! `POST <base>/workflows/launch` with the workflow kind and connector
//! id. The engine answers 202 for an accepted launch, 409 when an
//! equivalent workflow is already running, and 429 when it sheds load;
//! all three are normal outcomes, not errors.

use std::time::Duration;

use anyhow::Context;
use reqwest::{Client, StatusCode};
use serde_json::json;
use tracing::debug;

use treeline_core::domain::newtypes::ConnectorId;
use treeline_core::ports::{IWorkflowEngine, LaunchOutcome, WorkflowKind};

/// Request timeout for launch calls
const LAUNCH_TIMEOUT: Duration = Duration::from_secs(10);

/// Workflow engine adapter speaking the launch HTTP API
pub struct HttpWorkflowEngine {
    client: Client,
    base_url: String,
}

impl HttpWorkflowEngine {
    /// Creates a client for the engine at `base_url`
    pub fn new(base_url: impl Into<String>) -> Self {
        let client = Client::builder()
            .timeout(LAUNCH_TIMEOUT)
            .build()
            .unwrap_or_default();
        Self {
            client,
            base_url: base_url.into(),
        }
    }

    /// Returns the configured base URL
    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait::async_trait]
impl IWorkflowEngine for HttpWorkflowEngine {
    async fn launch(
        &self,
        kind: &WorkflowKind,
        connector_id: &ConnectorId,
    ) -> anyhow::Result<LaunchOutcome> {
        let url = format!("{}/workflows/launch", self.base_url);
        let body = json!({
            "workflow": kind,
            "connector_id": connector_id.to_string(),
        });

        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .context("Failed to reach workflow engine")?;

        let status = response.status();
        debug!(
            workflow = kind.name(),
            connector_id = %connector_id,
            status = %status,
            "Workflow launch request completed"
        );

        match status {
            StatusCode::CONFLICT => Ok(LaunchOutcome::AlreadyRunning),
            StatusCode::TOO_MANY_REQUESTS => Ok(LaunchOutcome::RateLimited),
            s if s.is_success() => Ok(LaunchOutcome::Triggered),
            s => {
                let text = response.text().await.unwrap_or_default();
                anyhow::bail!("Workflow engine returned {s}: {text}")
            }
        }
    }
}
