//! Connector aggregate root
//!
//! A connector is one configured integration between a workspace data
//! source and one external content provider. Mirrored folders, files,
//! the webhook channel, and the sync config are all owned by the
//! connector and destroyed together on teardown.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{errors::DomainError, newtypes::ConnectorId};

/// The content provider a connector integrates with
///
/// Providers are registered once in the [`ProviderRegistry`] at startup;
/// dispatch happens through the registry, never per call site.
///
/// [`ProviderRegistry`]: crate::usecases::lifecycle::ProviderRegistry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderKind {
    /// Google Drive
    GoogleDrive,
}

impl ProviderKind {
    /// Stable name used for storage and registry keys
    pub fn name(self) -> &'static str {
        match self {
            ProviderKind::GoogleDrive => "google_drive",
        }
    }

    /// Resolves a stored name back to a provider kind
    pub fn from_name(name: &str) -> Result<Self, DomainError> {
        match name {
            "google_drive" => Ok(ProviderKind::GoogleDrive),
            other => Err(DomainError::ValidationFailed(format!(
                "Unknown provider: {other}"
            ))),
        }
    }
}

impl std::fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Administrative state of a connector
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectorState {
    /// Syncing normally
    #[default]
    Active,
    /// Administratively paused; notifications are acknowledged and dropped
    Paused,
}

impl ConnectorState {
    /// Returns true if sync triggers should be honored
    pub fn can_sync(&self) -> bool {
        matches!(self, ConnectorState::Active)
    }
}

impl std::fmt::Display for ConnectorState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConnectorState::Active => write!(f, "active"),
            ConnectorState::Paused => write!(f, "paused"),
        }
    }
}

/// A configured integration instance
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Connector {
    /// Unique identifier for this connector
    id: ConnectorId,
    /// The provider this connector talks to
    provider: ProviderKind,
    /// Administrative state
    state: ConnectorState,
    /// Completion time of the last successful sync pass
    last_synced_at: Option<DateTime<Utc>>,
    /// When this connector was created
    created_at: DateTime<Utc>,
}

impl Connector {
    /// Creates a new active connector
    pub fn new(provider: ProviderKind) -> Self {
        Self {
            id: ConnectorId::new(),
            provider,
            state: ConnectorState::Active,
            last_synced_at: None,
            created_at: Utc::now(),
        }
    }

    /// Reconstitutes a connector from storage
    pub fn from_parts(
        id: ConnectorId,
        provider: ProviderKind,
        state: ConnectorState,
        last_synced_at: Option<DateTime<Utc>>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            provider,
            state,
            last_synced_at,
            created_at,
        }
    }

    /// Returns the connector's unique identifier
    pub fn id(&self) -> &ConnectorId {
        &self.id
    }

    /// Returns the provider kind
    pub fn provider(&self) -> ProviderKind {
        self.provider
    }

    /// Returns the administrative state
    pub fn state(&self) -> ConnectorState {
        self.state
    }

    /// Returns the completion time of the last successful sync pass
    pub fn last_synced_at(&self) -> Option<DateTime<Utc>> {
        self.last_synced_at
    }

    /// Returns when the connector was created
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Pauses the connector
    ///
    /// # Errors
    /// Returns `DomainError::InvalidState` if already paused
    pub fn pause(&mut self) -> Result<(), DomainError> {
        match self.state {
            ConnectorState::Active => {
                self.state = ConnectorState::Paused;
                Ok(())
            }
            ConnectorState::Paused => Err(DomainError::InvalidState {
                from: self.state.to_string(),
                to: ConnectorState::Paused.to_string(),
            }),
        }
    }

    /// Resumes a paused connector
    ///
    /// # Errors
    /// Returns `DomainError::InvalidState` if already active
    pub fn resume(&mut self) -> Result<(), DomainError> {
        match self.state {
            ConnectorState::Paused => {
                self.state = ConnectorState::Active;
                Ok(())
            }
            ConnectorState::Active => Err(DomainError::InvalidState {
                from: self.state.to_string(),
                to: ConnectorState::Active.to_string(),
            }),
        }
    }

    /// Records the completion of a sync pass
    pub fn record_sync(&mut self, completed_at: DateTime<Utc>) {
        self.last_synced_at = Some(completed_at);
    }
}
