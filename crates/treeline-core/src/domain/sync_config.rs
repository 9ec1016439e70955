//! Per-connector sync feature toggles
//!
//! Mutating any toggle invalidates cached sync results: the configure
//! use case forces a full resync whenever a save actually changes the
//! stored value.

use serde::{Deserialize, Serialize};

use super::newtypes::ConnectorId;

/// Feature toggles controlling which file types a connector ingests
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Owning connector
    connector_id: ConnectorId,
    /// Whether CSV and spreadsheet exports are ingested
    csv_enabled: bool,
    /// Whether PDF documents are ingested
    pdf_enabled: bool,
}

impl SyncConfig {
    /// Creates the default config for a connector (everything off)
    pub fn new(connector_id: ConnectorId) -> Self {
        Self {
            connector_id,
            csv_enabled: false,
            pdf_enabled: false,
        }
    }

    /// Reconstitutes a config from storage
    pub fn from_parts(connector_id: ConnectorId, csv_enabled: bool, pdf_enabled: bool) -> Self {
        Self {
            connector_id,
            csv_enabled,
            pdf_enabled,
        }
    }

    /// Returns the owning connector id
    pub fn connector_id(&self) -> &ConnectorId {
        &self.connector_id
    }

    /// Returns whether CSV ingestion is enabled
    pub fn csv_enabled(&self) -> bool {
        self.csv_enabled
    }

    /// Returns whether PDF ingestion is enabled
    pub fn pdf_enabled(&self) -> bool {
        self.pdf_enabled
    }

    /// Sets the CSV toggle
    pub fn set_csv_enabled(&mut self, enabled: bool) {
        self.csv_enabled = enabled;
    }

    /// Sets the PDF toggle
    pub fn set_pdf_enabled(&mut self, enabled: bool) {
        self.pdf_enabled = enabled;
    }

    /// Returns true if any toggle differs from `other`
    pub fn differs_from(&self, other: &SyncConfig) -> bool {
        self.csv_enabled != other.csv_enabled || self.pdf_enabled != other.pdf_enabled
    }
}
