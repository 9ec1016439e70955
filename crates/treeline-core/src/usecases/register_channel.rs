//! Webhook channel registration use case
//!
//! Creates a push-notification channel at the provider and persists it.
//! At most one channel is tracked per connector; re-registration
//! replaces the previous record. Renewal scheduling is an external
//! concern (see [`WebhookChannel::is_expiring_soon`]).
//!
//! [`WebhookChannel::is_expiring_soon`]: crate::domain::WebhookChannel::is_expiring_soon

use std::sync::Arc;

use tracing::{info, warn};

use crate::domain::{channel::WebhookChannel, errors::ConnectorError, newtypes::ConnectorId};
use crate::ports::{IDirectoryProvider, IMirrorStore};

/// Use case registering a connector's push-notification channel
pub struct RegisterChannelUseCase {
    provider: Arc<dyn IDirectoryProvider>,
    store: Arc<dyn IMirrorStore>,
    /// URL the provider delivers notifications to
    callback_url: String,
}

impl RegisterChannelUseCase {
    /// Creates the use case with its dependencies
    pub fn new(
        provider: Arc<dyn IDirectoryProvider>,
        store: Arc<dyn IMirrorStore>,
        callback_url: impl Into<String>,
    ) -> Self {
        Self {
            provider,
            store,
            callback_url: callback_url.into(),
        }
    }

    /// Registers a channel for the connector
    ///
    /// # Errors
    ///
    /// `ConnectorNotFound` if the connector id does not resolve;
    /// `RegistrationFailed` if the provider call errors - the caller
    /// decides whether to retry.
    pub async fn execute(
        &self,
        connector_id: &ConnectorId,
    ) -> Result<WebhookChannel, ConnectorError> {
        self.store
            .get_connector(connector_id)
            .await
            .map_err(ConnectorError::store)?
            .ok_or(ConnectorError::ConnectorNotFound(*connector_id))?;

        // Stop any channel we still track before creating the new one,
        // so the provider side does not accumulate registrations.
        if let Some(previous) = self
            .store
            .find_channel_for_connector(connector_id)
            .await
            .map_err(ConnectorError::store)?
        {
            if let Err(e) = self
                .provider
                .stop_channel(previous.channel_id(), previous.resource_id())
                .await
            {
                warn!(
                    connector_id = %connector_id,
                    channel_id = %previous.channel_id(),
                    error = %e,
                    "Failed to stop previous channel, continuing with registration"
                );
            }
        }

        let grant = self
            .provider
            .create_channel(connector_id, &self.callback_url)
            .await
            .map_err(|e| ConnectorError::RegistrationFailed(e.to_string()))?;

        let channel = WebhookChannel::new(
            *connector_id,
            grant.channel_id,
            grant.resource_id,
            grant.expires_at,
        );

        // The store's unique constraint on connector id makes this a
        // replace, never a second row.
        self.store
            .save_channel(&channel)
            .await
            .map_err(ConnectorError::store)?;

        info!(
            connector_id = %connector_id,
            channel_id = %channel.channel_id(),
            expires_at = %channel.expires_at(),
            "Webhook channel registered"
        );

        Ok(channel)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Connector, ProviderKind};
    use crate::test_support::{FailureMode, FakeDirectoryProvider, InMemoryMirrorStore};

    struct Fixture {
        provider: Arc<FakeDirectoryProvider>,
        store: Arc<InMemoryMirrorStore>,
        usecase: RegisterChannelUseCase,
        connector_id: ConnectorId,
    }

    async fn fixture() -> Fixture {
        let provider = Arc::new(FakeDirectoryProvider::new(10));
        let store = Arc::new(InMemoryMirrorStore::new());
        let connector = Connector::new(ProviderKind::GoogleDrive);
        let connector_id = *connector.id();
        store.save_connector(&connector).await.unwrap();
        let usecase = RegisterChannelUseCase::new(
            Arc::clone(&provider) as Arc<dyn IDirectoryProvider>,
            Arc::clone(&store) as Arc<dyn IMirrorStore>,
            "https://connectors.example.com/notifications",
        );
        Fixture {
            provider,
            store,
            usecase,
            connector_id,
        }
    }

    #[tokio::test]
    async fn test_registration_persists_channel() {
        let f = fixture().await;

        let channel = f.usecase.execute(&f.connector_id).await.unwrap();

        let stored = f
            .store
            .find_channel_for_connector(&f.connector_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.channel_id(), channel.channel_id());
        assert!(!stored.is_expiring_soon(chrono::Utc::now()));
    }

    #[tokio::test]
    async fn test_reregistration_replaces_channel() {
        let f = fixture().await;

        f.usecase.execute(&f.connector_id).await.unwrap();
        f.usecase.execute(&f.connector_id).await.unwrap();

        // Still exactly one tracked channel
        let stored = f
            .store
            .find_channel_for_connector(&f.connector_id)
            .await
            .unwrap();
        assert!(stored.is_some());
    }

    #[tokio::test]
    async fn test_provider_failure_is_registration_failed() {
        let f = fixture().await;
        f.provider.fail_with(FailureMode::Unavailable);

        let err = f.usecase.execute(&f.connector_id).await.unwrap_err();
        assert!(matches!(err, ConnectorError::RegistrationFailed(_)));

        // Nothing persisted on failure
        let stored = f
            .store
            .find_channel_for_connector(&f.connector_id)
            .await
            .unwrap();
        assert!(stored.is_none());
    }

    #[tokio::test]
    async fn test_unknown_connector_fails() {
        let f = fixture().await;
        let err = f.usecase.execute(&ConnectorId::new()).await.unwrap_err();
        assert!(matches!(err, ConnectorError::ConnectorNotFound(_)));
    }
}
