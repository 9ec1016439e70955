//! Webhook channel entity
//!
//! A channel is a provider-issued push-notification registration.
//! This system tracks at most one active channel per connector;
//! renewal scheduling is an external concern, this entity only exposes
//! the expiry predicate the scheduler consults.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use super::newtypes::{ChannelId, ConnectorId};

/// How long before expiry a channel is considered due for renewal
const RENEWAL_MARGIN_HOURS: i64 = 24;

/// A tracked push-notification registration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebhookChannel {
    /// Owning connector
    connector_id: ConnectorId,
    /// Provider-assigned channel identifier
    channel_id: ChannelId,
    /// Provider-specific resource handle needed to stop the channel
    resource_id: String,
    /// Provider-supplied expiry
    expires_at: DateTime<Utc>,
    /// When the channel was created or last renewed
    renewed_at: DateTime<Utc>,
}

impl WebhookChannel {
    /// Creates a channel record from a fresh provider registration
    pub fn new(
        connector_id: ConnectorId,
        channel_id: ChannelId,
        resource_id: impl Into<String>,
        expires_at: DateTime<Utc>,
    ) -> Self {
        Self {
            connector_id,
            channel_id,
            resource_id: resource_id.into(),
            expires_at,
            renewed_at: Utc::now(),
        }
    }

    /// Reconstitutes a channel from storage
    pub fn from_parts(
        connector_id: ConnectorId,
        channel_id: ChannelId,
        resource_id: String,
        expires_at: DateTime<Utc>,
        renewed_at: DateTime<Utc>,
    ) -> Self {
        Self {
            connector_id,
            channel_id,
            resource_id,
            expires_at,
            renewed_at,
        }
    }

    /// Returns the owning connector id
    pub fn connector_id(&self) -> &ConnectorId {
        &self.connector_id
    }

    /// Returns the provider-assigned channel identifier
    pub fn channel_id(&self) -> &ChannelId {
        &self.channel_id
    }

    /// Returns the provider resource handle
    pub fn resource_id(&self) -> &str {
        &self.resource_id
    }

    /// Returns the provider-supplied expiry
    pub fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }

    /// Returns when the channel was created or last renewed
    pub fn renewed_at(&self) -> DateTime<Utc> {
        self.renewed_at
    }

    /// Returns true if the channel expires within the default renewal margin
    pub fn is_expiring_soon(&self, now: DateTime<Utc>) -> bool {
        self.is_expiring_within(now, Duration::hours(RENEWAL_MARGIN_HOURS))
    }

    /// Returns true if the channel expires within `margin` of `now`
    pub fn is_expiring_within(&self, now: DateTime<Utc>, margin: Duration) -> bool {
        now + margin >= self.expires_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn channel(expires_in: Duration) -> (WebhookChannel, DateTime<Utc>) {
        let now = Utc::now();
        let ch = WebhookChannel::new(
            ConnectorId::new(),
            ChannelId::new("chan-1".to_string()).unwrap(),
            "res-1",
            now + expires_in,
        );
        (ch, now)
    }

    #[test]
    fn test_fresh_channel_not_expiring() {
        let (ch, now) = channel(Duration::days(7));
        assert!(!ch.is_expiring_soon(now));
    }

    #[test]
    fn test_expiring_within_margin() {
        let (ch, now) = channel(Duration::hours(12));
        assert!(ch.is_expiring_soon(now));
    }

    #[test]
    fn test_already_expired() {
        let (ch, now) = channel(Duration::hours(-1));
        assert!(ch.is_expiring_soon(now));
    }

    #[test]
    fn test_custom_margin() {
        let (ch, now) = channel(Duration::hours(12));
        assert!(!ch.is_expiring_within(now, Duration::hours(1)));
        assert!(ch.is_expiring_within(now, Duration::hours(13)));
    }
}
