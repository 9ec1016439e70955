//! Drive push-notification channels
//!
//! Creates and stops webhook channels via the Drive changes API. The
//! channel id is generated locally (a UUID) as the API requires; the
//! provider answers with its resource handle and the channel expiry in
//! epoch milliseconds.

use chrono::{DateTime, TimeZone, Utc};
use reqwest::Method;
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, info};
use uuid::Uuid;

use treeline_core::domain::newtypes::{ChannelId, ConnectorId};
use treeline_core::ports::{ChannelGrant, ProviderError};

use crate::client::DriveClient;

/// Raw response from `POST /changes/watch`
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WatchResponse {
    /// Echo of the channel id we supplied
    id: String,
    /// Provider resource handle, required to stop the channel
    resource_id: String,
    /// Channel expiry as epoch milliseconds (stringified)
    expiration: Option<String>,
}

/// Fallback channel lifetime when the provider omits the expiry
const DEFAULT_CHANNEL_TTL_HOURS: i64 = 24 * 7;

/// Creates a push-notification channel for the connector's changes feed
///
/// The connector id rides along as the channel token so notifications
/// can be routed even when the channel record is lost locally.
pub async fn create_channel(
    client: &DriveClient,
    connector_id: &ConnectorId,
    callback_url: &str,
) -> Result<ChannelGrant, ProviderError> {
    let channel_uuid = Uuid::new_v4().to_string();
    let body = json!({
        "id": channel_uuid,
        "type": "web_hook",
        "address": callback_url,
        "token": connector_id.to_string(),
    });

    let request = client
        .request(Method::POST, "/changes/watch")
        .query(&[("pageToken", "1"), ("supportsAllDrives", "true")])
        .json(&body);

    let response: WatchResponse = client
        .send(request)
        .await?
        .json()
        .await
        .map_err(|e| ProviderError::Unavailable(format!("Failed to parse watch response: {e}")))?;

    let channel_id = ChannelId::new(response.id)
        .map_err(|e| ProviderError::Unavailable(format!("Malformed channel id: {e}")))?;
    let expires_at = parse_expiration(response.expiration.as_deref());

    info!(
        connector_id = %connector_id,
        channel_id = %channel_id,
        expires_at = %expires_at,
        "Drive watch channel created"
    );

    Ok(ChannelGrant {
        channel_id,
        resource_id: response.resource_id,
        expires_at,
    })
}

/// Stops a previously created channel
pub async fn stop_channel(
    client: &DriveClient,
    channel_id: &ChannelId,
    resource_id: &str,
) -> Result<(), ProviderError> {
    let body = json!({
        "id": channel_id.as_str(),
        "resourceId": resource_id,
    });

    let request = client.request(Method::POST, "/channels/stop").json(&body);
    client.send(request).await?;

    debug!(channel_id = %channel_id, "Drive watch channel stopped");
    Ok(())
}

/// Parses the stringified epoch-millisecond expiry
///
/// A missing or malformed value falls back to the documented default
/// channel lifetime rather than failing the registration.
fn parse_expiration(expiration: Option<&str>) -> DateTime<Utc> {
    expiration
        .and_then(|e| e.parse::<i64>().ok())
        .and_then(|ms| Utc.timestamp_millis_opt(ms).single())
        .unwrap_or_else(|| Utc::now() + chrono::Duration::hours(DEFAULT_CHANNEL_TTL_HOURS))
}
