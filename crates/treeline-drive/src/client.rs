//! Google Drive API client
//!
//! A typed HTTP client for the Drive v3 API. Handles authentication
//! headers, endpoint construction, and status mapping into
//! [`ProviderError`]. There is deliberately no retry loop here: 429 is
//! surfaced as a backoff signal and retry policy belongs to the
//! workflow engine.

use std::time::Duration;

use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use tracing::{debug, warn};

use treeline_core::ports::ProviderError;

/// Base URL for the Google Drive v3 API
const DRIVE_BASE_URL: &str = "https://www.googleapis.com/drive/v3";

/// Request timeout applied to every Drive call
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// HTTP client for Google Drive API calls
///
/// Wraps `reqwest::Client` with bearer authentication and base URL
/// construction.
pub struct DriveClient {
    /// The underlying HTTP client
    client: Client,
    /// Base URL for API requests
    base_url: String,
    /// Current OAuth2 access token
    access_token: String,
}

impl DriveClient {
    /// Creates a new DriveClient with the given access token
    pub fn new(access_token: impl Into<String>) -> Self {
        Self::with_base_url(access_token, DRIVE_BASE_URL)
    }

    /// Creates a new DriveClient with a custom base URL (useful for testing)
    pub fn with_base_url(access_token: impl Into<String>, base_url: impl Into<String>) -> Self {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .unwrap_or_default();
        Self {
            client,
            base_url: base_url.into(),
            access_token: access_token.into(),
        }
    }

    /// Updates the access token (e.g., after an external refresh)
    pub fn set_access_token(&mut self, token: impl Into<String>) {
        self.access_token = token.into();
        debug!("Updated DriveClient access token");
    }

    /// Returns the base URL for API requests
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Creates an authenticated request builder for the given method and path
    ///
    /// Automatically prepends the base URL and adds the Authorization header.
    pub fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}{}", self.base_url, path);
        self.client
            .request(method, &url)
            .bearer_auth(&self.access_token)
    }

    /// Sends a request and maps error statuses into [`ProviderError`]
    ///
    /// 429 becomes `RateLimited` carrying the parsed `Retry-After`
    /// value; every other non-success status becomes `Unavailable`.
    pub async fn send(&self, request: RequestBuilder) -> Result<Response, ProviderError> {
        let response = request
            .send()
            .await
            .map_err(|e| ProviderError::Unavailable(format!("Request failed: {e}")))?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after_secs = response
                .headers()
                .get("Retry-After")
                .and_then(|v| v.to_str().ok())
                .and_then(parse_retry_after);
            warn!(?retry_after_secs, "Drive API rate limited the request");
            return Err(ProviderError::RateLimited { retry_after_secs });
        }

        if !status.is_success() && status != StatusCode::NOT_FOUND {
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::Unavailable(format!(
                "Drive API returned {status}: {body}"
            )));
        }

        Ok(response)
    }
}

/// Parses a `Retry-After` header value into seconds
///
/// Accepts integer seconds (the common Drive form) or an HTTP-date;
/// dates further than an hour out are ignored.
pub fn parse_retry_after(value: &str) -> Option<u64> {
    if let Ok(seconds) = value.trim().parse::<u64>() {
        return Some(seconds);
    }

    if let Ok(date) = chrono::DateTime::parse_from_rfc2822(value.trim()) {
        let now = chrono::Utc::now();
        let target = date.with_timezone(&chrono::Utc);
        if target > now {
            let diff = target - now;
            return diff
                .num_seconds()
                .try_into()
                .ok()
                .filter(|&s: &u64| s <= 3600);
        }
    }

    None
}
