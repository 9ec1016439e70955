//! Treeline Drive - Google Drive directory adapter
//!
//! Implements the `IDirectoryProvider` port from `treeline-core`
//! against the Drive v3 API:
//! - [`client::DriveClient`] - authenticated HTTP client with status mapping
//! - [`files`] - file/drive listing and single-node lookup
//! - [`watch`] - push-notification channel create/stop
//! - [`provider::DriveDirectoryProvider`] - the port implementation
//!
//! Rate limiting is surfaced, never retried here: a 429 maps to
//! `ProviderError::RateLimited` and the caller owns backoff.

pub mod client;
pub mod files;
pub mod provider;
pub mod watch;

pub use client::DriveClient;
pub use provider::DriveDirectoryProvider;
