//! Channel identity and connection tuning.
//!
//! # Example
//!
//! ```ignore
//! use std::time::Duration;
//! use frame_remote::{ChannelIdentity, ConnectionOptions, Security};
//!
//! let identity = ChannelIdentity::art("192.168.1.20", 8002, "LivingRoom");
//! let options = ConnectionOptions::new()
//!     .with_request_timeout(Duration::from_secs(10))
//!     .with_security(Security::Tls);
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::path::PathBuf;
use std::time::Duration;

use base64::Engine;
use base64::engine::general_purpose::STANDARD as Base64Standard;
use url::Url;

use crate::error::{Error, Result};

// ============================================================================
// Constants
// ============================================================================

/// Secure WebSocket port of the device.
pub const DEFAULT_WS_PORT: u16 = 8002;

/// REST port of the device.
pub const DEFAULT_REST_PORT: u16 = 8001;

/// Channel path of the art application.
pub const ART_CHANNEL: &str = "com.samsung.art-app";

/// Channel path of the remote control.
pub const REMOTE_CHANNEL: &str = "samsung.remote.control";

const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(4);
const DEFAULT_RECONNECT_INTERVAL: Duration = Duration::from_secs(3);
const DEFAULT_HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(30);
const DEFAULT_UPLOAD_TIMEOUT: Duration = Duration::from_secs(30);

// ============================================================================
// Security
// ============================================================================

/// Transport security for the channel and upload streams.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Security {
    /// TLS, accepting the device's self-signed certificate.
    #[default]
    Tls,
    /// Unencrypted; for local test peers.
    Plain,
}

impl Security {
    /// WebSocket URL scheme.
    #[inline]
    #[must_use]
    pub const fn ws_scheme(self) -> &'static str {
        match self {
            Self::Tls => "wss",
            Self::Plain => "ws",
        }
    }
}

// ============================================================================
// ChannelIdentity
// ============================================================================

/// Identifies one logical channel on the device.
///
/// Fixed for the lifetime of a connection; a different identity needs a
/// new connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelIdentity {
    /// Device host or IP.
    pub host: String,
    /// WebSocket port.
    pub port: u16,
    /// Channel path (e.g. `com.samsung.art-app`).
    pub path: String,
    /// Display name shown in the pairing prompt.
    pub name: String,
}

impl ChannelIdentity {
    /// Creates a channel identity.
    #[must_use]
    pub fn new(
        host: impl Into<String>,
        port: u16,
        path: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        Self {
            host: host.into(),
            port,
            path: path.into(),
            name: name.into(),
        }
    }

    /// Identity of the art channel; the display name gets an `Art` suffix.
    #[must_use]
    pub fn art(host: impl Into<String>, port: u16, name: &str) -> Self {
        Self::new(host, port, ART_CHANNEL, format!("{name}Art"))
    }

    /// Identity of the remote-control channel; the display name gets a
    /// `Remote` suffix.
    #[must_use]
    pub fn remote(host: impl Into<String>, port: u16, name: &str) -> Self {
        Self::new(host, port, REMOTE_CHANNEL, format!("{name}Remote"))
    }

    /// Builds the channel URL.
    ///
    /// Format: `{scheme}://{host}:{port}/api/v2/channels/{path}?name={base64 name}&token={token|None}`
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if host or path do not form a valid URL.
    pub fn channel_url(&self, security: Security, token: Option<&str>) -> Result<Url> {
        let base = format!(
            "{}://{}:{}/api/v2/channels/{}",
            security.ws_scheme(),
            self.host,
            self.port,
            self.path
        );
        let mut url =
            Url::parse(&base).map_err(|e| Error::config(format!("invalid channel url {base}: {e}")))?;
        url.query_pairs_mut()
            .append_pair("name", &Base64Standard.encode(self.name.as_bytes()))
            .append_pair("token", token.unwrap_or("None"));
        Ok(url)
    }
}

// ============================================================================
// ConnectionOptions
// ============================================================================

/// Timeouts, security and token location for a connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionOptions {
    /// Transport security.
    pub security: Security,

    /// Deadline for a correlated response.
    pub request_timeout: Duration,

    /// Fixed delay before an automatic reconnect.
    pub reconnect_interval: Duration,

    /// Deadline for the channel handshake (includes the pairing prompt).
    pub handshake_timeout: Duration,

    /// Deadline for the device to confirm an upload.
    pub upload_timeout: Duration,

    /// Directory for pairing tokens (`None` = OS temp directory).
    pub token_dir: Option<PathBuf>,
}

impl Default for ConnectionOptions {
    fn default() -> Self {
        Self::new()
    }
}

impl ConnectionOptions {
    /// Creates options with default settings.
    #[inline]
    #[must_use]
    pub const fn new() -> Self {
        Self {
            security: Security::Tls,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            reconnect_interval: DEFAULT_RECONNECT_INTERVAL,
            handshake_timeout: DEFAULT_HANDSHAKE_TIMEOUT,
            upload_timeout: DEFAULT_UPLOAD_TIMEOUT,
            token_dir: None,
        }
    }

    /// Sets transport security.
    #[inline]
    #[must_use]
    pub fn with_security(mut self, security: Security) -> Self {
        self.security = security;
        self
    }

    /// Sets the request deadline.
    #[inline]
    #[must_use]
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Sets the reconnect delay.
    #[inline]
    #[must_use]
    pub fn with_reconnect_interval(mut self, interval: Duration) -> Self {
        self.reconnect_interval = interval;
        self
    }

    /// Sets the handshake deadline.
    #[inline]
    #[must_use]
    pub fn with_handshake_timeout(mut self, timeout: Duration) -> Self {
        self.handshake_timeout = timeout;
        self
    }

    /// Sets the upload confirmation deadline.
    #[inline]
    #[must_use]
    pub fn with_upload_timeout(mut self, timeout: Duration) -> Self {
        self.upload_timeout = timeout;
        self
    }

    /// Sets the token directory.
    #[inline]
    #[must_use]
    pub fn with_token_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.token_dir = Some(dir.into());
        self
    }

    /// Returns the token directory, falling back to the OS temp directory.
    #[must_use]
    pub fn token_dir(&self) -> PathBuf {
        self.token_dir.clone().unwrap_or_else(std::env::temp_dir)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_options() {
        let options = ConnectionOptions::default();
        assert_eq!(options.security, Security::Tls);
        assert_eq!(options.request_timeout, Duration::from_secs(4));
        assert_eq!(options.reconnect_interval, Duration::from_secs(3));
        assert_eq!(options.token_dir(), std::env::temp_dir());
    }

    #[test]
    fn test_builder_chain() {
        let options = ConnectionOptions::new()
            .with_security(Security::Plain)
            .with_request_timeout(Duration::from_millis(250))
            .with_token_dir("/tmp/tokens");
        assert_eq!(options.security, Security::Plain);
        assert_eq!(options.request_timeout, Duration::from_millis(250));
        assert_eq!(options.token_dir(), PathBuf::from("/tmp/tokens"));
    }

    #[test]
    fn test_channel_url_without_token() {
        let identity = ChannelIdentity::new("127.0.0.1", 8002, "testing", "undefined");
        let url = identity.channel_url(Security::Tls, None).expect("url");
        assert_eq!(
            url.as_str(),
            "wss://127.0.0.1:8002/api/v2/channels/testing?name=dW5kZWZpbmVk&token=None"
        );
    }

    #[test]
    fn test_channel_url_with_token() {
        let identity = ChannelIdentity::art("10.0.0.5", 8002, "Tv");
        let url = identity.channel_url(Security::Plain, Some("12345")).expect("url");
        assert!(url.as_str().starts_with("ws://10.0.0.5:8002/api/v2/channels/com.samsung.art-app?"));
        assert!(url.as_str().ends_with("&token=12345"));
    }

    #[test]
    fn test_identity_suffixes() {
        assert_eq!(ChannelIdentity::art("h", 1, "Tv").name, "TvArt");
        assert_eq!(ChannelIdentity::remote("h", 1, "Tv").path, REMOTE_CHANNEL);
    }
}
