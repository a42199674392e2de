//! Remote-control endpoint.
//!
//! Key events over the `samsung.remote.control` channel. Key messages are
//! fire-and-forget; the device sends no correlated reply.

// ============================================================================
// Imports
// ============================================================================

use std::time::Duration;

use async_trait::async_trait;
use tokio::time::sleep;
use tracing::debug;

use crate::client::{ChannelIdentity, ConnectionOptions};
use crate::error::Result;
use crate::protocol::{KeyCommand, RemoteKeyMessage};
use crate::transport::Connection;

use super::Endpoint;
use super::keys::RemoteKey;

// ============================================================================
// Constants
// ============================================================================

/// How long the power key is held for [`RemoteControl::toggle_power`].
pub const TOGGLE_POWER_DWELL: Duration = Duration::from_secs(3);

// ============================================================================
// RemoteControl
// ============================================================================

/// Remote-control channel of the device.
#[derive(Debug, Clone)]
pub struct RemoteControl {
    connection: Connection,
}

impl RemoteControl {
    /// Creates the endpoint; no I/O until [`RemoteControl::connect`].
    #[must_use]
    pub fn new(identity: ChannelIdentity, options: ConnectionOptions) -> Self {
        Self {
            connection: Connection::new(identity, options),
        }
    }

    /// Returns the underlying connection.
    #[inline]
    #[must_use]
    pub fn connection(&self) -> &Connection {
        &self.connection
    }

    /// Opens the channel (pairing if needed).
    ///
    /// # Errors
    ///
    /// See [`Connection::connect`].
    pub async fn connect(&self) -> Result<()> {
        self.connection.connect().await
    }

    /// Closes the channel.
    pub async fn close(&self) {
        self.connection.close().await;
    }

    /// Sends one key event.
    ///
    /// # Errors
    ///
    /// - [`Error::ConnectionClosed`](crate::Error::ConnectionClosed) if the channel is not open
    /// - [`Error::WebSocket`](crate::Error::WebSocket) if the write fails
    pub async fn send_key(&self, key: RemoteKey, cmd: KeyCommand) -> Result<()> {
        self.send_key_code(key.code(), cmd).await
    }

    /// Sends one key event by raw key code (e.g. `KEY_AMBIENT`).
    ///
    /// # Errors
    ///
    /// See [`RemoteControl::send_key`].
    pub async fn send_key_code(&self, code: &str, cmd: KeyCommand) -> Result<()> {
        debug!(key = code, ?cmd, "Sending key");
        self.connection.emit(&RemoteKeyMessage::new(cmd, code)).await
    }

    /// Presses and releases a key in one message.
    ///
    /// # Errors
    ///
    /// See [`RemoteControl::send_key`].
    pub async fn click(&self, key: RemoteKey) -> Result<()> {
        self.send_key(key, KeyCommand::Click).await
    }

    /// Presses a key, holds it for `dwell`, then releases it.
    ///
    /// # Errors
    ///
    /// See [`RemoteControl::send_key`]. No release is sent if the press fails.
    pub async fn press_and_hold(&self, key: RemoteKey, dwell: Duration) -> Result<()> {
        self.send_key(key, KeyCommand::Press).await?;
        sleep(dwell).await;
        self.send_key(key, KeyCommand::Release).await
    }

    /// Toggles power by holding the power key for three seconds.
    ///
    /// On a Frame TV a short press only switches between art mode and TV.
    ///
    /// # Errors
    ///
    /// See [`RemoteControl::press_and_hold`].
    pub async fn toggle_power(&self) -> Result<()> {
        self.press_and_hold(RemoteKey::Power, TOGGLE_POWER_DWELL).await
    }
}

#[async_trait]
impl Endpoint for RemoteControl {
    fn name(&self) -> &'static str {
        "remote-control"
    }

    async fn connect(&self) -> Result<()> {
        RemoteControl::connect(self).await
    }

    async fn close(&self) {
        RemoteControl::close(self).await;
    }
}

// ============================================================================
// Tests
// ============================================================================
