//! Aggregate client over all device endpoints.
//!
//! # Example
//!
//! ```no_run
//! use frame_remote::FrameClient;
//!
//! # async fn example() -> frame_remote::Result<()> {
//! let client = FrameClient::builder().host("192.168.1.20").build()?;
//!
//! let info = client.device()?.device_info().await?;
//! println!("Found {} ({})", info.name, info.device.model_name);
//!
//! client.connect().await?;
//! println!("In art mode: {}", client.art()?.in_art_mode().await?);
//! client.close().await;
//! # Ok(())
//! # }
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;

use futures_util::future::{join_all, try_join_all};
use tracing::{debug, info};

use crate::endpoint::{ArtMode, Device, Endpoint, RemoteControl};
use crate::error::{Error, Result};

use super::builder::ClientBuilder;
use super::options::{ChannelIdentity, ConnectionOptions};
use super::service::Service;

// ============================================================================
// Types
// ============================================================================

/// Internal shared state for the client.
struct ClientInner {
    /// Device host.
    host: String,
    /// Art-mode endpoint, when enabled.
    art: Option<ArtMode>,
    /// Remote-control endpoint, when enabled.
    remote: Option<RemoteControl>,
    /// REST endpoint, when enabled.
    device: Option<Device>,
}

// ============================================================================
// FrameClient
// ============================================================================

/// Client for one Frame TV.
///
/// Owns one endpoint per enabled service; [`FrameClient::connect`] and
/// [`FrameClient::close`] act on all of them.
#[derive(Clone)]
pub struct FrameClient {
    inner: Arc<ClientInner>,
}

// ============================================================================
// FrameClient - Display
// ============================================================================

impl fmt::Debug for FrameClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FrameClient")
            .field("host", &self.inner.host)
            .field("services", &self.services())
            .finish_non_exhaustive()
    }
}

// ============================================================================
// FrameClient - Public API
// ============================================================================

impl FrameClient {
    /// Creates a configuration builder for the client.
    #[inline]
    #[must_use]
    pub fn builder() -> ClientBuilder {
        ClientBuilder::new()
    }

    /// Creates a client from validated configuration.
    pub(crate) fn new(
        host: String,
        name: &str,
        ws_port: u16,
        rest_port: u16,
        services: &[Service],
        options: ConnectionOptions,
    ) -> Result<Self> {
        let art = services.contains(&Service::ArtMode).then(|| {
            ArtMode::new(ChannelIdentity::art(host.as_str(), ws_port, name), options.clone())
        });
        let remote = services.contains(&Service::RemoteControl).then(|| {
            RemoteControl::new(
                ChannelIdentity::remote(host.as_str(), ws_port, name),
                options.clone(),
            )
        });
        let device = if services.contains(&Service::Device) {
            Some(Device::new(&host, rest_port)?)
        } else {
            None
        };

        debug!(%host, ?services, "Client created");
        Ok(Self {
            inner: Arc::new(ClientInner {
                host,
                art,
                remote,
                device,
            }),
        })
    }

    /// Returns the device host.
    #[inline]
    #[must_use]
    pub fn host(&self) -> &str {
        &self.inner.host
    }

    /// Returns the enabled services.
    #[must_use]
    pub fn services(&self) -> Vec<Service> {
        let mut services = Vec::with_capacity(3);
        if self.inner.art.is_some() {
            services.push(Service::ArtMode);
        }
        if self.inner.remote.is_some() {
            services.push(Service::RemoteControl);
        }
        if self.inner.device.is_some() {
            services.push(Service::Device);
        }
        services
    }

    /// Returns the art-mode endpoint.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the service is not enabled.
    pub fn art(&self) -> Result<&ArtMode> {
        self.inner
            .art
            .as_ref()
            .ok_or_else(|| not_enabled(Service::ArtMode))
    }

    /// Returns the remote-control endpoint.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the service is not enabled.
    pub fn remote(&self) -> Result<&RemoteControl> {
        self.inner
            .remote
            .as_ref()
            .ok_or_else(|| not_enabled(Service::RemoteControl))
    }

    /// Returns the REST endpoint.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the service is not enabled.
    pub fn device(&self) -> Result<&Device> {
        self.inner
            .device
            .as_ref()
            .ok_or_else(|| not_enabled(Service::Device))
    }

    /// Opens every enabled endpoint concurrently.
    ///
    /// # Errors
    ///
    /// Returns the first endpoint error.
    pub async fn connect(&self) -> Result<()> {
        let endpoints = self.endpoints();
        info!(host = %self.inner.host, count = endpoints.len(), "Connecting endpoints");
        try_join_all(endpoints.iter().map(|endpoint| endpoint.connect())).await?;
        info!(host = %self.inner.host, "All endpoints connected");
        Ok(())
    }

    /// Closes every enabled endpoint.
    pub async fn close(&self) {
        let endpoints = self.endpoints();
        join_all(endpoints.iter().map(|endpoint| endpoint.close())).await;
        debug!(host = %self.inner.host, "All endpoints closed");
    }

    fn endpoints(&self) -> Vec<&dyn Endpoint> {
        let mut endpoints: Vec<&dyn Endpoint> = Vec::with_capacity(3);
        if let Some(art) = &self.inner.art {
            endpoints.push(art);
        }
        if let Some(remote) = &self.inner.remote {
            endpoints.push(remote);
        }
        if let Some(device) = &self.inner.device {
            endpoints.push(device);
        }
        endpoints
    }
}

fn not_enabled(service: Service) -> Error {
    Error::config(format!("The {service} service is not enabled for this client"))
}

// ============================================================================
// Tests
// ============================================================================
