//! Builder pattern for client configuration.
//!
//! Provides a fluent API for configuring and creating [`FrameClient`]
//! instances.
//!
//! # Example
//!
//! ```no_run
//! use frame_remote::{FrameClient, Service};
//!
//! # fn example() -> frame_remote::Result<()> {
//! let client = FrameClient::builder()
//!     .host("192.168.1.20")
//!     .name("LivingRoom")
//!     .services([Service::ArtMode, Service::Device])
//!     .build()?;
//! # Ok(())
//! # }
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::path::PathBuf;

use crate::error::{Error, Result};

use super::core::FrameClient;
use super::options::{ConnectionOptions, DEFAULT_REST_PORT, DEFAULT_WS_PORT};
use super::service::Service;

// ============================================================================
// Constants
// ============================================================================

/// Display name used when none is set.
pub const DEFAULT_CLIENT_NAME: &str = "SamsungTv";

// ============================================================================
// ClientBuilder
// ============================================================================

/// Builder for configuring a [`FrameClient`] instance.
///
/// Use [`FrameClient::builder()`] to create a new builder.
#[derive(Debug, Clone)]
pub struct ClientBuilder {
    /// Device host or IP.
    host: Option<String>,
    /// Display name shown in the pairing prompt.
    name: String,
    /// WebSocket port.
    ws_port: u16,
    /// REST port.
    rest_port: u16,
    /// Enabled services.
    services: Vec<Service>,
    /// Connection tuning shared by both channels.
    options: ConnectionOptions,
}

impl Default for ClientBuilder {
    fn default() -> Self {
        Self {
            host: None,
            name: DEFAULT_CLIENT_NAME.to_string(),
            ws_port: DEFAULT_WS_PORT,
            rest_port: DEFAULT_REST_PORT,
            services: Service::ALL.to_vec(),
            options: ConnectionOptions::default(),
        }
    }
}

// ============================================================================
// ClientBuilder Implementation
// ============================================================================

impl ClientBuilder {
    /// Creates a builder with every service enabled.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the device host or IP (required).
    #[inline]
    #[must_use]
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.host = Some(host.into());
        self
    }

    /// Sets the display name shown in the pairing prompt.
    ///
    /// Each channel appends its own suffix (`Art`, `Remote`).
    #[inline]
    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Sets the WebSocket port.
    #[inline]
    #[must_use]
    pub fn ws_port(mut self, port: u16) -> Self {
        self.ws_port = port;
        self
    }

    /// Sets the REST port.
    #[inline]
    #[must_use]
    pub fn rest_port(mut self, port: u16) -> Self {
        self.rest_port = port;
        self
    }

    /// Replaces the enabled services.
    #[must_use]
    pub fn services(mut self, services: impl IntoIterator<Item = Service>) -> Self {
        self.services = services.into_iter().collect();
        self
    }

    /// Sets connection options for both channels.
    #[inline]
    #[must_use]
    pub fn options(mut self, options: ConnectionOptions) -> Self {
        self.options = options;
        self
    }

    /// Sets the pairing token directory.
    #[inline]
    #[must_use]
    pub fn token_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.options = self.options.with_token_dir(dir);
        self
    }

    /// Builds the client with validation.
    ///
    /// # Errors
    ///
    /// - [`Error::Config`] if the host is missing or malformed
    /// - [`Error::Config`] if the name is empty
    /// - [`Error::Config`] if no service is enabled or a port is zero
    pub fn build(self) -> Result<FrameClient> {
        let host = self.validate_host()?;
        self.validate_name()?;
        let services = self.validate_services()?;
        self.validate_ports()?;

        FrameClient::new(
            host,
            &self.name,
            self.ws_port,
            self.rest_port,
            &services,
            self.options,
        )
    }
}

// ============================================================================
// Validation
// ============================================================================

impl ClientBuilder {
    /// Validates the host.
    fn validate_host(&self) -> Result<String> {
        let host = self.host.as_deref().map(str::trim).unwrap_or_default();

        if host.is_empty() {
            return Err(Error::config(
                "Device host is required. Use .host() to set it.\n\
                 Example: FrameClient::builder().host(\"192.168.1.20\")",
            ));
        }
        if host.contains(char::is_whitespace) || host.contains('/') {
            return Err(Error::config(format!("Invalid device host: {host:?}")));
        }

        Ok(host.to_string())
    }

    /// Validates the display name.
    fn validate_name(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(Error::config("Client name must not be empty"));
        }
        Ok(())
    }

    /// Validates and de-duplicates the services.
    fn validate_services(&self) -> Result<Vec<Service>> {
        let mut services = Vec::with_capacity(self.services.len());
        for service in &self.services {
            if !services.contains(service) {
                services.push(*service);
            }
        }

        if services.is_empty() {
            return Err(Error::config("At least one service must be enabled"));
        }
        Ok(services)
    }

    /// Validates the ports.
    fn validate_ports(&self) -> Result<()> {
        if self.ws_port == 0 || self.rest_port == 0 {
            return Err(Error::config("Ports must be non-zero"));
        }
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_builder() {
        let builder = ClientBuilder::new();
        assert!(builder.host.is_none());
        assert_eq!(builder.name, "SamsungTv");
        assert_eq!(builder.ws_port, 8002);
        assert_eq!(builder.rest_port, 8001);
        assert_eq!(builder.services, Service::ALL.to_vec());
    }

    #[test]
    fn test_missing_host() {
        let err = ClientBuilder::new().build().unwrap_err();
        assert!(matches!(err, Error::Config { .. }));
        assert!(err.to_string().contains(".host()"));
    }

    #[test]
    fn test_malformed_host() {
        let err = ClientBuilder::new().host("bad host").build().unwrap_err();
        assert!(matches!(err, Error::Config { .. }));
    }

    #[test]
    fn test_empty_name() {
        let err = ClientBuilder::new().host("10.0.0.5").name("  ").build().unwrap_err();
        assert!(matches!(err, Error::Config { .. }));
    }

    #[test]
    fn test_no_services() {
        let err = ClientBuilder::new()
            .host("10.0.0.5")
            .services([])
            .build()
            .unwrap_err();
        assert!(matches!(err, Error::Config { .. }));
    }

    #[test]
    fn test_zero_port() {
        let err = ClientBuilder::new().host("10.0.0.5").ws_port(0).build().unwrap_err();
        assert!(matches!(err, Error::Config { .. }));
    }

    #[test]
    fn test_duplicate_services_collapse() {
        let builder = ClientBuilder::new().services([Service::Device, Service::Device]);
        assert_eq!(builder.validate_services().expect("services"), vec![Service::Device]);
    }
}
