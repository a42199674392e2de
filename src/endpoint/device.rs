//! Device REST endpoint.
//!
//! A stateless GET against `http://{host}:8001/api/v2/`. Useful before
//! pairing, e.g. to check the model or whether the screen is on.

// ============================================================================
// Imports
// ============================================================================

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;
use url::Url;

use crate::error::{Error, Result};

use super::Endpoint;

// ============================================================================
// DeviceInfo
// ============================================================================

/// Device description returned by the REST interface.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DeviceInfo {
    /// Device identifier.
    #[serde(default)]
    pub id: String,
    /// Friendly name.
    #[serde(default)]
    pub name: String,
    /// Device class (e.g. `Samsung SmartTV`).
    #[serde(default, rename = "type")]
    pub device_type: String,
    /// REST API version.
    #[serde(default)]
    pub version: String,
    /// REST base URI as reported by the device.
    #[serde(default)]
    pub uri: String,
    /// Hardware and state details.
    pub device: DeviceDetails,
}

/// The `device` block of [`DeviceInfo`].
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DeviceDetails {
    /// Friendly name.
    #[serde(default)]
    pub name: String,
    /// Device class.
    #[serde(default, rename = "type")]
    pub device_type: String,
    /// Marketing model name (e.g. `QN32LS03CBFXZA`).
    #[serde(default, rename = "modelName")]
    pub model_name: String,
    /// Internal model code.
    #[serde(default)]
    pub model: String,
    /// `on` when the screen is on.
    #[serde(default, rename = "PowerState")]
    pub power_state: Option<String>,
    /// `true` on Frame models.
    #[serde(default, rename = "FrameTVSupport")]
    pub frame_tv_support: Option<String>,
    /// `true` when token pairing is supported.
    #[serde(default, rename = "TokenAuthSupport")]
    pub token_auth_support: Option<String>,
    /// Operating system.
    #[serde(default, rename = "OS")]
    pub os: Option<String>,
    /// Firmware version.
    #[serde(default, rename = "firmwareVersion")]
    pub firmware_version: Option<String>,
    /// Panel resolution (e.g. `1920x1080`).
    #[serde(default)]
    pub resolution: Option<String>,
    /// Device IP.
    #[serde(default)]
    pub ip: Option<String>,
    /// Wi-Fi MAC address.
    #[serde(default, rename = "wifiMac")]
    pub wifi_mac: Option<String>,
}

impl DeviceInfo {
    /// Returns `true` if the device reports its screen on.
    #[inline]
    #[must_use]
    pub fn is_on(&self) -> bool {
        self.device.power_state.as_deref() == Some("on")
    }

    /// Returns `true` if the device is a Frame TV.
    #[inline]
    #[must_use]
    pub fn is_frame_tv(&self) -> bool {
        self.device.frame_tv_support.as_deref() == Some("true")
    }
}

// ============================================================================
// Device
// ============================================================================

/// REST endpoint of the device.
#[derive(Debug, Clone)]
pub struct Device {
    base_url: Url,
    http: Client,
}

impl Device {
    /// Creates the endpoint for `host:port`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if host and port do not form a valid URL.
    pub fn new(host: &str, port: u16) -> Result<Self> {
        let raw = format!("http://{host}:{port}/api/v2/");
        let base_url =
            Url::parse(&raw).map_err(|e| Error::config(format!("invalid device url {raw}: {e}")))?;
        Ok(Self {
            base_url,
            http: Client::new(),
        })
    }

    /// Returns the REST base URL.
    #[inline]
    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Fetches the device description.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Http`] on transport failures, non-success statuses
    /// or an unexpected body.
    pub async fn device_info(&self) -> Result<DeviceInfo> {
        debug!(url = %self.base_url, "Fetching device info");
        let info = self
            .http
            .get(self.base_url.clone())
            .send()
            .await?
            .error_for_status()?
            .json::<DeviceInfo>()
            .await?;
        debug!(name = %info.name, model = %info.device.model_name, "Got device info");
        Ok(info)
    }

    /// Returns `true` if the screen is on.
    pub async fn is_on(&self) -> Result<bool> {
        Ok(self.device_info().await?.is_on())
    }
}

#[async_trait]
impl Endpoint for Device {
    fn name(&self) -> &'static str {
        "device"
    }

    /// Stateless; nothing to open.
    async fn connect(&self) -> Result<()> {
        Ok(())
    }

    async fn close(&self) {}
}

// ============================================================================
// Tests
// ============================================================================
