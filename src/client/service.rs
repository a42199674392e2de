//! Service selection.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::str::FromStr;

use crate::error::Error;

// ============================================================================
// Service
// ============================================================================

/// A service the client can talk to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Service {
    /// Art-mode channel.
    ArtMode,
    /// Remote-control channel.
    RemoteControl,
    /// REST device information.
    Device,
}

impl Service {
    /// All services, in connect order.
    pub const ALL: [Service; 3] = [Service::ArtMode, Service::RemoteControl, Service::Device];

    /// Returns the service name.
    #[inline]
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Service::ArtMode => "art-mode",
            Service::RemoteControl => "remote-control",
            Service::Device => "device",
        }
    }
}

impl fmt::Display for Service {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Service {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "art-mode" => Ok(Service::ArtMode),
            "remote-control" => Ok(Service::RemoteControl),
            "device" => Ok(Service::Device),
            other => Err(Error::config(format!(
                "unknown service {other:?}; expected art-mode, remote-control or device"
            ))),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
