//! Device endpoints.
//!
//! Typed facades over the channels and the REST interface of the device.
//!
//! | Endpoint | Transport | Purpose |
//! |----------|-----------|---------|
//! | [`ArtMode`] | WebSocket `com.samsung.art-app` | Art listing, selection, upload, mattes, brightness |
//! | [`RemoteControl`] | WebSocket `samsung.remote.control` | Key events, power toggle |
//! | [`Device`] | HTTP `:8001/api/v2/` | Device description, power state |

// ============================================================================
// Imports
// ============================================================================

use async_trait::async_trait;

use crate::error::Result;

// ============================================================================
// Submodules
// ============================================================================

/// Art-mode endpoint.
pub mod art;

/// Artwork and matte types.
pub mod artwork;

/// Device REST endpoint.
pub mod device;

/// Remote-control key definitions.
pub mod keys;

/// Remote-control endpoint.
pub mod remote;

// ============================================================================
// Re-exports
// ============================================================================

pub use art::{ArtMode, UploadOptions};
pub use artwork::{ArtPiece, Matte};
pub use device::{Device, DeviceDetails, DeviceInfo};
pub use keys::RemoteKey;
pub use remote::RemoteControl;

// ============================================================================
// Endpoint Trait
// ============================================================================

/// Lifecycle shared by every endpoint.
#[async_trait]
pub trait Endpoint: Send + Sync {
    /// Service name (`art-mode`, `remote-control`, `device`).
    fn name(&self) -> &'static str;

    /// Opens the endpoint.
    async fn connect(&self) -> Result<()>;

    /// Closes the endpoint.
    async fn close(&self);
}
