//! Frame Remote - Async client for Samsung Frame TVs.
//!
//! This library talks to the art-mode and remote-control WebSocket
//! channels of a Samsung Frame TV and to its REST device endpoint.
//!
//! # Architecture
//!
//! Each WebSocket channel is one [`Connection`]:
//!
//! - **Handshake**: `ms.channel.connect` then `ms.channel.ready`, with a
//!   pairing token persisted per channel
//! - **Requests**: correlated by `request_id`, answered or timed out
//! - **Events**: unsolicited service messages fanned out to one handler
//! - **Reconnection**: fixed-interval retry after an abnormal close
//!
//! Art uploads use a side TLS socket announced by the device: a 4-byte
//! big-endian header length, a JSON header, then the image bytes.
//!
//! # Quick Start
//!
//! ```no_run
//! use frame_remote::{FrameClient, Result};
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let client = FrameClient::builder()
//!         .host("192.168.1.20")
//!         .name("LivingRoom")
//!         .build()?;
//!
//!     client.connect().await?;
//!
//!     let art = client.art()?;
//!     for piece in art.available_art().await? {
//!         println!("{} ({:?})", piece.id, piece.matte);
//!     }
//!     art.set_brightness(7).await?;
//!
//!     client.close().await;
//!     Ok(())
//! }
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`client`] | [`FrameClient`], its builder and connection options |
//! | [`endpoint`] | [`ArtMode`], [`RemoteControl`], [`Device`] facades |
//! | [`error`] | Error types and [`Result`] alias |
//! | [`identifiers`] | Type-safe ID wrappers |
//! | [`protocol`] | Channel message types |
//! | [`transport`] | WebSocket session engine, token store, upload socket |

// ============================================================================
// Modules
// ============================================================================

/// Aggregate client and configuration.
///
/// Use [`FrameClient::builder()`] to create a configured client.
pub mod client;

/// Device endpoints.
///
/// - [`ArtMode`] - Art listing, selection, upload, mattes, brightness
/// - [`RemoteControl`] - Key events and power toggle
/// - [`Device`] - REST device description
pub mod endpoint;

/// Error types and result aliases.
///
/// All fallible operations return [`Result<T>`] which uses [`Error`].
pub mod error;

/// Type-safe identifiers.
pub mod identifiers;

/// Channel message types.
///
/// Outbound requests, inbound envelopes and event classification.
pub mod protocol;

/// Transport layer.
///
/// Session engine, pairing token store and upload socket.
pub mod transport;

// ============================================================================
// Re-exports
// ============================================================================

// Client types
pub use client::{ChannelIdentity, ClientBuilder, ConnectionOptions, FrameClient, Security, Service};

// Endpoint types
pub use endpoint::{
    ArtMode, ArtPiece, Device, DeviceDetails, DeviceInfo, Endpoint, Matte, RemoteControl,
    RemoteKey, UploadOptions,
};

// Error types
pub use error::{Error, Result};

// Identifier types
pub use identifiers::{ContentId, RequestId};

// Protocol types
pub use protocol::{KeyCommand, Notification};

// Transport types
pub use transport::{Connection, ConnectionState, TokenStore};
