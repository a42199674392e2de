//! Wire message types.
//!
//! This module defines the message format spoken on the device's
//! WebSocket channels.
//!
//! # Protocol Overview
//!
//! | Message Type | Direction | Purpose |
//! |--------------|-----------|---------|
//! | `Request` | Local → Device | Correlated art request |
//! | `Response` | Device → Local | Correlated reply |
//! | `Notification` | Device → Local | Unsolicited event |
//! | `RemoteKeyMessage` | Local → Device | Remote key press (no reply) |
//!
//! # Double Encoding
//!
//! Request bodies and service-message payloads are JSON documents carried
//! as *strings* inside the outer JSON envelope. Several response fields
//! (`content_list`, `conn_info`, ...) are encoded a second time on top.
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `command` | Typed art and remote-control commands |
//! | `event` | Inbound frame classification |
//! | `request` | Request and Response types |

// ============================================================================
// Submodules
// ============================================================================

/// Typed command definitions.
pub mod command;

/// Inbound frame types.
pub mod event;

/// Request and Response message types.
pub mod request;

// ============================================================================
// Re-exports
// ============================================================================

pub use command::{ArtCommand, ContentRef, KeyCommand, RemoteKeyMessage, UploadSocketRequest};
pub use event::{Inbound, Notification};
pub use request::{Request, Response};
