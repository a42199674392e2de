//! WebSocket transport layer.
//!
//! This module handles the channel to the device and the side streams used
//! for uploads.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────┐                              ┌─────────────────┐
//! │  Endpoint       │        WebSocket (TLS)       │  Device         │
//! │  (Rust)         │◄────────────────────────────►│  channel        │
//! │  → Connection   │     host:8002/api/v2/...     │  (art/remote)   │
//! │                 │                              │                 │
//! │  upload()       │─────── TCP/TLS stream ──────►│  upload socket  │
//! └─────────────────┘                              └─────────────────┘
//! ```
//!
//! # Connection Lifecycle
//!
//! 1. `Connection::new` - Bind identity and options, no I/O yet
//! 2. `Connection::connect` - Open channel, pair if needed, wait for ready
//! 3. `Connection::request` / `emit` - Send messages, receive responses/events
//! 4. Abnormal closure - Automatic reconnect after a fixed interval
//! 5. `Connection::close` - Normal closure, no reconnect
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `connection` | WebSocket connection and event loop |
//! | `tls` | TLS configuration and side streams |
//! | `token` | Pairing token persistence |
//! | `upload` | Upload sub-protocol |

// ============================================================================
// Submodules
// ============================================================================

/// WebSocket connection and event loop.
pub mod connection;

/// TLS configuration accepting the device certificate.
pub mod tls;

/// Pairing token persistence.
pub mod token;

/// Upload sub-protocol.
pub mod upload;

#[cfg(test)]
pub(crate) mod mock;

// ============================================================================
// Re-exports
// ============================================================================

pub use connection::{Connection, ConnectionState, EventHandler, PendingResponse};
pub use token::TokenStore;
pub use upload::{UploadEndpoint, UploadHeader, UploadRequest};
