//! Client configuration and the aggregate client.
//!
//! # Components
//!
//! | Type | Description |
//! |------|-------------|
//! | [`FrameClient`] | One device, all enabled endpoints |
//! | [`ClientBuilder`] | Fluent, validating configuration |
//! | [`ChannelIdentity`] | Host, port, channel path and display name |
//! | [`ConnectionOptions`] | Timeouts, security, token directory |
//! | [`Service`] | Selectable services |

// ============================================================================
// Submodules
// ============================================================================

/// Fluent builder pattern for client configuration.
pub mod builder;

/// Aggregate client implementation.
pub mod core;

/// Channel identity and connection options.
pub mod options;

/// Service selection.
pub mod service;

// ============================================================================
// Re-exports
// ============================================================================

pub use builder::ClientBuilder;
pub use core::FrameClient;
pub use options::{
    ART_CHANNEL, ChannelIdentity, ConnectionOptions, DEFAULT_REST_PORT, DEFAULT_WS_PORT,
    REMOTE_CHANNEL, Security,
};
pub use service::Service;
