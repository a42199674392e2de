//! Shared utilities for demos.
//!
//! Provides common functionality used across all demos:
//! - Command-line argument parsing
//! - Logging initialization

#![allow(dead_code)]

// ============================================================================
// Imports
// ============================================================================

use std::path::PathBuf;

use frame_remote::{FrameClient, Result, Service};
use tracing_subscriber::EnvFilter;

// ============================================================================
// Types
// ============================================================================

/// Command-line arguments for demos.
#[derive(Debug, Clone)]
pub struct Args {
    pub host: String,
    pub name: Option<String>,
    pub image: Option<PathBuf>,
    pub debug: bool,
}

impl Args {
    /// Parse command-line arguments.
    ///
    /// The device host comes from `--host <addr>` or `FRAME_TV_HOST`.
    pub fn parse() -> Self {
        let args: Vec<String> = std::env::args().collect();
        let value_of = |flag: &str| {
            args.iter()
                .position(|a| a == flag)
                .and_then(|i| args.get(i + 1))
                .cloned()
        };

        let host = value_of("--host")
            .or_else(|| std::env::var("FRAME_TV_HOST").ok())
            .unwrap_or_else(|| "192.168.1.20".to_string());

        Self {
            host,
            name: value_of("--name"),
            image: value_of("--image").map(PathBuf::from),
            debug: args.iter().any(|a| a == "--debug"),
        }
    }

    /// Build a client for the given services.
    pub fn client(&self, services: &[Service]) -> Result<FrameClient> {
        let mut builder = FrameClient::builder()
            .host(&self.host)
            .services(services.iter().copied());
        if let Some(name) = &self.name {
            builder = builder.name(name);
        }
        builder.build()
    }
}

// ============================================================================
// Functions
// ============================================================================

/// Initialize tracing/logging.
pub fn init_logging(debug: bool) {
    let filter = if debug {
        "frame_remote=debug"
    } else {
        "frame_remote=info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .with_target(false)
        .init();
}
