//! Type-safe identifiers.
//!
//! Newtype wrappers keep correlation IDs and artwork IDs from being mixed
//! up with arbitrary strings.
//!
//! | Type | Wraps | Purpose |
//! |------|-------|---------|
//! | [`RequestId`] | `String` (UUID by default) | Request/response correlation |
//! | [`ContentId`] | `String` | Artwork stored on the device |

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{Error, Result};

// ============================================================================
// RequestId
// ============================================================================

/// Correlation ID tying an outbound request to its inbound response.
///
/// Any non-empty string is accepted, so IDs chosen by another client can be
/// reused. Fresh IDs are hyphenated UUID v4 strings.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestId(String);

impl RequestId {
    /// Generates a fresh random ID.
    #[inline]
    #[must_use]
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Wraps a caller-chosen ID.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if `id` is empty or only whitespace.
    pub fn new(id: impl Into<String>) -> Result<Self> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err(Error::config("Request ID must not be empty"));
        }
        Ok(Self(id))
    }

    /// Returns the ID as a string slice.
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<Uuid> for RequestId {
    fn from(uuid: Uuid) -> Self {
        Self(uuid.to_string())
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for RequestId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::new(s)
    }
}

// ============================================================================
// ContentId
// ============================================================================

/// Identifier of a piece of art stored on the device (e.g. `MY_F0012`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContentId(String);

impl ContentId {
    /// Creates a content ID.
    #[inline]
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the ID as a string slice.
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ContentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ContentId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for ContentId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_ids_are_unique() {
        assert_ne!(RequestId::generate(), RequestId::generate());
    }

    #[test]
    fn test_request_id_parse_display() {
        let id = RequestId::generate();
        let parsed: RequestId = id.to_string().parse().expect("parse");
        assert_eq!(id, parsed);
        assert!(Uuid::parse_str(id.as_str()).is_ok());
    }

    #[test]
    fn test_request_id_accepts_foreign_formats() {
        let id: RequestId = "req-42".parse().expect("parse");
        assert_eq!(id.as_str(), "req-42");
        assert!(matches!("".parse::<RequestId>(), Err(Error::Config { .. })));
        assert!(RequestId::new("   ").is_err());
    }

    #[test]
    fn test_request_id_serializes_as_string() {
        let id = RequestId::generate();
        let json = serde_json::to_string(&id).expect("serialize");
        assert_eq!(json, format!("\"{id}\""));
    }

    #[test]
    fn test_content_id_transparent() {
        let id = ContentId::from("MY_F0012");
        assert_eq!(serde_json::to_string(&id).expect("serialize"), "\"MY_F0012\"");
        assert_eq!(id.to_string(), "MY_F0012");
    }
}
