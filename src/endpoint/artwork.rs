//! Artwork and matte types.
//!
//! The device describes stored art with loosely typed records (booleans as
//! strings, mattes as `type_color` strings, dates as `YYYY:MM:DD HH:MM:SS`).
//! This module converts them into typed values.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;

use chrono::NaiveDateTime;
use serde::Deserialize;
use serde_json::Value;

use crate::error::{Error, Result};
use crate::identifiers::ContentId;

// ============================================================================
// Constants
// ============================================================================

/// Matte identifier meaning "no matte".
pub const NO_MATTE: &str = "none";

const IMAGE_DATE_FORMAT: &str = "%Y:%m:%d %H:%M:%S";

// ============================================================================
// Matte
// ============================================================================

/// A matte (frame border) style.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Matte {
    /// Matte type (e.g. `modern`, `squares`).
    pub kind: String,
    /// Matte color (e.g. `warm`, `polar`).
    pub color: String,
}

impl Matte {
    /// Creates a matte.
    #[must_use]
    pub fn new(kind: impl Into<String>, color: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            color: color.into(),
        }
    }

    /// Parses a `type_color` matte identifier; `none` means no matte.
    #[must_use]
    pub fn parse(id: &str) -> Option<Self> {
        if id.is_empty() || id == NO_MATTE {
            return None;
        }
        match id.split_once('_') {
            Some((kind, color)) => Some(Self::new(kind, color)),
            None => Some(Self::new(id, "")),
        }
    }

    /// Wire identifier for an optional matte.
    #[must_use]
    pub fn wire_id(matte: Option<&Self>) -> String {
        matte.map_or_else(|| NO_MATTE.to_string(), Self::to_string)
    }
}

impl fmt::Display for Matte {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}", self.kind, self.color)
    }
}

// ============================================================================
// ArtPiece
// ============================================================================

/// A piece of art stored on the device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtPiece {
    /// Content identifier.
    pub id: ContentId,
    /// Date the image was taken or uploaded.
    pub date: Option<NaiveDateTime>,
    /// Category (`MY-C0002` for uploads).
    pub category_id: Option<String>,
    /// Part of the slideshow rotation.
    pub slideshow: bool,
    /// Landscape matte.
    pub matte: Option<Matte>,
    /// Portrait matte.
    pub portrait_matte: Option<Matte>,
    /// Width in pixels.
    pub width: Option<u32>,
    /// Height in pixels.
    pub height: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct RawArtPiece {
    content_id: String,
    #[serde(default)]
    category_id: Option<String>,
    #[serde(default)]
    slideshow: Value,
    #[serde(default)]
    matte_id: Option<String>,
    #[serde(default)]
    portrait_matte_id: Option<String>,
    #[serde(default)]
    width: Option<u32>,
    #[serde(default)]
    height: Option<u32>,
    #[serde(default)]
    image_date: Option<String>,
}

impl From<RawArtPiece> for ArtPiece {
    fn from(raw: RawArtPiece) -> Self {
        let slideshow = match raw.slideshow {
            Value::Bool(flag) => flag,
            Value::String(ref text) => text == "true",
            _ => false,
        };

        Self {
            id: ContentId::new(raw.content_id),
            date: raw
                .image_date
                .as_deref()
                .and_then(|date| NaiveDateTime::parse_from_str(date, IMAGE_DATE_FORMAT).ok()),
            category_id: raw.category_id,
            slideshow,
            matte: raw.matte_id.as_deref().and_then(Matte::parse),
            portrait_matte: raw.portrait_matte_id.as_deref().and_then(Matte::parse),
            width: raw.width,
            height: raw.height,
        }
    }
}

impl ArtPiece {
    /// Builds a piece from a single record.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Protocol`] if `content_id` is missing.
    pub fn from_value(value: Value) -> Result<Self> {
        serde_json::from_value::<RawArtPiece>(value)
            .map(Self::from)
            .map_err(|e| Error::protocol(format!("malformed art record: {e}")))
    }
}

/// Decodes a `content_list` payload.
///
/// # Errors
///
/// Returns [`Error::Protocol`] if the list is not valid JSON.
pub fn parse_content_list(raw: &str) -> Result<Vec<ArtPiece>> {
    let records: Vec<RawArtPiece> = serde_json::from_str(raw)
        .map_err(|e| Error::protocol(format!("malformed content list: {e}")))?;
    Ok(records.into_iter().map(ArtPiece::from).collect())
}

// ============================================================================
// Tests
// ============================================================================
