//! Command definitions for the art and remote-control channels.
//!
//! Art commands are serialized with their action name under `request`,
//! which [`Request::from_command`](super::Request::from_command) lifts out
//! into the generic request envelope.
//!
//! # Commands
//!
//! | Channel | Commands |
//! |---------|----------|
//! | art | `api_version`, `get_content_list`, `select_image`, `send_image`, ... |
//! | remote | `ms.remote.control` key press/release |

// ============================================================================
// Imports
// ============================================================================

use serde::Serialize;

use crate::identifiers::ContentId;

// ============================================================================
// Constants
// ============================================================================

/// Outer method for remote key messages.
pub const REMOTE_CONTROL_METHOD: &str = "ms.remote.control";

// ============================================================================
// ArtCommand
// ============================================================================

/// Art channel commands.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "request")]
pub enum ArtCommand {
    /// Query the art API version.
    #[serde(rename = "api_version")]
    ApiVersion,

    /// Query art-mode device information.
    #[serde(rename = "get_device_info")]
    GetDeviceInfo,

    /// Query whether art mode is on.
    #[serde(rename = "get_artmode_status")]
    GetArtModeStatus,

    /// List stored art in a category.
    #[serde(rename = "get_content_list")]
    GetContentList {
        /// Category to list (`MY-C0002` holds user uploads).
        category_id: String,
    },

    /// Query the artwork currently displayed.
    #[serde(rename = "get_current_artwork")]
    GetCurrentArtwork,

    /// Display a piece of art.
    #[serde(rename = "select_image")]
    SelectImage {
        /// Art to display.
        content_id: ContentId,
        /// Optional category of the art.
        #[serde(skip_serializing_if = "Option::is_none")]
        category: Option<String>,
        /// Show immediately.
        show: bool,
    },

    /// Query art-mode settings (brightness, color temperature, ...).
    #[serde(rename = "get_artmode_settings")]
    GetArtModeSettings,

    /// Set art-mode brightness.
    #[serde(rename = "set_brightness")]
    SetBrightness {
        /// Brightness in `0..=10`.
        value: u8,
    },

    /// List available matte types and colors.
    #[serde(rename = "get_matte_list")]
    GetMatteList,

    /// Change the matte of a stored piece.
    #[serde(rename = "change_matte")]
    ChangeMatte {
        /// Art to change.
        content_id: ContentId,
        /// Matte identifier (`none` or `{type}_{color}`).
        matte_id: String,
    },

    /// Delete stored art.
    #[serde(rename = "delete_image_list")]
    DeleteImageList {
        /// Art to delete.
        content_id_list: Vec<ContentRef>,
    },

    /// Ask the device to open a socket for an upload.
    #[serde(rename = "send_image")]
    SendImage {
        /// File type (`png`, `jpg`).
        file_type: String,
        /// Upload correlation ID, equal to the request ID.
        id: String,
        /// Socket negotiation details.
        conn_info: UploadSocketRequest,
        /// Image date in `YYYY:MM:DD HH:MM:SS`.
        image_date: String,
        /// Landscape matte.
        matte_id: String,
        /// Portrait matte.
        portrait_matte_id: String,
        /// Payload size in bytes.
        file_size: usize,
    },
}

/// Reference to one stored piece, as used in list operations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ContentRef {
    /// Art identifier.
    pub content_id: ContentId,
}

/// Socket negotiation block of `send_image`.
#[derive(Debug, Clone, Serialize)]
pub struct UploadSocketRequest {
    /// Always `socket`.
    pub d2d_mode: &'static str,
    /// Random connection identifier.
    pub connection_id: u32,
    /// Upload correlation ID.
    pub id: String,
}

// ============================================================================
// Remote Control
// ============================================================================

/// Key action sent over the remote-control channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum KeyCommand {
    /// Key down.
    Press,
    /// Key up.
    Release,
    /// Press and release in one message.
    Click,
}

/// A `ms.remote.control` message.
///
/// # Format
///
/// ```json
/// {
///   "method": "ms.remote.control",
///   "params": {
///     "Cmd": "Press",
///     "DataOfCmd": "KEY_POWER",
///     "Option": "false",
///     "TypeOfRemote": "SendRemoteKey"
///   }
/// }
/// ```
#[derive(Debug, Clone, Serialize)]
pub struct RemoteKeyMessage {
    method: &'static str,
    params: RemoteKeyParams,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
struct RemoteKeyParams {
    cmd: KeyCommand,
    data_of_cmd: String,
    option: &'static str,
    type_of_remote: &'static str,
}

impl RemoteKeyMessage {
    /// Creates a key message for `key` (e.g. `KEY_POWER`).
    #[must_use]
    pub fn new(cmd: KeyCommand, key: impl Into<String>) -> Self {
        Self {
            method: REMOTE_CONTROL_METHOD,
            params: RemoteKeyParams {
                cmd,
                data_of_cmd: key.into(),
                option: "false",
                type_of_remote: "SendRemoteKey",
            },
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
