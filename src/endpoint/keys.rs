//! Remote-control key definitions.
//!
//! # Example
//!
//! ```ignore
//! use frame_remote::RemoteKey;
//!
//! remote.click(RemoteKey::Home).await?;
//! remote.click(RemoteKey::VolumeUp).await?;
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::fmt;

// ============================================================================
// RemoteKey Enum
// ============================================================================

/// Common remote-control keys.
///
/// Keys not listed here can be sent by code with
/// [`RemoteControl::send_key_code`](super::RemoteControl::send_key_code).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RemoteKey {
    // ========================================================================
    // Power & Source
    // ========================================================================
    /// Power toggle (hold for standby vs. art mode)
    Power,
    /// Input source
    Source,

    // ========================================================================
    // Navigation
    // ========================================================================
    /// Home / Smart Hub
    Home,
    /// Menu
    Menu,
    /// Select
    Enter,
    /// Back
    Return,
    /// Exit
    Exit,
    /// Arrow Up
    Up,
    /// Arrow Down
    Down,
    /// Arrow Left
    Left,
    /// Arrow Right
    Right,

    // ========================================================================
    // Volume & Channel
    // ========================================================================
    /// Volume up
    VolumeUp,
    /// Volume down
    VolumeDown,
    /// Mute
    Mute,
    /// Channel up
    ChannelUp,
    /// Channel down
    ChannelDown,

    // ========================================================================
    // Playback
    // ========================================================================
    /// Play
    Play,
    /// Pause
    Pause,
    /// Stop
    Stop,

    // ========================================================================
    // Info
    // ========================================================================
    /// Info overlay
    Info,
    /// Program guide
    Guide,
}

impl RemoteKey {
    /// Returns the key code sent as `DataOfCmd`.
    #[must_use]
    pub fn code(self) -> &'static str {
        match self {
            RemoteKey::Power => "KEY_POWER",
            RemoteKey::Source => "KEY_SOURCE",
            RemoteKey::Home => "KEY_HOME",
            RemoteKey::Menu => "KEY_MENU",
            RemoteKey::Enter => "KEY_ENTER",
            RemoteKey::Return => "KEY_RETURN",
            RemoteKey::Exit => "KEY_EXIT",
            RemoteKey::Up => "KEY_UP",
            RemoteKey::Down => "KEY_DOWN",
            RemoteKey::Left => "KEY_LEFT",
            RemoteKey::Right => "KEY_RIGHT",
            RemoteKey::VolumeUp => "KEY_VOLUP",
            RemoteKey::VolumeDown => "KEY_VOLDOWN",
            RemoteKey::Mute => "KEY_MUTE",
            RemoteKey::ChannelUp => "KEY_CHUP",
            RemoteKey::ChannelDown => "KEY_CHDOWN",
            RemoteKey::Play => "KEY_PLAY",
            RemoteKey::Pause => "KEY_PAUSE",
            RemoteKey::Stop => "KEY_STOP",
            RemoteKey::Info => "KEY_INFO",
            RemoteKey::Guide => "KEY_GUIDE",
        }
    }
}

impl fmt::Display for RemoteKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

// ============================================================================
// Tests
// ============================================================================
