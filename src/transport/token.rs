//! Pairing token persistence.
//!
//! One plain-text token file per channel path, so a restarted process
//! skips the pairing prompt. Reads fail soft; writes go through a temp file
//! and a rename so a torn write is never read back as a token.
//!
//! No locking between processes sharing a token directory: last writer wins.

// ============================================================================
// Imports
// ============================================================================

use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use tempfile::NamedTempFile;
use tracing::debug;

use crate::error::Result;

// ============================================================================
// TokenStore
// ============================================================================

/// File-backed pairing token for one channel path.
#[derive(Debug)]
pub struct TokenStore {
    /// Token file location.
    path: PathBuf,
    /// Last token read or written by this process.
    cached: Mutex<Option<String>>,
}

impl TokenStore {
    /// Creates a store for `channel_path` under `dir`.
    ///
    /// The file name is derived only from the channel path, so repeated
    /// runs address the same record.
    #[must_use]
    pub fn for_channel(dir: &Path, channel_path: &str) -> Self {
        let file_name = format!(".frame-remote-{}-token", urlencoding::encode(channel_path));
        Self {
            path: dir.join(file_name),
            cached: Mutex::new(None),
        }
    }

    /// Returns the token file path.
    #[inline]
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the stored token, or `None` if absent or unreadable.
    #[must_use]
    pub fn get(&self) -> Option<String> {
        if let Some(token) = self.cached.lock().clone() {
            return Some(token);
        }

        match fs::read_to_string(&self.path) {
            Ok(contents) => {
                let token = contents.trim();
                if token.is_empty() {
                    return None;
                }
                *self.cached.lock() = Some(token.to_string());
                Some(token.to_string())
            }
            Err(e) => {
                debug!(path = %self.path.display(), error = %e, "No usable pairing token");
                None
            }
        }
    }

    /// Stores a token, replacing any previous one.
    ///
    /// The in-memory copy is updated even if the write fails.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`](crate::Error::Io) if the file cannot be written.
    pub fn set(&self, token: &str) -> Result<()> {
        *self.cached.lock() = Some(token.to_string());

        let dir = self.path.parent().unwrap_or_else(|| Path::new("."));
        let mut file = NamedTempFile::new_in(dir)?;
        file.write_all(token.as_bytes())?;
        file.flush()?;
        file.persist(&self.path).map_err(|e| e.error)?;

        debug!(path = %self.path.display(), "Pairing token stored");
        Ok(())
    }

    /// Forgets the token in memory and on disk.
    pub fn clear(&self) {
        self.cached.lock().take();
        match fs::remove_file(&self.path) {
            Ok(()) => debug!(path = %self.path.display(), "Pairing token cleared"),
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => debug!(path = %self.path.display(), error = %e, "Failed to remove token file"),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
