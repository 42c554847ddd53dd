//! Last-status slot shared by the reader, the command path and status queries.
//!
//! Every update replaces the whole string under one mutex, so readers observe
//! either the previous value or the new one, never a mix. Updates can be
//! mirrored to a status file (`[YYYY-MM-DD HH:MM:SS] <status>`), rewritten on
//! every publish outside that mutex. The file is a side artifact: failing to
//! write it is logged and otherwise ignored.

use chrono::Local;
use printgate_core::constants::{STATUS_INITIALIZING, STATUS_TIMESTAMP_FORMAT};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};
use tracing::warn;

/// On-disk mirror of the last status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusFile {
    path: PathBuf,
}

impl StatusFile {
    /// Create a mirror writing to `path`. Nothing is touched until the first
    /// publish.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Path of the status file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Overwrite the file with a timestamped status line.
    pub fn write(&self, message: &str) -> io::Result<()> {
        let timestamp = Local::now().format(STATUS_TIMESTAMP_FORMAT);
        std::fs::write(&self.path, format!("[{timestamp}] {message}"))
    }

    /// Read the current file content, trimmed.
    pub fn read(&self) -> io::Result<String> {
        std::fs::read_to_string(&self.path).map(|content| content.trim().to_string())
    }
}

/// Thread-safe holder of the last observed status.
///
/// The in-memory slot and the file mirror have separate locks, so a slow
/// disk never stalls [`last`](StatusStore::last). Each update takes a
/// sequence number under the slot lock and the file writer skips updates
/// older than the one already on disk.
///
/// # Examples
///
/// ```
/// use printgate_serial::status::StatusStore;
///
/// let store = StatusStore::new(None);
/// assert_eq!(store.last(), "Initializing...");
///
/// store.publish("R:OK");
/// assert_eq!(store.last(), "R:OK");
/// ```
#[derive(Debug)]
pub struct StatusStore {
    current: Mutex<Slot>,
    file: Option<StatusFile>,

    /// Sequence number of the last update written to the file.
    written: Mutex<u64>,
}

#[derive(Debug)]
struct Slot {
    message: String,
    seq: u64,
}

impl StatusStore {
    /// Create a store holding the initial sentinel.
    pub fn new(file: Option<StatusFile>) -> Self {
        Self {
            current: Mutex::new(Slot {
                message: STATUS_INITIALIZING.to_string(),
                seq: 0,
            }),
            file,
            written: Mutex::new(0),
        }
    }

    /// Replace the last status and mirror it to the status file.
    pub fn publish(&self, message: impl Into<String>) {
        let message = message.into();

        let seq = {
            let mut slot = self.current.lock().unwrap_or_else(PoisonError::into_inner);
            slot.seq += 1;
            slot.message.clone_from(&message);
            slot.seq
        };

        let Some(file) = &self.file else {
            return;
        };

        let mut written = self.written.lock().unwrap_or_else(PoisonError::into_inner);
        if *written > seq {
            return;
        }
        if let Err(e) = file.write(&message) {
            warn!(
                path = %file.path().display(),
                error = %e,
                "Failed to write status file"
            );
        }
        *written = seq;
    }

    /// Copy of the last status.
    pub fn last(&self) -> String {
        self.current
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .message
            .clone()
    }

    /// Status file mirror, if configured.
    pub fn file(&self) -> Option<&StatusFile> {
        self.file.as_ref()
    }
}

impl Default for StatusStore {
    fn default() -> Self {
        Self::new(None)
    }
}
