#![forbid(unsafe_code)]

//! Durable key-value media the snapshot can be written to.

use std::collections::HashMap;
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use tempfile::NamedTempFile;

use crate::types::{EmuError, Result, SlotFailure};

/// A string-valued key-value medium with last-write-wins semantics.
pub trait DurableSlot: Send + Sync {
    /// Returns the stored value, or `None` when the key was never written.
    fn get(&self, key: &str) -> Result<Option<String>>;
    /// Replaces the stored value.
    fn set(&self, key: &str, value: &str) -> Result<()>;
}

/// In-memory slot, optionally capped to emulate browser storage quotas.
#[derive(Default)]
pub struct MemorySlot {
    capacity: Option<usize>,
    entries: Mutex<HashMap<String, String>>,
}

impl MemorySlot {
    /// Creates an unbounded slot.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a slot that rejects values larger than `capacity` bytes.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            capacity: Some(capacity),
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Writes a raw value, bypassing the quota. Used to plant foreign blobs.
    pub fn seed(&self, key: &str, value: &str) {
        self.entries.lock().insert(key.to_string(), value.to_string());
    }
}

impl DurableSlot for MemorySlot {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries.lock().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        if let Some(capacity) = self.capacity {
            if value.len() > capacity {
                return Err(EmuError::Slot {
                    key: key.to_string(),
                    reason: SlotFailure::QuotaExceeded {
                        needed: value.len(),
                        capacity,
                    },
                });
            }
        }
        self.entries.lock().insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// Directory-backed slot storing each key as `<key>.json`.
pub struct FileSlot {
    dir: PathBuf,
}

impl FileSlot {
    /// Opens (and creates if needed) the slot directory.
    pub fn open(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    /// Path the value for `key` is stored at.
    pub fn path_for(&self, key: &str) -> PathBuf {
        let name: String = key
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || c == '_' || c == '-' {
                    c
                } else {
                    '_'
                }
            })
            .collect();
        self.dir.join(format!("{name}.json"))
    }
}

impl DurableSlot for FileSlot {
    fn get(&self, key: &str) -> Result<Option<String>> {
        match fs::read_to_string(self.path_for(key)) {
            Ok(contents) => Ok(Some(contents)),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        // Write next to the target so the rename stays on one filesystem.
        let mut tmp = NamedTempFile::new_in(&self.dir)?;
        tmp.write_all(value.as_bytes())?;
        tmp.as_file().sync_all()?;
        tmp.persist(self.path_for(key)).map_err(|err| err.error)?;
        Ok(())
    }
}
