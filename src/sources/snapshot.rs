//! Per-source JSON snapshot files.
//!
//! Every collector writes exactly one file into the output directory, once per
//! run. The combiner reads them back, treating a missing or unreadable file as
//! an absent source.

use crate::Result;
use ohno::IntoAppError;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::fs;
use std::path::{Path, PathBuf};

const LOG_TARGET: &str = "  snapshot";

/// Reads and writes snapshot files under a fixed output directory.
#[derive(Debug, Clone)]
pub struct SnapshotStore {
    dir: PathBuf,
}

impl SnapshotStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// The output directory holding the snapshot files.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Full path of a snapshot file.
    #[must_use]
    pub fn path(&self, name: &str) -> PathBuf {
        self.dir.join(name)
    }

    /// Serialize a record to `<dir>/<name>` as pretty-printed JSON.
    pub fn save<T: Serialize>(&self, name: &str, record: &T) -> Result<()> {
        fs::create_dir_all(&self.dir).into_app_err_with(|| format!("creating output directory '{}'", self.dir.display()))?;

        let path = self.path(name);
        let json = serde_json::to_string_pretty(record)?;
        fs::write(&path, json).into_app_err_with(|| format!("writing snapshot '{}'", path.display()))?;

        log::info!(target: LOG_TARGET, "Saved {name}");
        Ok(())
    }

    /// Read a snapshot back, or `None` if the file is missing or unreadable.
    #[must_use]
    pub fn load<T: DeserializeOwned>(&self, name: &str) -> Option<T> {
        let path = self.path(name);
        let text = match fs::read_to_string(&path) {
            Ok(text) => text,
            Err(e) => {
                log::debug!(target: LOG_TARGET, "No snapshot at '{}': {e}", path.display());
                return None;
            }
        };

        match serde_json::from_str(&text) {
            Ok(record) => Some(record),
            Err(e) => {
                log::warn!(target: LOG_TARGET, "Ignoring unreadable snapshot '{}': {e}", path.display());
                None
            }
        }
    }
}
