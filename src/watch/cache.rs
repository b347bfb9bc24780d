// src/watch/cache.rs

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::watch::hash::Fingerprint;

/// Last-seen content fingerprint per file.
///
/// Lives only in memory for the lifetime of one supervisor run. A path that
/// has never been observed counts as changed.
#[derive(Debug, Default)]
pub struct FingerprintCache {
    fingerprints: HashMap<PathBuf, Fingerprint>,
}

impl FingerprintCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `fingerprint` for `path`.
    ///
    /// Returns true (and stores the new value) when the path was unknown or
    /// its content differs from the last observation; false when identical.
    pub fn observe(&mut self, path: &Path, fingerprint: Fingerprint) -> bool {
        match self.fingerprints.get(path) {
            Some(previous) if *previous == fingerprint => false,
            Some(_) => {
                debug!(path = ?path, "fingerprint changed");
                self.fingerprints.insert(path.to_path_buf(), fingerprint);
                true
            }
            None => {
                debug!(path = ?path, "first fingerprint for path");
                self.fingerprints.insert(path.to_path_buf(), fingerprint);
                true
            }
        }
    }

    pub fn get(&self, path: &Path) -> Option<&Fingerprint> {
        self.fingerprints.get(path)
    }

    pub fn len(&self) -> usize {
        self.fingerprints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fingerprints.is_empty()
    }
}
