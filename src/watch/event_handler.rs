// src/watch/event_handler.rs

//! Decides, for a single change event, whether it warrants a rebuild.

use std::path::Path;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::fs::FileSystem;
use crate::watch::cache::FingerprintCache;
use crate::watch::event::ChangeEvent;
use crate::watch::hash::compute_file_hash;
use crate::watch::watch_set::WatchSet;

/// What the change detector concluded about one event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// Path is under an ignore prefix or matches an exclude glob.
    Ignored,
    /// Not a content change (chmod, bare create/remove, rename source, ...).
    NotAWrite,
    /// Passed the cheap filters; the content still has to be fingerprinted.
    Significant,
    /// Content identical to the last observation.
    Unchanged,
    /// The file could not be read; skipped.
    Unreadable,
    /// New or different content: rebuild.
    Changed,
}

impl Verdict {
    pub fn triggers_rebuild(self) -> bool {
        self == Verdict::Changed
    }
}

/// Cheap, IO-free screening of an event.
///
/// Returns `Ignored`, `NotAWrite` or `Significant`.
pub fn classify(watch_set: &WatchSet, event: &ChangeEvent) -> Verdict {
    if watch_set.is_ignored(&event.path) {
        return Verdict::Ignored;
    }
    if !event.kind.touches_content() {
        return Verdict::NotAWrite;
    }
    Verdict::Significant
}

/// Fingerprint-based deduplication of write events.
///
/// Owns the [`FingerprintCache`]; nothing else reads or writes it.
#[derive(Debug)]
pub struct ChangeProcessor {
    watch_set: Arc<WatchSet>,
    fs: Arc<dyn FileSystem>,
    cache: FingerprintCache,
}

impl ChangeProcessor {
    pub fn new(watch_set: Arc<WatchSet>, fs: Arc<dyn FileSystem>) -> Self {
        Self {
            watch_set,
            fs,
            cache: FingerprintCache::new(),
        }
    }

    pub fn cache(&self) -> &FingerprintCache {
        &self.cache
    }

    /// Screen and, if significant, fingerprint one event.
    pub fn handle(&mut self, event: &ChangeEvent) -> Verdict {
        match classify(&self.watch_set, event) {
            Verdict::Significant => self.fingerprint(&event.path),
            other => other,
        }
    }

    /// Hash `path` and compare against the cache.
    ///
    /// Read errors are not fatal: the event is skipped and the cache is left
    /// untouched, so the next successful read of the path still counts as a
    /// change.
    pub fn fingerprint(&mut self, path: &Path) -> Verdict {
        let fingerprint = match compute_file_hash(self.fs.as_ref(), path) {
            Ok(f) => f,
            Err(err) => {
                warn!(path = ?path, error = %format!("{err:#}"), "[watcher] cannot read changed file; skipping event");
                return Verdict::Unreadable;
            }
        };

        if self.cache.observe(path, fingerprint) {
            Verdict::Changed
        } else {
            debug!(path = ?path, "content fingerprint unchanged");
            Verdict::Unchanged
        }
    }
}
