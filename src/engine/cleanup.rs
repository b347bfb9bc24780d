// src/engine/cleanup.rs

use std::path::PathBuf;
use std::sync::Arc;

use tracing::{debug, error};

use crate::fs::FileSystem;

/// Removes the build output directory when dropped.
///
/// The supervisor creates one before anything else, so the directory is
/// removed on every way out of `Supervisor::run`: normal return, early `?`,
/// and unwinding.
#[derive(Debug)]
pub struct ArtifactCleanup {
    fs: Arc<dyn FileSystem>,
    dir: PathBuf,
}

impl ArtifactCleanup {
    pub fn new(fs: Arc<dyn FileSystem>, dir: PathBuf) -> Self {
        Self { fs, dir }
    }
}

impl Drop for ArtifactCleanup {
    fn drop(&mut self) {
        if !self.fs.exists(&self.dir) {
            debug!(dir = ?self.dir, "[clean] nothing to remove");
            return;
        }
        match self.fs.remove_dir_all(&self.dir) {
            Ok(()) => debug!(dir = ?self.dir, "[clean] removed build output"),
            Err(e) => error!(dir = ?self.dir, error = %e, "[clean] failed to remove build output"),
        }
    }
}
