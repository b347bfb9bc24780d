// src/watch/watch_set.rs

use std::fmt;
use std::path::{Path, PathBuf};

use anyhow::Context;
use globset::{Glob, GlobSet, GlobSetBuilder};

use crate::config::RunSettings;
use crate::errors::Result;
use crate::watch::path_utils::relative_str;

/// Directories to observe plus the paths whose events are dropped.
///
/// - `dirs` always starts with the root itself, followed by each configured
///   subdirectory (in configuration order, duplicates removed). Every entry is
///   watched non-recursively.
/// - `ignore` holds path prefixes relative to the root; a path is ignored when
///   one of them is a leading run of its components (`tmp` matches
///   `tmp/main` but not `tmpl/x.go`).
/// - `exclude` holds optional globs matched against the root-relative path.
///
/// Immutable after construction.
#[derive(Clone)]
pub struct WatchSet {
    root: PathBuf,
    dirs: Vec<PathBuf>,
    ignore: Vec<PathBuf>,
    exclude: Option<GlobSet>,
    exclude_patterns: Vec<String>,
}

impl fmt::Debug for WatchSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WatchSet")
            .field("root", &self.root)
            .field("dirs", &self.dirs)
            .field("ignore", &self.ignore)
            .field("exclude", &self.exclude_patterns)
            .finish()
    }
}

impl WatchSet {
    pub fn new(
        root: impl Into<PathBuf>,
        subdirs: &[PathBuf],
        ignore: &[PathBuf],
        exclude: &[String],
    ) -> Result<Self> {
        let root = root.into();
        // Canonicalize once so we have a stable base path.
        let root = root.canonicalize().unwrap_or(root);

        let mut dirs = vec![root.clone()];
        for sub in subdirs {
            let dir = root.join(sub);
            if !dirs.contains(&dir) {
                dirs.push(dir);
            }
        }

        let exclude_set = if exclude.is_empty() {
            None
        } else {
            let mut builder = GlobSetBuilder::new();
            for pat in exclude {
                let glob = Glob::new(pat)
                    .with_context(|| format!("invalid exclude glob: {pat}"))?;
                builder.add(glob);
            }
            Some(builder.build().context("building exclude globset")?)
        };

        Ok(Self {
            root,
            dirs,
            ignore: ignore.to_vec(),
            exclude: exclude_set,
            exclude_patterns: exclude.to_vec(),
        })
    }

    /// Build the watch set for a project from validated settings.
    ///
    /// The build output directory is added to the ignore list when no
    /// configured prefix already covers it; the build writes there and must
    /// never trigger itself.
    pub fn from_settings(root: impl Into<PathBuf>, settings: &RunSettings) -> Result<Self> {
        let mut ignore = settings.ignore.clone();
        if !ignore.iter().any(|p| settings.output_dir.starts_with(p)) {
            ignore.push(settings.output_dir.clone());
        }
        Self::new(root, &settings.watch, &ignore, &settings.exclude)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn dirs(&self) -> &[PathBuf] {
        &self.dirs
    }

    pub fn ignore_prefixes(&self) -> &[PathBuf] {
        &self.ignore
    }

    pub fn exclude_patterns(&self) -> &[String] {
        &self.exclude_patterns
    }

    /// Returns true if events for `path` must never cause a rebuild.
    ///
    /// Paths that cannot be related to the root are ignored as well.
    pub fn is_ignored(&self, path: &Path) -> bool {
        let Some(rel) = relative_str(&self.root, path) else {
            return true;
        };

        let rel_path = Path::new(&rel);
        if self.ignore.iter().any(|prefix| rel_path.starts_with(prefix)) {
            return true;
        }

        self.exclude
            .as_ref()
            .is_some_and(|set| set.is_match(&rel))
    }
}
