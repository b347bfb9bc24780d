// src/watch/event.rs

use std::path::PathBuf;
use std::time::Instant;

use notify::event::{EventKind, ModifyKind, RenameMode};

/// Coarse classification of a filesystem notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    /// File content was written.
    Write,
    /// A file was renamed onto this path (atomic "safe write" saves).
    MovedIn,
    Create,
    Remove,
    /// Metadata (chmod, timestamps), the source side of a rename, access and
    /// anything unknown.
    Other,
}

impl ChangeKind {
    /// Whether the path may now hold different content.
    pub fn touches_content(self) -> bool {
        matches!(self, ChangeKind::Write | ChangeKind::MovedIn)
    }
}

impl From<&EventKind> for ChangeKind {
    fn from(kind: &EventKind) -> Self {
        match kind {
            EventKind::Modify(ModifyKind::Data(_)) | EventKind::Modify(ModifyKind::Any) => {
                ChangeKind::Write
            }
            EventKind::Modify(ModifyKind::Name(RenameMode::To | RenameMode::Any)) => {
                ChangeKind::MovedIn
            }
            EventKind::Create(_) => ChangeKind::Create,
            EventKind::Remove(_) => ChangeKind::Remove,
            EventKind::Modify(_) | EventKind::Access(_) | EventKind::Any | EventKind::Other => {
                ChangeKind::Other
            }
        }
    }
}

/// One observed change to one path.
#[derive(Debug, Clone)]
pub struct ChangeEvent {
    pub path: PathBuf,
    pub kind: ChangeKind,
    pub timestamp: Instant,
}

impl ChangeEvent {
    pub fn new(path: impl Into<PathBuf>, kind: ChangeKind) -> Self {
        Self {
            path: path.into(),
            kind,
            timestamp: Instant::now(),
        }
    }

    /// Split a raw notify event into one `ChangeEvent` per affected path.
    ///
    /// A paired rename (`[from, to]`) yields `Other` for the source and
    /// `MovedIn` for the destination.
    pub fn from_notify(event: notify::Event) -> Vec<ChangeEvent> {
        let timestamp = Instant::now();
        let paired_rename = matches!(
            event.kind,
            EventKind::Modify(ModifyKind::Name(RenameMode::Both))
        );
        let kind = ChangeKind::from(&event.kind);
        let last = event.paths.len().saturating_sub(1);

        event
            .paths
            .into_iter()
            .enumerate()
            .map(|(i, path)| {
                let kind = match (paired_rename, i == last) {
                    (true, true) => ChangeKind::MovedIn,
                    (true, false) => ChangeKind::Other,
                    (false, _) => kind,
                };
                ChangeEvent {
                    path,
                    kind,
                    timestamp,
                }
            })
            .collect()
    }
}
