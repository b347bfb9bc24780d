//! Synthetic notify events for feeding a `ChangeDetector` without OS watches.

use std::path::Path;

use notify::event::{
    AccessKind, CreateKind, DataChange, MetadataKind, ModifyKind, RemoveKind, RenameMode,
};
use notify::{Event, EventKind};

/// Content write, the only kind that can trigger a rebuild.
pub fn write_event(path: &Path) -> notify::Result<Event> {
    Ok(Event::new(EventKind::Modify(ModifyKind::Data(DataChange::Content))).add_path(path.to_path_buf()))
}

pub fn chmod_event(path: &Path) -> notify::Result<Event> {
    Ok(Event::new(EventKind::Modify(ModifyKind::Metadata(MetadataKind::Permissions)))
        .add_path(path.to_path_buf()))
}

pub fn create_event(path: &Path) -> notify::Result<Event> {
    Ok(Event::new(EventKind::Create(CreateKind::File)).add_path(path.to_path_buf()))
}

pub fn remove_event(path: &Path) -> notify::Result<Event> {
    Ok(Event::new(EventKind::Remove(RemoveKind::File)).add_path(path.to_path_buf()))
}

pub fn access_event(path: &Path) -> notify::Result<Event> {
    Ok(Event::new(EventKind::Access(AccessKind::Any)).add_path(path.to_path_buf()))
}

/// A rename seen only from the destination side, e.g. moved in from an
/// unwatched directory.
pub fn moved_in_event(path: &Path) -> notify::Result<Event> {
    Ok(Event::new(EventKind::Modify(ModifyKind::Name(RenameMode::To))).add_path(path.to_path_buf()))
}

/// A rename with both ends inside watched directories.
pub fn rename_event(from: &Path, to: &Path) -> notify::Result<Event> {
    Ok(Event::new(EventKind::Modify(ModifyKind::Name(RenameMode::Both)))
        .add_path(from.to_path_buf())
        .add_path(to.to_path_buf()))
}

/// An error as reported by the watch primitive itself.
pub fn watch_error(msg: &str) -> notify::Result<Event> {
    Err(notify::Error::generic(msg))
}
