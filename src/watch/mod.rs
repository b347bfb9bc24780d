// src/watch/mod.rs

//! File watching and change detection.
//!
//! This module is responsible for:
//! - Describing what to watch and what to ignore ([`WatchSet`]).
//! - Wiring up a cross-platform filesystem watcher (`notify`), one
//!   non-recursive watch per directory.
//! - Content fingerprinting so saves that don't change a file's bytes don't
//!   rebuild anything.
//!
//! It knows nothing about compilers or processes; its only output is a
//! [`RebuildRequest`](crate::engine::RebuildRequest).

pub mod cache;
pub mod event;
pub mod event_handler;
pub mod hash;
pub mod path_utils;
pub mod watch_set;
pub mod watcher;

pub use cache::FingerprintCache;
pub use event::{ChangeEvent, ChangeKind};
pub use event_handler::{classify, ChangeProcessor, Verdict};
pub use hash::{compute_file_hash, Fingerprint};
pub use watch_set::WatchSet;
pub use watcher::{ChangeDetector, RawEventReceiver, RawEventSender};
