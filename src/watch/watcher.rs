// src/watch/watcher.rs

use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::engine::{RebuildRequest, RebuildTrigger, TriggerOutcome};
use crate::errors::{Result, SupervisorError};
use crate::fs::FileSystem;
use crate::watch::event::ChangeEvent;
use crate::watch::event_handler::{classify, ChangeProcessor, Verdict};
use crate::watch::watch_set::WatchSet;

/// Raw notify messages as forwarded out of the watcher callback.
pub type RawEventReceiver = mpsc::UnboundedReceiver<notify::Result<Event>>;
pub type RawEventSender = mpsc::UnboundedSender<notify::Result<Event>>;

/// The change detector: turns raw filesystem notifications into rebuild
/// requests.
///
/// Holds the `RecommendedWatcher` (when watching a real filesystem) so the OS
/// watches live exactly as long as the detector. Dropping it stops watching.
pub struct ChangeDetector {
    watch_set: Arc<WatchSet>,
    settle_delay: Duration,
    processor: Arc<Mutex<ChangeProcessor>>,
    raw_rx: RawEventReceiver,
    _watcher: Option<RecommendedWatcher>,
}

impl std::fmt::Debug for ChangeDetector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChangeDetector")
            .field("watch_set", &self.watch_set)
            .field("settle_delay", &self.settle_delay)
            .field("watching", &self._watcher.is_some())
            .finish()
    }
}

impl ChangeDetector {
    /// Register a non-recursive watch on every directory of `watch_set`.
    ///
    /// Any registration failure (typically a configured subdirectory that
    /// does not exist) is returned as [`SupervisorError::WatchRegistration`].
    pub fn start(
        watch_set: Arc<WatchSet>,
        fs: Arc<dyn FileSystem>,
        settle_delay: Duration,
    ) -> Result<Self> {
        let (raw_tx, raw_rx) = mpsc::unbounded_channel();

        // Called synchronously on notify's own thread.
        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| {
                // A closed receiver means the detector is shutting down.
                let _ = raw_tx.send(res);
            },
            Config::default(),
        )
        .map_err(|source| SupervisorError::WatchRegistration {
            path: watch_set.root().to_path_buf(),
            source,
        })?;

        for dir in watch_set.dirs() {
            watcher
                .watch(dir, RecursiveMode::NonRecursive)
                .map_err(|source| SupervisorError::WatchRegistration {
                    path: dir.clone(),
                    source,
                })?;
            debug!(dir = ?dir, "watching directory");
        }

        info!(
            root = ?watch_set.root(),
            dirs = watch_set.dirs().len(),
            "[watcher] file watcher started"
        );

        let mut detector = Self::from_receiver(watch_set, fs, settle_delay, raw_rx);
        detector._watcher = Some(watcher);
        Ok(detector)
    }

    /// Build a detector fed from an arbitrary event source instead of the OS.
    pub fn from_receiver(
        watch_set: Arc<WatchSet>,
        fs: Arc<dyn FileSystem>,
        settle_delay: Duration,
        raw_rx: RawEventReceiver,
    ) -> Self {
        let processor = ChangeProcessor::new(Arc::clone(&watch_set), fs);
        Self {
            watch_set,
            settle_delay,
            processor: Arc::new(Mutex::new(processor)),
            raw_rx,
            _watcher: None,
        }
    }

    /// Consume notifications until cancelled or the event source closes.
    ///
    /// Watch errors and unreadable files are logged and skipped; this loop
    /// never fails on its own.
    pub async fn run(self, trigger: RebuildTrigger, token: CancellationToken) -> Result<()> {
        let Self {
            watch_set,
            settle_delay,
            processor,
            mut raw_rx,
            // Keeps the OS watches registered until the loop ends.
            _watcher,
        } = self;

        loop {
            let raw = tokio::select! {
                biased;
                _ = token.cancelled() => break,
                raw = raw_rx.recv() => raw,
            };

            let event = match raw {
                Some(Ok(event)) => event,
                Some(Err(err)) => {
                    warn!(error = %err, "[watcher] watch error");
                    continue;
                }
                None => {
                    debug!("event source closed");
                    break;
                }
            };

            for change in ChangeEvent::from_notify(event) {
                match consider(&watch_set, settle_delay, &processor, change, &token).await {
                    Some(Verdict::Changed) => {
                        if trigger.request(RebuildRequest::FileChanged) == TriggerOutcome::Closed {
                            debug!("build loop gone; change detector stopping");
                            return Ok(());
                        }
                    }
                    Some(_) => {}
                    None => return Ok(()),
                }
            }
        }

        debug!("change detector finished");
        Ok(())
    }
}

/// Screen one change; returns `None` when cancelled mid-way.
async fn consider(
    watch_set: &WatchSet,
    settle_delay: Duration,
    processor: &Arc<Mutex<ChangeProcessor>>,
    change: ChangeEvent,
    token: &CancellationToken,
) -> Option<Verdict> {
    match classify(watch_set, &change) {
        Verdict::Significant => {}
        other => {
            debug!(path = ?change.path, kind = ?change.kind, verdict = ?other, "dropping event");
            return Some(other);
        }
    }

    // Give the editor time to finish writing before reading the file.
    tokio::select! {
        biased;
        _ = token.cancelled() => return None,
        _ = tokio::time::sleep(settle_delay) => {}
    }

    let verdict = fingerprint(Arc::clone(processor), change.path.clone()).await;
    match verdict {
        Verdict::Changed => info!(path = ?change.path, "[watcher] file changed"),
        Verdict::Unchanged => debug!(path = ?change.path, "file not changed"),
        _ => {}
    }
    Some(verdict)
}

/// Hash on the blocking pool; the cache stays behind the mutex.
async fn fingerprint(processor: Arc<Mutex<ChangeProcessor>>, path: PathBuf) -> Verdict {
    let joined = tokio::task::spawn_blocking(move || {
        let mut processor = processor
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        processor.fingerprint(&path)
    })
    .await;

    match joined {
        Ok(verdict) => verdict,
        Err(err) => {
            warn!(error = %err, "[watcher] fingerprinting task failed; skipping event");
            Verdict::Unreadable
        }
    }
}
