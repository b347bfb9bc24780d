// src/engine/runtime.rs

use std::fmt;
use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::errors::{Result, SupervisorError};
use crate::exec::{run_build_loop, run_process_loop, BuildBackend, ProcessLauncher};
use crate::fs::{FileSystem, RealFileSystem};
use crate::watch::{ChangeDetector, RawEventReceiver, WatchSet};

use super::cleanup::ArtifactCleanup;
use super::queue::rebuild_channel;

/// Default pause between a write event and reading the file.
pub const DEFAULT_SETTLE_DELAY: Duration = Duration::from_millis(100);

/// Fatal errors buffered per run; each component reports at most one.
const ERROR_CHANNEL_CAPACITY: usize = 3;

/// Owns one supervised run of the pipeline.
///
/// - Registers the file watches (fatal on failure) before anything starts.
/// - Spawns the change detector, the build loop and the process runner as
///   tokio tasks and primes the first build.
/// - Waits for `shutdown` or the first fatal component error, then cancels
///   every component and joins them.
/// - Removes the build output directory on every way out, including panics.
pub struct Supervisor<B: BuildBackend, L: ProcessLauncher> {
    watch_set: Arc<WatchSet>,
    builder: B,
    launcher: L,
    fs: Arc<dyn FileSystem>,
    output_dir: Option<PathBuf>,
    settle_delay: Duration,
    event_source: Option<RawEventReceiver>,
}

impl<B: BuildBackend, L: ProcessLauncher> fmt::Debug for Supervisor<B, L> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Supervisor")
            .field("watch_set", &self.watch_set)
            .field("output_dir", &self.output_dir)
            .field("settle_delay", &self.settle_delay)
            .finish_non_exhaustive()
    }
}

impl<B, L> Supervisor<B, L>
where
    B: BuildBackend + 'static,
    L: ProcessLauncher + 'static,
{
    pub fn new(watch_set: WatchSet, builder: B, launcher: L) -> Self {
        Self {
            watch_set: Arc::new(watch_set),
            builder,
            launcher,
            fs: Arc::new(RealFileSystem),
            output_dir: None,
            settle_delay: DEFAULT_SETTLE_DELAY,
            event_source: None,
        }
    }

    /// Directory removed when the run ends.
    pub fn output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = Some(dir.into());
        self
    }

    pub fn settle_delay(mut self, delay: Duration) -> Self {
        self.settle_delay = delay;
        self
    }

    /// Filesystem used for fingerprinting and cleanup.
    pub fn filesystem(mut self, fs: Arc<dyn FileSystem>) -> Self {
        self.fs = fs;
        self
    }

    /// Feed the change detector from `source` instead of OS watches.
    pub fn event_source(mut self, source: RawEventReceiver) -> Self {
        self.event_source = Some(source);
        self
    }

    /// Run until `shutdown` resolves (returns `Ok`) or a component fails
    /// (returns that component's error).
    pub async fn run<S>(self, shutdown: S) -> Result<()>
    where
        S: Future<Output = ()>,
    {
        let Self {
            watch_set,
            builder,
            launcher,
            fs,
            output_dir,
            settle_delay,
            event_source,
        } = self;

        // Created first so it is dropped last.
        let _cleanup = output_dir.map(|dir| ArtifactCleanup::new(Arc::clone(&fs), dir));

        let detector = match event_source {
            Some(source) => {
                ChangeDetector::from_receiver(Arc::clone(&watch_set), fs, settle_delay, source)
            }
            None => ChangeDetector::start(Arc::clone(&watch_set), fs, settle_delay)?,
        };

        let token = CancellationToken::new();
        let (trigger, requests) = rebuild_channel();
        let (result_tx, result_rx) = mpsc::channel(1);
        let (err_tx, mut err_rx) = mpsc::channel::<SupervisorError>(ERROR_CHANNEL_CAPACITY);

        let handles = vec![
            spawn_component(
                "watcher",
                detector.run(trigger.clone(), token.clone()),
                err_tx.clone(),
            ),
            spawn_component(
                "builder",
                run_build_loop(builder, requests, result_tx, token.clone()),
                err_tx.clone(),
            ),
            spawn_component(
                "runner",
                run_process_loop(launcher, result_rx, token.clone()),
                err_tx,
            ),
        ];

        info!("[supervisor] started; priming first build");
        trigger.prime();

        let mut fatal = tokio::select! {
            _ = shutdown => {
                info!("[supervisor] shutdown requested");
                None
            }
            Some(err) = err_rx.recv() => {
                error!(error = %err, "[supervisor] component failed; shutting down");
                Some(err)
            }
        };

        token.cancel();
        // Keep the build loop's request channel open until cancellation.
        drop(trigger);

        for handle in handles {
            if let Err(join_err) = handle.await {
                error!(error = %join_err, "[supervisor] component task panicked");
                if fatal.is_none() {
                    fatal = Some(SupervisorError::Other(anyhow::anyhow!(
                        "component task failed: {join_err}"
                    )));
                }
            }
        }

        // Errors raised while shutting down.
        while let Ok(err) = err_rx.try_recv() {
            debug!(error = %err, "component error during shutdown");
            if fatal.is_none() {
                fatal = Some(err);
            }
        }

        info!("[supervisor] stopped");
        match fatal {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

fn spawn_component<F>(
    name: &'static str,
    component: F,
    errors: mpsc::Sender<SupervisorError>,
) -> JoinHandle<()>
where
    F: Future<Output = Result<()>> + Send + 'static,
{
    tokio::spawn(async move {
        match component.await {
            Ok(()) => debug!(component = name, "component finished"),
            Err(err) => {
                error!(component = name, error = %err, "component failed");
                let _ = errors.send(err).await;
            }
        }
    })
}
