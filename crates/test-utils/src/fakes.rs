//! Fake build and launch backends.
//!
//! They never spawn a process; instead they count what the loops asked for so
//! tests can assert on ordering and exclusivity.

use std::collections::VecDeque;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::Semaphore;
use tz_gin::engine::BuildResult;
use tz_gin::errors::{Result, SupervisorError};
use tz_gin::exec::{BoxFuture, BuildBackend, ProcessExit, ProcessLauncher, RunningProcess};

/// Counters shared between a [`FakeBuilder`] and the test.
#[derive(Debug, Default)]
pub struct BuildStats {
    pub started: AtomicUsize,
    pub finished: AtomicUsize,
    pub succeeded: AtomicUsize,
    pub failed: AtomicUsize,
}

impl BuildStats {
    pub fn started(&self) -> usize {
        self.started.load(Ordering::SeqCst)
    }

    pub fn finished(&self) -> usize {
        self.finished.load(Ordering::SeqCst)
    }

    pub fn succeeded(&self) -> usize {
        self.succeeded.load(Ordering::SeqCst)
    }

    pub fn failed(&self) -> usize {
        self.failed.load(Ordering::SeqCst)
    }
}

/// A build backend with scripted outcomes.
///
/// - Outcomes are taken from the script in order; once it is empty every
///   build succeeds.
/// - With a gate, each build waits for one permit before finishing, so tests
///   decide exactly when a build completes.
pub struct FakeBuilder {
    script: Arc<Mutex<VecDeque<bool>>>,
    gate: Option<Arc<Semaphore>>,
    stats: Arc<BuildStats>,
    artifact: PathBuf,
}

impl FakeBuilder {
    pub fn new(artifact: impl Into<PathBuf>) -> Self {
        Self {
            script: Arc::new(Mutex::new(VecDeque::new())),
            gate: None,
            stats: Arc::new(BuildStats::default()),
            artifact: artifact.into(),
        }
    }

    /// Outcomes for the next builds (`true` = success).
    pub fn with_outcomes(self, outcomes: &[bool]) -> Self {
        self.script.lock().unwrap().extend(outcomes.iter().copied());
        self
    }

    pub fn gated(mut self, gate: Arc<Semaphore>) -> Self {
        self.gate = Some(gate);
        self
    }

    pub fn stats(&self) -> Arc<BuildStats> {
        Arc::clone(&self.stats)
    }
}

impl BuildBackend for FakeBuilder {
    fn build(&mut self) -> BoxFuture<'_, BuildResult> {
        let script = Arc::clone(&self.script);
        let gate = self.gate.clone();
        let stats = Arc::clone(&self.stats);
        let artifact = self.artifact.clone();

        Box::pin(async move {
            stats.started.fetch_add(1, Ordering::SeqCst);

            if let Some(gate) = gate {
                gate.acquire()
                    .await
                    .expect("build gate closed")
                    .forget();
            }

            let success = script.lock().unwrap().pop_front().unwrap_or(true);
            stats.finished.fetch_add(1, Ordering::SeqCst);
            if success {
                stats.succeeded.fetch_add(1, Ordering::SeqCst);
            } else {
                stats.failed.fetch_add(1, Ordering::SeqCst);
            }

            BuildResult {
                success,
                artifact,
                exit_code: Some(if success { 0 } else { 2 }),
                output: if success {
                    String::new()
                } else {
                    "main.go:3:1: syntax error: non-declaration statement outside function body"
                        .to_string()
                },
                duration: Duration::from_millis(1),
            }
        })
    }
}

/// Counters shared between a [`FakeLauncher`], its processes and the test.
#[derive(Debug, Default)]
pub struct LaunchStats {
    pub launches: AtomicUsize,
    /// Processes started and not yet terminated, crashed or dropped.
    pub live: AtomicUsize,
    /// Highest value `live` ever reached.
    pub max_live: AtomicUsize,
    pub terminations: AtomicUsize,
}

impl LaunchStats {
    pub fn launches(&self) -> usize {
        self.launches.load(Ordering::SeqCst)
    }

    pub fn live(&self) -> usize {
        self.live.load(Ordering::SeqCst)
    }

    pub fn max_live(&self) -> usize {
        self.max_live.load(Ordering::SeqCst)
    }

    pub fn terminations(&self) -> usize {
        self.terminations.load(Ordering::SeqCst)
    }
}

/// A launcher whose processes only exist as counters.
#[derive(Clone)]
pub struct FakeLauncher {
    stats: Arc<LaunchStats>,
    /// 1-based launch number that fails to start.
    fail_launch_at: Option<usize>,
    fail_terminate: bool,
    crash_after: Option<Duration>,
}

impl FakeLauncher {
    pub fn new() -> Self {
        Self {
            stats: Arc::new(LaunchStats::default()),
            fail_launch_at: None,
            fail_terminate: false,
            crash_after: None,
        }
    }

    pub fn fail_launch_at(mut self, n: usize) -> Self {
        self.fail_launch_at = Some(n);
        self
    }

    /// Every process refuses to die.
    pub fn fail_terminate(mut self) -> Self {
        self.fail_terminate = true;
        self
    }

    /// Every process exits on its own with status 1 after `after`.
    pub fn crash_after(mut self, after: Duration) -> Self {
        self.crash_after = Some(after);
        self
    }

    pub fn stats(&self) -> Arc<LaunchStats> {
        Arc::clone(&self.stats)
    }
}

impl Default for FakeLauncher {
    fn default() -> Self {
        Self::new()
    }
}

impl ProcessLauncher for FakeLauncher {
    fn launch(&mut self, artifact: &Path) -> Result<Box<dyn RunningProcess>> {
        let n = self.stats.launches.fetch_add(1, Ordering::SeqCst) + 1;
        if self.fail_launch_at == Some(n) {
            return Err(SupervisorError::ProcessStart {
                artifact: artifact.to_path_buf(),
                source: io::Error::new(io::ErrorKind::NotFound, "fake launch failure"),
            });
        }

        let live = self.stats.live.fetch_add(1, Ordering::SeqCst) + 1;
        self.stats.max_live.fetch_max(live, Ordering::SeqCst);

        Ok(Box::new(FakeProcess {
            pid: 10_000 + n as u32,
            stats: Arc::clone(&self.stats),
            alive: true,
            fail_terminate: self.fail_terminate,
            crash_after: self.crash_after,
        }))
    }
}

struct FakeProcess {
    pid: u32,
    stats: Arc<LaunchStats>,
    alive: bool,
    fail_terminate: bool,
    crash_after: Option<Duration>,
}

impl FakeProcess {
    fn mark_dead(&mut self) {
        if self.alive {
            self.alive = false;
            self.stats.live.fetch_sub(1, Ordering::SeqCst);
        }
    }
}

impl RunningProcess for FakeProcess {
    fn id(&self) -> Option<u32> {
        Some(self.pid)
    }

    fn terminate(&mut self) -> BoxFuture<'_, Result<()>> {
        Box::pin(async move {
            if self.fail_terminate {
                return Err(SupervisorError::ProcessKill {
                    pid: Some(self.pid),
                    source: io::Error::new(io::ErrorKind::PermissionDenied, "fake kill failure"),
                });
            }
            if self.alive {
                self.stats.terminations.fetch_add(1, Ordering::SeqCst);
                self.mark_dead();
            }
            Ok(())
        })
    }

    fn wait(&mut self) -> BoxFuture<'_, Result<ProcessExit>> {
        Box::pin(async move {
            match self.crash_after {
                Some(after) if self.alive => {
                    tokio::time::sleep(after).await;
                    self.mark_dead();
                    Ok(ProcessExit {
                        code: Some(1),
                        success: false,
                    })
                }
                _ => std::future::pending().await,
            }
        })
    }
}

impl Drop for FakeProcess {
    fn drop(&mut self) {
        self.mark_dead();
    }
}
