// src/exec/backend.rs

//! Pluggable build and launch backends.
//!
//! The build loop talks to a `BuildBackend` and the process runner to a
//! `ProcessLauncher` instead of calling `tokio::process` directly. Production
//! uses [`CompilerBackend`](super::CompilerBackend) and
//! [`ChildLauncher`](super::ChildLauncher); tests swap in fakes that never
//! spawn anything.

use std::future::Future;
use std::path::Path;
use std::pin::Pin;

use crate::engine::BuildResult;
use crate::errors::Result;

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Something that can (re)build the project.
pub trait BuildBackend: Send {
    /// Run one complete build.
    ///
    /// Never fails as such: problems running the compiler are reported as a
    /// `BuildResult` with `success == false`. Dropping the returned future
    /// must abort the build.
    fn build(&mut self) -> BoxFuture<'_, BuildResult>;
}

/// Something that can start the built artifact.
pub trait ProcessLauncher: Send {
    fn launch(&mut self, artifact: &Path) -> Result<Box<dyn RunningProcess>>;
}

/// Handle to one started artifact.
pub trait RunningProcess: Send {
    fn id(&self) -> Option<u32>;

    /// Stop the process and wait until it has exited.
    ///
    /// Terminating a process that already exited is not an error.
    fn terminate(&mut self) -> BoxFuture<'_, Result<()>>;

    /// Wait for the process to exit on its own.
    fn wait(&mut self) -> BoxFuture<'_, Result<ProcessExit>>;
}

/// How a process ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProcessExit {
    /// `None` when the process was killed by a signal.
    pub code: Option<i32>,
    pub success: bool,
}

impl From<std::process::ExitStatus> for ProcessExit {
    fn from(status: std::process::ExitStatus) -> Self {
        Self {
            code: status.code(),
            success: status.success(),
        }
    }
}
