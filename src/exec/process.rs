// src/exec/process.rs

//! The production launcher: starts the built artifact as a child process.

use std::path::Path;
use std::process::Stdio;

use tokio::process::{Child, Command};
use tracing::{debug, info};

use crate::errors::{Result, SupervisorError};
use crate::exec::backend::{BoxFuture, ProcessExit, ProcessLauncher, RunningProcess};

/// Starts the artifact with inherited stdio and the configured arguments.
#[derive(Debug, Clone, Default)]
pub struct ChildLauncher {
    args: Vec<String>,
}

impl ChildLauncher {
    pub fn new(args: Vec<String>) -> Self {
        Self { args }
    }
}

impl ProcessLauncher for ChildLauncher {
    fn launch(&mut self, artifact: &Path) -> Result<Box<dyn RunningProcess>> {
        let child = Command::new(artifact)
            .args(&self.args)
            .stdin(Stdio::inherit())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| SupervisorError::ProcessStart {
                artifact: artifact.to_path_buf(),
                source,
            })?;

        info!(artifact = ?artifact, pid = ?child.id(), "[runner] process started");
        Ok(Box::new(ChildProcess { child }))
    }
}

/// A running artifact.
///
/// Dropping it kills the process.
#[derive(Debug)]
pub struct ChildProcess {
    child: Child,
}

impl ChildProcess {
    async fn terminate_inner(&mut self) -> Result<()> {
        let pid = self.child.id();

        // Already reaped or exited on its own.
        match self.child.try_wait() {
            Ok(Some(status)) => {
                debug!(?pid, %status, "process already exited");
                return Ok(());
            }
            Ok(None) => {}
            Err(source) => return Err(SupervisorError::ProcessKill { pid, source }),
        }

        // `kill` sends the kill signal and then waits for the exit status.
        self.child
            .kill()
            .await
            .map_err(|source| SupervisorError::ProcessKill { pid, source })?;

        info!(?pid, "[runner] process stopped");
        Ok(())
    }
}

impl RunningProcess for ChildProcess {
    fn id(&self) -> Option<u32> {
        self.child.id()
    }

    fn terminate(&mut self) -> BoxFuture<'_, Result<()>> {
        Box::pin(self.terminate_inner())
    }

    fn wait(&mut self) -> BoxFuture<'_, Result<ProcessExit>> {
        Box::pin(async move {
            let status = self.child.wait().await?;
            Ok(ProcessExit::from(status))
        })
    }
}
