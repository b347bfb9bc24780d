// src/exec/runner_loop.rs

//! The process runner loop.
//!
//! Per build result **there is never more than one artifact instance
//! running**: the previous instance is terminated, and its exit confirmed,
//! before the next one is started.

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::engine::BuildResult;
use crate::errors::Result;
use crate::exec::backend::{ProcessExit, ProcessLauncher, RunningProcess};

/// Restart the artifact after every successful build until cancelled.
///
/// Failing to stop the old instance or to start the new one is fatal and
/// returned to the caller. Whatever is running when the loop ends is
/// terminated before returning.
pub async fn run_process_loop<L>(
    mut launcher: L,
    mut results: mpsc::Receiver<BuildResult>,
    token: CancellationToken,
) -> Result<()>
where
    L: ProcessLauncher,
{
    info!("[runner] process loop started");
    let mut current: Option<Box<dyn RunningProcess>> = None;

    let outcome = loop {
        tokio::select! {
            biased;
            _ = token.cancelled() => break Ok(()),

            exit = wait_current(&mut current) => {
                let pid = current.as_ref().and_then(|p| p.id());
                match exit {
                    Ok(exit) if exit.success => {
                        info!(?pid, "[runner] process exited");
                    }
                    Ok(exit) => {
                        warn!(?pid, exit_code = ?exit.code, "[runner] process exited with failure");
                    }
                    Err(err) => {
                        warn!(?pid, error = %err, "[runner] lost track of process");
                    }
                }
                current = None;
            }

            result = results.recv() => {
                let Some(result) = result else {
                    debug!("build loop gone; process loop stopping");
                    break Ok(());
                };
                if !result.success {
                    debug!(artifact = ?result.artifact, "ignoring unsuccessful build result");
                    continue;
                }
                if token.is_cancelled() {
                    break Ok(());
                }

                if let Err(err) = restart(&mut launcher, &mut current, &result).await {
                    break Err(err);
                }
            }
        }
    };

    if let Some(mut process) = current.take() {
        let pid = process.id();
        debug!(?pid, "stopping process on shutdown");
        if let Err(err) = process.terminate().await {
            warn!(?pid, error = %err, "[runner] failed to stop process on shutdown");
            if outcome.is_ok() {
                return Err(err);
            }
        }
    }

    info!("[runner] process loop finished");
    outcome
}

async fn restart<L>(
    launcher: &mut L,
    current: &mut Option<Box<dyn RunningProcess>>,
    result: &BuildResult,
) -> Result<()>
where
    L: ProcessLauncher,
{
    if let Some(mut previous) = current.take() {
        debug!(pid = ?previous.id(), "stopping previous instance");
        previous.terminate().await?;
    }

    info!(artifact = ?result.artifact, "[runner] starting");
    *current = Some(launcher.launch(&result.artifact)?);
    Ok(())
}

/// Resolves when the current process exits; pending forever when there is
/// none.
async fn wait_current(current: &mut Option<Box<dyn RunningProcess>>) -> Result<ProcessExit> {
    match current.as_mut() {
        Some(process) => process.wait().await,
        None => std::future::pending().await,
    }
}
