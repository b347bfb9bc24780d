// src/exec/build_loop.rs

//! The build supervisor loop.

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::engine::{BuildResult, RebuildReceiver};
use crate::errors::Result;
use crate::exec::backend::BuildBackend;

/// Compiler output lines repeated in the failure log entry.
const FAILURE_TAIL_LINES: usize = 5;

/// Take rebuild requests one at a time and run a build for each.
///
/// - Only one build runs at a time; requests arriving meanwhile coalesce in
///   the rebuild channel, so a burst yields a single follow-up build.
/// - Successful builds are forwarded to the process runner.
/// - Failed builds are logged and dropped; the loop keeps waiting.
/// - Cancellation aborts an in-flight build and stops the loop.
pub async fn run_build_loop<B>(
    mut backend: B,
    mut requests: RebuildReceiver,
    results: mpsc::Sender<BuildResult>,
    token: CancellationToken,
) -> Result<()>
where
    B: BuildBackend,
{
    info!("[builder] build loop started");
    let mut attempt: u64 = 0;

    loop {
        let request = tokio::select! {
            biased;
            _ = token.cancelled() => break,
            req = requests.recv() => match req {
                Some(req) => req,
                None => {
                    debug!("all rebuild triggers dropped");
                    break;
                }
            },
        };

        attempt += 1;
        info!(attempt, reason = ?request, "[builder] building");

        let result = tokio::select! {
            biased;
            _ = token.cancelled() => {
                debug!(attempt, "cancelled during build; build aborted");
                break;
            }
            result = backend.build() => result,
        };

        if !result.success {
            error!(
                attempt,
                exit_code = ?result.exit_code,
                duration = ?result.duration,
                output = %result.output_tail(FAILURE_TAIL_LINES),
                "[builder] build failed"
            );
            continue;
        }

        info!(
            attempt,
            duration = ?result.duration,
            artifact = ?result.artifact,
            "[builder] build finished"
        );

        tokio::select! {
            biased;
            _ = token.cancelled() => break,
            sent = results.send(result) => {
                if sent.is_err() {
                    debug!("process runner gone; build loop stopping");
                    break;
                }
            }
        }
    }

    info!("[builder] build loop finished");
    Ok(())
}
