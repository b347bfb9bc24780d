// src/engine/mod.rs

//! Orchestration engine for tz-gin.
//!
//! This module ties together:
//! - the messages that flow between the change detector, the build loop and
//!   the process runner
//! - the coalescing rebuild queue (what happens when changes arrive while a
//!   build is already pending)
//! - the supervisor that owns cancellation, signals and artifact cleanup
//!
//! The pipeline itself is:
//!
//! ```text
//! notify -> watch::ChangeDetector -> RebuildTrigger ==(cap 1, coalesce)==>
//!     exec::build_loop -> BuildResult ==(cap 1)==> exec::runner_loop -> child
//! ```

use std::path::PathBuf;
use std::time::Duration;

pub mod cleanup;
pub mod queue;
pub mod runtime;
pub mod signals;

pub use queue::{rebuild_channel, RebuildReceiver, RebuildTrigger, TriggerOutcome};
pub use runtime::Supervisor;
pub use signals::ShutdownSignals;

/// Why a rebuild was requested.
///
/// The build loop treats both the same way (it always rebuilds the whole
/// project); the reason only exists so the start-up transition is explicit in
/// logs and tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RebuildRequest {
    /// Initial kick-off sent once by the supervisor, before any file changed.
    Prime,
    /// A watched file's content changed.
    FileChanged,
}

/// Outcome of one build attempt.
#[derive(Debug, Clone)]
pub struct BuildResult {
    pub success: bool,
    /// Where the artifact is (or would have been) written.
    pub artifact: PathBuf,
    /// Exit code of the compiler, when it ran to completion.
    pub exit_code: Option<i32>,
    /// Tail of the compiler's combined stdout/stderr, or the reason the
    /// compiler could not be run at all.
    pub output: String,
    pub duration: Duration,
}

impl BuildResult {
    /// Last `max_lines` lines of the captured output, for log lines.
    pub fn output_tail(&self, max_lines: usize) -> String {
        let lines: Vec<&str> = self.output.lines().collect();
        let start = lines.len().saturating_sub(max_lines);
        lines[start..].join("\n")
    }
}
