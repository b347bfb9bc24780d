// src/exec/build.rs

//! The production build backend: runs the compiler as a child process.

use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::{Duration, Instant};

use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::process::Command;
use tracing::debug;

use crate::config::RunSettings;
use crate::engine::BuildResult;
use crate::exec::backend::{BoxFuture, BuildBackend};
use crate::exec::toolchain::Toolchain;
use crate::types::Platform;

/// Lines of compiler output kept per stream for the `BuildResult`.
const OUTPUT_TAIL_LINES: usize = 200;

/// A fully resolved compiler invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildCommand {
    pub program: String,
    pub args: Vec<String>,
    /// Working directory for the compiler; only set when the toolchain
    /// cannot be pointed at the root with `-C`.
    pub current_dir: Option<PathBuf>,
    /// Where the compiler writes the executable.
    pub artifact: PathBuf,
}

impl BuildCommand {
    /// `<compiler> build [-C <root>] -o <output_dir>/<artifact> [flags...] <package>`
    pub fn new(
        root: &Path,
        settings: &RunSettings,
        platform: Platform,
        toolchain: &Toolchain,
    ) -> Self {
        let mut args = vec!["build".to_string()];
        let current_dir = if toolchain.supports_dir_flag {
            args.push("-C".to_string());
            args.push(root.to_string_lossy().into_owned());
            None
        } else {
            Some(root.to_path_buf())
        };

        args.push("-o".to_string());
        args.push(platform.output_arg(&settings.output_dir, &settings.artifact));
        args.extend(settings.build_flags.iter().cloned());
        args.push(settings.package.clone());

        Self {
            program: toolchain.compiler.clone(),
            args,
            current_dir,
            artifact: platform.artifact_path(root, &settings.output_dir, &settings.artifact),
        }
    }

    /// Shell-like rendering for logs and `--dry-run`.
    pub fn display(&self) -> String {
        let mut rendered = self.program.clone();
        for arg in &self.args {
            rendered.push(' ');
            rendered.push_str(arg);
        }
        rendered
    }
}

/// Runs a [`BuildCommand`], forwarding its output to the terminal.
#[derive(Debug, Clone)]
pub struct CompilerBackend {
    command: BuildCommand,
    timeout: Option<Duration>,
}

impl CompilerBackend {
    pub fn new(command: BuildCommand) -> Self {
        Self {
            command,
            timeout: None,
        }
    }

    /// Abort builds that take longer than `timeout`.
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    async fn run(&self) -> BuildResult {
        let started = Instant::now();
        let mut result = match self.timeout {
            Some(limit) => match tokio::time::timeout(limit, self.run_compiler()).await {
                Ok(result) => result,
                // The compiler child was dropped with the future and killed.
                Err(_) => self.failure(None, format!("build timed out after {limit:?}")),
            },
            None => self.run_compiler().await,
        };
        result.duration = started.elapsed();
        result
    }

    async fn run_compiler(&self) -> BuildResult {
        let mut cmd = Command::new(&self.command.program);
        cmd.args(&self.command.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(dir) = &self.command.current_dir {
            cmd.current_dir(dir);
        }

        debug!(cmd = %self.command.display(), "spawning compiler");

        let mut child = match cmd.spawn() {
            Ok(child) => child,
            Err(err) => {
                return self.failure(
                    None,
                    format!("failed to start `{}`: {err}", self.command.program),
                );
            }
        };

        let stdout = child.stdout.take();
        let stderr = child.stderr.take();

        let (out_tail, err_tail, status) = tokio::join!(
            forward_output(stdout, Stream::Stdout),
            forward_output(stderr, Stream::Stderr),
            child.wait(),
        );

        let mut output: Vec<String> = out_tail.into_iter().collect();
        output.extend(err_tail);
        let output = output.join("\n");

        match status {
            Ok(status) => BuildResult {
                success: status.success(),
                artifact: self.command.artifact.clone(),
                exit_code: status.code(),
                output,
                duration: Duration::ZERO,
            },
            Err(err) => self.failure(None, format!("waiting for compiler: {err}")),
        }
    }

    fn failure(&self, exit_code: Option<i32>, output: String) -> BuildResult {
        BuildResult {
            success: false,
            artifact: self.command.artifact.clone(),
            exit_code,
            output,
            duration: Duration::ZERO,
        }
    }
}

impl BuildBackend for CompilerBackend {
    fn build(&mut self) -> BoxFuture<'_, BuildResult> {
        Box::pin(self.run())
    }
}

#[derive(Debug, Clone, Copy)]
enum Stream {
    Stdout,
    Stderr,
}

/// Copy `reader` byte-for-byte to our own stdout/stderr and keep the last
/// [`OUTPUT_TAIL_LINES`] lines of it.
///
/// The pipe is drained to EOF even when echoing fails.
async fn forward_output<R>(reader: Option<R>, stream: Stream) -> VecDeque<String>
where
    R: AsyncRead + Unpin,
{
    let mut tail = VecDeque::new();
    let Some(reader) = reader else {
        return tail;
    };

    let mut reader = BufReader::new(reader);
    let mut sink: Box<dyn AsyncWrite + Send + Unpin> = match stream {
        Stream::Stdout => Box::new(tokio::io::stdout()),
        Stream::Stderr => Box::new(tokio::io::stderr()),
    };
    let mut echo = true;
    let mut buf = Vec::new();

    loop {
        buf.clear();
        match reader.read_until(b'\n', &mut buf).await {
            Ok(0) => break,
            Ok(_) => {}
            Err(err) => {
                debug!(?stream, error = %err, "reading compiler output failed");
                break;
            }
        }

        if echo {
            let written = async {
                sink.write_all(&buf).await?;
                sink.flush().await
            };
            if let Err(err) = written.await {
                debug!(?stream, error = %err, "echoing compiler output failed; still draining");
                echo = false;
            }
        }

        if tail.len() == OUTPUT_TAIL_LINES {
            tail.pop_front();
        }
        tail.push_back(tail_line(&buf));
    }
    tail
}

/// Lossy text of one output line without its terminator.
fn tail_line(raw: &[u8]) -> String {
    let line = raw.strip_suffix(b"\n").unwrap_or(raw);
    let line = line.strip_suffix(b"\r").unwrap_or(line);
    String::from_utf8_lossy(line).into_owned()
}
