// src/exec/mod.rs

//! Process execution layer.
//!
//! This module is responsible for actually running the compiler and the
//! compiled artifact, using `tokio::process::Command`.
//!
//! - [`backend`] provides the `BuildBackend` / `ProcessLauncher` traits the
//!   loops talk to, so tests can replace the real processes with fakes.
//! - [`build`] resolves the compiler invocation and runs it.
//! - [`toolchain`] probes the compiler version once at startup.
//! - [`process`] starts and stops the artifact.
//! - [`build_loop`] and [`runner_loop`] are the two long-lived loops driven
//!   by the supervisor.

pub mod backend;
pub mod build;
pub mod build_loop;
pub mod process;
pub mod runner_loop;
pub mod toolchain;

pub use backend::{BoxFuture, BuildBackend, ProcessExit, ProcessLauncher, RunningProcess};
pub use build::{BuildCommand, CompilerBackend};
pub use build_loop::run_build_loop;
pub use process::{ChildLauncher, ChildProcess};
pub use runner_loop::run_process_loop;
pub use toolchain::{parse_go_version, GoVersion, Toolchain};
