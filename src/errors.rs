// src/errors.rs

//! Crate-wide error type and result alias.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum SupervisorError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("failed to watch {path:?}: {source}")]
    WatchRegistration {
        path: PathBuf,
        #[source]
        source: notify::Error,
    },

    #[error("compiler toolchain unavailable: {0}")]
    Toolchain(String),

    #[error("failed to start {artifact:?}: {source}")]
    ProcessStart {
        artifact: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to terminate running process (pid {pid:?}): {source}")]
    ProcessKill {
        pid: Option<u32>,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, SupervisorError>;
