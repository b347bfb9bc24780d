// src/exec/toolchain.rs

//! Compiler toolchain probing.

use std::fmt;
use std::process::Stdio;

use regex::Regex;
use tokio::process::Command;
use tracing::{debug, warn};

use crate::errors::{Result, SupervisorError};

/// First Go release whose `go build` understands `-C <dir>`.
pub const DIR_FLAG_MIN_VERSION: GoVersion = GoVersion {
    major: 1,
    minor: 20,
    patch: 0,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct GoVersion {
    pub major: u32,
    pub minor: u32,
    pub patch: u32,
}

impl fmt::Display for GoVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "go{}.{}.{}", self.major, self.minor, self.patch)
    }
}

/// Facts about the compiler, probed once at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Toolchain {
    pub compiler: String,
    pub version: Option<GoVersion>,
    /// Whether `build -C <dir>` may be used.
    pub supports_dir_flag: bool,
}

impl Toolchain {
    /// Run `<compiler> version` and derive the toolchain facts from it.
    ///
    /// Fails when the compiler cannot be started or exits non-zero.
    pub async fn probe(compiler: &str) -> Result<Self> {
        let output = Command::new(compiler)
            .arg("version")
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|err| {
                SupervisorError::Toolchain(format!("cannot run `{compiler} version`: {err}"))
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(SupervisorError::Toolchain(format!(
                "`{compiler} version` exited with {}: {}",
                output.status,
                stderr.trim()
            )));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        Ok(Self::from_version_output(compiler, &stdout))
    }

    /// Interpret the output of `<compiler> version`.
    ///
    /// Unparseable output (development builds, gccgo, wrappers) is assumed to
    /// come from a modern toolchain.
    pub fn from_version_output(compiler: &str, output: &str) -> Self {
        match parse_go_version(output) {
            Some(version) => {
                let supports_dir_flag = version >= DIR_FLAG_MIN_VERSION;
                debug!(%version, supports_dir_flag, "probed compiler version");
                Self {
                    compiler: compiler.to_string(),
                    version: Some(version),
                    supports_dir_flag,
                }
            }
            None => {
                warn!(
                    output = output.trim(),
                    "could not parse compiler version; assuming `build -C` is supported"
                );
                Self::assume_modern(compiler)
            }
        }
    }

    /// Toolchain facts without probing anything.
    pub fn assume_modern(compiler: &str) -> Self {
        Self {
            compiler: compiler.to_string(),
            version: None,
            supports_dir_flag: true,
        }
    }
}

/// Extract `goX.Y[.Z]` from a version banner such as
/// `go version go1.21.5 linux/amd64`.
pub fn parse_go_version(output: &str) -> Option<GoVersion> {
    let re = Regex::new(r"go(\d+)\.(\d+)(?:\.(\d+))?").ok()?;
    let caps = re.captures(output)?;
    let major = caps.get(1)?.as_str().parse().ok()?;
    let minor = caps.get(2)?.as_str().parse().ok()?;
    let patch = match caps.get(3) {
        Some(m) => m.as_str().parse().ok()?,
        None => 0,
    };
    Some(GoVersion {
        major,
        minor,
        patch,
    })
}
