// src/types.rs

use std::path::{Path, PathBuf};

/// Host platform facts that affect how artifacts are named and addressed.
///
/// Resolved once at startup and passed by value into the components that need
/// it; nothing reads the host OS again after that.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Platform {
    /// Suffix appended to executable names (`".exe"` on Windows, `""` elsewhere).
    pub exe_suffix: &'static str,
    /// Preferred path separator for rendering command-line arguments.
    pub separator: char,
}

impl Platform {
    /// Describe the platform this binary was compiled for.
    pub fn current() -> Self {
        if cfg!(windows) {
            Self::windows()
        } else {
            Self::unix()
        }
    }

    pub fn unix() -> Self {
        Self {
            exe_suffix: "",
            separator: '/',
        }
    }

    pub fn windows() -> Self {
        Self {
            exe_suffix: ".exe",
            separator: '\\',
        }
    }

    /// `main` -> `main.exe` on Windows.
    pub fn executable_name(&self, stem: &str) -> String {
        format!("{stem}{}", self.exe_suffix)
    }

    /// Render `<dir><sep><file>` the way the compiler expects its `-o` argument,
    /// e.g. `tmp/main` or `tmp\main.exe`.
    pub fn output_arg(&self, output_dir: &Path, stem: &str) -> String {
        let dir = output_dir
            .to_string_lossy()
            .trim_end_matches(['/', '\\'])
            .to_string();
        format!("{dir}{}{}", self.separator, self.executable_name(stem))
    }

    /// Absolute location of the artifact produced under `root`.
    pub fn artifact_path(&self, root: &Path, output_dir: &Path, stem: &str) -> PathBuf {
        root.join(output_dir).join(self.executable_name(stem))
    }
}

impl Default for Platform {
    fn default() -> Self {
        Self::current()
    }
}
