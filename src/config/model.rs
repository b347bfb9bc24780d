// src/config/model.rs

use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

/// Source subdirectories watched next to the project root by default.
pub const DEFAULT_WATCH: &[&str] = &[
    "common",
    "config",
    "controller",
    "middleware",
    "model",
    "router",
    "service",
    "service/validator",
];

/// Path prefixes (relative to the root) that never trigger a rebuild.
pub const DEFAULT_IGNORE: &[&str] = &["log", ".git", "docs", "tmp"];

/// Top-level configuration as read from a TOML file.
///
/// ```toml
/// [app]
/// name = "tz-gin-cli"
/// version = "0.2.0"
///
/// [run]
/// watch = ["controller", "router"]
/// ignore = ["log", ".git", "tmp"]
/// exclude = ["**/*.swp"]
/// build_timeout = "2m"
/// ```
///
/// All sections are optional and have reasonable defaults.
/// This is the unvalidated form; use [`ConfigFile`] everywhere else.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawConfigFile {
    /// Static application metadata from `[app]`.
    #[serde(default)]
    pub app: AppSection,

    /// Live-reload settings from `[run]`.
    #[serde(default)]
    pub run: RunSection,
}

/// `[app]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct AppSection {
    #[serde(default = "default_app_name")]
    pub name: String,
    #[serde(default = "default_app_usage")]
    pub usage: String,
    #[serde(default = "default_app_author")]
    pub author: String,
    #[serde(default = "default_app_version")]
    pub version: String,
}

fn default_app_name() -> String {
    "tz-gin-cli".to_string()
}

fn default_app_usage() -> String {
    "quickly build tenzor normalizing go-gin code".to_string()
}

fn default_app_author() -> String {
    "tenzor/tiaozhan".to_string()
}

fn default_app_version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}

impl Default for AppSection {
    fn default() -> Self {
        Self {
            name: default_app_name(),
            usage: default_app_usage(),
            author: default_app_author(),
            version: default_app_version(),
        }
    }
}

/// `[run]` section, as written by the user.
#[derive(Debug, Clone, Deserialize)]
pub struct RunSection {
    /// Subdirectories of the root to watch (non-recursively). The root itself
    /// is always watched.
    #[serde(default = "default_watch")]
    pub watch: Vec<String>,

    /// Path prefixes relative to the root whose events are dropped.
    #[serde(default = "default_ignore")]
    pub ignore: Vec<String>,

    /// Glob patterns (relative to the root) whose events are dropped,
    /// e.g. editor swap files.
    #[serde(default)]
    pub exclude: Vec<String>,

    /// Compiler binary used for `<compiler> build`.
    #[serde(default = "default_compiler")]
    pub compiler: String,

    /// Package argument passed last to the build command.
    #[serde(default = "default_package")]
    pub package: String,

    /// Build output directory relative to the root. Removed on exit.
    #[serde(default = "default_output_dir")]
    pub output_dir: String,

    /// Artifact file stem; the platform executable suffix is appended.
    #[serde(default = "default_artifact")]
    pub artifact: String,

    /// Extra flags inserted before the package argument.
    #[serde(default)]
    pub build_flags: Vec<String>,

    /// Arguments passed to the artifact when it is launched.
    #[serde(default)]
    pub run_args: Vec<String>,

    /// Delay between a write notification and fingerprinting the file
    /// (e.g. `"100ms"`).
    #[serde(default = "default_settle_delay")]
    pub settle_delay: String,

    /// Optional upper bound for a single build (e.g. `"2m"`). Unset means
    /// builds may take as long as they need.
    #[serde(default)]
    pub build_timeout: Option<String>,
}

fn default_watch() -> Vec<String> {
    DEFAULT_WATCH.iter().map(|s| s.to_string()).collect()
}

fn default_ignore() -> Vec<String> {
    DEFAULT_IGNORE.iter().map(|s| s.to_string()).collect()
}

fn default_compiler() -> String {
    "go".to_string()
}

fn default_package() -> String {
    ".".to_string()
}

fn default_output_dir() -> String {
    "tmp".to_string()
}

fn default_artifact() -> String {
    "main".to_string()
}

fn default_settle_delay() -> String {
    "100ms".to_string()
}

impl Default for RunSection {
    fn default() -> Self {
        Self {
            watch: default_watch(),
            ignore: default_ignore(),
            exclude: Vec::new(),
            compiler: default_compiler(),
            package: default_package(),
            output_dir: default_output_dir(),
            artifact: default_artifact(),
            build_flags: Vec::new(),
            run_args: Vec::new(),
            settle_delay: default_settle_delay(),
            build_timeout: None,
        }
    }
}

/// Validated `[run]` settings with paths and durations resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSettings {
    pub watch: Vec<PathBuf>,
    pub ignore: Vec<PathBuf>,
    pub exclude: Vec<String>,
    pub compiler: String,
    pub package: String,
    pub output_dir: PathBuf,
    pub artifact: String,
    pub build_flags: Vec<String>,
    pub run_args: Vec<String>,
    pub settle_delay: Duration,
    pub build_timeout: Option<Duration>,
}

/// Validated configuration.
///
/// Only constructible through `TryFrom<RawConfigFile>` (see `validate.rs`),
/// so holders can rely on every field having been checked.
#[derive(Debug, Clone)]
pub struct ConfigFile {
    app: AppSection,
    run: RunSettings,
}

impl ConfigFile {
    pub(crate) fn new_unchecked(app: AppSection, run: RunSettings) -> Self {
        Self { app, run }
    }

    pub fn app(&self) -> &AppSection {
        &self.app
    }

    pub fn run(&self) -> &RunSettings {
        &self.run
    }
}
