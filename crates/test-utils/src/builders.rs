#![allow(dead_code)]

use tz_gin::config::{ConfigFile, RawConfigFile, RunSection};
use tz_gin::errors::Result;

/// Builder for `ConfigFile` to simplify test setup.
///
/// Starts from the built-in defaults; each setter replaces one `[run]` field.
pub struct ConfigFileBuilder {
    config: RawConfigFile,
}

impl ConfigFileBuilder {
    pub fn new() -> Self {
        Self {
            config: RawConfigFile::default(),
        }
    }

    pub fn with_watch(mut self, dirs: &[&str]) -> Self {
        self.config.run.watch = to_strings(dirs);
        self
    }

    pub fn with_ignore(mut self, prefixes: &[&str]) -> Self {
        self.config.run.ignore = to_strings(prefixes);
        self
    }

    pub fn with_exclude(mut self, pattern: &str) -> Self {
        self.config.run.exclude.push(pattern.to_string());
        self
    }

    pub fn with_output_dir(mut self, dir: &str) -> Self {
        self.config.run.output_dir = dir.to_string();
        self
    }

    pub fn with_artifact(mut self, artifact: &str) -> Self {
        self.config.run.artifact = artifact.to_string();
        self
    }

    pub fn with_settle_delay(mut self, delay: &str) -> Self {
        self.config.run.settle_delay = delay.to_string();
        self
    }

    pub fn with_build_timeout(mut self, timeout: &str) -> Self {
        self.config.run.build_timeout = Some(timeout.to_string());
        self
    }

    pub fn with_run(mut self, run: RunSection) -> Self {
        self.config.run = run;
        self
    }

    pub fn raw(self) -> RawConfigFile {
        self.config
    }

    pub fn try_build(self) -> Result<ConfigFile> {
        ConfigFile::try_from(self.config)
    }

    pub fn build(self) -> ConfigFile {
        self.try_build()
            .expect("Failed to build valid config from builder")
    }
}

impl Default for ConfigFileBuilder {
    fn default() -> Self {
        Self::new()
    }
}

fn to_strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}
