// src/config/validate.rs

use std::path::{Component, Path, PathBuf};

use globset::Glob;

use crate::config::duration::parse_duration;
use crate::config::model::{ConfigFile, RawConfigFile, RunSection, RunSettings};
use crate::errors::{Result, SupervisorError};

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = SupervisorError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        let run = validate_run_section(&raw.run)?;
        Ok(ConfigFile::new_unchecked(raw.app, run))
    }
}

fn validate_run_section(run: &RunSection) -> Result<RunSettings> {
    ensure_non_empty("compiler", &run.compiler)?;
    ensure_non_empty("package", &run.package)?;
    ensure_non_empty("artifact", &run.artifact)?;
    ensure_non_empty("output_dir", &run.output_dir)?;

    if run.artifact.contains(['/', '\\']) {
        return Err(SupervisorError::ConfigError(format!(
            "[run].artifact must be a file name, not a path (got {:?})",
            run.artifact
        )));
    }

    let watch = relative_paths("watch", &run.watch)?;
    let ignore = relative_paths("ignore", &run.ignore)?;
    let output_dir = relative_path("output_dir", &run.output_dir)?;

    for pattern in &run.exclude {
        Glob::new(pattern).map_err(|e| {
            SupervisorError::ConfigError(format!(
                "[run].exclude has invalid glob {pattern:?}: {e}"
            ))
        })?;
    }

    let settle_delay = parse_duration(&run.settle_delay).map_err(|e| {
        SupervisorError::ConfigError(format!("[run].settle_delay: {e}"))
    })?;

    let build_timeout = match run.build_timeout.as_deref() {
        Some(s) => {
            let timeout = parse_duration(s).map_err(|e| {
                SupervisorError::ConfigError(format!("[run].build_timeout: {e}"))
            })?;
            if timeout.is_zero() {
                return Err(SupervisorError::ConfigError(
                    "[run].build_timeout must be greater than zero".to_string(),
                ));
            }
            Some(timeout)
        }
        None => None,
    };

    Ok(RunSettings {
        watch,
        ignore,
        exclude: run.exclude.clone(),
        compiler: run.compiler.trim().to_string(),
        package: run.package.trim().to_string(),
        output_dir,
        artifact: run.artifact.trim().to_string(),
        build_flags: run.build_flags.clone(),
        run_args: run.run_args.clone(),
        settle_delay,
        build_timeout,
    })
}

fn ensure_non_empty(field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(SupervisorError::ConfigError(format!(
            "[run].{field} must not be empty"
        )));
    }
    Ok(())
}

fn relative_paths(field: &str, values: &[String]) -> Result<Vec<PathBuf>> {
    values.iter().map(|v| relative_path(field, v)).collect()
}

/// Accept only paths that stay inside the project root.
fn relative_path(field: &str, value: &str) -> Result<PathBuf> {
    let path = Path::new(value.trim());
    let escapes = path.components().any(|c| {
        matches!(
            c,
            Component::RootDir | Component::Prefix(_) | Component::ParentDir
        )
    });
    if escapes || path.as_os_str().is_empty() {
        return Err(SupervisorError::ConfigError(format!(
            "[run].{field} entries must be relative paths inside the project (got {value:?})"
        )));
    }

    // Normalise away `./` segments so prefix checks compare like with like.
    Ok(path
        .components()
        .filter(|c| !matches!(c, Component::CurDir))
        .collect())
}
