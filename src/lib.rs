// src/lib.rs

pub mod cli;
pub mod config;
pub mod engine;
pub mod errors;
pub mod exec;
pub mod fs;
pub mod logging;
pub mod types;
pub mod watch;

use std::path::Path;

use tracing::{debug, info, warn};

use crate::cli::{CliArgs, Command, RunArgs};
use crate::config::{resolve_config, ConfigFile};
use crate::engine::{ShutdownSignals, Supervisor};
use crate::errors::{Result, SupervisorError};
use crate::exec::{BuildCommand, ChildLauncher, CompilerBackend, Toolchain};
use crate::types::Platform;
use crate::watch::WatchSet;

/// High-level entry point used by `main.rs`.
pub async fn run(args: CliArgs) -> Result<()> {
    match args.command {
        Command::Run(run_args) => run_dev(run_args).await,
    }
}

/// `tz-gin run`.
///
/// This wires together:
/// - config resolution
/// - platform and toolchain facts (resolved once, passed down by value)
/// - the watch set, the compiler backend and the process launcher
/// - signal handling and the supervisor
pub async fn run_dev(args: RunArgs) -> Result<()> {
    let root = args.directory.as_path();
    if !root.is_dir() {
        return Err(SupervisorError::ConfigError(format!(
            "project directory {root:?} does not exist or is not a directory"
        )));
    }

    let cfg = resolve_config(root, args.config.as_deref())?;
    let settings = cfg.run();
    let platform = Platform::current();

    info!(
        app = %cfg.app().name,
        version = %cfg.app().version,
        root = ?root,
        "tz-gin starting"
    );

    let watch_set = WatchSet::from_settings(root, settings)?;
    // Compiler and artifact are addressed through the canonical root.
    let root = watch_set.root().to_path_buf();

    if args.dry_run {
        let toolchain = match Toolchain::probe(&settings.compiler).await {
            Ok(t) => t,
            Err(err) => {
                warn!(error = %err, "toolchain probe failed; assuming a modern compiler");
                Toolchain::assume_modern(&settings.compiler)
            }
        };
        let build = BuildCommand::new(&root, settings, platform, &toolchain);
        print_dry_run(&cfg, &watch_set, &build, &toolchain);
        return Ok(());
    }

    let toolchain = Toolchain::probe(&settings.compiler).await?;
    debug!(?toolchain, "compiler toolchain");

    let build = BuildCommand::new(&root, settings, platform, &toolchain);
    info!(cmd = %build.display(), "build command");

    let builder = CompilerBackend::new(build).with_timeout(settings.build_timeout);
    let launcher = ChildLauncher::new(settings.run_args.clone());

    // Installed before anything is spawned so Ctrl-C is never missed.
    let signals = ShutdownSignals::install()?;

    Supervisor::new(watch_set, builder, launcher)
        .output_dir(root.join(&settings.output_dir))
        .settle_delay(settings.settle_delay)
        .run(async move {
            let name = signals.recv().await;
            info!(signal = name, "received shutdown signal");
        })
        .await
}

/// Print what `run` would do, without doing it.
fn print_dry_run(cfg: &ConfigFile, watch_set: &WatchSet, build: &BuildCommand, toolchain: &Toolchain) {
    let app = cfg.app();
    let settings = cfg.run();

    println!("tz-gin dry-run");
    println!("  app: {} {} ({})", app.name, app.version, app.author);
    println!("  root: {}", watch_set.root().display());
    println!();

    println!("watch ({}):", watch_set.dirs().len());
    for dir in watch_set.dirs() {
        println!("  - {}", display_relative(watch_set.root(), dir));
    }

    println!("ignore ({}):", watch_set.ignore_prefixes().len());
    for prefix in watch_set.ignore_prefixes() {
        println!("  - {}", prefix.display());
    }

    if !watch_set.exclude_patterns().is_empty() {
        println!("exclude ({}):", watch_set.exclude_patterns().len());
        for pat in watch_set.exclude_patterns() {
            println!("  - {pat}");
        }
    }
    println!();

    match toolchain.version {
        Some(version) => println!("toolchain: {} ({version})", toolchain.compiler),
        None => println!("toolchain: {} (version unknown)", toolchain.compiler),
    }
    println!("build: {}", build.display());
    if let Some(dir) = &build.current_dir {
        println!("  in: {}", dir.display());
    }

    let mut run_line = build.artifact.display().to_string();
    for arg in &settings.run_args {
        run_line.push(' ');
        run_line.push_str(arg);
    }
    println!("run: {run_line}");
    println!();

    println!("settle_delay: {:?}", settings.settle_delay);
    match settings.build_timeout {
        Some(t) => println!("build_timeout: {t:?}"),
        None => println!("build_timeout: none"),
    }

    debug!("dry-run complete (no execution)");
}

fn display_relative(root: &Path, dir: &Path) -> String {
    match dir.strip_prefix(root) {
        Ok(rel) if rel.as_os_str().is_empty() => ".".to_string(),
        Ok(rel) => rel.display().to_string(),
        Err(_) => dir.display().to_string(),
    }
}
