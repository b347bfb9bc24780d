// src/config/mod.rs

//! Configuration loading and validation for tz-gin.
//!
//! Responsibilities:
//! - Define the TOML-backed data model (`model.rs`).
//! - Load a config file from disk, or fall back to defaults (`loader.rs`).
//! - Validate paths, globs and durations (`validate.rs`).
//!
//! The supervisor itself only consumes the resolved [`RunSettings`].

pub mod duration;
pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{load_and_validate, load_from_path, resolve_config, DEFAULT_CONFIG_FILE};
pub use model::{AppSection, ConfigFile, RawConfigFile, RunSection, RunSettings};
