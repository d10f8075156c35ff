//! Run configuration.
//!
//! Handles loading, merging, and validating the settings for one run. Values
//! are layered, later layers overriding earlier ones:
//!
//! ```text
//! stock defaults  →  config file (--config)  →  command-line flags
//! ```
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! input = "stickers"        # Directory tree scanned for *.png
//! output = "scaled"         # Directory receiving the normalized images
//! width = 512               # Canvas width in pixels
//! height = 512              # Canvas height in pixels
//! parallelism = 8           # Max files decoded/scaled/encoded at once (default: CPU cores)
//! threads = 8               # Worker threads for the task pool (omit for auto)
//! layout = "flat"           # "flat" or "mirror"
//! ```
//!
//! Unknown keys are rejected to catch typos early.
//!
//! The merged result is a [`RunConfig`]: validated once at startup, then
//! shared read-only by every component for the rest of the run.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("TOML serialize error: {0}")]
    Serialize(#[from] toml::ser::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// How output paths are derived from input paths.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum OutputLayout {
    /// `output/<file name>`: every image lands in one directory. Two inputs
    /// with the same file name are rejected before processing starts.
    #[default]
    Flat,
    /// `output/<path relative to input>`: the input tree is reproduced.
    Mirror,
}

/// Settings for a single run.
///
/// All fields have defaults; config files and flags only need the values
/// they want to change. Unknown keys are rejected.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RunConfig {
    /// Root of the input tree.
    pub input: PathBuf,
    /// Directory receiving the output images.
    pub output: PathBuf,
    /// Canvas width in pixels.
    pub width: u32,
    /// Canvas height in pixels.
    pub height: u32,
    /// Admission limit: files in decode/scale/encode at the same instant.
    pub parallelism: usize,
    /// Worker threads for the task pool. `None` means one per CPU core.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub threads: Option<usize>,
    /// Output naming scheme.
    pub layout: OutputLayout,
}

fn available_cores() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            input: PathBuf::from("stickers"),
            output: PathBuf::from("scaled"),
            width: 512,
            height: 512,
            parallelism: available_cores(),
            threads: None,
            layout: OutputLayout::default(),
        }
    }
}

impl RunConfig {
    /// Convenience constructor for the five core values, other fields default.
    pub fn new(
        input: impl Into<PathBuf>,
        output: impl Into<PathBuf>,
        width: u32,
        height: u32,
        parallelism: usize,
    ) -> Self {
        Self {
            input: input.into(),
            output: output.into(),
            width,
            height,
            parallelism,
            ..Self::default()
        }
    }

    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.width == 0 || self.height == 0 {
            return Err(ConfigError::Validation(
                "width and height must be at least 1".into(),
            ));
        }
        if self.parallelism == 0 {
            return Err(ConfigError::Validation(
                "parallelism must be at least 1".into(),
            ));
        }
        if self.threads == Some(0) {
            return Err(ConfigError::Validation(
                "threads must be at least 1 when set".into(),
            ));
        }
        if self.input.as_os_str().is_empty() || self.output.as_os_str().is_empty() {
            return Err(ConfigError::Validation(
                "input and output paths must not be empty".into(),
            ));
        }
        if self.input == self.output {
            return Err(ConfigError::Validation(format!(
                "output must differ from input ({})",
                self.input.display()
            )));
        }
        Ok(())
    }
}

/// Resolve the effective worker thread count.
///
/// - `None` → use all available cores
/// - `Some(n)` → use `min(n, cores)` (user can constrain down, not up)
pub fn effective_threads(config: &RunConfig) -> usize {
    let cores = available_cores();
    config.threads.map(|n| n.min(cores)).unwrap_or(cores)
}

// =============================================================================
// Layering
// =============================================================================

/// Command-line values layered on top of file config. `None` leaves the
/// underlying value untouched.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ConfigOverrides {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parallelism: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub threads: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub layout: Option<OutputLayout>,
}

impl ConfigOverrides {
    /// Render the set values as a sparse TOML table.
    pub fn to_value(&self) -> Result<toml::Value, ConfigError> {
        Ok(toml::Value::try_from(self)?)
    }
}

/// Returns the stock default config as a `toml::Value::Table`.
pub fn stock_defaults_value() -> Result<toml::Value, ConfigError> {
    Ok(toml::Value::try_from(RunConfig::default())?)
}

/// Recursively merge `overlay` on top of `base`.
///
/// - Tables are merged key-by-key (overlay keys override base keys).
/// - Non-table values in overlay replace base values entirely.
/// - Keys in base that are not in overlay are preserved.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_toml(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

/// Read a config file as a raw TOML value. The file must exist.
pub fn load_raw_config(path: &Path) -> Result<toml::Value, ConfigError> {
    let content = fs::read_to_string(path)?;
    Ok(toml::from_str(&content)?)
}

/// Merge overlays onto a base value in order, then deserialize and validate.
pub fn resolve_config(
    base: toml::Value,
    overlays: impl IntoIterator<Item = toml::Value>,
) -> Result<RunConfig, ConfigError> {
    let merged = overlays.into_iter().fold(base, merge_toml);
    let config: RunConfig = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Build the run configuration from stock defaults, an optional config file,
/// and command-line overrides.
pub fn load_config(
    file: Option<&Path>,
    overrides: &ConfigOverrides,
) -> Result<RunConfig, ConfigError> {
    let mut overlays = Vec::new();
    if let Some(path) = file {
        overlays.push(load_raw_config(path)?);
    }
    overlays.push(overrides.to_value()?);
    resolve_config(stock_defaults_value()?, overlays)
}

/// Returns a fully-commented stock config file with all keys and explanations.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# sticker-scale configuration
# ===========================
# All settings are optional. Values shown below are the defaults.
# Command-line flags override anything set here.
# Unknown keys will cause an error.

# Directory tree scanned (recursively) for *.png files, any letter case.
input = "stickers"

# Directory receiving the normalized images. Created if missing.
output = "scaled"

# Canvas size in pixels. Every output image is exactly width x height;
# the source is scaled to fit and centered on transparent padding.
width = 512
height = 512

# Maximum number of files being decoded, scaled, and encoded at the same
# instant. Bounds peak memory. Omit to use the number of CPU cores.
# parallelism = 8

# Worker threads for the task pool. Omit to auto-detect (= CPU cores).
# Values above the core count are clamped down.
# threads = 8

# Output naming:
#   "flat"   -> output/<file name>; duplicate file names abort the run
#   "mirror" -> output/<relative path>; subdirectories are reproduced
layout = "flat"
"##
}
