//! Application configuration.
//!
//! Handles loading, validating, and merging `shutterpost.toml`. Stock defaults
//! are serialized to a TOML table, the user file is merged on top key by key,
//! and the result is deserialized and validated.
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! [output]
//! quality = 92                      # JPEG quality (1-100)
//!
//! [storage]
//! blob_root = "data/blobs"          # Where uploaded images are written
//! document_root = "data/documents"  # Where post records are written
//! # public_base_url = "https://cdn.example.com"
//!
//! [feed]
//! page_size = 20                    # Posts shown by `feed`
//!
//! [processing]
//! # max_threads = 4                 # Omit for auto = CPU cores
//! ```
//!
//! Relative storage paths are resolved against the directory holding the
//! config file. Unknown keys are rejected to catch typos early.

use crate::feed::DEFAULT_PAGE_SIZE;
use crate::imaging::Quality;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Name of the config file looked up in the config directory.
pub const CONFIG_FILENAME: &str = "shutterpost.toml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Configuration loaded from `shutterpost.toml`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AppConfig {
    /// Encoding of shared images.
    pub output: OutputConfig,
    /// Local blob and document stores.
    pub storage: StorageConfig,
    /// Feed listing.
    pub feed: FeedConfig,
    /// Parallel processing settings.
    pub processing: ProcessingConfig,
}

impl AppConfig {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(1..=100).contains(&self.output.quality) {
            return Err(ConfigError::Validation(
                "output.quality must be 1-100".into(),
            ));
        }
        if self.storage.blob_root.trim().is_empty() {
            return Err(ConfigError::Validation(
                "storage.blob_root must not be empty".into(),
            ));
        }
        if self.storage.document_root.trim().is_empty() {
            return Err(ConfigError::Validation(
                "storage.document_root must not be empty".into(),
            ));
        }
        if self
            .storage
            .public_base_url
            .as_deref()
            .is_some_and(|url| url.trim().is_empty())
        {
            return Err(ConfigError::Validation(
                "storage.public_base_url must not be empty when set".into(),
            ));
        }
        if self.feed.page_size == 0 {
            return Err(ConfigError::Validation(
                "feed.page_size must be greater than 0".into(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OutputConfig {
    /// JPEG encoding quality (1 = worst, 100 = best).
    pub quality: u32,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            quality: Quality::default().value(),
        }
    }
}

impl OutputConfig {
    pub fn quality(&self) -> Quality {
        Quality::new(self.quality)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StorageConfig {
    pub blob_root: String,
    pub document_root: String,
    /// Prefix for public image URLs. When absent, `file://` URLs are used.
    pub public_base_url: Option<String>,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            blob_root: "data/blobs".to_string(),
            document_root: "data/documents".to_string(),
            public_base_url: None,
        }
    }
}

impl StorageConfig {
    pub fn blob_root_in(&self, config_dir: &Path) -> PathBuf {
        config_dir.join(&self.blob_root)
    }

    pub fn document_root_in(&self, config_dir: &Path) -> PathBuf {
        config_dir.join(&self.document_root)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FeedConfig {
    pub page_size: usize,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

/// Parallel processing settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProcessingConfig {
    /// Maximum number of rasterizer worker threads.
    /// When absent, defaults to the number of CPU cores.
    /// Values larger than the core count are clamped down.
    pub max_threads: Option<usize>,
}

/// Resolve the effective thread count from config.
///
/// - `None` → use all available cores
/// - `Some(n)` → use `min(n, cores)`, at least 1
pub fn effective_threads(config: &ProcessingConfig) -> usize {
    let cores = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    config
        .max_threads
        .map(|n| n.clamp(1, cores))
        .unwrap_or(cores)
}

/// Returns the stock default config as a `toml::Value::Table`.
///
/// This is the base layer user overrides are merged onto.
pub fn stock_defaults_value() -> toml::Value {
    toml::Value::try_from(AppConfig::default()).expect("default config must serialize")
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

/// Load `shutterpost.toml` from a directory as a raw TOML value.
///
/// Returns `Ok(None)` if the file does not exist.
pub fn load_raw_config(dir: &Path) -> Result<Option<toml::Value>, ConfigError> {
    let config_path = dir.join(CONFIG_FILENAME);
    if !config_path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(&config_path)?;
    let value: toml::Value = toml::from_str(&content)?;
    Ok(Some(value))
}

/// Merge an optional overlay onto a base value, then deserialize and validate.
pub fn resolve_config(
    base: toml::Value,
    overlay: Option<toml::Value>,
) -> Result<AppConfig, ConfigError> {
    let merged = match overlay {
        Some(ov) => merge_toml(base, ov),
        None => base,
    };
    let config: AppConfig = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Load config from `shutterpost.toml` in the given directory.
pub fn load_config(dir: &Path) -> Result<AppConfig, ConfigError> {
    let config = resolve_config(stock_defaults_value(), load_raw_config(dir)?)?;
    tracing::debug!(dir = %dir.display(), "loaded config");
    Ok(config)
}

/// Returns a fully-commented stock `shutterpost.toml`.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# Shutterpost Configuration
# ========================
# All settings are optional. Remove or comment out any you don't need.
# Values shown below are the defaults.
# Unknown keys will cause an error.

# ---------------------------------------------------------------------------
# Output encoding
# ---------------------------------------------------------------------------
[output]
# JPEG quality for shared images (1 = worst, 100 = best).
quality = 92

# ---------------------------------------------------------------------------
# Storage
# ---------------------------------------------------------------------------
[storage]
# Directory uploaded images are written to, relative to this file.
blob_root = "data/blobs"

# Directory post records are written to, relative to this file.
document_root = "data/documents"

# Prefix for public image URLs. Omit to use file:// URLs.
# public_base_url = "https://cdn.example.com"

# ---------------------------------------------------------------------------
# Feed
# ---------------------------------------------------------------------------
[feed]
# Number of posts listed by `shutterpost feed`.
page_size = 20

# ---------------------------------------------------------------------------
# Processing
# ---------------------------------------------------------------------------
[processing]
# Maximum rasterizer worker threads.
# Omit or comment out to auto-detect (= number of CPU cores).
# max_threads = 4
"##
}
