//! Project configuration.
//!
//! Handles loading, validating, and merging `config.toml`. Stock defaults are
//! overridden by the project's `config.toml`, which only needs the keys it
//! changes.
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! content_dir = "content"   # Markdown documents
//! output_dir = "_site"      # Build manifest destination
//!
//! [images]
//! widths = [655, 1310, 1965]          # Responsive widths to generate
//! formats = ["webp", "jpeg", "avif"]  # avif | webp | png | jpeg (jpg)
//! quality = 90                        # Lossy encoding quality (1-100)
//! output_dir = "_site/img"            # Where variant files are written
//! url_path = "/img/"                  # Public URL of output_dir
//! asset_dir = "site/assets"           # Where {% asset %} names are resolved
//! default_sizes = "(min-width: 40ch) 90vw, (min-width: 65ch) 90vw, 100vw"
//!
//! [processing]
//! max_processes = 4         # Max parallel image workers (omit for auto = CPU cores)
//! ```
//!
//! Relative paths are resolved against the directory holding `config.toml`.
//! Unknown keys are rejected to catch typos early.

use crate::imaging::OutputFormat;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Name of the config file in the project root.
pub const CONFIG_FILENAME: &str = "config.toml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Project configuration loaded from `config.toml`.
///
/// All fields have defaults. Unknown keys are rejected.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SiteConfig {
    /// Directory scanned for Markdown documents.
    pub content_dir: PathBuf,
    /// Directory the build manifest is written to.
    pub output_dir: PathBuf,
    /// Responsive image generation settings.
    pub images: ImagesConfig,
    /// Parallel processing settings.
    pub processing: ProcessingConfig,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            content_dir: PathBuf::from("content"),
            output_dir: PathBuf::from("_site"),
            images: ImagesConfig::default(),
            processing: ProcessingConfig::default(),
        }
    }
}

impl SiteConfig {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.images.quality == 0 || self.images.quality > 100 {
            return Err(ConfigError::Validation(
                "images.quality must be 1-100".into(),
            ));
        }
        if self.images.widths.is_empty() {
            return Err(ConfigError::Validation(
                "images.widths must not be empty".into(),
            ));
        }
        if self.images.widths.contains(&0) {
            return Err(ConfigError::Validation(
                "images.widths values must be non-zero".into(),
            ));
        }
        if self.images.formats.is_empty() {
            return Err(ConfigError::Validation(
                "images.formats must not be empty".into(),
            ));
        }
        if self.images.url_path.trim().is_empty() {
            return Err(ConfigError::Validation(
                "images.url_path must not be empty".into(),
            ));
        }
        if self.processing.max_processes == Some(0) {
            return Err(ConfigError::Validation(
                "processing.max_processes must be at least 1".into(),
            ));
        }
        Ok(())
    }

    /// Resolve relative paths against the project root.
    pub fn resolve_paths(mut self, root: &Path) -> Self {
        self.content_dir = root.join(&self.content_dir);
        self.output_dir = root.join(&self.output_dir);
        self.images.output_dir = root.join(&self.images.output_dir);
        self.images.asset_dir = root.join(&self.images.asset_dir);
        self
    }
}

/// Parallel processing settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProcessingConfig {
    /// Maximum number of parallel image processing workers.
    /// When absent, defaults to the number of CPU cores.
    /// Values larger than the core count are clamped down.
    pub max_processes: Option<usize>,
}

/// Resolve the effective thread count from config.
///
/// - `None` → use all available cores
/// - `Some(n)` → use `min(n, cores)` (user can constrain down, not up)
pub fn effective_threads(config: &ProcessingConfig) -> usize {
    let cores = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    config
        .max_processes
        .map(|n| n.clamp(1, cores))
        .unwrap_or(cores)
}

/// Responsive image generation settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ImagesConfig {
    /// Pixel widths generated for `{% image %}` and `{% asset %}`.
    pub widths: Vec<u32>,
    /// Output formats. Order does not matter; markup lists them by capability.
    pub formats: Vec<OutputFormat>,
    /// Lossy encoding quality (1 = worst, 100 = best).
    pub quality: u32,
    /// Directory variant files are written to.
    pub output_dir: PathBuf,
    /// Public URL prefix of `output_dir`.
    pub url_path: String,
    /// Directory `{% asset %}` names are resolved against.
    pub asset_dir: PathBuf,
    /// `sizes` attribute used by `{% asset %}` when none is given.
    pub default_sizes: String,
}

impl Default for ImagesConfig {
    fn default() -> Self {
        Self {
            widths: vec![655, 1310, 1965],
            formats: vec![OutputFormat::Webp, OutputFormat::Jpeg, OutputFormat::Avif],
            quality: 90,
            output_dir: PathBuf::from("_site/img"),
            url_path: "/img/".to_string(),
            asset_dir: PathBuf::from("site/assets"),
            default_sizes: "(min-width: 40ch) 90vw, (min-width: 65ch) 90vw, 100vw".to_string(),
        }
    }
}

// =============================================================================
// Config loading, merging, and validation
// =============================================================================

/// Returns the stock default config as a `toml::Value::Table`.
///
/// This is the base layer user overrides are merged on top of.
pub fn stock_defaults_value() -> Result<toml::Value, ConfigError> {
    toml::Value::try_from(SiteConfig::default())
        .map_err(|e| ConfigError::Validation(format!("default config must serialize: {e}")))
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

/// Load a config file as a raw TOML value.
///
/// Returns `Ok(None)` if the file does not exist.
/// Returns `Err` if the file exists but contains invalid TOML.
pub fn load_raw_config(config_path: &Path) -> Result<Option<toml::Value>, ConfigError> {
    if !config_path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(config_path)?;
    let value: toml::Value = toml::from_str(&content)?;
    Ok(Some(value))
}

/// Merge an optional overlay onto a base value, then deserialize and validate.
pub fn resolve_config(
    base: toml::Value,
    overlay: Option<toml::Value>,
) -> Result<SiteConfig, ConfigError> {
    let merged = match overlay {
        Some(ov) => merge_toml(base, ov),
        None => base,
    };
    let config: SiteConfig = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Load config from `config.toml` in the project root.
///
/// Merges user values on top of stock defaults, rejects unknown keys,
/// validates the result and resolves relative paths against `root`.
pub fn load_config(root: &Path) -> Result<SiteConfig, ConfigError> {
    load_config_file(&root.join(CONFIG_FILENAME))
}

/// Load config from an explicit file path. The project root is the file's
/// directory; a missing file yields the stock defaults.
pub fn load_config_file(config_path: &Path) -> Result<SiteConfig, ConfigError> {
    let root = match config_path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };
    let base = stock_defaults_value()?;
    let overlay = load_raw_config(config_path)?;
    Ok(resolve_config(base, overlay)?.resolve_paths(root))
}

/// Returns a fully-commented stock `config.toml` with all keys and explanations.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# Postsmith Configuration
# =======================
# All settings are optional. Remove or comment out any you don't need.
# Values shown below are the defaults.
#
# Relative paths are resolved against the directory holding this file.
# Unknown keys will cause an error.

# Directory scanned for Markdown documents.
content_dir = "content"

# Directory the build manifest (manifest.json) is written to.
output_dir = "_site"

# ---------------------------------------------------------------------------
# Responsive image generation
# ---------------------------------------------------------------------------
[images]
# Pixel widths generated for {% image %} and {% asset %} shortcodes.
# Widths larger than the source are skipped; images are never upscaled.
widths = [655, 1310, 1965]

# Output formats: avif, webp, png, jpeg (or jpg).
# The least capable format becomes the <img> fallback.
formats = ["webp", "jpeg", "avif"]

# Lossy encoding quality (1 = worst, 100 = best). WebP output is lossless.
quality = 90

# Where variant files are written, and the URL they are served from.
output_dir = "_site/img"
url_path = "/img/"

# Directory {% asset "name" %} looks names up in.
asset_dir = "site/assets"

# sizes attribute used by {% asset %} when the shortcode gives none.
default_sizes = "(min-width: 40ch) 90vw, (min-width: 65ch) 90vw, 100vw"

# ---------------------------------------------------------------------------
# Processing
# ---------------------------------------------------------------------------
[processing]
# Maximum parallel image-processing workers.
# Omit or comment out to auto-detect (= number of CPU cores).
# max_processes = 4
"##
}
