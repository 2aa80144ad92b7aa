//! Configuration module.
//!
//! Handles loading, validating, and merging `shapeshift.toml`. User values are
//! merged over stock defaults, so a config file only needs the keys it wants
//! to change.
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! backend = "magick"          # "magick" (external binary) or "native" (image crate)
//!
//! [magick]
//! program = ["convert"]       # e.g. ["magick"] or ["gm", "convert"]
//!
//! [output]
//! # quality = 90              # encoder quality 1-100 (omit for tool default)
//!
//! [processing]
//! # max_processes = 4         # Max parallel workers (omit for auto = CPU cores)
//!
//! [presets.thumb]
//! processor = "fill"
//! args = ["200", "200", "north"]
//! format = "webp"             # optional
//! pre = "fit:2000,2000"       # optional pre-transform
//! ```
//!
//! Presets are checked when the config loads: the processor must be one of
//! the registered modes and its args must resolve. Unknown keys are rejected
//! to catch typos early.

use crate::error::ProcessError;
use crate::geometry;
use crate::processor::{CallOptions, Mode};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use thiserror::Error;

/// Config file looked up when `--config` is not given.
pub const DEFAULT_CONFIG_FILE: &str = "shapeshift.toml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Which [`CommandRunner`](crate::command::CommandRunner) executes chains.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    /// Spawn an ImageMagick-compatible binary.
    #[default]
    Magick,
    /// Run in-process with the `image` crate.
    Native,
}

/// Configuration loaded from `shapeshift.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ShapeshiftConfig {
    pub backend: Backend,
    pub magick: MagickConfig,
    pub output: OutputConfig,
    pub processing: ProcessingConfig,
    /// Named processor invocations, keyed by preset name.
    pub presets: BTreeMap<String, PresetConfig>,
}

impl ShapeshiftConfig {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.magick.program.is_empty() {
            return Err(ConfigError::Validation("magick.program must not be empty".into()));
        }
        if let Some(quality) = self.output.quality {
            if !(1..=100).contains(&quality) {
                return Err(ConfigError::Validation("output.quality must be 1-100".into()));
            }
        }
        if self.processing.max_processes == Some(0) {
            return Err(ConfigError::Validation(
                "processing.max_processes must be at least 1".into(),
            ));
        }
        for (name, preset) in &self.presets {
            preset
                .check()
                .map_err(|e| ConfigError::Validation(format!("presets.{name}: {e}")))?;
        }
        Ok(())
    }

    /// Look up a preset by name.
    pub fn preset(&self, name: &str) -> Result<&PresetConfig, ConfigError> {
        self.presets.get(name).ok_or_else(|| {
            let known: Vec<&str> = self.presets.keys().map(String::as_str).collect();
            ConfigError::Validation(format!("unknown preset '{name}'. Available: {known:?}"))
        })
    }
}

/// External binary settings for the `magick` backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MagickConfig {
    /// Program and leading arguments.
    pub program: Vec<String>,
}

impl Default for MagickConfig {
    fn default() -> Self {
        Self {
            program: vec!["convert".to_string()],
        }
    }
}

/// Encoder settings shared by both backends.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OutputConfig {
    /// Encoder quality (1 = worst, 100 = best). `None` keeps the tool default.
    pub quality: Option<u32>,
}

/// Parallel processing settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProcessingConfig {
    /// Maximum number of files processed at once.
    /// When absent or null, defaults to the number of CPU cores.
    /// Values larger than the core count are clamped down.
    pub max_processes: Option<usize>,
}

/// Worker count for a batch: `max_processes` capped at the core count.
pub fn effective_threads(config: &ProcessingConfig) -> usize {
    let cores = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    config.max_processes.map(|n| n.min(cores)).unwrap_or(cores)
}

/// A named processor invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PresetConfig {
    /// Processor mode name (`limit`, `fit`, `fill`, `pad`, `convert`).
    pub processor: String,
    /// Positional arguments for the processor.
    #[serde(default)]
    pub args: Vec<String>,
    /// Output format for the final write.
    #[serde(default)]
    pub format: Option<String>,
    /// Pre-transform: `mode:arg,arg`, or raw tool arguments starting with `-`.
    #[serde(default)]
    pub pre: Option<String>,
}

impl PresetConfig {
    pub fn mode(&self) -> Result<Mode, ProcessError> {
        self.processor.parse()
    }

    /// Build the call options this preset asks for.
    pub fn call_options(&self) -> Result<CallOptions, ProcessError> {
        CallOptions::parse(self.format.clone(), self.pre.as_deref())
    }

    fn check(&self) -> Result<(), ProcessError> {
        self.mode()?.resolve(&self.args)?;
        if let Some(format) = &self.format {
            geometry::convert(format)?;
        }
        self.call_options()?;
        Ok(())
    }
}

// =============================================================================
// Config loading, merging, and validation
// =============================================================================

/// `ShapeshiftConfig::default()` as a TOML table, the layer a
/// `shapeshift.toml` is merged onto.
pub fn stock_defaults_value() -> toml::Value {
    toml::Value::try_from(ShapeshiftConfig::default()).expect("default config must serialize")
}

/// Lay `overlay` over `base`. Tables merge per key (so `[presets.*]` from
/// the file add to the defaults); arrays and scalars are replaced whole,
/// so a configured `magick.program` never appends to the default one.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    use toml::Value::Table;

    match (base, overlay) {
        (Table(mut into), Table(from)) => {
            for (key, value) in from {
                let value = match into.remove(&key) {
                    Some(existing) => merge_toml(existing, value),
                    None => value,
                };
                into.insert(key, value);
            }
            Table(into)
        }
        (_, replacement) => replacement,
    }
}

/// Read `shapeshift.toml` (or whatever `--config` names) without typing it.
/// A missing file is `Ok(None)`; a file that is not TOML is an error.
pub fn load_raw_config(path: &Path) -> Result<Option<toml::Value>, ConfigError> {
    if !path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(path)?;
    let value: toml::Value = toml::from_str(&content)?;
    Ok(Some(value))
}

/// Type the merged table as a [`ShapeshiftConfig`] and run
/// [`ShapeshiftConfig::validate`], presets included.
pub fn resolve_config(
    base: toml::Value,
    overlay: Option<toml::Value>,
) -> Result<ShapeshiftConfig, ConfigError> {
    let table = match overlay {
        Some(file) => merge_toml(base, file),
        None => base,
    };
    let config: ShapeshiftConfig = table.try_into()?;
    config.validate()?;
    Ok(config)
}

/// The config a CLI run uses: stock defaults with the file at `path` on top.
///
/// Unknown keys and invalid presets are rejected here, before any image
/// is touched.
pub fn load_config(path: &Path) -> Result<ShapeshiftConfig, ConfigError> {
    let base = stock_defaults_value();
    let overlay = load_raw_config(path)?;
    resolve_config(base, overlay)
}

/// Returns a fully-commented stock `shapeshift.toml` with all keys and explanations.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# Shapeshift Configuration
# =========================
# All settings are optional. Remove or comment out any you don't need.
# Values shown below are the defaults.
#
# Unknown keys will cause an error.

# Which runner executes the operation chains:
#   "magick" - spawn an ImageMagick-compatible binary (see [magick])
#   "native" - decode, resize and encode in-process (JPEG, PNG, TIFF, WebP)
backend = "magick"

# ---------------------------------------------------------------------------
# External binary
# ---------------------------------------------------------------------------
[magick]
# Program and leading arguments. The source path and operation arguments
# are appended. Examples: ["magick"] for ImageMagick 7, ["gm", "convert"]
# for GraphicsMagick.
program = ["convert"]

# ---------------------------------------------------------------------------
# Encoding
# ---------------------------------------------------------------------------
[output]
# Encoder quality, 1 (worst) to 100 (best). Omit to keep the tool default.
# quality = 90

# ---------------------------------------------------------------------------
# Parallel processing
# ---------------------------------------------------------------------------
[processing]
# Maximum number of files processed at once. Omit for auto (= CPU cores).
# Values above the core count are clamped down.
# max_processes = 4

# ---------------------------------------------------------------------------
# Presets
# ---------------------------------------------------------------------------
# A preset binds a processor to its arguments so `shapeshift preset NAME`
# runs it by name. Processors: limit, fit, fill, pad, convert.
#
#   [presets.thumb]
#   processor = "fill"
#   args = ["200", "200", "north"]   # width, height, gravity
#   format = "webp"                  # optional: write as WebP
#   pre = "fit:2000,2000"            # optional: applied first
#                                    # (or raw magick args: "-rotate 90")
#
#   [presets.avatar]
#   processor = "pad"
#   args = ["128", "128", "transparent"]
#   format = "png"
"##
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn default_config_uses_magick() {
        let config = ShapeshiftConfig::default();
        assert_eq!(config.backend, Backend::Magick);
        assert_eq!(config.magick.program, vec!["convert"]);
        assert_eq!(config.output.quality, None);
        assert!(config.presets.is_empty());
    }

    #[test]
    fn parse_partial_config() {
        let config: ShapeshiftConfig = toml::from_str(
            r#"
backend = "native"
"#,
        )
        .unwrap();
        assert_eq!(config.backend, Backend::Native);
        // Default values preserved
        assert_eq!(config.magick.program, vec!["convert"]);
    }

    #[test]
    fn parse_presets() {
        let config: ShapeshiftConfig = toml::from_str(
            r#"
[presets.thumb]
processor = "fill"
args = ["200", "200", "north"]
format = "webp"
"#,
        )
        .unwrap();
        let thumb = config.preset("thumb").unwrap();
        assert_eq!(thumb.mode().unwrap(), Mode::Fill);
        assert_eq!(thumb.args, vec!["200", "200", "north"]);
        assert_eq!(thumb.format.as_deref(), Some("webp"));
        assert_eq!(thumb.pre, None);
    }

    #[test]
    fn unknown_preset_lists_available() {
        let config = ShapeshiftConfig::default();
        let err = config.preset("thumb").unwrap_err();
        assert!(err.to_string().contains("unknown preset 'thumb'"));
    }

    #[test]
    fn preset_call_options_parse_pre_transform() {
        let preset = PresetConfig {
            processor: "fill".into(),
            args: vec!["100".into(), "100".into()],
            format: Some("png".into()),
            pre: Some("fit:2000,2000".into()),
        };
        let options = preset.call_options().unwrap();
        assert_eq!(options.format.as_deref(), Some("png"));
        assert_eq!(options.pre_transform, Some(geometry::fit("2000", "2000")));
    }

    // =========================================================================
    // validation tests
    // =========================================================================

    fn validate_toml(content: &str) -> Result<ShapeshiftConfig, ConfigError> {
        let overlay: toml::Value = toml::from_str(content).unwrap();
        resolve_config(stock_defaults_value(), Some(overlay))
    }

    #[test]
    fn validate_rejects_empty_program() {
        let result = validate_toml("[magick]\nprogram = []\n");
        assert!(matches!(result, Err(ConfigError::Validation(_))));
    }

    #[test]
    fn validate_rejects_quality_out_of_range() {
        assert!(validate_toml("[output]\nquality = 0\n").is_err());
        assert!(validate_toml("[output]\nquality = 101\n").is_err());
        assert_eq!(
            validate_toml("[output]\nquality = 100\n")
                .unwrap()
                .output
                .quality,
            Some(100)
        );
    }

    #[test]
    fn validate_rejects_zero_processes() {
        let result = validate_toml("[processing]\nmax_processes = 0\n");
        assert!(matches!(result, Err(ConfigError::Validation(_))));
    }

    #[test]
    fn validate_rejects_unknown_preset_processor() {
        let err = validate_toml("[presets.x]\nprocessor = \"crop\"\nargs = [\"1\", \"1\"]\n")
            .unwrap_err();
        assert!(err.to_string().contains("presets.x"));
        assert!(err.to_string().contains("unknown processor mode"));
    }

    #[test]
    fn validate_rejects_preset_bad_arity() {
        let result = validate_toml("[presets.x]\nprocessor = \"limit\"\nargs = [\"1\"]\n");
        assert!(matches!(result, Err(ConfigError::Validation(_))));
    }

    #[test]
    fn validate_rejects_preset_bad_pre() {
        let result = validate_toml(
            "[presets.x]\nprocessor = \"limit\"\nargs = [\"1\", \"1\"]\npre = \"convert:png\"\n",
        );
        assert!(matches!(result, Err(ConfigError::Validation(_))));
    }

    #[test]
    fn unknown_keys_rejected() {
        let result = validate_toml("[output]\nqualty = 90\n");
        assert!(matches!(result, Err(ConfigError::Toml(_))));
    }

    #[test]
    fn unknown_backend_rejected() {
        let result = validate_toml("backend = \"vips\"\n");
        assert!(matches!(result, Err(ConfigError::Toml(_))));
    }

    // =========================================================================
    // effective_threads tests
    // =========================================================================

    #[test]
    fn effective_threads_auto() {
        let config = ProcessingConfig {
            max_processes: None,
        };
        let cores = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1);
        assert_eq!(effective_threads(&config), cores);
    }

    #[test]
    fn effective_threads_clamped_to_cores() {
        let config = ProcessingConfig {
            max_processes: Some(99999),
        };
        let cores = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1);
        assert_eq!(effective_threads(&config), cores);
    }

    #[test]
    fn effective_threads_user_constrains_down() {
        let config = ProcessingConfig {
            max_processes: Some(1),
        };
        assert_eq!(effective_threads(&config), 1);
    }

    // =========================================================================
    // load_config tests
    // =========================================================================

    #[test]
    fn load_config_returns_default_when_no_file() {
        let tmp = TempDir::new().unwrap();
        let config = load_config(&tmp.path().join(DEFAULT_CONFIG_FILE)).unwrap();
        assert_eq!(config.backend, Backend::Magick);
    }

    #[test]
    fn load_config_reads_file() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join(DEFAULT_CONFIG_FILE);
        fs::write(
            &path,
            r#"
backend = "native"

[output]
quality = 85

[presets.avatar]
processor = "pad"
args = ["128", "128", "transparent"]
format = "png"
"#,
        )
        .unwrap();

        let config = load_config(&path).unwrap();
        assert_eq!(config.backend, Backend::Native);
        assert_eq!(config.output.quality, Some(85));
        assert_eq!(config.preset("avatar").unwrap().mode().unwrap(), Mode::Pad);
        // Unspecified values should be defaults
        assert_eq!(config.magick.program, vec!["convert"]);
    }

    #[test]
    fn load_config_invalid_toml_is_error() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join(DEFAULT_CONFIG_FILE);
        fs::write(&path, "this is not valid toml [[[").unwrap();

        let result = load_config(&path);
        assert!(matches!(result, Err(ConfigError::Toml(_))));
    }

    // =========================================================================
    // merge_toml tests
    // =========================================================================

    #[test]
    fn merge_toml_overlay_replaces_scalars() {
        let base: toml::Value = toml::from_str("a = 1\n[t]\nx = 1\ny = 2\n").unwrap();
        let overlay: toml::Value = toml::from_str("[t]\ny = 3\n").unwrap();
        let merged = merge_toml(base, overlay);
        assert_eq!(merged["a"].as_integer(), Some(1));
        assert_eq!(merged["t"]["x"].as_integer(), Some(1));
        assert_eq!(merged["t"]["y"].as_integer(), Some(3));
    }

    #[test]
    fn merge_toml_replaces_arrays_whole() {
        let base = stock_defaults_value();
        let overlay: toml::Value =
            toml::from_str("[magick]\nprogram = [\"gm\", \"convert\"]\n").unwrap();
        let config: ShapeshiftConfig = merge_toml(base, overlay).try_into().unwrap();
        assert_eq!(config.magick.program, vec!["gm", "convert"]);
    }

    // =========================================================================
    // stock_config_toml tests
    // =========================================================================

    #[test]
    fn stock_config_toml_is_valid_toml() {
        let content = stock_config_toml();
        let _: toml::Value = toml::from_str(content).expect("stock config must be valid TOML");
    }

    #[test]
    fn stock_config_toml_roundtrips_to_defaults() {
        let config: ShapeshiftConfig = toml::from_str(stock_config_toml()).unwrap();
        config.validate().unwrap();
        assert_eq!(config.backend, Backend::Magick);
        assert_eq!(config.magick.program, vec!["convert"]);
        assert_eq!(config.output.quality, None);
        assert_eq!(config.processing.max_processes, None);
    }

    #[test]
    fn stock_config_toml_contains_all_sections() {
        let content = stock_config_toml();
        assert!(content.contains("[magick]"));
        assert!(content.contains("[output]"));
        assert!(content.contains("[processing]"));
        assert!(content.contains("[presets.thumb]"));
    }

    #[test]
    fn stock_defaults_value_has_all_sections() {
        let val = stock_defaults_value();
        assert!(val.is_table());
        assert!(val.get("backend").is_some());
        assert!(val.get("magick").is_some());
        assert!(val.get("output").is_some());
        assert!(val.get("processing").is_some());
        assert!(val.get("presets").is_some());
    }
}
