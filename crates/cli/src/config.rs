//! `typebridge.toml` loading.
//!
//! Layering is defaults < config file < flags; each command merges its own
//! flags over the sections read here.

use std::fs;
use std::path::{Path, PathBuf};

use clap::ValueEnum;
use serde::Deserialize;
use tracing::debug;

/// Config file picked up from the working directory when `--config` is absent.
pub const DEFAULT_CONFIG_FILE: &str = "typebridge.toml";

/// What the api command emits when no include list is given.
#[derive(ValueEnum, Deserialize, Clone, Debug, Copy, PartialEq, Eq, Default)]
#[value(rename_all = "lower")]
#[serde(rename_all = "lowercase")]
pub enum SelectionMode {
    /// Every public function
    #[default]
    Public,
    /// Only the functions in the curated list
    Curated,
}

/// `[api]` section.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct ApiConfig {
    /// Declaration file.
    pub input: Option<PathBuf>,
    /// Swift output.
    pub out: Option<PathBuf>,
    /// Root exports to walk.
    pub roots: Option<Vec<String>>,
    /// Functions to generate instead of the default selection.
    pub include: Vec<String>,
    /// Functions to leave out.
    pub exclude: Vec<String>,
    /// Selection used without an include list.
    pub default_selection: Option<SelectionMode>,
    /// List used by the curated selection.
    pub curated: Vec<String>,
}

/// `[schema]` section.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct SchemaConfig {
    /// Schema source.
    pub input: Option<PathBuf>,
    /// Swift output.
    pub out: Option<PathBuf>,
    /// JSON IR dump.
    pub ir_out: Option<PathBuf>,
    /// JSON usage report.
    pub report_out: Option<PathBuf>,
}

/// `[format]` section.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct FormatConfig {
    /// Run the formatter by default.
    pub enabled: Option<bool>,
    /// Formatter argv; the generated file path is appended.
    pub command: Option<Vec<String>>,
}

/// Contents of `typebridge.toml`
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// `[api]`
    pub api: ApiConfig,
    /// `[schema]`
    pub schema: SchemaConfig,
    /// `[format]`
    pub format: FormatConfig,
}

/// Load `explicit` (which must exist), else `typebridge.toml` in the working
/// directory when present, else defaults.
pub fn load_config(explicit: Option<&Path>) -> Result<Config, String> {
    let path = match explicit {
        Some(path) => {
            if !path.exists() {
                return Err(format!("Config file not found: {}", path.display()));
            }
            path.to_path_buf()
        }
        None => {
            let default = PathBuf::from(DEFAULT_CONFIG_FILE);
            if !default.exists() {
                return Ok(Config::default());
            }
            default
        }
    };

    let contents = fs::read_to_string(&path)
        .map_err(|err| format!("Failed to read config file {}: {err}", path.display()))?;
    let config = parse_config(&contents)
        .map_err(|err| format!("Failed to parse config file {}: {err}", path.display()))?;
    debug!(path = %path.display(), "Loaded config file.");
    Ok(config)
}

fn parse_config(contents: &str) -> Result<Config, toml::de::Error> {
    toml::from_str(contents)
}
