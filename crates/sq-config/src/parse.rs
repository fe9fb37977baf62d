//! Configuration file parsing.
//!
//! Parses individual `.sq.toml` files into intermediate `RawConfig` structures
//! that preserve the optional nature of all fields before merging.

use std::{collections::BTreeMap, fs, path::Path};

use serde::Deserialize;
#[cfg(test)]
use toml::de::Error as TomlError;

use crate::ConfigError;

/// Raw configuration as parsed directly from a TOML file.
///
/// All fields are optional to support partial configs that will be merged.
/// This mirrors the TOML schema exactly.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RawConfig {
    /// When true, stop discovery here - ignore parent and global configs.
    pub root: Option<bool>,
    /// General settings section.
    pub settings: Option<RawSettings>,
    /// Field declarations: name -> type name.
    ///
    /// Types stay as strings here so an unknown type can be reported with its file.
    pub fields: Option<BTreeMap<String, String>>,
}

/// Raw query settings.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RawSettings {
    /// Deepest nesting accepted in a query.
    pub max_depth: Option<usize>,
    /// Warn about fields not declared in `[fields]`.
    pub strict_fields: Option<bool>,
}

/// Parses a configuration file from disk.
///
/// Returns a `RawConfig` with all fields as optionals, ready for merging.
pub fn parse_config_file(path: &Path) -> Result<RawConfig, ConfigError> {
    let contents = fs::read_to_string(path).map_err(|source| ConfigError::ReadFile {
        path: path.to_path_buf(),
        source,
    })?;

    parse_config_str(&contents, path)
}

/// Parses configuration from a TOML string.
///
/// The `path` parameter is used for error reporting.
pub fn parse_config_str(contents: &str, path: &Path) -> Result<RawConfig, ConfigError> {
    toml::from_str(contents).map_err(|source| ConfigError::ParseToml {
        path: path.to_path_buf(),
        source,
    })
}

/// Parses configuration from a TOML string without path context.
///
/// Useful for validating template content (tests only).
#[cfg(test)]
pub fn parse_config(contents: &str) -> Result<RawConfig, TomlError> {
    toml::from_str(contents)
}

/// Returns true if the file at `path` sets `root = true`.
///
/// Unreadable or malformed files are not roots; loading reports them later.
pub fn is_root_config(path: &Path) -> bool {
    fs::read_to_string(path)
        .ok()
        .and_then(|contents| toml::from_str::<RawConfig>(&contents).ok())
        .and_then(|config| config.root)
        .unwrap_or(false)
}
