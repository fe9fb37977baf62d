//! Configuration system for sq.
//!
//! sq uses TOML configuration files named `.sq.toml`. Configuration is resolved by walking up
//! the directory tree from the current working directory, collecting any `.sq.toml` files found,
//! then loading `~/.sq.toml` as the global config with lowest precedence.
//!
//! A config file holds query settings and the field declarations the validator
//! checks range endpoints against:
//!
//! ```toml
//! [settings]
//! max_depth = 128
//! strict_fields = false
//!
//! [fields]
//! dateFiled = "date"
//! citeCount = "number"
//! ```

#![warn(missing_docs)]

mod discovery;
mod error;
mod fields;
mod merge;
mod parse;
mod templates;
mod validate;

use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
};

pub use discovery::{CONFIG_FILENAME, discover_config_files, global_config_path, is_global_config};
pub use error::ConfigError;
pub use fields::{FieldDef, FieldTable};
pub use merge::{ParsedConfig, merge_configs};
pub use parse::{RawConfig, RawSettings, parse_config_file, parse_config_str};
use serde::{Deserialize, Serialize};
use sq_query::{DEFAULT_MAX_DEPTH, QueryOptions};
pub use templates::{global_template, local_template};
pub use validate::{ConfigWarning, MIN_RECOMMENDED_DEPTH};
use validate::validate_config;

/// Top-level merged configuration for sq.
///
/// This represents the fully resolved configuration after merging all discovered `.sq.toml`
/// files according to precedence rules.
#[derive(Debug, Clone, Default)]
pub struct Config {
    /// Query settings.
    pub settings: Settings,
    /// Declared fields.
    pub fields: FieldTable,
    /// Directory containing the most specific config file.
    pub config_root: Option<PathBuf>,
    /// Config files that were merged, highest precedence first.
    pub sources: Vec<PathBuf>,
}

impl Config {
    /// Loads configuration by discovering and merging all relevant `.sq.toml` files.
    ///
    /// Returns `Ok(Config::default())` if no configuration files are found.
    pub fn load(cwd: &Path) -> Result<Self, ConfigError> {
        let config_files = discover_config_files(cwd);
        Self::load_from_files(&config_files)
    }

    /// Loads configuration from a specific list of config file paths.
    ///
    /// Files should be provided in precedence order: highest precedence first.
    ///
    /// Returns `Ok(Config::default())` if the list is empty.
    pub fn load_from_files(files: &[PathBuf]) -> Result<Self, ConfigError> {
        if files.is_empty() {
            return Ok(Self::default());
        }

        let parsed: Vec<ParsedConfig> = files
            .iter()
            .map(|path| {
                let config = parse_config_file(path)?;
                Ok(ParsedConfig {
                    path: path.clone(),
                    config,
                })
            })
            .collect::<Result<Vec<_>, ConfigError>>()?;

        merge_configs(&parsed)
    }

    /// Returns the parser and validator options these settings describe.
    pub fn query_options(&self) -> QueryOptions {
        QueryOptions {
            max_depth: self.settings.max_depth,
            strict_fields: self.settings.strict_fields,
        }
    }

    /// Returns the declared fields, for use as a validator registry.
    pub fn fields(&self) -> &FieldTable {
        &self.fields
    }

    /// Validates the configuration and returns any warnings.
    pub fn validate(&self) -> Vec<ConfigWarning> {
        validate_config(self)
    }

    /// Serializes the effective settings and fields to TOML format.
    ///
    /// The output has the same shape as a `.sq.toml` file.
    pub fn settings_to_toml(&self) -> Result<String, ConfigError> {
        let serializable = SerializableConfig {
            settings: self.settings.clone(),
            fields: self.fields.type_names(),
        };
        Ok(toml::to_string_pretty(&serializable)?)
    }
}

/// Query settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct Settings {
    /// Deepest nesting of groups, negations and field qualifiers.
    pub max_depth: usize,
    /// Warn about fields not declared in `[fields]`.
    pub strict_fields: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
            strict_fields: false,
        }
    }
}

/// Internal struct for TOML serialization of the effective config.
#[derive(Serialize)]
struct SerializableConfig {
    /// Query settings.
    settings: Settings,
    /// Field name to type name, sorted for deterministic output.
    fields: BTreeMap<String, String>,
}

#[cfg(test)]
mod tests {
    use sq_query::FieldType;

    use super::*;

    #[test]
    fn test_settings_defaults() {
        let settings = Settings::default();
        assert_eq!(settings.max_depth, 128);
        assert!(!settings.strict_fields);
    }

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert!(config.fields.is_empty());
        assert!(config.config_root.is_none());
        assert!(config.sources.is_empty());
        assert_eq!(config.query_options(), QueryOptions::default());
    }

    #[test]
    fn test_query_options() {
        let config = Config {
            settings: Settings {
                max_depth: 64,
                strict_fields: true,
            },
            ..Config::default()
        };
        let options = config.query_options();
        assert_eq!(options.max_depth, 64);
        assert!(options.strict_fields);
    }

    #[test]
    fn test_settings_to_toml() {
        let mut config = Config::default();
        config
            .fields
            .declare("dateFiled", FieldType::Date, Path::new("/.sq.toml"));
        let toml = config.settings_to_toml().unwrap();

        assert!(toml.contains("[settings]"));
        assert!(toml.contains("max_depth = 128"));
        assert!(toml.contains("strict_fields = false"));
        assert!(toml.contains("[fields]"));
        assert!(toml.contains("dateFiled = \"date\""));

        // Output is itself a valid config.
        let reparsed = parse_config_str(&toml, Path::new("effective")).unwrap();
        assert_eq!(reparsed.settings.and_then(|s| s.max_depth), Some(128));
        assert_eq!(reparsed.fields.map(|f| f.len()), Some(1));
    }
}
