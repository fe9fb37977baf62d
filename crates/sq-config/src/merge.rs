//! Configuration merging.
//!
//! Merges multiple `RawConfig` files into a single resolved `Config`,
//! applying precedence rules.

use std::path::PathBuf;

use sq_query::FieldType;
use tracing::debug;

use crate::{
    Config, ConfigError, Settings,
    fields::FieldTable,
    parse::{RawConfig, RawSettings},
};

/// A parsed config file with its source path.
pub struct ParsedConfig {
    /// Path to the config file.
    pub path: PathBuf,
    /// Parsed raw configuration.
    pub config: RawConfig,
}

/// Merges multiple configuration files into a single resolved `Config`.
///
/// Configs should be provided in precedence order: highest precedence first (closest to CWD),
/// lowest precedence last (global config).
///
/// Merge rules:
/// - Scalar settings: first defined value wins (highest precedence)
/// - Fields: merged by name, first declaration wins
pub fn merge_configs(configs: &[ParsedConfig]) -> Result<Config, ConfigError> {
    if configs.is_empty() {
        return Ok(Config::default());
    }

    let settings = merge_settings(configs);
    let fields = merge_fields(configs)?;
    let config_root = configs
        .first()
        .and_then(|c| c.path.parent())
        .map(PathBuf::from);

    debug!(
        files = configs.len(),
        fields = fields.len(),
        max_depth = settings.max_depth,
        "merged configuration"
    );

    Ok(Config {
        settings,
        fields,
        config_root,
        sources: configs.iter().map(|c| c.path.clone()).collect(),
    })
}

/// Merges settings, taking first defined value for each field.
fn merge_settings(configs: &[ParsedConfig]) -> Settings {
    let mut result = Settings::default();

    // Lowest precedence first so higher precedence overwrites.
    for parsed in configs.iter().rev() {
        if let Some(ref settings) = parsed.config.settings {
            apply_raw_settings(&mut result, settings);
        }
    }

    result
}

/// Applies raw settings to result, overwriting any present values.
fn apply_raw_settings(result: &mut Settings, raw: &RawSettings) {
    if let Some(v) = raw.max_depth {
        result.max_depth = v;
    }
    if let Some(v) = raw.strict_fields {
        result.strict_fields = v;
    }
}

/// Merges field declarations from all configs.
///
/// Every file's types are checked, including declarations that end up shadowed.
fn merge_fields(configs: &[ParsedConfig]) -> Result<FieldTable, ConfigError> {
    let mut table = FieldTable::new();

    for parsed in configs {
        let Some(ref fields) = parsed.config.fields else {
            continue;
        };

        for (name, value) in fields {
            let field_type =
                value
                    .parse::<FieldType>()
                    .map_err(|_| ConfigError::UnknownFieldType {
                        path: parsed.path.clone(),
                        field: name.clone(),
                        value: value.clone(),
                    })?;
            table.declare(name, field_type, &parsed.path);
        }
    }

    Ok(table)
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use sq_query::FieldRegistry;

    use super::*;
    use crate::parse::parse_config_str;

    fn parsed(path: &str, toml: &str) -> ParsedConfig {
        ParsedConfig {
            path: PathBuf::from(path),
            config: parse_config_str(toml, Path::new(path)).unwrap(),
        }
    }

    #[test]
    fn test_merge_empty_configs() {
        let result = merge_configs(&[]).unwrap();
        assert_eq!(result.settings.max_depth, 128);
        assert!(result.fields.is_empty());
        assert!(result.config_root.is_none());
    }

    #[test]
    fn test_merge_single_config() {
        let result = merge_configs(&[parsed(
            "/project/.sq.toml",
            r#"
[settings]
max_depth = 64

[fields]
dateFiled = "date"
"#,
        )])
        .unwrap();

        assert_eq!(result.settings.max_depth, 64);
        assert!(!result.settings.strict_fields);
        assert_eq!(result.fields.lookup("dateFiled"), FieldType::Date);
        assert_eq!(result.config_root, Some(PathBuf::from("/project")));
    }

    #[test]
    fn test_merge_scalar_override() {
        let high = parsed("/project/.sq.toml", "[settings]\nstrict_fields = true\n");
        let low = parsed(
            "/.sq.toml",
            "[settings]\nmax_depth = 200\nstrict_fields = false\n",
        );

        let result = merge_configs(&[high, low]).unwrap();
        assert!(result.settings.strict_fields);
        // Not set in the closer file, so inherited.
        assert_eq!(result.settings.max_depth, 200);
    }

    #[test]
    fn test_merge_fields_by_name() {
        let high = parsed("/project/.sq.toml", "[fields]\ncourt_id = \"text\"\n");
        let low = parsed(
            "/.sq.toml",
            "[fields]\ncourt_id = \"number\"\ndateFiled = \"date\"\n",
        );

        let result = merge_configs(&[high, low]).unwrap();
        assert_eq!(result.fields.len(), 2);
        assert_eq!(result.fields.lookup("court_id"), FieldType::Text);
        assert_eq!(result.fields.lookup("dateFiled"), FieldType::Date);
        assert_eq!(
            result.fields.get("dateFiled").map(|d| d.source.clone()),
            Some(PathBuf::from("/.sq.toml"))
        );
    }

    #[test]
    fn test_merge_unknown_field_type() {
        let err = merge_configs(&[parsed("/p/.sq.toml", "[fields]\nx = \"blob\"\n")]).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::UnknownFieldType { ref field, ref value, .. }
                if field == "x" && value == "blob"
        ));
    }

    #[test]
    fn test_merge_records_sources() {
        let result = merge_configs(&[
            parsed("/a/b/.sq.toml", ""),
            parsed("/a/.sq.toml", ""),
        ])
        .unwrap();
        assert_eq!(
            result.sources,
            vec![PathBuf::from("/a/b/.sq.toml"), PathBuf::from("/a/.sq.toml")]
        );
    }
}
