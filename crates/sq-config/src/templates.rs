//! Configuration templates for `sq init`.
//!
//! Templates are stored as valid TOML files. The local template is written as-is;
//! the global one is commented out, so it documents options without overriding
//! every project.

/// Default local configuration template (valid TOML).
const LOCAL_TEMPLATE: &str = include_str!("../templates/config.toml");

/// Global configuration template (valid TOML).
const GLOBAL_TEMPLATE: &str = include_str!("../templates/config-global.toml");

/// Returns the local configuration template.
pub fn local_template() -> String {
    LOCAL_TEMPLATE.to_string()
}

/// Returns the global configuration template as a commented-out example.
pub fn global_template() -> String {
    comment_template(GLOBAL_TEMPLATE)
}

/// Prefixes every setting line with "# ", leaving comments and blank lines alone.
fn comment_template(template: &str) -> String {
    template
        .lines()
        .map(|line| {
            if line.is_empty() || line.starts_with('#') {
                format!("{line}\n")
            } else {
                format!("# {line}\n")
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use super::*;
    use crate::{
        merge::{ParsedConfig, merge_configs},
        parse::parse_config,
    };

    #[test]
    fn local_template_parses_as_valid_toml() {
        let result = parse_config(LOCAL_TEMPLATE);
        assert!(result.is_ok(), "local template failed to parse: {result:?}");
    }

    #[test]
    fn global_template_parses_as_valid_toml() {
        let result = parse_config(GLOBAL_TEMPLATE);
        assert!(
            result.is_ok(),
            "global template failed to parse: {result:?}"
        );
    }

    #[test]
    fn template_field_types_are_known() {
        for template in [LOCAL_TEMPLATE, GLOBAL_TEMPLATE] {
            let parsed = ParsedConfig {
                path: Path::new("/.sq.toml").to_path_buf(),
                config: parse_config(template).unwrap(),
            };
            let config = merge_configs(&[parsed]).unwrap();
            assert!(!config.fields.is_empty());
        }
    }

    #[test]
    fn commented_template_is_empty_config() {
        let config = parse_config(&global_template()).unwrap();
        assert!(config.settings.is_none());
        assert!(config.fields.is_none());
    }

    #[test]
    fn comment_template_preserves_existing_comments() {
        let input = "# This is a comment\nkey = \"value\"\n";
        let result = comment_template(input);
        assert_eq!(result, "# This is a comment\n# key = \"value\"\n");
    }

    #[test]
    fn comment_template_preserves_empty_lines() {
        let input = "key1 = \"a\"\n\nkey2 = \"b\"\n";
        let result = comment_template(input);
        assert_eq!(result, "# key1 = \"a\"\n\n# key2 = \"b\"\n");
    }

    #[test]
    fn comment_template_handles_section_headers() {
        let input = "[section]\nkey = \"value\"\n";
        let result = comment_template(input);
        assert_eq!(result, "# [section]\n# key = \"value\"\n");
    }
}
