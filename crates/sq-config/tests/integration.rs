//! Integration tests for sq-config.
//!
//! Tests the full configuration loading pipeline: discovery -> parse -> merge, and the
//! loaded field table driving query validation.

// Integration tests live outside cfg(test) by design
#![allow(clippy::tests_outside_test_module)]

use std::{
    fs,
    path::{Path, PathBuf},
};

use sq_config::{Config, ConfigError, ConfigWarning};
use sq_query::{DiagnosticKind, FieldRegistry, FieldType, analyze};

/// Test helper to create a temporary directory structure for tests.
struct TestEnv {
    root: tempfile::TempDir,
}

impl TestEnv {
    fn new() -> Self {
        Self {
            root: tempfile::tempdir().unwrap(),
        }
    }

    fn path(&self) -> &Path {
        self.root.path()
    }

    /// Creates a directory and returns its path.
    fn create_dir(&self, rel_path: &str) -> PathBuf {
        let path = self.root.path().join(rel_path);
        fs::create_dir_all(&path).unwrap();
        path
    }

    /// Creates a file with content and returns its path.
    fn create_file(&self, rel_path: &str, content: &str) -> PathBuf {
        let path = self.root.path().join(rel_path);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(&path, content).unwrap();
        path
    }
}

#[test]
fn test_load_from_files_empty_list() {
    let config = Config::load_from_files(&[]).unwrap();
    assert!(config.fields.is_empty());
    assert!(config.config_root.is_none());
    assert_eq!(config.settings.max_depth, 128);
}

#[test]
fn test_load_single_config() {
    let env = TestEnv::new();
    env.create_file(
        ".sq.toml",
        r#"
root = true

[settings]
max_depth = 96

[fields]
dateFiled = "date"
"#,
    );

    let config = Config::load(env.path()).unwrap();

    assert_eq!(config.settings.max_depth, 96);
    assert_eq!(config.fields.lookup("dateFiled"), FieldType::Date);
    assert_eq!(config.config_root.as_deref(), Some(env.path()));
    assert_eq!(config.sources.len(), 1);
}

#[test]
fn test_load_nested_configs_merging() {
    let env = TestEnv::new();
    let subdir = env.create_dir("project/subdir");

    env.create_file(
        ".sq.toml",
        r#"
root = true

[settings]
max_depth = 100
strict_fields = false

[fields]
dateFiled = "date"
court_id = "number"
"#,
    );
    env.create_file(
        "project/.sq.toml",
        r#"
[settings]
strict_fields = true

[fields]
court_id = "text"
citeCount = "number"
"#,
    );

    let config = Config::load(&subdir).unwrap();

    // Closest file wins for scalars; unset scalars are inherited.
    assert!(config.settings.strict_fields);
    assert_eq!(config.settings.max_depth, 100);

    // Fields merge by name; closest declaration wins.
    assert_eq!(config.fields.len(), 3);
    assert_eq!(config.fields.lookup("court_id"), FieldType::Text);
    assert_eq!(config.fields.lookup("dateFiled"), FieldType::Date);
    assert_eq!(config.fields.lookup("citeCount"), FieldType::Number);
    assert_eq!(config.config_root, Some(env.path().join("project")));
}

#[test]
fn test_root_config_hides_parents() {
    let env = TestEnv::new();
    env.create_file(".sq.toml", "[fields]\nhidden = \"date\"\n");
    env.create_file("project/.sq.toml", "root = true\n[fields]\nshown = \"text\"\n");
    let cwd = env.create_dir("project/src");

    let config = Config::load(&cwd).unwrap();
    assert_eq!(config.fields.lookup("shown"), FieldType::Text);
    assert_eq!(config.fields.lookup("hidden"), FieldType::Unknown);
}

#[test]
fn test_load_error_invalid_toml() {
    let env = TestEnv::new();
    env.create_file(
        ".sq.toml",
        r#"
[settings
invalid toml
"#,
    );

    let result = Config::load(env.path());
    assert!(matches!(result, Err(ConfigError::ParseToml { .. })));
}

#[test]
fn test_load_error_unknown_field_type() {
    let env = TestEnv::new();
    let path = env.create_file(".sq.toml", "root = true\n[fields]\ndateFiled = \"datetime\"\n");

    let err = Config::load(env.path()).unwrap_err();
    let message = err.to_string();
    assert!(message.contains("dateFiled"));
    assert!(message.contains("datetime"));
    assert!(message.contains(&path.display().to_string()));
}

#[test]
fn test_load_error_unreadable_file() {
    let env = TestEnv::new();
    let missing = env.path().join("missing.toml");

    let result = Config::load_from_files(&[missing]);
    assert!(matches!(result, Err(ConfigError::ReadFile { .. })));
}

#[test]
fn test_load_from_files_precedence() {
    let env = TestEnv::new();
    let high = env.create_file("high.toml", "[settings]\nmax_depth = 70\n");
    let low = env.create_file("low.toml", "[settings]\nmax_depth = 300\nstrict_fields = true\n");

    let config = Config::load_from_files(&[high, low]).unwrap();
    assert_eq!(config.settings.max_depth, 70);
    assert!(config.settings.strict_fields);
}

#[test]
fn test_validate_loaded_config() {
    let env = TestEnv::new();
    env.create_file(".sq.toml", "root = true\n[settings]\nmax_depth = 10\n");

    let config = Config::load(env.path()).unwrap();
    let warnings = config.validate();
    assert!(warnings.contains(&ConfigWarning::NoFieldsDefined));
    assert!(warnings.contains(&ConfigWarning::MaxDepthTooLow { max_depth: 10 }));
}

#[test]
fn test_loaded_fields_drive_validation() {
    let env = TestEnv::new();
    env.create_file(
        ".sq.toml",
        r#"
root = true

[settings]
strict_fields = true

[fields]
dateFiled = "date"
citeCount = "number"
"#,
    );
    let config = Config::load(env.path()).unwrap();
    let options = config.query_options();

    let ok = analyze("dateFiled:[2018-10-01 TO 2018-10-31]", &config.fields, &options);
    assert!(ok.diagnostics.is_empty());

    let bad = analyze("citeCount:[ten TO 20] court:ca1", &config.fields, &options);
    assert!(bad.is_rejected());
    assert!(bad.diagnostics.contains(DiagnosticKind::InvalidNumberFormat));
    assert!(bad.diagnostics.contains(DiagnosticKind::UnknownField));
}
