//! Error types for sq configuration.

use std::io;
use std::path::PathBuf;

use thiserror::Error;
use toml::{de, ser};

/// Errors that can occur when loading or processing configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read a configuration file.
    #[error("failed to read config file {path}: {source}")]
    ReadFile {
        /// Path to the file that could not be read.
        path: PathBuf,
        /// Underlying I/O error.
        source: io::Error,
    },

    /// Failed to parse TOML configuration.
    #[error("failed to parse config file {path}: {source}")]
    ParseToml {
        /// Path to the file that could not be parsed.
        path: PathBuf,
        /// Underlying TOML parse error.
        source: de::Error,
    },

    /// A field is declared with a type sq doesn't know.
    #[error("{path}: field '{field}' has unknown type '{value}' (expected text, date or number)")]
    UnknownFieldType {
        /// Config file declaring the field.
        path: PathBuf,
        /// Name of the field.
        field: String,
        /// The type as written.
        value: String,
    },

    /// Failed to render settings as TOML.
    #[error("failed to serialize settings: {source}")]
    Serialize {
        /// Underlying TOML serialization error.
        #[from]
        source: ser::Error,
    },

    /// Failed to determine home directory.
    #[error("could not determine home directory")]
    NoHomeDirectory,
}
