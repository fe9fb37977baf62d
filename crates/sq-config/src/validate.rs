//! Configuration validation.
//!
//! Validates a loaded configuration and reports warnings for potential issues.

use std::fmt;

use crate::Config;

/// Nesting every query must be allowed, whatever the configuration says.
pub const MIN_RECOMMENDED_DEPTH: usize = 64;

/// A non-fatal warning about the configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigWarning {
    /// No fields are declared, so range endpoints are never type-checked.
    NoFieldsDefined,
    /// `max_depth` rejects queries with ordinary nesting.
    MaxDepthTooLow {
        /// The configured limit.
        max_depth: usize,
    },
    /// Strict mode is on but no fields are declared, so every field warns.
    StrictWithoutFields,
}

impl fmt::Display for ConfigWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoFieldsDefined => {
                write!(f, "no fields are defined in configuration")
            }
            Self::MaxDepthTooLow { max_depth } => write!(
                f,
                "max_depth = {max_depth} is below {MIN_RECOMMENDED_DEPTH}; nested queries may be rejected"
            ),
            Self::StrictWithoutFields => write!(
                f,
                "strict_fields is enabled but no fields are defined; every field will be reported"
            ),
        }
    }
}

/// Validates the configuration and returns any warnings.
pub fn validate_config(config: &Config) -> Vec<ConfigWarning> {
    let mut warnings = Vec::new();

    if config.fields.is_empty() {
        warnings.push(ConfigWarning::NoFieldsDefined);
        if config.settings.strict_fields {
            warnings.push(ConfigWarning::StrictWithoutFields);
        }
    }

    if config.settings.max_depth < MIN_RECOMMENDED_DEPTH {
        warnings.push(ConfigWarning::MaxDepthTooLow {
            max_depth: config.settings.max_depth,
        });
    }

    warnings
}
