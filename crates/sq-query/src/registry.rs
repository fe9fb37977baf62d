//! Field registry: the validator's view of which fields exist and what they hold.

use std::{
    collections::{BTreeMap, HashMap},
    fmt,
    str::FromStr,
};

use serde::{Deserialize, Serialize};

/// The declared type of a document field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    /// Free text.
    Text,
    /// A calendar date; range endpoints must be `YYYY-MM-DD`.
    Date,
    /// A number; range endpoints must be numeric.
    Number,
    /// Not known to the registry.
    Unknown,
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Text => "text",
            Self::Date => "date",
            Self::Number => "number",
            Self::Unknown => "unknown",
        };
        f.write_str(name)
    }
}

impl FromStr for FieldType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "text" => Ok(Self::Text),
            "date" => Ok(Self::Date),
            "number" => Ok(Self::Number),
            _ => Err(format!(
                "unknown field type: {s} (expected text, date or number)"
            )),
        }
    }
}

/// Resolves field names to their declared types.
///
/// Implementations are consulted read-only, so one registry can be shared across
/// threads validating different queries.
pub trait FieldRegistry {
    /// Returns the type of `field`, or [`FieldType::Unknown`].
    fn lookup(&self, field: &str) -> FieldType;
}

/// A registry that knows no fields.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoFields;

impl FieldRegistry for NoFields {
    fn lookup(&self, _field: &str) -> FieldType {
        FieldType::Unknown
    }
}

impl FieldRegistry for HashMap<String, FieldType> {
    fn lookup(&self, field: &str) -> FieldType {
        self.get(field).copied().unwrap_or(FieldType::Unknown)
    }
}

impl FieldRegistry for BTreeMap<String, FieldType> {
    fn lookup(&self, field: &str) -> FieldType {
        self.get(field).copied().unwrap_or(FieldType::Unknown)
    }
}

impl<R: FieldRegistry + ?Sized> FieldRegistry for &R {
    fn lookup(&self, field: &str) -> FieldType {
        (**self).lookup(field)
    }
}
