//! The field registry loaded from configuration.

use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
};

use sq_query::{FieldRegistry, FieldType};

/// A declared field and where it was declared.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDef {
    /// The field's type.
    pub field_type: FieldType,
    /// Config file that declared it.
    pub source: PathBuf,
}

/// Field declarations merged from every config file, ordered by name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldTable {
    /// Declarations by field name.
    entries: BTreeMap<String, FieldDef>,
}

impl FieldTable {
    /// Creates an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Declares a field unless it is already declared.
    ///
    /// Returns false if an earlier declaration was kept.
    pub fn declare(&mut self, name: &str, field_type: FieldType, source: &Path) -> bool {
        if self.entries.contains_key(name) {
            return false;
        }
        self.entries.insert(
            name.to_string(),
            FieldDef {
                field_type,
                source: source.to_path_buf(),
            },
        );
        true
    }

    /// Returns the declaration for `name`.
    pub fn get(&self, name: &str) -> Option<&FieldDef> {
        self.entries.get(name)
    }

    /// Iterates over declarations in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldDef)> {
        self.entries.iter().map(|(name, def)| (name.as_str(), def))
    }

    /// Number of declared fields.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if no fields are declared.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns name to type-name pairs for serialization.
    pub(crate) fn type_names(&self) -> BTreeMap<String, String> {
        self.entries
            .iter()
            .map(|(name, def)| (name.clone(), def.field_type.to_string()))
            .collect()
    }
}

impl FieldRegistry for FieldTable {
    fn lookup(&self, field: &str) -> FieldType {
        self.get(field)
            .map_or(FieldType::Unknown, |def| def.field_type)
    }
}
