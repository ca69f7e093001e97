//! Schema difference calculator
//!
//! Advisory comparison of two schemas by table name only. Columns and
//! constraints are never looked at, and nothing is applied.

use serde::Serialize;
use std::collections::BTreeSet;
use std::fmt;

use crate::schema::types::Schema;

/// Tables that differ between source and target, both lists sorted
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SchemaDiff {
    /// In the source but not the target.
    pub new_tables: Vec<String>,
    /// In the target but not the source.
    pub removed_tables: Vec<String>,
}

impl SchemaDiff {
    /// Compare the table-name sets of two schemas
    pub fn compare(source: &Schema, target: &Schema) -> Self {
        let source_names: BTreeSet<&str> = source.table_names().collect();
        let target_names: BTreeSet<&str> = target.table_names().collect();

        Self {
            new_tables: source_names
                .difference(&target_names)
                .map(|name| name.to_string())
                .collect(),
            removed_tables: target_names
                .difference(&source_names)
                .map(|name| name.to_string())
                .collect(),
        }
    }

    /// Check if the diff is empty (same set of tables)
    pub fn is_empty(&self) -> bool {
        self.new_tables.is_empty() && self.removed_tables.is_empty()
    }
}

impl fmt::Display for SchemaDiff {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return writeln!(f, "source and target have the same tables");
        }
        for name in &self.new_tables {
            writeln!(f, "+ {}", name)?;
        }
        for name in &self.removed_tables {
            writeln!(f, "- {}", name)?;
        }
        Ok(())
    }
}
