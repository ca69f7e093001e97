//! Type definitions for database schema objects

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Schema used when none is configured
pub const DEFAULT_SCHEMA: &str = "public";

/// A snapshot of every table in one (database, schema) pair
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schema {
    pub name: String,
    pub tables: IndexMap<String, Table>,
}

impl Schema {
    /// Create a new empty schema
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            tables: IndexMap::new(),
        }
    }

    /// Add a table, keyed by its own name
    pub fn add_table(&mut self, table: Table) {
        self.tables.insert(table.name.clone(), table);
    }

    pub fn table(&self, name: &str) -> Option<&Table> {
        self.tables.get(name)
    }

    pub fn table_mut(&mut self, name: &str) -> Option<&mut Table> {
        self.tables.get_mut(name)
    }

    pub fn table_names(&self) -> impl Iterator<Item = &str> {
        self.tables.keys().map(String::as_str)
    }

    /// Total number of columns across all tables
    pub fn column_count(&self) -> usize {
        self.tables.values().map(|t| t.columns.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }
}

/// Represents a database table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Table {
    pub name: String,
    /// Only single-column primary keys are modelled.
    pub primary_key_column: Option<String>,
    /// Physical ordinal order.
    pub columns: Vec<Column>,
    pub foreign_keys: Vec<ForeignKey>,
}

impl Table {
    /// Create a new table with the given name
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            primary_key_column: None,
            columns: Vec::new(),
            foreign_keys: Vec::new(),
        }
    }

    /// Add a column to the table
    pub fn add_column(&mut self, column: Column) {
        self.columns.push(column);
    }

    /// Builder form of [`Table::add_column`]
    pub fn with_column(mut self, column: Column) -> Self {
        self.add_column(column);
        self
    }

    pub fn with_primary_key(mut self, column: &str) -> Self {
        self.primary_key_column = Some(column.to_string());
        self
    }

    /// Add a foreign key to the table
    pub fn add_foreign_key(&mut self, fk: ForeignKey) {
        self.foreign_keys.push(fk);
    }

    pub fn with_foreign_key(mut self, fk: ForeignKey) -> Self {
        self.add_foreign_key(fk);
        self
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }
}

/// Represents a database column
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Column {
    pub name: String,
    pub data_type: String,
    pub nullable: bool,
    /// Raw default expression. Read but never rendered into DDL.
    pub default: Option<String>,
}

impl Column {
    /// Create a new NOT NULL column with the given name and type
    pub fn new(name: &str, data_type: &str) -> Self {
        Self {
            name: name.to_string(),
            data_type: data_type.to_string(),
            nullable: false,
            default: None,
        }
    }

    /// Set whether the column is nullable
    pub fn nullable(mut self, nullable: bool) -> Self {
        self.nullable = nullable;
        self
    }

    /// Set a default value for the column
    pub fn default(mut self, default: &str) -> Self {
        self.default = Some(default.to_string());
        self
    }
}

/// One outgoing single-column reference
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForeignKey {
    pub source_column: String,
    pub target_table: String,
    pub target_column: String,
}

impl ForeignKey {
    pub fn new(source_column: &str, target_table: &str, target_column: &str) -> Self {
        Self {
            source_column: source_column.to_string(),
            target_table: target_table.to_string(),
            target_column: target_column.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schema_is_keyed_by_table_name() {
        let mut schema = Schema::new(DEFAULT_SCHEMA);
        schema.add_table(Table::new("users").with_column(Column::new("id", "integer")));
        schema.add_table(
            Table::new("orders")
                .with_column(Column::new("id", "integer"))
                .with_column(Column::new("note", "text").nullable(true)),
        );

        assert_eq!(schema.table_names().collect::<Vec<_>>(), vec!["users", "orders"]);
        assert_eq!(schema.column_count(), 3);
        for (key, table) in &schema.tables {
            assert_eq!(key, &table.name);
        }
    }

    #[test]
    fn table_mut_edits_in_place() {
        let mut schema = Schema::new(DEFAULT_SCHEMA);
        schema.add_table(Table::new("users"));

        if let Some(table) = schema.table_mut("users") {
            table.primary_key_column = Some("id".to_string());
        }

        assert_eq!(
            schema.table("users").and_then(|t| t.primary_key_column.as_deref()),
            Some("id")
        );
    }
}
