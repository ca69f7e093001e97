//! DDL generator
//!
//! Renders schema model entities as PostgreSQL statements. Identifiers come
//! straight from the source catalog and are written out verbatim.

use serde::Serialize;

use crate::error::ApplyPhase;
use crate::schema::types::{ForeignKey, Table};

/// One statement of a replication run, tagged with what it does
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DdlStatement {
    pub phase: ApplyPhase,
    pub table: String,
    pub sql: String,
}

/// Generate SQL to create a table.
///
/// Column defaults are not rendered.
pub fn create_table_sql(table: &Table) -> String {
    let column_defs: Vec<String> = table
        .columns
        .iter()
        .map(|column| {
            if column.nullable {
                format!("  {} {}", column.name, column.data_type)
            } else {
                format!("  {} {} NOT NULL", column.name, column.data_type)
            }
        })
        .collect();

    format!(
        "CREATE TABLE IF NOT EXISTS {} (\n{}\n);",
        table.name,
        column_defs.join(",\n")
    )
}

/// Generate SQL to drop a table along with whatever depends on it
pub fn drop_table_sql(table_name: &str) -> String {
    format!("DROP TABLE IF EXISTS {} CASCADE;", table_name)
}

pub fn add_primary_key_sql(table_name: &str, column: &str) -> String {
    format!("ALTER TABLE {} ADD PRIMARY KEY ({});", table_name, column)
}

pub fn add_foreign_key_sql(table_name: &str, fk: &ForeignKey) -> String {
    format!(
        "ALTER TABLE {} ADD FOREIGN KEY ({}) REFERENCES {}({});",
        table_name, fk.source_column, fk.target_table, fk.target_column
    )
}
