//! Full-replace change plan
//!
//! Every target table is dropped and every source table recreated. Keys are
//! taken from the source tables as-is since the target's own keys disappear
//! with the drops.

use indexmap::IndexMap;
use serde::Serialize;

use crate::error::ApplyPhase;
use crate::schema::generator::{self, DdlStatement};
use crate::schema::types::{ForeignKey, Schema, Table};

/// Everything a replication run will do to the target
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChangePlan {
    pub tables_to_drop: Vec<String>,
    pub tables_to_create: Vec<Table>,
    pub primary_keys_to_add: IndexMap<String, String>,
    pub foreign_keys_to_add: IndexMap<String, Vec<ForeignKey>>,
}

impl ChangePlan {
    /// Plan a full replace of `target` by `source`
    pub fn full_replace(source: &Schema, target: &Schema) -> Self {
        let tables_to_drop = target.tables.keys().cloned().collect();
        let tables_to_create: Vec<Table> = source.tables.values().cloned().collect();

        let primary_keys_to_add = tables_to_create
            .iter()
            .filter_map(|table| {
                table
                    .primary_key_column
                    .as_ref()
                    .map(|column| (table.name.clone(), column.clone()))
            })
            .collect();

        let foreign_keys_to_add = tables_to_create
            .iter()
            .filter(|table| !table.foreign_keys.is_empty())
            .map(|table| (table.name.clone(), table.foreign_keys.clone()))
            .collect();

        Self {
            tables_to_drop,
            tables_to_create,
            primary_keys_to_add,
            foreign_keys_to_add,
        }
    }

    /// Render the plan as ordered DDL.
    ///
    /// Drops come first, then creates, then every primary key, and only then
    /// the foreign keys: a foreign key needs the referenced primary key to
    /// exist already.
    pub fn statements(&self) -> Vec<DdlStatement> {
        let drops = self.tables_to_drop.iter().map(|name| DdlStatement {
            phase: ApplyPhase::Drop,
            table: name.clone(),
            sql: generator::drop_table_sql(name),
        });

        let creates = self.tables_to_create.iter().map(|table| DdlStatement {
            phase: ApplyPhase::Create,
            table: table.name.clone(),
            sql: generator::create_table_sql(table),
        });

        let primary_keys = self.primary_keys_to_add.iter().map(|(table, column)| DdlStatement {
            phase: ApplyPhase::PrimaryKey,
            table: table.clone(),
            sql: generator::add_primary_key_sql(table, column),
        });

        let foreign_keys = self.foreign_keys_to_add.iter().flat_map(|(table, fks)| {
            fks.iter().map(move |fk| DdlStatement {
                phase: ApplyPhase::ForeignKey,
                table: table.clone(),
                sql: generator::add_foreign_key_sql(table, fk),
            })
        });

        drops
            .chain(creates)
            .chain(primary_keys)
            .chain(foreign_keys)
            .collect()
    }

    pub fn column_count(&self) -> usize {
        self.tables_to_create.iter().map(|t| t.columns.len()).sum()
    }

    pub fn foreign_key_count(&self) -> usize {
        self.foreign_keys_to_add.values().map(Vec::len).sum()
    }
}
