//! Database schema analyzer
//!
//! Reads table, column and key metadata out of the PostgreSQL catalog. Each
//! step is a single bulk query for the whole schema; rows are then assembled
//! into a [`Schema`] without touching the database again.

use async_trait::async_trait;
use indexmap::IndexMap;
use sqlx::FromRow;
use std::collections::HashSet;

use crate::db::connection::DatabaseConnection;
use crate::error::{Error, IntrospectionPhase, Result};
use crate::schema::types::{Column, ForeignKey, Schema, Table};

/// Anything that can produce a schema snapshot
#[async_trait]
pub trait SchemaSource: Send + Sync {
    /// Read every table of the schema. Keys are only loaded when
    /// `include_constraints` is set.
    async fn read_schema(&self, include_constraints: bool) -> Result<Schema>;
}

/// Schema analyzer for PostgreSQL catalog introspection
pub struct SchemaAnalyzer {
    connection: DatabaseConnection,
}

impl SchemaAnalyzer {
    /// Create a new schema analyzer
    pub fn new(connection: DatabaseConnection) -> Self {
        Self { connection }
    }

    async fn fetch_tables(&self, schema: &str) -> Result<Vec<TableRow>> {
        let sql = r#"
            SELECT tablename::text AS table_name
            FROM pg_tables
            WHERE schemaname = $1
            ORDER BY tablename
        "#;

        sqlx::query_as::<_, TableRow>(sql)
            .bind(schema)
            .fetch_all(self.connection.pool())
            .await
            .map_err(|source| self.introspection_error(IntrospectionPhase::Tables, source))
    }

    async fn fetch_columns(&self, schema: &str) -> Result<Vec<ColumnRow>> {
        let sql = r#"
            SELECT
                table_name::text AS table_name,
                column_name::text AS column_name,
                data_type::text AS data_type,
                udt_name::text AS udt_name,
                is_nullable::text AS is_nullable,
                column_default::text AS column_default
            FROM information_schema.columns
            WHERE table_schema = $1
            ORDER BY table_name, ordinal_position
        "#;

        sqlx::query_as::<_, ColumnRow>(sql)
            .bind(schema)
            .fetch_all(self.connection.pool())
            .await
            .map_err(|source| self.introspection_error(IntrospectionPhase::Columns, source))
    }

    async fn fetch_constraints(&self, schema: &str) -> Result<Vec<ConstraintRow>> {
        // pg_constraint is visible to every role and ties each key to its own
        // table through conrelid, so same-named keys on different tables and
        // tables owned by someone else both come back correctly.
        let sql = r#"
            SELECT
                tab.relname::text AS table_name,
                con.conname::text AS constraint_name,
                CASE con.contype WHEN 'p' THEN 'PRIMARY KEY' ELSE 'FOREIGN KEY' END AS constraint_type,
                src.attname::text AS column_name,
                target.relname::text AS foreign_table_name,
                dst.attname::text AS foreign_column_name
            FROM pg_catalog.pg_constraint con
            JOIN pg_catalog.pg_class tab ON tab.oid = con.conrelid
            JOIN pg_catalog.pg_namespace ns ON ns.oid = tab.relnamespace
            CROSS JOIN LATERAL unnest(con.conkey, con.confkey)
                WITH ORDINALITY AS cols (conkey, confkey, position)
            JOIN pg_catalog.pg_attribute src
                ON src.attrelid = con.conrelid AND src.attnum = cols.conkey
            LEFT JOIN pg_catalog.pg_class target ON target.oid = con.confrelid
            LEFT JOIN pg_catalog.pg_attribute dst
                ON dst.attrelid = con.confrelid AND dst.attnum = cols.confkey
            WHERE con.contype IN ('p', 'f')
                AND ns.nspname = $1
            ORDER BY tab.relname, con.conname, cols.position
        "#;

        sqlx::query_as::<_, ConstraintRow>(sql)
            .bind(schema)
            .fetch_all(self.connection.pool())
            .await
            .map_err(|source| self.introspection_error(IntrospectionPhase::Constraints, source))
    }

    fn introspection_error(&self, phase: IntrospectionPhase, source: sqlx::Error) -> Error {
        Error::IntrospectionError {
            side: self.connection.side(),
            phase,
            source,
        }
    }
}

#[async_trait]
impl SchemaSource for SchemaAnalyzer {
    async fn read_schema(&self, include_constraints: bool) -> Result<Schema> {
        let schema = self.connection.schema_name();
        let side = self.connection.side();

        tracing::debug!(%side, schema, include_constraints, "Reading schema");

        let tables = self.fetch_tables(schema).await?;
        let columns = self.fetch_columns(schema).await?;
        let constraints = if include_constraints {
            self.fetch_constraints(schema).await?
        } else {
            Vec::new()
        };

        let result = assemble_schema(schema, tables, columns, constraints);

        tracing::info!(
            %side,
            schema,
            tables = result.tables.len(),
            columns = result.column_count(),
            "Schema read"
        );

        Ok(result)
    }
}

#[derive(Debug, Clone, FromRow)]
pub(crate) struct TableRow {
    pub table_name: String,
}

#[derive(Debug, Clone, FromRow)]
pub(crate) struct ColumnRow {
    pub table_name: String,
    pub column_name: String,
    pub data_type: String,
    pub udt_name: String,
    pub is_nullable: String,
    pub column_default: Option<String>,
}

#[derive(Debug, Clone, FromRow)]
pub(crate) struct ConstraintRow {
    pub table_name: String,
    pub constraint_name: String,
    pub constraint_type: String,
    pub column_name: String,
    pub foreign_table_name: Option<String>,
    pub foreign_column_name: Option<String>,
}

/// Catalog array types (`ARRAY` with a udt of `_int4`) are not valid DDL;
/// rewrite them as `int4[]`.
pub fn normalize_data_type(data_type: &str, udt_name: &str) -> String {
    if data_type == "ARRAY" {
        format!("{}[]", udt_name.replace('_', ""))
    } else {
        data_type.to_string()
    }
}

/// Build a schema out of raw catalog rows.
///
/// Every listed table exists in the result, even without columns. Columns of
/// relations that are not listed (views, for instance) are dropped.
pub(crate) fn assemble_schema(
    schema_name: &str,
    tables: Vec<TableRow>,
    columns: Vec<ColumnRow>,
    constraints: Vec<ConstraintRow>,
) -> Schema {
    let mut columns_by_table: IndexMap<String, Vec<Column>> = tables
        .iter()
        .map(|row| (row.table_name.clone(), Vec::new()))
        .collect();

    for row in columns {
        match columns_by_table.get_mut(&row.table_name) {
            Some(table_columns) => table_columns.push(Column {
                data_type: normalize_data_type(&row.data_type, &row.udt_name),
                name: row.column_name,
                nullable: row.is_nullable == "YES",
                default: row.column_default,
            }),
            None => {
                tracing::debug!(relation = %row.table_name, column = %row.column_name, "Skipping column of non-table relation");
            }
        }
    }

    let mut primary_keys: IndexMap<String, String> = IndexMap::new();
    let mut foreign_keys: IndexMap<String, Vec<ForeignKey>> = IndexMap::new();
    let mut seen_constraints = HashSet::new();

    for row in constraints {
        // Composite keys come back as several rows; only the first column is kept.
        if !seen_constraints.insert((row.table_name.clone(), row.constraint_name.clone())) {
            tracing::warn!(
                table = %row.table_name,
                constraint = %row.constraint_name,
                "Multi-column key is not supported, keeping its first column only"
            );
            continue;
        }

        match row.constraint_type.as_str() {
            "PRIMARY KEY" => {
                primary_keys.insert(row.table_name, row.column_name);
            }
            "FOREIGN KEY" => match (row.foreign_table_name, row.foreign_column_name) {
                (Some(target_table), Some(target_column)) => {
                    foreign_keys.entry(row.table_name).or_default().push(ForeignKey {
                        source_column: row.column_name,
                        target_table,
                        target_column,
                    });
                }
                _ => {
                    tracing::warn!(
                        table = %row.table_name,
                        constraint = %row.constraint_name,
                        "Foreign key has no referenced column, skipping it"
                    );
                }
            },
            other => {
                tracing::debug!(constraint_type = other, "Ignoring constraint");
            }
        }
    }

    let mut schema = Schema::new(schema_name);
    for (name, table_columns) in columns_by_table {
        let table = Table {
            primary_key_column: primary_keys.shift_remove(&name),
            foreign_keys: foreign_keys.shift_remove(&name).unwrap_or_default(),
            columns: table_columns,
            name,
        };
        schema.add_table(table);
    }

    schema
}
