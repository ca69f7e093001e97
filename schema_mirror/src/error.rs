//! Error types for schema_mirror

use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// Result type for schema_mirror operations
pub type Result<T> = std::result::Result<T, Error>;

/// Which of the two databases an operation was talking to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemaSide {
    Source,
    Target,
}

impl fmt::Display for SchemaSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SchemaSide::Source => f.write_str("source"),
            SchemaSide::Target => f.write_str("target"),
        }
    }
}

/// The catalog query that was running when introspection failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntrospectionPhase {
    Tables,
    Columns,
    Constraints,
}

impl fmt::Display for IntrospectionPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IntrospectionPhase::Tables => f.write_str("tables"),
            IntrospectionPhase::Columns => f.write_str("columns"),
            IntrospectionPhase::Constraints => f.write_str("constraints"),
        }
    }
}

/// The kind of DDL statement being applied to the target
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ApplyPhase {
    Drop,
    Create,
    PrimaryKey,
    ForeignKey,
}

impl fmt::Display for ApplyPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApplyPhase::Drop => f.write_str("drop"),
            ApplyPhase::Create => f.write_str("create"),
            ApplyPhase::PrimaryKey => f.write_str("primary key"),
            ApplyPhase::ForeignKey => f.write_str("foreign key"),
        }
    }
}

/// Error types for schema_mirror
#[derive(Error, Debug)]
pub enum Error {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Could not connect to the {side} database: {source}")]
    ConnectionError {
        side: SchemaSide,
        #[source]
        source: sqlx::Error,
    },

    #[error("Failed to read {phase} of the {side} schema: {source}")]
    IntrospectionError {
        side: SchemaSide,
        phase: IntrospectionPhase,
        #[source]
        source: sqlx::Error,
    },

    /// Not produced by the full-replace policy.
    #[error("Planning error: {0}")]
    PlanningError(String),

    #[error("Failed during {phase} of table `{table}`, transaction rolled back: {message}\n  statement: {statement}")]
    ApplyError {
        phase: ApplyPhase,
        table: String,
        statement: String,
        message: String,
    },

    #[error("Could not {action} the transaction on the target: {source}")]
    TransactionError {
        action: &'static str,
        #[source]
        source: sqlx::Error,
    },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}
