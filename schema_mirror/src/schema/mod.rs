//! Schema module for schema_mirror
//!
//! Introspection, the schema model, planning and DDL generation.

pub mod analyzer;
pub mod diff;
pub mod generator;
pub mod plan;
pub mod types;

// Re-export key types
pub use analyzer::{SchemaAnalyzer, SchemaSource};
pub use diff::SchemaDiff;
pub use generator::DdlStatement;
pub use plan::ChangePlan;
pub use types::{Column, ForeignKey, Schema, Table};
