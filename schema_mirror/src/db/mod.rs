//! Database module for schema_mirror
//!
//! This module handles database connections and transactional DDL execution.

pub mod connection;
pub mod executor;

// Re-export key types
pub use connection::{ConnectionParams, DatabaseConnection};
pub use executor::{DdlExecutor, SqlExecutor};
