//! SQL executor
//!
//! Applies an ordered batch of DDL to the target inside one transaction.

use async_trait::async_trait;

use crate::db::connection::DatabaseConnection;
use crate::error::{Error, Result};
use crate::replicate::ProgressSink;
use crate::schema::generator::DdlStatement;

/// Something that can run a batch of DDL all-or-nothing
#[async_trait]
pub trait DdlExecutor: Send + Sync {
    /// Run every statement in order and commit. On the first failure nothing
    /// is kept and an [`Error::ApplyError`] describing the statement is returned.
    async fn apply_in_transaction(
        &self,
        statements: &[DdlStatement],
        progress: &dyn ProgressSink,
    ) -> Result<()>;
}

/// SQL executor for running DDL against a live connection
pub struct SqlExecutor {
    connection: DatabaseConnection,
}

impl SqlExecutor {
    /// Create a new SQL executor
    pub fn new(connection: DatabaseConnection) -> Self {
        Self { connection }
    }
}

#[async_trait]
impl DdlExecutor for SqlExecutor {
    async fn apply_in_transaction(
        &self,
        statements: &[DdlStatement],
        progress: &dyn ProgressSink,
    ) -> Result<()> {
        let mut tx = self
            .connection
            .pool()
            .begin()
            .await
            .map_err(|source| Error::TransactionError { action: "begin", source })?;

        // Returning early drops `tx`, which rolls everything back.
        for statement in statements {
            progress.update(statement.phase.into(), &statement.table);
            tracing::debug!(phase = %statement.phase, table = %statement.table, sql = %statement.sql, "Executing");

            sqlx::query(&statement.sql)
                .execute(&mut *tx)
                .await
                .map_err(|e| Error::ApplyError {
                    phase: statement.phase,
                    table: statement.table.clone(),
                    statement: statement.sql.clone(),
                    message: e.to_string(),
                })?;
        }

        tx.commit()
            .await
            .map_err(|source| Error::TransactionError { action: "commit", source })?;

        tracing::info!(statements = statements.len(), "Transaction committed");
        Ok(())
    }
}
