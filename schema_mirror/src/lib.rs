//! schema_mirror: copies the shape of a PostgreSQL schema into another database
//!
//! The target schema is torn down and rebuilt from the source's tables,
//! columns and single-column keys inside one transaction. Rows are never
//! copied.

pub mod config;
pub mod db;
pub mod error;
pub mod prompt;
pub mod replicate;
pub mod schema;
pub mod utils;

// Re-export main types for easier access
pub use config::Config;
pub use db::connection::{ConnectionParams, DatabaseConnection};
pub use db::executor::{DdlExecutor, SqlExecutor};
pub use error::{Error, Result, SchemaSide};
pub use prompt::{Confirm, ConsoleConfirm, FixedAnswer};
pub use replicate::{
    NoProgress, ProgressSink, ReplicationOutcome, ReplicationPhase, ReplicationReport, Replicator,
    TracingProgress,
};
pub use schema::analyzer::{SchemaAnalyzer, SchemaSource};
pub use schema::diff::SchemaDiff;
pub use schema::plan::ChangePlan;

/// Connections to both sides plus the configuration they came from
pub struct SchemaMirrorClient {
    config: Config,
    source: DatabaseConnection,
    target: DatabaseConnection,
}

impl SchemaMirrorClient {
    /// Validate the configuration and open both connections
    pub async fn connect(config: Config) -> Result<Self> {
        config.validate()?;
        let timeout = config.replication.connect_timeout();

        let source = DatabaseConnection::connect(&config.source, timeout, SchemaSide::Source).await?;
        let target = DatabaseConnection::connect(&config.target, timeout, SchemaSide::Target).await?;

        Ok(Self { config, source, target })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Table-name comparison only; nothing is changed
    pub async fn diff(&self) -> Result<SchemaDiff> {
        let source = SchemaAnalyzer::new(self.source.clone()).read_schema(false).await?;
        let target = SchemaAnalyzer::new(self.target.clone()).read_schema(false).await?;

        Ok(SchemaDiff::compare(&source, &target))
    }

    /// Compute the full-replace plan without applying it
    pub async fn plan(&self) -> Result<ChangePlan> {
        let mut replicator = Replicator::new(FixedAnswer(false), TracingProgress);
        replicator
            .plan_only(
                &SchemaAnalyzer::new(self.source.clone()),
                &SchemaAnalyzer::new(self.target.clone()),
            )
            .await
    }

    /// Full replace of the target by the source, after confirmation
    pub async fn replace<C: Confirm, P: ProgressSink>(&self, confirm: C, progress: P) -> Result<ReplicationOutcome> {
        let mut replicator = Replicator::new(confirm, progress);
        replicator
            .run(
                &SchemaAnalyzer::new(self.source.clone()),
                &SchemaAnalyzer::new(self.target.clone()),
                &SqlExecutor::new(self.target.clone()),
            )
            .await
    }

    pub async fn close(&self) {
        self.source.close().await;
        self.target.close().await;
    }
}
