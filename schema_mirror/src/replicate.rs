//! Replication orchestrator
//!
//! Drives one full replace: confirm, introspect both sides, plan, then hand
//! the ordered DDL to the target executor which applies it in a single
//! transaction.

use serde::Serialize;
use std::fmt;
use std::time::{Duration, Instant};

use crate::db::executor::DdlExecutor;
use crate::error::{ApplyPhase, Result};
use crate::prompt::Confirm;
use crate::schema::analyzer::SchemaSource;
use crate::schema::plan::ChangePlan;

const CONFIRM_QUESTION: &str =
    "Replacing the target schema is permanent and will remove all of its data. Are you sure?";

/// States a replication run moves through
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReplicationPhase {
    Idle,
    Confirming,
    Introspecting,
    Planning,
    Dropping,
    Creating,
    ConstrainingPk,
    ConstrainingFk,
    Committed,
    RolledBack,
    Aborted,
}

impl From<ApplyPhase> for ReplicationPhase {
    fn from(phase: ApplyPhase) -> Self {
        match phase {
            ApplyPhase::Drop => ReplicationPhase::Dropping,
            ApplyPhase::Create => ReplicationPhase::Creating,
            ApplyPhase::PrimaryKey => ReplicationPhase::ConstrainingPk,
            ApplyPhase::ForeignKey => ReplicationPhase::ConstrainingFk,
        }
    }
}

impl fmt::Display for ReplicationPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ReplicationPhase::Idle => "idle",
            ReplicationPhase::Confirming => "confirming",
            ReplicationPhase::Introspecting => "introspecting",
            ReplicationPhase::Planning => "planning",
            ReplicationPhase::Dropping => "dropping table",
            ReplicationPhase::Creating => "creating table",
            ReplicationPhase::ConstrainingPk => "adding primary key to",
            ReplicationPhase::ConstrainingFk => "adding foreign key to",
            ReplicationPhase::Committed => "committed",
            ReplicationPhase::RolledBack => "rolled back",
            ReplicationPhase::Aborted => "aborted",
        };
        f.write_str(name)
    }
}

/// Receives human-readable progress. Purely informational.
pub trait ProgressSink: Send + Sync {
    fn update(&self, phase: ReplicationPhase, detail: &str);
}

/// Discards every update
#[derive(Debug, Default, Clone, Copy)]
pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn update(&self, _phase: ReplicationPhase, _detail: &str) {}
}

/// Forwards updates to `tracing` at info level
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingProgress;

impl ProgressSink for TracingProgress {
    fn update(&self, phase: ReplicationPhase, detail: &str) {
        if detail.is_empty() {
            tracing::info!(%phase, "{}", phase);
        } else {
            tracing::info!(%phase, "{} {}", phase, detail);
        }
    }
}

/// Summary of a committed run
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReplicationReport {
    pub tables_dropped: usize,
    pub tables: usize,
    pub columns: usize,
    pub primary_keys: usize,
    pub foreign_keys: usize,
    pub elapsed: Duration,
}

impl fmt::Display for ReplicationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Replicated {} tables ({} columns, {} primary keys, {} foreign keys) in {:.2?}",
            self.tables, self.columns, self.primary_keys, self.foreign_keys, self.elapsed
        )
    }
}

/// How a run ended when it did not fail
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplicationOutcome {
    Committed(ReplicationReport),
    /// The operator said no; nothing was touched.
    Aborted,
}

/// Runs a full replace of a target schema by a source schema
pub struct Replicator<C, P> {
    confirm: C,
    progress: P,
    phase: ReplicationPhase,
}

impl<C: Confirm, P: ProgressSink> Replicator<C, P> {
    pub fn new(confirm: C, progress: P) -> Self {
        Self {
            confirm,
            progress,
            phase: ReplicationPhase::Idle,
        }
    }

    /// Last state reached
    pub fn phase(&self) -> ReplicationPhase {
        self.phase
    }

    fn enter(&mut self, phase: ReplicationPhase, detail: &str) {
        self.phase = phase;
        self.progress.update(phase, detail);
    }

    /// Introspect both sides and compute the plan without applying it
    pub async fn plan_only<S, T>(&mut self, source: &S, target: &T) -> Result<ChangePlan>
    where
        S: SchemaSource + ?Sized,
        T: SchemaSource + ?Sized,
    {
        self.enter(ReplicationPhase::Introspecting, "source schema");
        let source_schema = source.read_schema(true).await?;

        // The target's keys are about to go away with the drops.
        self.enter(ReplicationPhase::Introspecting, "target schema");
        let target_schema = target.read_schema(false).await?;

        self.enter(ReplicationPhase::Planning, "");
        let plan = ChangePlan::full_replace(&source_schema, &target_schema);

        tracing::info!(
            drop = plan.tables_to_drop.len(),
            create = plan.tables_to_create.len(),
            primary_keys = plan.primary_keys_to_add.len(),
            foreign_keys = plan.foreign_key_count(),
            "Planned full replace"
        );

        Ok(plan)
    }

    /// Confirm, plan and apply a full replace
    pub async fn run<S, T, E>(&mut self, source: &S, target: &T, executor: &E) -> Result<ReplicationOutcome>
    where
        S: SchemaSource + ?Sized,
        T: SchemaSource + ?Sized,
        E: DdlExecutor + ?Sized,
    {
        let started = Instant::now();

        self.enter(ReplicationPhase::Confirming, "");
        if !self.confirm.confirm(CONFIRM_QUESTION)? {
            self.enter(ReplicationPhase::Aborted, "");
            tracing::info!("Replace declined by operator");
            return Ok(ReplicationOutcome::Aborted);
        }

        match self.replace(source, target, executor, started).await {
            Ok(report) => {
                self.enter(ReplicationPhase::Committed, "");
                tracing::info!(%report, "Replace committed");
                Ok(ReplicationOutcome::Committed(report))
            }
            Err(err) => {
                self.enter(ReplicationPhase::RolledBack, "");
                tracing::error!(error = %err, "Replace failed, target left unchanged");
                Err(err)
            }
        }
    }

    async fn replace<S, T, E>(
        &mut self,
        source: &S,
        target: &T,
        executor: &E,
        started: Instant,
    ) -> Result<ReplicationReport>
    where
        S: SchemaSource + ?Sized,
        T: SchemaSource + ?Sized,
        E: DdlExecutor + ?Sized,
    {
        let plan = self.plan_only(source, target).await?;
        let statements = plan.statements();

        executor.apply_in_transaction(&statements, &self.progress).await?;

        Ok(ReplicationReport {
            tables_dropped: plan.tables_to_drop.len(),
            tables: plan.tables_to_create.len(),
            columns: plan.column_count(),
            primary_keys: plan.primary_keys_to_add.len(),
            foreign_keys: plan.foreign_key_count(),
            elapsed: started.elapsed(),
        })
    }
}
