//! The apply executor.
//!
//! [`Reconciler`] drives a full reconciliation: acquire the per-table
//! lease, snapshot the live schema, compute the plan, then execute each
//! operation through the connection — or, in dry-run mode, report each
//! operation through the connection's log sink without mutating anything.

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::connection::{LiveSchema, SchemaConnection};
use crate::dialect::Dialect;
use crate::diff::reconcile;
use crate::error::{Result, SchemaError};
use crate::lock::{self, LockKey};
use crate::model::SchemaModel;
use crate::plan::{Plan, SchemaOp};

/// Marker prefixed to every dry-run report line.
pub const DRY_RUN_MARKER: &str = "DRY RUN: ";

/// Options for one `apply` call.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ApplyOptions {
    /// Report the plan without executing it.
    pub dry_run: bool,
    /// Keep obsolete live columns and indexes instead of dropping them.
    pub gentle: bool,
    /// Trailing `CREATE TABLE` clause, overriding the dialect default.
    pub create_table_options: Option<String>,
}

impl ApplyOptions {
    /// Creates default options: real run, destructive removals allowed.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Enables dry-run mode.
    #[must_use]
    pub const fn dry_run(mut self, enabled: bool) -> Self {
        self.dry_run = enabled;
        self
    }

    /// Enables gentle mode.
    #[must_use]
    pub const fn gentle(mut self, enabled: bool) -> Self {
        self.gentle = enabled;
        self
    }

    /// Overrides the trailing `CREATE TABLE` clause.
    #[must_use]
    pub fn create_table_options(mut self, options: impl Into<String>) -> Self {
        self.create_table_options = Some(options.into());
        self
    }
}

/// What an `apply` call decided and did.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApplyReport {
    /// The computed plan, in execution order.
    pub plan: Plan,
    /// Whether this was a dry run.
    pub dry_run: bool,
    /// Dry-run report lines (empty on a real run).
    pub messages: Vec<String>,
}

/// Reconciles schema models against a live database.
#[derive(Debug)]
pub struct Reconciler<C> {
    connection: C,
}

impl<C: SchemaConnection> Reconciler<C> {
    /// Creates a reconciler over the given connection.
    pub fn new(connection: C) -> Self {
        Self { connection }
    }

    /// Returns the underlying connection.
    pub fn connection(&self) -> &C {
        &self.connection
    }

    /// Consumes the reconciler, returning the connection.
    pub fn into_connection(self) -> C {
        self.connection
    }

    /// Converges the live table to the model's ideal schema.
    ///
    /// At most one `apply` proceeds per (database, table) pair at a time;
    /// concurrent callers wait on the reconciliation lease. A DDL failure
    /// is surfaced unmodified and leaves the table in whatever state the
    /// already-executed steps produced.
    pub async fn apply(&self, model: &SchemaModel, options: &ApplyOptions) -> Result<ApplyReport> {
        if !self.connection.is_active() {
            return Err(SchemaError::ConnectionInactive);
        }

        let dialect = Dialect::classify(self.connection.adapter_name());
        let key = LockKey::new(self.connection.current_database(), model.table());
        let _guard = lock::registry().acquire(key).await;

        let live = self.snapshot(model.table()).await?;
        let plan = reconcile(model, &live, dialect, options);
        info!(
            table = model.table(),
            steps = plan.len(),
            dry_run = options.dry_run,
            "computed reconciliation plan"
        );

        let mut messages = Vec::new();
        for step in &plan.steps {
            if options.dry_run {
                let line = format!("{DRY_RUN_MARKER}{}", step.description());
                self.connection.log(&line);
                messages.push(line);
            } else {
                self.execute_step(step).await?;
            }
        }

        if !options.dry_run {
            self.connection.invalidate_schema_cache().await?;
        }

        Ok(ApplyReport {
            plan,
            dry_run: options.dry_run,
            messages,
        })
    }

    /// Resets the model's ideal sets under the same lease `apply` takes, so
    /// a reset never interleaves with a running reconciliation of the same
    /// table.
    pub async fn clear(&self, model: &mut SchemaModel) -> Result<()> {
        let key = LockKey::new(self.connection.current_database(), model.table());
        let _guard = lock::registry().acquire(key).await;
        model.clear();
        Ok(())
    }

    /// Fetches a fresh live-schema snapshot, invalidating caches first.
    async fn snapshot(&self, table: &str) -> Result<LiveSchema> {
        self.connection.invalidate_schema_cache().await?;

        if !self.connection.table_exists(table).await? {
            return Ok(LiveSchema::default());
        }

        let columns = self.connection.columns_hash(table).await?;
        let index_names = self
            .connection
            .indexes(table)
            .await?
            .into_iter()
            .map(|i| i.name)
            .collect();

        Ok(LiveSchema {
            exists: true,
            columns,
            index_names,
        })
    }

    async fn execute_step(&self, step: &SchemaOp) -> Result<()> {
        debug!(step = %step.description(), "executing");
        match step {
            SchemaOp::CreateTable { sql, .. } => {
                self.connection.execute(sql).await?;
                // DDL invalidates any cached metadata for this table.
                self.connection.invalidate_schema_cache().await?;
            }
            SchemaOp::AddPrimaryKey { sql, .. } => self.connection.execute(sql).await?,
            SchemaOp::AddColumn { table, column } => {
                self.connection.add_column(table, column).await?;
            }
            SchemaOp::DropColumn { table, column } => {
                self.connection.remove_column(table, column).await?;
            }
            SchemaOp::ChangeColumn {
                table,
                column,
                column_type,
                changes,
            } => {
                self.connection
                    .change_column(table, column, *column_type, changes)
                    .await?;
            }
            SchemaOp::AddIndex { table, index } => {
                self.connection.add_index(table, index).await?;
            }
            SchemaOp::DropIndex { table, index } => {
                self.connection.remove_index(table, index).await?;
            }
        }
        Ok(())
    }
}
