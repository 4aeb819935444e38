//! Declarative table schema reconciliation.
//!
//! `autoschema` converges a live database table to an ideal schema declared
//! in code. Register the columns and indexes a table should have on a
//! [`SchemaModel`], hand it to a [`Reconciler`], and the minimal set of DDL
//! operations is computed and executed — or only reported, in dry-run mode.
//!
//! # Architecture
//!
//! - **Descriptors** ([`column`], [`index`]) — value objects describing one
//!   desired column or index.
//! - **Schema model** ([`model`]) — the ideal column/index sets for one
//!   table, built through an explicit builder API.
//! - **Dialect adapter** ([`dialect`]) — per-engine primary-key strategy,
//!   native type mapping and quoting for SQLite, PostgreSQL and MySQL.
//! - **Diff engine** ([`diff`]) — compares the model against a live-schema
//!   snapshot and produces an ordered change [`plan`].
//! - **Apply executor** ([`executor`]) — runs the plan against the
//!   connection, or logs it behind a dry-run marker.
//! - **Reconciliation lock** ([`lock`]) — a keyed lease serializing
//!   concurrent `apply` calls per (database, table) pair.
//!
//! The database itself is reached through the [`connection::SchemaConnection`]
//! contract; the `autoschema-sqlite` crate implements it over a
//! `sqlx::SqlitePool`.
//!
//! # Example
//!
//! ```rust,ignore
//! use autoschema::prelude::*;
//!
//! let mut users = SchemaModel::new("users");
//! users.add_ideal_column(ColumnSpec::new("id", ColumnType::PrimaryKey))?;
//! users.add_ideal_column(ColumnSpec::new("email", ColumnType::String).not_null())?;
//! users.add_ideal_index(IndexSpec::on(["email"]).unique());
//!
//! let reconciler = Reconciler::new(connection);
//! let report = reconciler.apply(&users, &ApplyOptions::new()).await?;
//! assert!(report.plan.is_empty() || !report.dry_run);
//! ```

pub mod column;
pub mod connection;
pub mod dialect;
pub mod diff;
pub mod error;
pub mod executor;
pub mod index;
pub mod lock;
pub mod model;
pub mod plan;

pub use column::{ColumnOptions, ColumnSpec, ColumnType, DefaultValue};
pub use connection::{LiveColumn, LiveIndex, LiveSchema, SchemaConnection};
pub use dialect::Dialect;
pub use error::{Result, SchemaError};
pub use executor::{ApplyOptions, ApplyReport, Reconciler, DRY_RUN_MARKER};
pub use index::IndexSpec;
pub use model::SchemaModel;
pub use plan::{Plan, SchemaOp};

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::column::{ColumnOptions, ColumnSpec, ColumnType, DefaultValue};
    pub use crate::connection::{LiveColumn, LiveIndex, LiveSchema, SchemaConnection};
    pub use crate::dialect::Dialect;
    pub use crate::error::{Result, SchemaError};
    pub use crate::executor::{ApplyOptions, ApplyReport, Reconciler};
    pub use crate::index::IndexSpec;
    pub use crate::model::SchemaModel;
    pub use crate::plan::{Plan, SchemaOp};
}
