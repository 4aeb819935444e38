//! The contract the surrounding database layer provides.
//!
//! The reconciler never talks SQL wire protocols itself; it drives a
//! [`SchemaConnection`], which the ORM or database layer implements with
//! whatever driver it already holds. The `autoschema-sqlite` crate ships a
//! `sqlx`-backed implementation for SQLite.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::column::{ColumnOptions, ColumnSpec, ColumnType};
use crate::dialect::Dialect;
use crate::error::Result;
use crate::index::IndexSpec;

/// Introspected metadata for one live column.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct LiveColumn {
    /// Semantic type tag, when the backend can derive one.
    pub type_tag: Option<ColumnType>,
    /// The column's declared SQL type, verbatim.
    pub sql_type: String,
    /// Whether the column allows NULL.
    pub null: bool,
    /// Default value literal, if any.
    pub default: Option<String>,
    /// Length limit, when the declared type carries one.
    pub limit: Option<u32>,
    /// Decimal precision, when the declared type carries one.
    pub precision: Option<u8>,
    /// Decimal scale, when the declared type carries one.
    pub scale: Option<u8>,
}

/// One live index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LiveIndex {
    /// Index name.
    pub name: String,
}

/// A point-in-time snapshot of the live table.
///
/// Snapshots are only valid until the next DDL statement executes; the
/// reconciler re-fetches rather than reusing one across mutations.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LiveSchema {
    /// Whether the table exists at all.
    pub exists: bool,
    /// Live columns keyed by name, in table order.
    pub columns: IndexMap<String, LiveColumn>,
    /// Live index names.
    pub index_names: Vec<String>,
}

/// Operations the reconciler needs from the database layer.
///
/// Implementations translate each call into their engine's native DDL.
/// Column and index matching inside the engine is by name string equality,
/// so implementations must report names exactly as the database stores
/// them.
#[allow(async_fn_in_trait)]
pub trait SchemaConnection {
    /// Dialect discriminator, e.g. `"SQLite"` or `"PostgreSQL"`.
    fn adapter_name(&self) -> &str;

    /// Whether the connection is usable. Reconciliation refuses to start on
    /// an inactive connection.
    fn is_active(&self) -> bool {
        true
    }

    /// The current database name, when the engine can report one. Used to
    /// scope the reconciliation lock.
    fn current_database(&self) -> Option<String> {
        None
    }

    /// Whether `table` exists.
    async fn table_exists(&self, table: &str) -> Result<bool>;

    /// The live column names of `table`, in table order.
    async fn column_names(&self, table: &str) -> Result<Vec<String>>;

    /// The live column metadata of `table`, keyed by column name.
    async fn columns_hash(&self, table: &str) -> Result<IndexMap<String, LiveColumn>>;

    /// The live indexes of `table`, excluding any the engine maintains
    /// internally.
    async fn indexes(&self, table: &str) -> Result<Vec<LiveIndex>>;

    /// Executes a raw DDL statement.
    async fn execute(&self, sql: &str) -> Result<()>;

    /// Adds `column` to `table`.
    async fn add_column(&self, table: &str, column: &ColumnSpec) -> Result<()>;

    /// Drops `column` from `table`.
    async fn remove_column(&self, table: &str, column: &str) -> Result<()>;

    /// Re-declares `column` with the given type and the changed options.
    async fn change_column(
        &self,
        table: &str,
        column: &str,
        column_type: ColumnType,
        changes: &ColumnOptions,
    ) -> Result<()>;

    /// Creates `index` on `table`.
    async fn add_index(&self, table: &str, index: &IndexSpec) -> Result<()>;

    /// Drops the index named `index`.
    async fn remove_index(&self, table: &str, index: &str) -> Result<()>;

    /// Clears any cached column/index metadata. Called before snapshots are
    /// read and after DDL executes.
    async fn invalidate_schema_cache(&self) -> Result<()>;

    /// Quotes an identifier for this engine.
    fn quote_identifier(&self, ident: &str) -> String {
        Dialect::classify(self.adapter_name()).quote(ident)
    }

    /// Sink for dry-run report lines.
    fn log(&self, message: &str) {
        tracing::info!(target: "autoschema", "{message}");
    }
}
