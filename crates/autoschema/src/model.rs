//! The schema model: the ideal shape of one table.
//!
//! A [`SchemaModel`] accumulates the columns and indexes a table should
//! have. It is built once per table at configuration time, mutated only
//! through [`SchemaModel::add_ideal_column`] and
//! [`SchemaModel::add_ideal_index`], and never persisted — each process run
//! rebuilds it from the declarative configuration and hands it to the
//! reconciler.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::column::{ColumnSpec, ColumnType};
use crate::error::{Result, SchemaError};
use crate::index::IndexSpec;

/// Default name of the implicit identity column.
pub const DEFAULT_PRIMARY_KEY: &str = "id";

/// The ideal schema for one table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchemaModel {
    table: String,
    primary_key: Option<String>,
    ideal_columns: IndexMap<String, ColumnSpec>,
    ideal_indexes: IndexMap<String, IndexSpec>,
}

impl SchemaModel {
    /// Creates a model for `table` with the default `id` primary key.
    #[must_use]
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            primary_key: Some(DEFAULT_PRIMARY_KEY.to_string()),
            ideal_columns: IndexMap::new(),
            ideal_indexes: IndexMap::new(),
        }
    }

    /// Uses `name` as the table's primary key column.
    #[must_use]
    pub fn with_primary_key(mut self, name: impl Into<String>) -> Self {
        self.primary_key = Some(name.into());
        self
    }

    /// Declares that the table has no primary key at all.
    #[must_use]
    pub fn without_primary_key(mut self) -> Self {
        self.primary_key = None;
        self
    }

    /// Returns the table name.
    #[must_use]
    pub fn table(&self) -> &str {
        &self.table
    }

    /// Returns the primary key column name, if the table has one.
    #[must_use]
    pub fn primary_key(&self) -> Option<&str> {
        self.primary_key.as_deref()
    }

    /// Registers an ideal column.
    ///
    /// Registering a column that is already present (same name and same
    /// descriptor) is a no-op; re-registering a name with a different
    /// descriptor replaces the earlier one. At most one column of type
    /// [`ColumnType::PrimaryKey`] may exist per model; a second one under a
    /// different name is rejected.
    pub fn add_ideal_column(&mut self, column: ColumnSpec) -> Result<()> {
        if column.column_type == ColumnType::PrimaryKey {
            if let Some(existing) = self.primary_key_column() {
                if existing.name != column.name {
                    return Err(SchemaError::PrimaryKeyConflict {
                        table: self.table.clone(),
                        existing: existing.name.clone(),
                        rejected: column.name,
                    });
                }
            }
        }
        self.ideal_columns.insert(column.name.clone(), column);
        Ok(())
    }

    /// Registers an ideal index.
    ///
    /// The index name is derived from the table and column names unless the
    /// descriptor carries an explicit one. Registering an already-present
    /// index is a no-op.
    pub fn add_ideal_index(&mut self, index: IndexSpec) {
        let name = index.resolved_name(&self.table);
        let resolved = IndexSpec {
            name: Some(name.clone()),
            ..index
        };
        self.ideal_indexes.insert(name, resolved);
    }

    /// Returns the registered columns, keyed by name in registration order.
    #[must_use]
    pub fn ideal_columns(&self) -> &IndexMap<String, ColumnSpec> {
        &self.ideal_columns
    }

    /// Returns the registered indexes, keyed by resolved name.
    #[must_use]
    pub fn ideal_indexes(&self) -> &IndexMap<String, IndexSpec> {
        &self.ideal_indexes
    }

    /// Finds a registered column by name.
    #[must_use]
    pub fn find_ideal_column(&self, name: &str) -> Option<&ColumnSpec> {
        self.ideal_columns.get(name)
    }

    /// Returns the column registered with [`ColumnType::PrimaryKey`], if any.
    #[must_use]
    pub fn primary_key_column(&self) -> Option<&ColumnSpec> {
        self.ideal_columns
            .values()
            .find(|c| c.column_type == ColumnType::PrimaryKey)
    }

    /// Resets both ideal sets to empty.
    ///
    /// Used when recomputing the configuration from scratch. Callers racing
    /// against `apply` should go through [`crate::Reconciler::clear`], which
    /// takes the reconciliation lock.
    pub fn clear(&mut self) {
        self.ideal_columns.clear();
        self.ideal_indexes.clear();
    }
}
