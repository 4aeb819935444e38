//! The ordered change plan produced by the diff engine.

use serde::{Deserialize, Serialize};

use crate::column::{ColumnOptions, ColumnSpec, ColumnType};
use crate::index::IndexSpec;

/// A single schema change, carrying fully-resolved parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SchemaOp {
    /// Create the table from scratch.
    CreateTable {
        /// Table name.
        table: String,
        /// The rendered `CREATE TABLE` statement.
        sql: String,
    },

    /// Establish the primary key after creation (PostgreSQL path).
    AddPrimaryKey {
        /// Table name.
        table: String,
        /// Primary key column.
        column: String,
        /// The rendered `ALTER TABLE` statement.
        sql: String,
    },

    /// Add a column missing from the live table.
    AddColumn {
        /// Table name.
        table: String,
        /// Column to add, with its full option set.
        column: ColumnSpec,
    },

    /// Drop a live column with no ideal counterpart.
    DropColumn {
        /// Table name.
        table: String,
        /// Column to drop.
        column: String,
    },

    /// Re-declare a live column whose type or options drifted.
    ChangeColumn {
        /// Table name.
        table: String,
        /// Column to change.
        column: String,
        /// The ideal semantic type.
        column_type: ColumnType,
        /// All currently-different explicit options, reapplied together.
        changes: ColumnOptions,
    },

    /// Create an ideal index missing from the live table.
    AddIndex {
        /// Table name.
        table: String,
        /// Index to create.
        index: IndexSpec,
    },

    /// Drop a live index with no ideal counterpart.
    DropIndex {
        /// Table name.
        table: String,
        /// Index to drop.
        index: String,
    },
}

impl SchemaOp {
    /// Returns a human-readable description of this operation.
    #[must_use]
    pub fn description(&self) -> String {
        match self {
            Self::CreateTable { table, .. } => format!("Create table '{table}'"),
            Self::AddPrimaryKey { table, column, .. } => {
                format!("Add primary key on '{column}' to table '{table}'")
            }
            Self::AddColumn { table, column } => {
                format!("Add column '{}' to table '{table}'", column.name)
            }
            Self::DropColumn { table, column } => {
                format!("Drop column '{column}' from table '{table}'")
            }
            Self::ChangeColumn { table, column, .. } => {
                format!("Change column '{column}' in table '{table}'")
            }
            Self::AddIndex { table, index } => format!(
                "Create index '{}' on table '{table}'",
                index.name.as_deref().unwrap_or_default()
            ),
            Self::DropIndex { table, index } => {
                format!("Drop index '{index}' from table '{table}'")
            }
        }
    }

    /// Returns true for operations that remove live structure.
    #[must_use]
    pub const fn is_destructive(&self) -> bool {
        matches!(self, Self::DropColumn { .. } | Self::DropIndex { .. })
    }
}

/// The ordered list of operations needed to converge a table.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Plan {
    /// Operations in execution order.
    pub steps: Vec<SchemaOp>,
}

impl Plan {
    /// Returns true if the live table already matches the ideal schema.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Number of planned operations.
    #[must_use]
    pub fn len(&self) -> usize {
        self.steps.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_descriptions() {
        let op = SchemaOp::DropColumn {
            table: "users".to_string(),
            column: "legacy_flag".to_string(),
        };
        assert_eq!(op.description(), "Drop column 'legacy_flag' from table 'users'");

        let op = SchemaOp::AddIndex {
            table: "users".to_string(),
            index: IndexSpec::on(["email"]).named("index_users_on_email"),
        };
        assert_eq!(
            op.description(),
            "Create index 'index_users_on_email' on table 'users'"
        );
    }

    #[test]
    fn test_destructive_flags() {
        let drop = SchemaOp::DropColumn {
            table: "users".to_string(),
            column: "x".to_string(),
        };
        let add = SchemaOp::AddColumn {
            table: "users".to_string(),
            column: ColumnSpec::new("x", ColumnType::String),
        };
        assert!(drop.is_destructive());
        assert!(!add.is_destructive());
    }
}
