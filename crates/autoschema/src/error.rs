//! Error types for schema reconciliation.

/// Errors that can occur while reconciling a table schema.
#[derive(Debug, thiserror::Error)]
pub enum SchemaError {
    /// The connection is missing or inactive; reconciliation cannot proceed.
    #[error("Connection is not active; connect to the database before calling apply")]
    ConnectionInactive,

    /// A second primary-key column was registered for the same table.
    #[error(
        "Table '{table}' already has primary key column '{existing}'; \
         cannot also register '{rejected}'"
    )]
    PrimaryKeyConflict {
        /// Table whose model was being populated.
        table: String,
        /// Name of the primary-key column already registered.
        existing: String,
        /// Name of the primary-key column that was rejected.
        rejected: String,
    },

    /// Database error while introspecting or executing DDL.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Execution failure reported by a non-sqlx backend.
    #[error("Failed to execute `{sql}`: {message}")]
    Execution {
        /// The statement that was rejected.
        sql: String,
        /// Backend-provided failure detail.
        message: String,
    },
}

/// Result type for schema reconciliation operations.
pub type Result<T> = std::result::Result<T, SchemaError>;
