//! Database dialect support.
//!
//! The three supported engines differ in how a primary key can be created,
//! how identifiers are quoted, and which native type a semantic column type
//! maps to. The dialect is classified once per reconciliation from the
//! connection's adapter name and passed through the call chain as a plain
//! enum.

use serde::{Deserialize, Serialize};

use crate::column::{ColumnOptions, ColumnSpec, ColumnType};

/// How a non-standard primary key is established on a freshly created table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrimaryKeyHandling {
    /// Append `PRIMARY KEY` to the column definition inside `CREATE TABLE`
    /// (MySQL requires the key declared inline).
    Inline,
    /// Issue a separate `ALTER TABLE ... ADD PRIMARY KEY` after creation.
    AlterAfterCreate,
    /// Primary keys cannot be added after creation at all; approximate with
    /// a unique index on the column (SQLite).
    UniqueIndexAfterCreate,
    /// Unknown engine: skip primary-key fixups entirely.
    Skip,
}

/// A database engine dialect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Dialect {
    /// SQLite.
    Sqlite,
    /// PostgreSQL.
    Postgres,
    /// MySQL.
    Mysql,
    /// Unrecognized engine; generic SQL only, no dialect-specific fixups.
    Generic,
}

impl Dialect {
    /// Classifies a connection's adapter name.
    ///
    /// Matching is a case-insensitive substring test, so `"SQLite"`,
    /// `"sqlite3"`, `"PostgreSQL"` and `"Mysql2"` all classify. Anything
    /// unrecognized becomes [`Dialect::Generic`].
    #[must_use]
    pub fn classify(adapter_name: &str) -> Self {
        let name = adapter_name.to_ascii_lowercase();
        if name.contains("sqlite") {
            Self::Sqlite
        } else if name.contains("postgres") {
            Self::Postgres
        } else if name.contains("mysql") {
            Self::Mysql
        } else {
            Self::Generic
        }
    }

    /// Returns the identifier quote character.
    #[must_use]
    pub const fn quote_char(self) -> char {
        match self {
            Self::Mysql => '`',
            _ => '"',
        }
    }

    /// Quotes an identifier.
    #[must_use]
    pub fn quote(self, ident: &str) -> String {
        let q = self.quote_char();
        format!("{q}{ident}{q}")
    }

    /// Returns how this engine establishes a non-standard primary key.
    #[must_use]
    pub const fn primary_key_handling(self) -> PrimaryKeyHandling {
        match self {
            Self::Sqlite => PrimaryKeyHandling::UniqueIndexAfterCreate,
            Self::Postgres => PrimaryKeyHandling::AlterAfterCreate,
            Self::Mysql => PrimaryKeyHandling::Inline,
            Self::Generic => PrimaryKeyHandling::Skip,
        }
    }

    /// Default trailing clause for `CREATE TABLE`, unless the caller
    /// overrides it.
    #[must_use]
    pub const fn create_table_suffix(self) -> Option<&'static str> {
        match self {
            Self::Mysql => Some("ENGINE=InnoDB"),
            _ => None,
        }
    }

    /// Maps a semantic column type to this engine's native SQL type.
    #[must_use]
    pub fn native_type(self, column_type: ColumnType, options: &ColumnOptions) -> String {
        match column_type {
            ColumnType::PrimaryKey => match self {
                Self::Sqlite => "INTEGER PRIMARY KEY AUTOINCREMENT".to_string(),
                Self::Postgres => "BIGSERIAL PRIMARY KEY".to_string(),
                Self::Mysql => "BIGINT AUTO_INCREMENT PRIMARY KEY".to_string(),
                Self::Generic => "INTEGER PRIMARY KEY".to_string(),
            },
            ColumnType::String => {
                format!("VARCHAR({})", options.limit.unwrap_or(255))
            }
            ColumnType::Text => "TEXT".to_string(),
            ColumnType::Integer => "INTEGER".to_string(),
            ColumnType::BigInt => match self {
                // SQLite uses INTEGER affinity for all integer widths.
                Self::Sqlite => "INTEGER".to_string(),
                _ => "BIGINT".to_string(),
            },
            ColumnType::Float => match self {
                Self::Sqlite => "REAL".to_string(),
                Self::Postgres => "DOUBLE PRECISION".to_string(),
                _ => "FLOAT".to_string(),
            },
            ColumnType::Decimal => match (options.precision, options.scale) {
                (Some(p), Some(s)) => format!("DECIMAL({p},{s})"),
                (Some(p), None) => format!("DECIMAL({p})"),
                _ => "DECIMAL".to_string(),
            },
            ColumnType::DateTime => match self {
                Self::Sqlite | Self::Mysql => "DATETIME".to_string(),
                _ => "TIMESTAMP".to_string(),
            },
            ColumnType::Date => "DATE".to_string(),
            ColumnType::Time => "TIME".to_string(),
            ColumnType::Boolean => match self {
                Self::Mysql => "TINYINT(1)".to_string(),
                _ => "BOOLEAN".to_string(),
            },
            ColumnType::Binary => match self {
                Self::Postgres => "BYTEA".to_string(),
                _ => "BLOB".to_string(),
            },
        }
    }

    /// Renders one column definition fragment for `CREATE TABLE` or
    /// `ADD COLUMN`.
    ///
    /// `inline_primary_key` appends `PRIMARY KEY` to this fragment; it is
    /// the in-place rewrite MySQL needs for non-standard keys.
    #[must_use]
    pub fn column_definition(self, column: &ColumnSpec, inline_primary_key: bool) -> String {
        let mut parts = vec![
            self.quote(&column.name),
            self.native_type(column.column_type, &column.options),
        ];

        // The identity type already carries its key and null semantics.
        if column.column_type != ColumnType::PrimaryKey {
            if column.options.null == Some(false) {
                parts.push("NOT NULL".to_string());
            }
            if column.options.unique == Some(true) {
                parts.push("UNIQUE".to_string());
            }
            if let Some(default) = &column.options.default {
                parts.push(format!("DEFAULT {}", default.to_sql()));
            }
            if inline_primary_key {
                parts.push("PRIMARY KEY".to_string());
            }
        }

        parts.join(" ")
    }

    /// Renders the full `CREATE TABLE` statement.
    ///
    /// `inline_primary_key` names the column whose fragment gets the
    /// in-place `PRIMARY KEY`; `suffix` is the trailing engine clause.
    #[must_use]
    pub fn create_table_sql(
        self,
        table: &str,
        columns: &[ColumnSpec],
        inline_primary_key: Option<&str>,
        suffix: Option<&str>,
    ) -> String {
        let defs: Vec<String> = columns
            .iter()
            .map(|c| self.column_definition(c, inline_primary_key == Some(c.name.as_str())))
            .collect();

        let mut sql = format!("CREATE TABLE {} ({})", self.quote(table), defs.join(", "));
        if let Some(suffix) = suffix {
            sql.push(' ');
            sql.push_str(suffix);
        }
        sql
    }

    /// Renders the post-create `ADD PRIMARY KEY` statement (PostgreSQL).
    #[must_use]
    pub fn add_primary_key_sql(self, table: &str, column: &str) -> String {
        format!(
            "ALTER TABLE {} ADD PRIMARY KEY ({})",
            self.quote(table),
            self.quote(column)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::column::DefaultValue;

    #[test]
    fn test_classify() {
        assert_eq!(Dialect::classify("SQLite"), Dialect::Sqlite);
        assert_eq!(Dialect::classify("sqlite3"), Dialect::Sqlite);
        assert_eq!(Dialect::classify("PostgreSQL"), Dialect::Postgres);
        assert_eq!(Dialect::classify("Mysql2"), Dialect::Mysql);
        assert_eq!(Dialect::classify("OracleEnhanced"), Dialect::Generic);
    }

    #[test]
    fn test_quoting() {
        assert_eq!(Dialect::Sqlite.quote("users"), "\"users\"");
        assert_eq!(Dialect::Mysql.quote("users"), "`users`");
    }

    #[test]
    fn test_primary_key_handling() {
        assert_eq!(
            Dialect::Sqlite.primary_key_handling(),
            PrimaryKeyHandling::UniqueIndexAfterCreate
        );
        assert_eq!(
            Dialect::Postgres.primary_key_handling(),
            PrimaryKeyHandling::AlterAfterCreate
        );
        assert_eq!(
            Dialect::Mysql.primary_key_handling(),
            PrimaryKeyHandling::Inline
        );
        assert_eq!(
            Dialect::Generic.primary_key_handling(),
            PrimaryKeyHandling::Skip
        );
    }

    #[test]
    fn test_native_types() {
        let opts = ColumnOptions::default();
        assert_eq!(
            Dialect::Sqlite.native_type(ColumnType::String, &opts),
            "VARCHAR(255)"
        );
        assert_eq!(
            Dialect::Postgres.native_type(ColumnType::BigInt, &opts),
            "BIGINT"
        );
        assert_eq!(
            Dialect::Sqlite.native_type(ColumnType::BigInt, &opts),
            "INTEGER"
        );
        assert_eq!(
            Dialect::Mysql.native_type(ColumnType::Boolean, &opts),
            "TINYINT(1)"
        );

        let sized = ColumnOptions {
            limit: Some(100),
            ..ColumnOptions::default()
        };
        assert_eq!(
            Dialect::Mysql.native_type(ColumnType::String, &sized),
            "VARCHAR(100)"
        );

        let decimal = ColumnOptions {
            precision: Some(10),
            scale: Some(2),
            ..ColumnOptions::default()
        };
        assert_eq!(
            Dialect::Postgres.native_type(ColumnType::Decimal, &decimal),
            "DECIMAL(10,2)"
        );
    }

    #[test]
    fn test_column_definition() {
        let col = ColumnSpec::new("email", ColumnType::String)
            .not_null()
            .unique()
            .default(DefaultValue::Text("none".to_string()));

        assert_eq!(
            Dialect::Sqlite.column_definition(&col, false),
            "\"email\" VARCHAR(255) NOT NULL UNIQUE DEFAULT 'none'"
        );
    }

    #[test]
    fn test_column_definition_inline_primary_key() {
        let col = ColumnSpec::new("uuid", ColumnType::String).not_null();
        assert_eq!(
            Dialect::Mysql.column_definition(&col, true),
            "`uuid` VARCHAR(255) NOT NULL PRIMARY KEY"
        );
    }

    #[test]
    fn test_identity_fragment_ignores_inline_flag() {
        let col = ColumnSpec::new("id", ColumnType::PrimaryKey);
        assert_eq!(
            Dialect::Sqlite.column_definition(&col, true),
            "\"id\" INTEGER PRIMARY KEY AUTOINCREMENT"
        );
    }

    #[test]
    fn test_create_table_sql_with_suffix() {
        let columns = vec![
            ColumnSpec::new("id", ColumnType::PrimaryKey),
            ColumnSpec::new("name", ColumnType::String).not_null(),
        ];
        let sql = Dialect::Mysql.create_table_sql("users", &columns, None, Some("ENGINE=InnoDB"));

        assert_eq!(
            sql,
            "CREATE TABLE `users` (`id` BIGINT AUTO_INCREMENT PRIMARY KEY, \
             `name` VARCHAR(255) NOT NULL) ENGINE=InnoDB"
        );
    }

    #[test]
    fn test_add_primary_key_sql() {
        assert_eq!(
            Dialect::Postgres.add_primary_key_sql("users", "uuid"),
            "ALTER TABLE \"users\" ADD PRIMARY KEY (\"uuid\")"
        );
    }
}
