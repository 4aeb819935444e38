//! # autoschema-sqlite
//!
//! A [`SchemaConnection`] implementation over `sqlx::SqlitePool`.
//!
//! # How SQLite differs from other engines here
//!
//! - **Introspection** goes through `sqlite_master` and the `table_info`/
//!   `index_list` pragmas rather than an information schema.
//! - **Internal indexes**: `index_list` reports the indexes SQLite
//!   maintains itself (`sqlite_autoindex_*`, origin `u`/`pk`); only
//!   explicitly created indexes (origin `c`) are reported to the
//!   reconciler, so they are never candidates for removal.
//! - **Limited ALTER TABLE**: columns can be added and dropped
//!   (SQLite 3.35.0+), but not altered in place. [`change_column`] uses
//!   the table-recreation strategy: create a shadow table with the new
//!   declaration, copy rows, drop the old table, rename, and recreate the
//!   explicit indexes the drop discarded.
//!
//! [`change_column`]: SchemaConnection::change_column

use sqlx::sqlite::SqlitePool;
use sqlx::Row;
use tracing::debug;

use autoschema::column::{ColumnOptions, ColumnSpec, ColumnType};
use autoschema::connection::{LiveColumn, LiveIndex, SchemaConnection};
use autoschema::dialect::Dialect;
use autoschema::error::Result;
use autoschema::index::IndexSpec;
use indexmap::IndexMap;

/// Raw `PRAGMA table_info` row.
struct RawColumn {
    name: String,
    declared: String,
    notnull: bool,
    default: Option<String>,
    pk: i64,
}

/// One explicitly created index, with enough detail to recreate it.
struct RawIndex {
    name: String,
    unique: bool,
    columns: Vec<String>,
}

/// Schema connection over a SQLite pool.
#[derive(Debug, Clone)]
pub struct SqliteSchemaConnection {
    pool: SqlitePool,
}

impl SqliteSchemaConnection {
    /// Wraps an existing pool.
    #[must_use]
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Returns the underlying pool.
    #[must_use]
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    fn quote(ident: &str) -> String {
        Dialect::Sqlite.quote(ident)
    }

    async fn table_info(&self, table: &str) -> Result<Vec<RawColumn>> {
        let sql = format!("PRAGMA table_info({})", Self::quote(table));
        let rows = sqlx::query(&sql).fetch_all(&self.pool).await?;

        let mut columns = Vec::with_capacity(rows.len());
        for row in rows {
            columns.push(RawColumn {
                name: row.try_get("name")?,
                declared: row.try_get("type")?,
                notnull: row.try_get::<i64, _>("notnull")? != 0,
                default: row.try_get("dflt_value")?,
                pk: row.try_get("pk")?,
            });
        }
        Ok(columns)
    }

    /// Explicitly created indexes of `table` (origin `c`), with their
    /// column lists.
    async fn explicit_indexes(&self, table: &str) -> Result<Vec<RawIndex>> {
        let sql = format!("PRAGMA index_list({})", Self::quote(table));
        let rows = sqlx::query(&sql).fetch_all(&self.pool).await?;

        let mut indexes = Vec::new();
        for row in rows {
            let origin: String = row.try_get("origin")?;
            if origin != "c" {
                continue;
            }
            let name: String = row.try_get("name")?;
            let unique = row.try_get::<i64, _>("unique")? != 0;

            let info_sql = format!("PRAGMA index_info({})", Self::quote(&name));
            let info_rows = sqlx::query(&info_sql).fetch_all(&self.pool).await?;
            let mut columns = Vec::with_capacity(info_rows.len());
            for info in info_rows {
                columns.push(info.try_get("name")?);
            }

            indexes.push(RawIndex {
                name,
                unique,
                columns,
            });
        }
        Ok(indexes)
    }

    /// Re-renders a live column declaration from its raw metadata.
    fn live_definition(raw: &RawColumn, inline_primary_key: bool) -> String {
        let mut parts = vec![Self::quote(&raw.name), raw.declared.clone()];
        if inline_primary_key {
            parts.push("PRIMARY KEY".to_string());
        }
        if raw.notnull {
            parts.push("NOT NULL".to_string());
        }
        if let Some(default) = &raw.default {
            parts.push(format!("DEFAULT {default}"));
        }
        parts.join(" ")
    }

    /// Renders the changed column's new declaration: the ideal type plus
    /// the changed options, falling back to the live metadata for anything
    /// left unchanged.
    fn changed_definition(
        raw: &RawColumn,
        column_type: ColumnType,
        changes: &ColumnOptions,
        inline_primary_key: bool,
    ) -> String {
        let mut parts = vec![
            Self::quote(&raw.name),
            Dialect::Sqlite.native_type(column_type, changes),
        ];
        if inline_primary_key {
            parts.push("PRIMARY KEY".to_string());
        }
        let nullable = changes.null.unwrap_or(!raw.notnull);
        if !nullable {
            parts.push("NOT NULL".to_string());
        }
        let default = changes
            .default
            .as_ref()
            .map(autoschema::column::DefaultValue::to_sql)
            .or_else(|| raw.default.clone());
        if let Some(default) = default {
            parts.push(format!("DEFAULT {default}"));
        }
        if changes.unique == Some(true) {
            parts.push("UNIQUE".to_string());
        }
        parts.join(" ")
    }
}

impl SchemaConnection for SqliteSchemaConnection {
    fn adapter_name(&self) -> &str {
        "SQLite"
    }

    fn is_active(&self) -> bool {
        !self.pool.is_closed()
    }

    async fn table_exists(&self, table: &str) -> Result<bool> {
        let row = sqlx::query("SELECT name FROM sqlite_master WHERE type = 'table' AND name = ?")
            .bind(table)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.is_some())
    }

    async fn column_names(&self, table: &str) -> Result<Vec<String>> {
        let columns = self.table_info(table).await?;
        Ok(columns.into_iter().map(|c| c.name).collect())
    }

    async fn columns_hash(&self, table: &str) -> Result<IndexMap<String, LiveColumn>> {
        let columns = self.table_info(table).await?;
        let mut hash = IndexMap::with_capacity(columns.len());
        for raw in columns {
            let (type_tag, limit, precision, scale) = parse_declared_type(&raw.declared);
            hash.insert(
                raw.name.clone(),
                LiveColumn {
                    type_tag,
                    sql_type: raw.declared,
                    null: !raw.notnull,
                    default: raw.default,
                    limit,
                    precision,
                    scale,
                },
            );
        }
        Ok(hash)
    }

    async fn indexes(&self, table: &str) -> Result<Vec<LiveIndex>> {
        let indexes = self.explicit_indexes(table).await?;
        Ok(indexes
            .into_iter()
            .map(|i| LiveIndex { name: i.name })
            .collect())
    }

    async fn execute(&self, sql: &str) -> Result<()> {
        debug!(sql, "executing");
        sqlx::query(sql).execute(&self.pool).await?;
        Ok(())
    }

    async fn add_column(&self, table: &str, column: &ColumnSpec) -> Result<()> {
        let sql = format!(
            "ALTER TABLE {} ADD COLUMN {}",
            Self::quote(table),
            Dialect::Sqlite.column_definition(column, false)
        );
        self.execute(&sql).await
    }

    async fn remove_column(&self, table: &str, column: &str) -> Result<()> {
        let sql = format!(
            "ALTER TABLE {} DROP COLUMN {}",
            Self::quote(table),
            Self::quote(column)
        );
        self.execute(&sql).await
    }

    async fn change_column(
        &self,
        table: &str,
        column: &str,
        column_type: ColumnType,
        changes: &ColumnOptions,
    ) -> Result<()> {
        // Table-recreation strategy. Dropping the old table discards its
        // explicit indexes, so they are captured first and recreated last.
        let raw_columns = self.table_info(table).await?;
        let indexes = self.explicit_indexes(table).await?;

        let pk_columns: Vec<&RawColumn> = raw_columns.iter().filter(|c| c.pk > 0).collect();
        let inline_pk = pk_columns.len() == 1;

        let mut definitions = Vec::with_capacity(raw_columns.len());
        let mut names = Vec::with_capacity(raw_columns.len());
        for raw in &raw_columns {
            let is_pk = inline_pk && raw.pk > 0;
            names.push(Self::quote(&raw.name));
            if raw.name == column {
                definitions.push(Self::changed_definition(raw, column_type, changes, is_pk));
            } else {
                definitions.push(Self::live_definition(raw, is_pk));
            }
        }
        if pk_columns.len() > 1 {
            let key: Vec<String> = pk_columns.iter().map(|c| Self::quote(&c.name)).collect();
            definitions.push(format!("PRIMARY KEY ({})", key.join(", ")));
        }

        let quoted_table = Self::quote(table);
        let shadow = format!("{table}_changing");
        let quoted_shadow = Self::quote(&shadow);
        let column_list = names.join(", ");

        self.execute(&format!(
            "CREATE TABLE {quoted_shadow} ({})",
            definitions.join(", ")
        ))
        .await?;
        self.execute(&format!(
            "INSERT INTO {quoted_shadow} ({column_list}) SELECT {column_list} FROM {quoted_table}"
        ))
        .await?;
        self.execute(&format!("DROP TABLE {quoted_table}")).await?;
        self.execute(&format!(
            "ALTER TABLE {quoted_shadow} RENAME TO {quoted_table}"
        ))
        .await?;

        for index in indexes {
            let spec = IndexSpec {
                name: Some(index.name),
                columns: index.columns,
                unique: index.unique,
            };
            self.add_index(table, &spec).await?;
        }
        Ok(())
    }

    async fn add_index(&self, table: &str, index: &IndexSpec) -> Result<()> {
        let name = index.resolved_name(table);
        let columns: Vec<String> = index.columns.iter().map(|c| Self::quote(c)).collect();
        let unique = if index.unique { "UNIQUE " } else { "" };
        let sql = format!(
            "CREATE {unique}INDEX {} ON {} ({})",
            Self::quote(&name),
            Self::quote(table),
            columns.join(", ")
        );
        self.execute(&sql).await
    }

    async fn remove_index(&self, _table: &str, index: &str) -> Result<()> {
        let sql = format!("DROP INDEX {}", Self::quote(index));
        self.execute(&sql).await
    }

    async fn invalidate_schema_cache(&self) -> Result<()> {
        // SQLite re-prepares statements itself when the schema changes;
        // nothing is cached at this layer.
        Ok(())
    }
}

/// Parses a declared SQLite type into a semantic tag and its size options.
fn parse_declared_type(declared: &str) -> (Option<ColumnType>, Option<u32>, Option<u8>, Option<u8>) {
    let upper = declared.to_ascii_uppercase();
    let (base, args) = match upper.find('(') {
        Some(open) => {
            let close = upper.rfind(')').unwrap_or(upper.len());
            let args: Vec<u32> = upper[open + 1..close]
                .split(',')
                .filter_map(|a| a.trim().parse().ok())
                .collect();
            (upper[..open].trim().to_string(), args)
        }
        None => (upper.trim().to_string(), Vec::new()),
    };

    let first = args.first().copied();
    let second = args.get(1).copied();
    match base.as_str() {
        "VARCHAR" | "CHARACTER VARYING" | "NVARCHAR" => (Some(ColumnType::String), first, None, None),
        "TEXT" | "CLOB" => (Some(ColumnType::Text), None, None, None),
        "INTEGER" | "INT" | "SMALLINT" | "TINYINT" | "MEDIUMINT" => {
            (Some(ColumnType::Integer), None, None, None)
        }
        "BIGINT" => (Some(ColumnType::BigInt), None, None, None),
        "REAL" | "FLOAT" | "DOUBLE" | "DOUBLE PRECISION" => {
            (Some(ColumnType::Float), None, None, None)
        }
        "DECIMAL" | "NUMERIC" => (
            Some(ColumnType::Decimal),
            None,
            first.and_then(|p| u8::try_from(p).ok()),
            second.and_then(|s| u8::try_from(s).ok()),
        ),
        "DATETIME" | "TIMESTAMP" => (Some(ColumnType::DateTime), None, None, None),
        "DATE" => (Some(ColumnType::Date), None, None, None),
        "TIME" => (Some(ColumnType::Time), None, None, None),
        "BOOLEAN" | "BOOL" => (Some(ColumnType::Boolean), None, None, None),
        "BLOB" | "BINARY" | "VARBINARY" => (Some(ColumnType::Binary), None, None, None),
        _ => (None, None, None, None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_varchar_with_limit() {
        let (tag, limit, precision, scale) = parse_declared_type("varchar(255)");
        assert_eq!(tag, Some(ColumnType::String));
        assert_eq!(limit, Some(255));
        assert_eq!(precision, None);
        assert_eq!(scale, None);
    }

    #[test]
    fn test_parse_decimal_with_precision_and_scale() {
        let (tag, limit, precision, scale) = parse_declared_type("DECIMAL(10,2)");
        assert_eq!(tag, Some(ColumnType::Decimal));
        assert_eq!(limit, None);
        assert_eq!(precision, Some(10));
        assert_eq!(scale, Some(2));
    }

    #[test]
    fn test_parse_bare_types() {
        assert_eq!(parse_declared_type("TEXT").0, Some(ColumnType::Text));
        assert_eq!(parse_declared_type("integer").0, Some(ColumnType::Integer));
        assert_eq!(parse_declared_type("BOOLEAN").0, Some(ColumnType::Boolean));
        assert_eq!(parse_declared_type("DATETIME").0, Some(ColumnType::DateTime));
    }

    #[test]
    fn test_parse_unknown_type() {
        let (tag, limit, ..) = parse_declared_type("GEOMETRY");
        assert_eq!(tag, None);
        assert_eq!(limit, None);
    }
}
