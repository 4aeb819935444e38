//! The diff engine.
//!
//! [`reconcile`] compares a [`SchemaModel`] against a live-schema snapshot
//! and produces the ordered [`Plan`] that converges the table. It is a pure
//! function: the caller's model is never mutated, and the same snapshot
//! always yields the same plan, so a dry run reports exactly the decisions
//! a real run would execute.
//!
//! When the table does not exist, the plan is the `CREATE TABLE` (plus the
//! dialect's primary-key fixup) followed by every ideal index; the
//! column-delta steps are skipped because the create already materializes
//! the ideal columns exactly.

use indexmap::IndexMap;
use tracing::debug;

use crate::column::{ColumnOptions, ColumnSpec, ColumnType};
use crate::connection::{LiveColumn, LiveSchema};
use crate::dialect::{Dialect, PrimaryKeyHandling};
use crate::executor::ApplyOptions;
use crate::index::IndexSpec;
use crate::model::{SchemaModel, DEFAULT_PRIMARY_KEY};
use crate::plan::{Plan, SchemaOp};

/// The model's column set after primary-key resolution.
struct Resolution {
    columns: IndexMap<String, ColumnSpec>,
    non_standard_primary_key: bool,
}

/// Resolves the primary key into a working copy of the ideal columns.
///
/// A model whose primary key is the implicit `id` gets an identity column
/// injected if none was registered. A primary key under any other name, or
/// registered with a non-identity type, is non-standard: it cannot go
/// through the normal identity-column path, and on engines where it cannot
/// be created as a nullable column it is forced NOT NULL.
fn resolve_primary_key(model: &SchemaModel, dialect: Dialect) -> Resolution {
    let mut columns = model.ideal_columns().clone();

    let Some(pk) = model.primary_key() else {
        // No primary-key concept: nothing to inject, nothing to fix up.
        return Resolution {
            columns,
            non_standard_primary_key: false,
        };
    };

    let non_standard = match columns.get(pk) {
        Some(column) => column.column_type != ColumnType::PrimaryKey,
        None if pk == DEFAULT_PRIMARY_KEY => {
            let spec = ColumnSpec::new(pk, ColumnType::PrimaryKey);
            columns.shift_insert(0, pk.to_string(), spec);
            false
        }
        None => {
            // Undeclared non-standard key: only string keys are supported.
            let spec = ColumnSpec::new(pk, ColumnType::String).not_null();
            columns.shift_insert(0, pk.to_string(), spec);
            true
        }
    };

    if non_standard && matches!(dialect, Dialect::Sqlite | Dialect::Postgres) {
        if let Some(column) = columns.get_mut(pk) {
            column.options.null = Some(false);
        }
    }

    Resolution {
        columns,
        non_standard_primary_key: non_standard,
    }
}

/// The model's index set, extended with the unique index SQLite needs to
/// stand in for a non-standard primary key.
///
/// The extension happens on every run, not only the creating one, so the
/// obsolete-index step never drops the stand-in.
fn effective_indexes(
    model: &SchemaModel,
    dialect: Dialect,
    non_standard_primary_key: bool,
) -> IndexMap<String, IndexSpec> {
    let mut indexes = model.ideal_indexes().clone();

    if non_standard_primary_key
        && dialect.primary_key_handling() == PrimaryKeyHandling::UniqueIndexAfterCreate
    {
        if let Some(pk) = model.primary_key() {
            let spec = IndexSpec::on([pk]).unique();
            let name = spec.resolved_name(model.table());
            indexes.entry(name.clone()).or_insert(IndexSpec {
                name: Some(name),
                ..spec
            });
        }
    }

    indexes
}

/// Collects the drift between an ideal column and its live counterpart.
///
/// The type matches when the live semantic tag equals the ideal type, or
/// when the live declared SQL type equals the ideal type's native rendering
/// (compared case-insensitively). Only explicitly-set ideal options are
/// compared; everything currently different is returned together so the
/// change re-declares the column in one statement.
fn column_drift(
    ideal: &ColumnSpec,
    live: &LiveColumn,
    dialect: Dialect,
) -> Option<(ColumnType, ColumnOptions)> {
    let native = dialect.native_type(ideal.column_type, &ideal.options);
    let type_changed = live.type_tag != Some(ideal.column_type)
        && !live.sql_type.eq_ignore_ascii_case(&native);

    let mut changes = ColumnOptions::default();
    if let Some(null) = ideal.options.null {
        if null != live.null {
            changes.null = Some(null);
        }
    }
    if let Some(limit) = ideal.options.limit {
        if Some(limit) != live.limit {
            changes.limit = Some(limit);
        }
    }
    if let Some(precision) = ideal.options.precision {
        if Some(precision) != live.precision {
            changes.precision = Some(precision);
        }
    }
    if let Some(scale) = ideal.options.scale {
        if Some(scale) != live.scale {
            changes.scale = Some(scale);
        }
    }
    if let Some(default) = &ideal.options.default {
        if live.default.as_deref() != Some(default.to_sql().as_str()) {
            changes.default = Some(default.clone());
        }
    }
    // Live column metadata carries no per-column unique flag; uniqueness is
    // asserted through indexes instead.

    if type_changed || !changes.is_empty() {
        Some((ideal.column_type, changes))
    } else {
        None
    }
}

/// Computes the ordered plan converging `live` to the model's ideal schema.
#[must_use]
pub fn reconcile(
    model: &SchemaModel,
    live: &LiveSchema,
    dialect: Dialect,
    options: &ApplyOptions,
) -> Plan {
    let Resolution {
        columns: ideal_columns,
        non_standard_primary_key,
    } = resolve_primary_key(model, dialect);
    let ideal_indexes = effective_indexes(model, dialect, non_standard_primary_key);

    let table = model.table();
    let mut steps = Vec::new();

    if !live.exists {
        let handling = dialect.primary_key_handling();
        let inline_pk = if non_standard_primary_key && handling == PrimaryKeyHandling::Inline {
            model.primary_key()
        } else {
            None
        };
        let suffix = options
            .create_table_options
            .as_deref()
            .or_else(|| dialect.create_table_suffix());
        let columns: Vec<ColumnSpec> = ideal_columns.values().cloned().collect();

        steps.push(SchemaOp::CreateTable {
            table: table.to_string(),
            sql: dialect.create_table_sql(table, &columns, inline_pk, suffix),
        });

        if non_standard_primary_key && handling == PrimaryKeyHandling::AlterAfterCreate {
            if let Some(pk) = model.primary_key() {
                steps.push(SchemaOp::AddPrimaryKey {
                    table: table.to_string(),
                    column: pk.to_string(),
                    sql: dialect.add_primary_key_sql(table, pk),
                });
            }
        }

        for index in ideal_indexes.values() {
            steps.push(SchemaOp::AddIndex {
                table: table.to_string(),
                index: index.clone(),
            });
        }

        return Plan { steps };
    }

    // Remove live columns with no ideal counterpart.
    for name in live.columns.keys() {
        if !ideal_columns.contains_key(name) {
            if options.gentle {
                debug!(table, column = %name, "gentle mode: keeping obsolete column");
            } else {
                steps.push(SchemaOp::DropColumn {
                    table: table.to_string(),
                    column: name.clone(),
                });
            }
        }
    }

    // Add ideal columns missing from the live table.
    for (name, column) in &ideal_columns {
        if !live.columns.contains_key(name) {
            steps.push(SchemaOp::AddColumn {
                table: table.to_string(),
                column: column.clone(),
            });
        }
    }

    // Change columns that drifted. The primary key column is exempt: its
    // storage representation is authoritative once created.
    for (name, live_column) in &live.columns {
        if model.primary_key() == Some(name.as_str()) {
            continue;
        }
        let Some(ideal) = ideal_columns.get(name) else {
            continue;
        };
        if let Some((column_type, changes)) = column_drift(ideal, live_column, dialect) {
            steps.push(SchemaOp::ChangeColumn {
                table: table.to_string(),
                column: name.clone(),
                column_type,
                changes,
            });
        }
    }

    // Remove live indexes with no ideal counterpart.
    for name in &live.index_names {
        if !ideal_indexes.contains_key(name) {
            if options.gentle {
                debug!(table, index = %name, "gentle mode: keeping obsolete index");
            } else {
                steps.push(SchemaOp::DropIndex {
                    table: table.to_string(),
                    index: name.clone(),
                });
            }
        }
    }

    // Add ideal indexes missing from the live table.
    for (name, index) in &ideal_indexes {
        if !live.index_names.contains(name) {
            steps.push(SchemaOp::AddIndex {
                table: table.to_string(),
                index: index.clone(),
            });
        }
    }

    Plan { steps }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::column::DefaultValue;

    fn live_column(sql_type: &str, type_tag: Option<ColumnType>) -> LiveColumn {
        LiveColumn {
            type_tag,
            sql_type: sql_type.to_string(),
            null: true,
            ..LiveColumn::default()
        }
    }

    fn users_model() -> SchemaModel {
        let mut model = SchemaModel::new("users");
        model
            .add_ideal_column(ColumnSpec::new("id", ColumnType::PrimaryKey))
            .unwrap();
        model
            .add_ideal_column(ColumnSpec::new("email", ColumnType::String).not_null())
            .unwrap();
        model
    }

    fn matching_live(model: &SchemaModel, dialect: Dialect) -> LiveSchema {
        let mut live = LiveSchema {
            exists: true,
            ..LiveSchema::default()
        };
        for (name, column) in model.ideal_columns() {
            live.columns.insert(
                name.clone(),
                LiveColumn {
                    type_tag: Some(column.column_type),
                    sql_type: dialect.native_type(column.column_type, &column.options),
                    null: column.options.null.unwrap_or(true),
                    default: column.options.default.as_ref().map(DefaultValue::to_sql),
                    limit: column.options.limit,
                    precision: column.options.precision,
                    scale: column.options.scale,
                },
            );
        }
        for name in model.ideal_indexes().keys() {
            live.index_names.push(name.clone());
        }
        live
    }

    #[test]
    fn test_create_from_scratch() {
        let model = users_model();
        let plan = reconcile(
            &model,
            &LiveSchema::default(),
            Dialect::Sqlite,
            &ApplyOptions::default(),
        );

        assert_eq!(plan.len(), 1);
        match &plan.steps[0] {
            SchemaOp::CreateTable { table, sql } => {
                assert_eq!(table, "users");
                assert!(sql.contains("\"id\" INTEGER PRIMARY KEY AUTOINCREMENT"));
                assert!(sql.contains("\"email\" VARCHAR(255) NOT NULL"));
            }
            other => panic!("Expected CreateTable, got {other:?}"),
        }
    }

    #[test]
    fn test_implicit_id_injected_first() {
        let mut model = SchemaModel::new("users");
        model
            .add_ideal_column(ColumnSpec::new("email", ColumnType::String))
            .unwrap();

        let plan = reconcile(
            &model,
            &LiveSchema::default(),
            Dialect::Sqlite,
            &ApplyOptions::default(),
        );

        match &plan.steps[0] {
            SchemaOp::CreateTable { sql, .. } => {
                assert!(sql.starts_with("CREATE TABLE \"users\" (\"id\" INTEGER PRIMARY KEY"));
            }
            other => panic!("Expected CreateTable, got {other:?}"),
        }
    }

    #[test]
    fn test_no_primary_key_concept_injects_nothing() {
        let mut model = SchemaModel::new("events").without_primary_key();
        model
            .add_ideal_column(ColumnSpec::new("payload", ColumnType::Text))
            .unwrap();

        let plan = reconcile(
            &model,
            &LiveSchema::default(),
            Dialect::Sqlite,
            &ApplyOptions::default(),
        );

        match &plan.steps[0] {
            SchemaOp::CreateTable { sql, .. } => {
                assert!(!sql.contains("PRIMARY KEY"));
                assert!(!sql.contains("\"id\""));
            }
            other => panic!("Expected CreateTable, got {other:?}"),
        }
    }

    #[test]
    fn test_idempotent_when_live_matches() {
        let model = users_model();
        let live = matching_live(&model, Dialect::Sqlite);
        let plan = reconcile(&model, &live, Dialect::Sqlite, &ApplyOptions::default());
        assert!(plan.is_empty(), "expected empty plan, got {:?}", plan.steps);
    }

    #[test]
    fn test_drop_obsolete_column() {
        let model = users_model();
        let mut live = matching_live(&model, Dialect::Sqlite);
        live.columns.insert(
            "legacy_flag".to_string(),
            live_column("BOOLEAN", Some(ColumnType::Boolean)),
        );

        let plan = reconcile(&model, &live, Dialect::Sqlite, &ApplyOptions::default());
        assert_eq!(plan.len(), 1);
        assert_eq!(
            plan.steps[0],
            SchemaOp::DropColumn {
                table: "users".to_string(),
                column: "legacy_flag".to_string(),
            }
        );
    }

    #[test]
    fn test_gentle_mode_suppresses_removal() {
        let model = users_model();
        let mut live = matching_live(&model, Dialect::Sqlite);
        live.columns.insert(
            "legacy_flag".to_string(),
            live_column("BOOLEAN", Some(ColumnType::Boolean)),
        );
        live.index_names.push("index_users_on_legacy_flag".to_string());

        let options = ApplyOptions::default().gentle(true);
        let plan = reconcile(&model, &live, Dialect::Sqlite, &options);
        assert!(plan.is_empty(), "expected empty plan, got {:?}", plan.steps);
    }

    #[test]
    fn test_add_missing_column() {
        let mut model = users_model();
        model
            .add_ideal_column(ColumnSpec::new("name", ColumnType::String))
            .unwrap();
        let mut live = matching_live(&model, Dialect::Sqlite);
        live.columns.shift_remove("name");

        let plan = reconcile(&model, &live, Dialect::Sqlite, &ApplyOptions::default());
        assert_eq!(plan.len(), 1);
        match &plan.steps[0] {
            SchemaOp::AddColumn { column, .. } => assert_eq!(column.name, "name"),
            other => panic!("Expected AddColumn, got {other:?}"),
        }
    }

    #[test]
    fn test_option_diff_precision() {
        // Live: {type string, limit 100, null true}; ideal: {string, limit 255}.
        // Exactly one change op for limit; null was left unspecified and must
        // not be touched.
        let mut model = SchemaModel::new("users");
        model
            .add_ideal_column(ColumnSpec::new("id", ColumnType::PrimaryKey))
            .unwrap();
        model
            .add_ideal_column(ColumnSpec::new("email", ColumnType::String).limit(255))
            .unwrap();

        let mut live = matching_live(&model, Dialect::Sqlite);
        live.columns.insert(
            "email".to_string(),
            LiveColumn {
                type_tag: Some(ColumnType::String),
                sql_type: "VARCHAR(100)".to_string(),
                null: true,
                limit: Some(100),
                ..LiveColumn::default()
            },
        );

        let plan = reconcile(&model, &live, Dialect::Sqlite, &ApplyOptions::default());
        assert_eq!(plan.len(), 1);
        match &plan.steps[0] {
            SchemaOp::ChangeColumn {
                column, changes, ..
            } => {
                assert_eq!(column, "email");
                assert_eq!(changes.limit, Some(255));
                assert_eq!(changes.null, None);
            }
            other => panic!("Expected ChangeColumn, got {other:?}"),
        }
    }

    #[test]
    fn test_type_change_detected() {
        let model = users_model();
        let mut live = matching_live(&model, Dialect::Sqlite);
        live.columns.insert(
            "email".to_string(),
            LiveColumn {
                type_tag: Some(ColumnType::Text),
                sql_type: "TEXT".to_string(),
                null: false,
                ..LiveColumn::default()
            },
        );

        let plan = reconcile(&model, &live, Dialect::Sqlite, &ApplyOptions::default());
        assert_eq!(plan.len(), 1);
        match &plan.steps[0] {
            SchemaOp::ChangeColumn { column_type, .. } => {
                assert_eq!(*column_type, ColumnType::String);
            }
            other => panic!("Expected ChangeColumn, got {other:?}"),
        }
    }

    #[test]
    fn test_sql_type_string_match_suppresses_type_change() {
        // Live metadata without a semantic tag still matches when the
        // declared type equals the ideal type's native rendering.
        let model = users_model();
        let mut live = matching_live(&model, Dialect::Sqlite);
        live.columns.insert(
            "email".to_string(),
            LiveColumn {
                type_tag: None,
                sql_type: "varchar(255)".to_string(),
                null: false,
                ..LiveColumn::default()
            },
        );

        let plan = reconcile(&model, &live, Dialect::Sqlite, &ApplyOptions::default());
        assert!(plan.is_empty(), "expected empty plan, got {:?}", plan.steps);
    }

    #[test]
    fn test_primary_key_column_exempt_from_change() {
        let model = users_model();
        let mut live = matching_live(&model, Dialect::Sqlite);
        // Live identity column reads back as a plain integer; that drift is
        // authoritative and must not produce a change op.
        live.columns.insert(
            "id".to_string(),
            LiveColumn {
                type_tag: Some(ColumnType::Integer),
                sql_type: "INTEGER".to_string(),
                null: false,
                ..LiveColumn::default()
            },
        );

        let plan = reconcile(&model, &live, Dialect::Sqlite, &ApplyOptions::default());
        assert!(plan.is_empty(), "expected empty plan, got {:?}", plan.steps);
    }

    #[test]
    fn test_index_lifecycle() {
        let mut model = users_model();
        model.add_ideal_index(IndexSpec::on(["email"]).unique());
        let mut live = matching_live(&model, Dialect::Sqlite);
        live.index_names = vec!["index_users_on_stale".to_string()];

        let plan = reconcile(&model, &live, Dialect::Sqlite, &ApplyOptions::default());
        assert_eq!(plan.len(), 2);
        assert_eq!(
            plan.steps[0],
            SchemaOp::DropIndex {
                table: "users".to_string(),
                index: "index_users_on_stale".to_string(),
            }
        );
        match &plan.steps[1] {
            SchemaOp::AddIndex { index, .. } => {
                assert_eq!(index.name.as_deref(), Some("index_users_on_email"));
                assert!(index.unique);
            }
            other => panic!("Expected AddIndex, got {other:?}"),
        }
    }

    #[test]
    fn test_non_standard_primary_key_sqlite() {
        let mut model = SchemaModel::new("users").with_primary_key("uuid");
        model
            .add_ideal_column(ColumnSpec::new("uuid", ColumnType::String))
            .unwrap();

        let plan = reconcile(
            &model,
            &LiveSchema::default(),
            Dialect::Sqlite,
            &ApplyOptions::default(),
        );

        assert_eq!(plan.len(), 2);
        match &plan.steps[0] {
            SchemaOp::CreateTable { sql, .. } => {
                // No inline key; NOT NULL forced on the key column.
                assert!(!sql.contains("PRIMARY KEY"));
                assert!(sql.contains("\"uuid\" VARCHAR(255) NOT NULL"));
            }
            other => panic!("Expected CreateTable, got {other:?}"),
        }
        match &plan.steps[1] {
            SchemaOp::AddIndex { index, .. } => {
                assert_eq!(index.name.as_deref(), Some("index_users_on_uuid"));
                assert!(index.unique);
            }
            other => panic!("Expected AddIndex, got {other:?}"),
        }
    }

    #[test]
    fn test_sqlite_primary_key_index_never_dropped() {
        let mut model = SchemaModel::new("users").with_primary_key("uuid");
        model
            .add_ideal_column(ColumnSpec::new("uuid", ColumnType::String).not_null())
            .unwrap();

        let mut live = matching_live(&model, Dialect::Sqlite);
        live.index_names.push("index_users_on_uuid".to_string());

        let plan = reconcile(&model, &live, Dialect::Sqlite, &ApplyOptions::default());
        assert!(plan.is_empty(), "expected empty plan, got {:?}", plan.steps);
    }

    #[test]
    fn test_non_standard_primary_key_postgres() {
        let mut model = SchemaModel::new("users").with_primary_key("uuid");
        model
            .add_ideal_column(ColumnSpec::new("uuid", ColumnType::String))
            .unwrap();

        let plan = reconcile(
            &model,
            &LiveSchema::default(),
            Dialect::Postgres,
            &ApplyOptions::default(),
        );

        assert_eq!(plan.len(), 2);
        match &plan.steps[1] {
            SchemaOp::AddPrimaryKey { column, sql, .. } => {
                assert_eq!(column, "uuid");
                assert_eq!(sql, "ALTER TABLE \"users\" ADD PRIMARY KEY (\"uuid\")");
            }
            other => panic!("Expected AddPrimaryKey, got {other:?}"),
        }
    }

    #[test]
    fn test_non_standard_primary_key_mysql_inline() {
        let mut model = SchemaModel::new("users").with_primary_key("uuid");
        model
            .add_ideal_column(ColumnSpec::new("uuid", ColumnType::String))
            .unwrap();

        let plan = reconcile(
            &model,
            &LiveSchema::default(),
            Dialect::Mysql,
            &ApplyOptions::default(),
        );

        assert_eq!(plan.len(), 1);
        match &plan.steps[0] {
            SchemaOp::CreateTable { sql, .. } => {
                assert!(sql.contains("`uuid` VARCHAR(255) PRIMARY KEY"));
                assert!(sql.ends_with("ENGINE=InnoDB"));
            }
            other => panic!("Expected CreateTable, got {other:?}"),
        }
    }

    #[test]
    fn test_undeclared_non_standard_key_synthesized_as_string() {
        let model = SchemaModel::new("users").with_primary_key("token");

        let plan = reconcile(
            &model,
            &LiveSchema::default(),
            Dialect::Postgres,
            &ApplyOptions::default(),
        );

        match &plan.steps[0] {
            SchemaOp::CreateTable { sql, .. } => {
                assert!(sql.contains("\"token\" VARCHAR(255) NOT NULL"));
            }
            other => panic!("Expected CreateTable, got {other:?}"),
        }
    }

    #[test]
    fn test_generic_dialect_skips_primary_key_fixups() {
        let mut model = SchemaModel::new("users").with_primary_key("uuid");
        model
            .add_ideal_column(ColumnSpec::new("uuid", ColumnType::String))
            .unwrap();

        let plan = reconcile(
            &model,
            &LiveSchema::default(),
            Dialect::Generic,
            &ApplyOptions::default(),
        );

        assert_eq!(plan.len(), 1);
        match &plan.steps[0] {
            SchemaOp::CreateTable { sql, .. } => assert!(!sql.contains("PRIMARY KEY")),
            other => panic!("Expected CreateTable, got {other:?}"),
        }
    }

    #[test]
    fn test_caller_create_table_options_override() {
        let model = users_model();
        let options =
            ApplyOptions::default().create_table_options("ENGINE=MyISAM DEFAULT CHARSET=utf8");

        let plan = reconcile(&model, &LiveSchema::default(), Dialect::Mysql, &options);
        match &plan.steps[0] {
            SchemaOp::CreateTable { sql, .. } => {
                assert!(sql.ends_with("ENGINE=MyISAM DEFAULT CHARSET=utf8"));
            }
            other => panic!("Expected CreateTable, got {other:?}"),
        }
    }

    #[test]
    fn test_absent_table_plans_indexes_but_no_deltas() {
        let mut model = users_model();
        model.add_ideal_index(IndexSpec::on(["email"]));

        let plan = reconcile(
            &model,
            &LiveSchema::default(),
            Dialect::Sqlite,
            &ApplyOptions::default(),
        );

        assert_eq!(plan.len(), 2);
        assert!(matches!(plan.steps[0], SchemaOp::CreateTable { .. }));
        assert!(matches!(plan.steps[1], SchemaOp::AddIndex { .. }));
    }
}
