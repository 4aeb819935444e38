//! Example: Converging a users table
//!
//! Declares an ideal schema, previews the plan with a dry run, applies it
//! for real, then drifts the table by hand and reconciles again.
//!
//! Run with: cargo run --example user_table -p autoschema-sqlite

use autoschema::prelude::*;
use autoschema_sqlite::SqliteSchemaConnection;
use sqlx::sqlite::SqlitePoolOptions;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect(":memory:")
        .await?;
    let reconciler = Reconciler::new(SqliteSchemaConnection::new(pool));

    let mut users = SchemaModel::new("users");
    users.add_ideal_column(ColumnSpec::new("id", ColumnType::PrimaryKey))?;
    users.add_ideal_column(
        ColumnSpec::new("email", ColumnType::String)
            .not_null()
            .limit(255),
    )?;
    users.add_ideal_column(ColumnSpec::new("display_name", ColumnType::String))?;
    users.add_ideal_column(
        ColumnSpec::new("is_admin", ColumnType::Boolean).default(DefaultValue::Bool(false)),
    )?;
    users.add_ideal_index(IndexSpec::on(["email"]).unique());

    // Preview before touching anything.
    let preview = reconciler
        .apply(&users, &ApplyOptions::new().dry_run(true))
        .await?;
    println!("Planned operations:");
    for message in &preview.messages {
        println!("  {message}");
    }

    // Converge for real.
    let report = reconciler.apply(&users, &ApplyOptions::new()).await?;
    println!("Applied {} operation(s)", report.plan.len());

    // A second run finds nothing to do.
    let report = reconciler.apply(&users, &ApplyOptions::new()).await?;
    println!("Second run planned {} operation(s)", report.plan.len());

    // Drift the table behind the reconciler's back, then converge again.
    reconciler
        .connection()
        .execute("ALTER TABLE \"users\" ADD COLUMN \"legacy_flag\" BOOLEAN")
        .await?;
    let report = reconciler.apply(&users, &ApplyOptions::new()).await?;
    for step in &report.plan.steps {
        println!("Reconciled drift: {}", step.description());
    }

    Ok(())
}
