use std::collections::HashSet;

use anyhow::{Context, Result};
use chrono::Utc;
use rusqlite::Connection;

struct Migration {
    version: &'static str,
    name: &'static str,
    sql: &'static str,
}

const MIGRATIONS: &[Migration] = &[
    Migration {
        version: "001",
        name: "initial",
        sql: include_str!("migrations/001_initial.sql"),
    },
];

/// Applies every migration not yet recorded in `schema_migrations`.
///
/// Each migration and its bookkeeping row commit together. Returns how many
/// were applied.
pub fn run_migrations(conn: &Connection) -> Result<usize> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_migrations (
            version TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            applied_at TEXT NOT NULL
        )",
    )
    .context("Failed to create schema_migrations table")?;

    let applied: HashSet<String> = get_applied_migrations(conn)?.into_iter().collect();
    let pending: Vec<&Migration> = MIGRATIONS
        .iter()
        .filter(|m| !applied.contains(m.version))
        .collect();

    for migration in &pending {
        apply_migration(conn, migration)?;
    }

    if pending.is_empty() {
        tracing::debug!("Document schema is up to date");
    }
    Ok(pending.len())
}

fn get_applied_migrations(conn: &Connection) -> Result<Vec<String>> {
    let mut stmt = conn.prepare("SELECT version FROM schema_migrations ORDER BY version")?;
    let versions = stmt
        .query_map([], |row| row.get(0))?
        .collect::<Result<Vec<String>, _>>()?;
    Ok(versions)
}

fn apply_migration(conn: &Connection, migration: &Migration) -> Result<()> {
    tracing::info!(
        "Applying migration {}: {}",
        migration.version,
        migration.name
    );

    let tx = conn.unchecked_transaction()?;
    tx.execute_batch(migration.sql).with_context(|| {
        format!(
            "Failed to apply migration {}: {}",
            migration.version, migration.name
        )
    })?;
    tx.execute(
        "INSERT INTO schema_migrations (version, name, applied_at) VALUES (?, ?, ?)",
        (migration.version, migration.name, Utc::now().to_rfc3339()),
    )?;
    tx.commit()?;
    Ok(())
}
