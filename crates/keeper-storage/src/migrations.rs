//! Database schema migrations.

use rusqlite::Connection;
use tracing::info;

use keeper_core::error::StoreError;

/// Run all pending database migrations.
pub fn run_migrations(conn: &Connection) -> Result<(), StoreError> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_migrations (
            version     INTEGER PRIMARY KEY NOT NULL,
            name        TEXT NOT NULL,
            applied_at  INTEGER NOT NULL DEFAULT (strftime('%s', 'now'))
        );",
    )
    .map_err(|e| StoreError::Database(format!("Failed to create migrations table: {}", e)))?;

    let current_version: i64 = conn
        .query_row(
            "SELECT COALESCE(MAX(version), 0) FROM schema_migrations",
            [],
            |row| row.get(0),
        )
        .map_err(|e| StoreError::Database(format!("Failed to query migration version: {}", e)))?;

    if current_version < 1 {
        apply_v1(conn)?;
        info!("Applied migration v1: delayed_actions");
    }

    Ok(())
}

/// Version 1: queue, execution history and candidate names.
fn apply_v1(conn: &Connection) -> Result<(), StoreError> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS delayed_actions (
            id              INTEGER PRIMARY KEY AUTOINCREMENT,
            announced_block INTEGER NOT NULL,
            controller      TEXT NOT NULL,
            principal       TEXT NOT NULL,
            targets         TEXT NOT NULL,
            action_hash     TEXT NOT NULL,
            created_at      INTEGER NOT NULL DEFAULT (strftime('%s', 'now')),
            UNIQUE (announced_block, controller)
        );

        CREATE INDEX IF NOT EXISTS idx_delayed_actions_order
            ON delayed_actions (announced_block ASC, id ASC);

        -- Balance is stored as TEXT: u128 does not fit an SQLite INTEGER.
        CREATE TABLE IF NOT EXISTS executions (
            id                   INTEGER PRIMARY KEY AUTOINCREMENT,
            controller           TEXT NOT NULL,
            era                  INTEGER NOT NULL,
            targets              TEXT NOT NULL,
            bonded               TEXT NOT NULL,
            finalized_block_hash TEXT,
            executed_at          INTEGER NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_executions_controller_era
            ON executions (controller, era DESC);

        CREATE TABLE IF NOT EXISTS candidates (
            address      TEXT PRIMARY KEY NOT NULL,
            display_name TEXT NOT NULL
        );

        INSERT INTO schema_migrations (version, name) VALUES (1, 'delayed_actions');
        ",
    )
    .map_err(|e| StoreError::Database(format!("Migration v1 failed: {}", e)))?;

    Ok(())
}
