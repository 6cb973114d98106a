//! SQLite connection setup, schema migration and health checks.

use serde::Serialize;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::{Executor, Row, Sqlite, SqlitePool};
use tracing::{debug, instrument};

use crate::config::{DatabaseLocation, StoreConfig};
use crate::errors::{LedgerResult, sqlx_err};
use crate::legacy;

/// Quantities (`current_quantity`, `reorder_threshold`, `amount`) are INTEGER
/// thousandths of a unit. `unit_cost` is a price and stays REAL.
const SCHEMA: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS materials (
        id                INTEGER PRIMARY KEY AUTOINCREMENT,
        code              TEXT    NOT NULL UNIQUE,
        name              TEXT    NOT NULL,
        description       TEXT    NOT NULL DEFAULT '',
        category          TEXT    NOT NULL DEFAULT '',
        unit              TEXT    NOT NULL DEFAULT '',
        location          TEXT    NOT NULL DEFAULT '',
        notes             TEXT    NOT NULL DEFAULT '',
        current_quantity  INTEGER NOT NULL DEFAULT 0 CHECK (current_quantity >= 0),
        reorder_threshold INTEGER NOT NULL DEFAULT 0 CHECK (reorder_threshold >= 0),
        unit_cost         REAL    NOT NULL DEFAULT 0 CHECK (unit_cost >= 0),
        registered_at     TEXT    NOT NULL,
        image_path        TEXT,
        archived_at       TEXT
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS movements (
        id           INTEGER PRIMARY KEY AUTOINCREMENT,
        material_id  INTEGER NOT NULL REFERENCES materials(id),
        kind         TEXT    NOT NULL CHECK (kind IN ('ENTRY', 'EXIT', 'LOAN', 'RETURN', 'DEPLOY')),
        amount       INTEGER NOT NULL CHECK (amount > 0),
        occurred_at  TEXT    NOT NULL,
        actor        TEXT    NOT NULL DEFAULT '',
        counterparty TEXT    NOT NULL DEFAULT '',
        notes        TEXT    NOT NULL DEFAULT ''
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS loans (
        id               INTEGER PRIMARY KEY AUTOINCREMENT,
        material_id      INTEGER NOT NULL REFERENCES materials(id),
        amount           INTEGER NOT NULL CHECK (amount > 0),
        loaned_at        TEXT    NOT NULL,
        returned_at      TEXT,
        borrower         TEXT    NOT NULL,
        destination_area TEXT    NOT NULL DEFAULT '',
        status           TEXT    NOT NULL DEFAULT 'OPEN' CHECK (status IN ('OPEN', 'RETURNED')),
        notes            TEXT    NOT NULL DEFAULT ''
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS deployments (
        id           INTEGER PRIMARY KEY AUTOINCREMENT,
        material_id  INTEGER NOT NULL REFERENCES materials(id),
        amount       INTEGER NOT NULL CHECK (amount > 0),
        installed_at TEXT    NOT NULL,
        equipment    TEXT    NOT NULL,
        responsible  TEXT    NOT NULL DEFAULT '',
        notes        TEXT    NOT NULL DEFAULT ''
    )
    "#,
];

const INDEXES: &[&str] = &[
    "CREATE INDEX IF NOT EXISTS idx_materials_name ON materials(name)",
    "CREATE INDEX IF NOT EXISTS idx_movements_material ON movements(material_id, occurred_at)",
    "CREATE INDEX IF NOT EXISTS idx_movements_occurred_at ON movements(occurred_at)",
    "CREATE INDEX IF NOT EXISTS idx_loans_status ON loans(status, loaned_at)",
    "CREATE INDEX IF NOT EXISTS idx_loans_material ON loans(material_id)",
    "CREATE INDEX IF NOT EXISTS idx_deployments_installed_at ON deployments(installed_at)",
];

/// Open a pool over the configured database: WAL journal, foreign keys on, writers
/// waiting up to `busy_timeout` for the lock.
#[instrument(skip(config), fields(location = ?config.location, max_connections = config.max_connections))]
pub async fn connect(config: &StoreConfig) -> LedgerResult<SqlitePool> {
    let options = SqliteConnectOptions::new()
        .journal_mode(SqliteJournalMode::Wal)
        .synchronous(SqliteSynchronous::Normal)
        .busy_timeout(config.busy_timeout)
        .foreign_keys(true);

    let (options, pool_options) = match &config.location {
        DatabaseLocation::File(path) => (
            options.filename(path).create_if_missing(true),
            SqlitePoolOptions::new().max_connections(config.max_connections.max(1)),
        ),
        // Every connection to ":memory:" is its own database, so the pool keeps exactly
        // one connection alive forever.
        DatabaseLocation::InMemory => (
            options.filename(":memory:"),
            SqlitePoolOptions::new()
                .max_connections(1)
                .min_connections(1)
                .idle_timeout(None)
                .max_lifetime(None),
        ),
    };

    let pool = pool_options
        .connect_with(options)
        .await
        .map_err(sqlx_err("connect"))?;

    debug!("sqlite pool ready");
    Ok(pool)
}

/// Create missing tables and indexes, then import a legacy inventory file if one is
/// found. Safe to run on every start.
#[instrument(skip(pool))]
pub async fn migrate(pool: &SqlitePool) -> LedgerResult<()> {
    for statement in SCHEMA {
        sqlx::query(statement)
            .execute(pool)
            .await
            .map_err(sqlx_err("migrate"))?;
    }

    for statement in INDEXES {
        sqlx::query(statement)
            .execute(pool)
            .await
            .map_err(sqlx_err("migrate"))?;
    }

    legacy::import(pool).await?;
    Ok(())
}

pub(crate) async fn has_column<'e, E>(executor: E, table: &str, column: &str) -> LedgerResult<bool>
where
    E: Executor<'e, Database = Sqlite>,
{
    let rows = sqlx::query(&format!("PRAGMA table_info({table})"))
        .fetch_all(executor)
        .await
        .map_err(sqlx_err("migrate"))?;

    for row in rows {
        let name: String = row.try_get("name").map_err(sqlx_err("migrate"))?;
        if name == column {
            return Ok(true);
        }
    }
    Ok(false)
}

/// Result of a lightweight database diagnosis.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HealthReport {
    pub journal_mode: String,
    /// First line of `PRAGMA quick_check`; `"ok"` when the file is sound.
    pub integrity: String,
    /// Integrity is `"ok"` and the journal is WAL. In-memory stores report
    /// `"memory"` and count as healthy.
    pub healthy: bool,
}

#[instrument(skip(pool))]
pub async fn health(pool: &SqlitePool) -> LedgerResult<HealthReport> {
    let journal_mode: String = sqlx::query_scalar("PRAGMA journal_mode")
        .fetch_one(pool)
        .await
        .map_err(sqlx_err("health"))?;
    let integrity: String = sqlx::query_scalar("PRAGMA quick_check")
        .fetch_one(pool)
        .await
        .map_err(sqlx_err("health"))?;

    let journal_mode = journal_mode.to_lowercase();
    let healthy = integrity == "ok" && matches!(journal_mode.as_str(), "wal" | "memory");
    Ok(HealthReport {
        journal_mode,
        integrity,
        healthy,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn migrate_is_idempotent() {
        let pool = connect(&StoreConfig::in_memory()).await.unwrap();
        migrate(&pool).await.unwrap();
        migrate(&pool).await.unwrap();

        assert!(has_column(&pool, "materials", "image_path").await.unwrap());
        assert!(has_column(&pool, "movements", "kind").await.unwrap());
    }

    #[tokio::test]
    async fn current_schema_declares_every_material_column() {
        let pool = connect(&StoreConfig::in_memory()).await.unwrap();
        sqlx::query(SCHEMA[0]).execute(&pool).await.unwrap();

        assert!(has_column(&pool, "materials", "image_path").await.unwrap());
        assert!(has_column(&pool, "materials", "archived_at").await.unwrap());
    }

    #[tokio::test]
    async fn file_database_runs_in_wal_mode() {
        let dir = tempfile::tempdir().unwrap();
        let pool = connect(&StoreConfig::file(dir.path().join("stock.db"))).await.unwrap();
        migrate(&pool).await.unwrap();

        let report = health(&pool).await.unwrap();
        assert_eq!(report.journal_mode, "wal");
        assert!(report.healthy);
    }

    #[tokio::test]
    async fn rollback_journal_is_reported_unhealthy() {
        let dir = tempfile::tempdir().unwrap();
        // One connection, so leaving WAL is not blocked by a sibling.
        let config = StoreConfig::file(dir.path().join("stock.db")).with_max_connections(1);
        let pool = connect(&config).await.unwrap();
        migrate(&pool).await.unwrap();
        let mode: String = sqlx::query_scalar("PRAGMA journal_mode = DELETE")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(mode.to_lowercase(), "delete");

        let report = health(&pool).await.unwrap();
        assert_eq!(report.integrity, "ok");
        assert!(!report.healthy);
    }

    #[tokio::test]
    async fn in_memory_store_is_healthy() {
        let pool = connect(&StoreConfig::in_memory()).await.unwrap();
        migrate(&pool).await.unwrap();

        let report = health(&pool).await.unwrap();
        assert_eq!(report.journal_mode, "memory");
        assert!(report.healthy);
    }
}
