//! Import of inventory files written by the desktop application.
//!
//! That application kept its data in the same `inventario_ptar.db` file under Spanish
//! table names (`materiales`, `movimientos`, `prestamos`, `material_en_uso`), with REAL
//! quantities and local `YYYY-MM-DD HH:MM:SS` timestamps. Its later releases added
//! `materiales.imagen_ruta` with `ALTER TABLE`; files from before that lack the column.
//!
//! On start, when `materiales` exists and `materials` is still empty, every legacy row
//! is copied over in one transaction:
//!
//! - ids are kept, so foreign keys carry over unchanged
//! - quantities are rounded to thousandths
//! - timestamps are read as UTC and rewritten as RFC 3339
//! - movement kinds and loan states are translated; rows with unknown kinds or
//!   non-positive amounts are skipped
//! - where the cached quantity disagrees with the imported movements, an opening
//!   balance movement closes the gap so the ledger replays to the cached quantity
//!
//! The legacy tables are left in place.

use sqlx::{Sqlite, SqlitePool, Transaction};
use tracing::{info, instrument, warn};

use crate::db::has_column;
use crate::errors::{LedgerResult, sqlx_err};
use crate::ledger::OPENING_BALANCE;

const OP: &str = "legacy_import";

/// Rewrite a legacy timestamp column as RFC 3339 UTC, falling back to the import time.
fn timestamp(column: &str) -> String {
    format!(
        "COALESCE(strftime('%Y-%m-%dT%H:%M:%S', {column}) || '+00:00', \
         strftime('%Y-%m-%dT%H:%M:%S', 'now') || '+00:00')"
    )
}

/// Legacy REAL quantity as INTEGER thousandths.
fn milli(column: &str) -> String {
    format!("CAST(ROUND(COALESCE({column}, 0) * 1000) AS INTEGER)")
}

/// Rows copied by one import.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct LegacyImport {
    pub materials: u64,
    pub movements: u64,
    pub loans: u64,
    pub deployments: u64,
    /// Opening balance movements added to reconcile cached quantities.
    pub adjustments: u64,
}

/// Import a legacy inventory found in the same file. `None` when there is nothing to do.
#[instrument(skip(pool))]
pub(crate) async fn import(pool: &SqlitePool) -> LedgerResult<Option<LegacyImport>> {
    let mut tx = pool.begin().await.map_err(sqlx_err(OP))?;

    let legacy: Option<String> =
        sqlx::query_scalar("SELECT name FROM sqlite_master WHERE type = 'table' AND name = 'materiales'")
            .fetch_optional(&mut *tx)
            .await
            .map_err(sqlx_err(OP))?;
    if legacy.is_none() {
        return Ok(None);
    }

    let existing: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM materials")
        .fetch_one(&mut *tx)
        .await
        .map_err(sqlx_err(OP))?;
    if existing > 0 {
        return Ok(None);
    }

    if !has_column(&mut *tx, "materiales", "imagen_ruta").await? {
        sqlx::query("ALTER TABLE materiales ADD COLUMN imagen_ruta TEXT")
            .execute(&mut *tx)
            .await
            .map_err(sqlx_err(OP))?;
        info!("added materiales.imagen_ruta");
    }

    let report = LegacyImport {
        materials: copy_materials(&mut tx).await?,
        movements: copy_movements(&mut tx).await?,
        loans: copy_loans(&mut tx).await?,
        deployments: copy_deployments(&mut tx).await?,
        adjustments: reconcile(&mut tx).await?,
    };

    let legacy_movements: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM movimientos")
        .fetch_one(&mut *tx)
        .await
        .map_err(sqlx_err(OP))?;
    let skipped = u64::try_from(legacy_movements).unwrap_or_default().saturating_sub(report.movements);
    if skipped > 0 {
        warn!(skipped, "legacy movements with unknown kind, amount or material were not imported");
    }

    tx.commit().await.map_err(sqlx_err(OP))?;

    info!(
        materials = report.materials,
        movements = report.movements,
        loans = report.loans,
        deployments = report.deployments,
        adjustments = report.adjustments,
        "legacy inventory imported"
    );
    Ok(Some(report))
}

async fn copy_materials(tx: &mut Transaction<'_, Sqlite>) -> LedgerResult<u64> {
    let sql = format!(
        r#"
        INSERT INTO materials (
            id, code, name, description, category, unit, location, notes,
            current_quantity, reorder_threshold, unit_cost, registered_at, image_path
        )
        SELECT
            id,
            COALESCE(NULLIF(TRIM(codigo), ''), printf('IMP-%03d', id)),
            COALESCE(nombre, ''),
            COALESCE(descripcion, ''),
            COALESCE(categoria, ''),
            COALESCE(unidad, ''),
            COALESCE(ubicacion, ''),
            COALESCE(notas, ''),
            MAX({quantity}, 0),
            MAX({threshold}, 0),
            MAX(COALESCE(costo_unitario, 0), 0),
            {registered},
            NULLIF(imagen_ruta, '')
        FROM materiales
        ORDER BY id
        "#,
        quantity = milli("cantidad_actual"),
        threshold = milli("stock_minimo"),
        registered = timestamp("fecha_registro"),
    );

    let result = sqlx::query(&sql).execute(&mut **tx).await.map_err(sqlx_err(OP))?;
    Ok(result.rows_affected())
}

async fn copy_movements(tx: &mut Transaction<'_, Sqlite>) -> LedgerResult<u64> {
    let sql = format!(
        r#"
        INSERT INTO movements (id, material_id, kind, amount, occurred_at, actor, counterparty, notes)
        SELECT id, material_id, kind, amount, occurred_at, actor, counterparty, notes
        FROM (
            SELECT
                id,
                material_id,
                CASE TRIM(tipo_movimiento)
                    WHEN 'ENTRADA' THEN 'ENTRY'
                    WHEN 'SALIDA' THEN 'EXIT'
                    WHEN 'PRÉSTAMO' THEN 'LOAN'
                    WHEN 'PRESTAMO' THEN 'LOAN'
                    WHEN 'DEVOLUCIÓN' THEN 'RETURN'
                    WHEN 'DEVOLUCION' THEN 'RETURN'
                    WHEN 'EN USO' THEN 'DEPLOY'
                END AS kind,
                {amount} AS amount,
                {occurred} AS occurred_at,
                COALESCE(responsable, '') AS actor,
                COALESCE(destino_origen, '') AS counterparty,
                COALESCE(observaciones, '') AS notes
            FROM movimientos
        )
        WHERE kind IS NOT NULL
          AND amount > 0
          AND material_id IN (SELECT id FROM materials)
        ORDER BY id
        "#,
        amount = milli("cantidad"),
        occurred = timestamp("fecha"),
    );

    let result = sqlx::query(&sql).execute(&mut **tx).await.map_err(sqlx_err(OP))?;
    Ok(result.rows_affected())
}

async fn copy_loans(tx: &mut Transaction<'_, Sqlite>) -> LedgerResult<u64> {
    let sql = format!(
        r#"
        INSERT INTO loans (
            id, material_id, amount, loaned_at, returned_at, borrower, destination_area, status, notes
        )
        SELECT
            id,
            material_id,
            {amount},
            {loaned},
            CASE WHEN TRIM(estado) = 'DEVUELTO' THEN {returned} END,
            COALESCE(prestado_a, ''),
            COALESCE(area_destino, ''),
            CASE WHEN TRIM(estado) = 'DEVUELTO' THEN 'RETURNED' ELSE 'OPEN' END,
            COALESCE(observaciones, '')
        FROM prestamos
        WHERE {amount} > 0
          AND material_id IN (SELECT id FROM materials)
        ORDER BY id
        "#,
        amount = milli("cantidad"),
        loaned = timestamp("fecha_prestamo"),
        returned = timestamp("fecha_devolucion"),
    );

    let result = sqlx::query(&sql).execute(&mut **tx).await.map_err(sqlx_err(OP))?;
    Ok(result.rows_affected())
}

async fn copy_deployments(tx: &mut Transaction<'_, Sqlite>) -> LedgerResult<u64> {
    let sql = format!(
        r#"
        INSERT INTO deployments (id, material_id, amount, installed_at, equipment, responsible, notes)
        SELECT
            id,
            material_id,
            {amount},
            {installed},
            COALESCE(equipo_instalacion, ''),
            COALESCE(responsable, ''),
            COALESCE(observaciones, '')
        FROM material_en_uso
        WHERE {amount} > 0
          AND material_id IN (SELECT id FROM materials)
        ORDER BY id
        "#,
        amount = milli("cantidad"),
        installed = timestamp("fecha_instalacion"),
    );

    let result = sqlx::query(&sql).execute(&mut **tx).await.map_err(sqlx_err(OP))?;
    Ok(result.rows_affected())
}

/// Add one opening balance movement per material whose cached quantity is not what
/// its imported movements replay to.
async fn reconcile(tx: &mut Transaction<'_, Sqlite>) -> LedgerResult<u64> {
    let result = sqlx::query(
        r#"
        INSERT INTO movements (material_id, kind, amount, occurred_at, actor, counterparty, notes)
        SELECT id, CASE WHEN gap > 0 THEN 'ENTRY' ELSE 'EXIT' END, ABS(gap), registered_at, '', ?, ''
        FROM (
            SELECT
                m.id,
                m.registered_at,
                m.current_quantity - COALESCE((
                    SELECT SUM(CASE WHEN mv.kind IN ('ENTRY', 'RETURN') THEN mv.amount ELSE -mv.amount END)
                    FROM movements mv
                    WHERE mv.material_id = m.id
                ), 0) AS gap
            FROM materials m
        )
        WHERE gap <> 0
        ORDER BY id
        "#,
    )
    .bind(OPENING_BALANCE)
    .execute(&mut **tx)
    .await
    .map_err(sqlx_err(OP))?;

    Ok(result.rows_affected())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StoreConfig;
    use crate::db::{connect, migrate};
    use crate::rows;
    use ptar_core::{MaterialId, Quantity};
    use ptar_inventory::{LoanStatus, MovementKind, StockStatus, ledger_balance};

    /// Tables as the desktop application created them before `imagen_ruta` existed.
    const DESKTOP_SCHEMA: &[&str] = &[
        "CREATE TABLE materiales (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            codigo TEXT UNIQUE,
            nombre TEXT NOT NULL,
            descripcion TEXT,
            categoria TEXT,
            unidad TEXT,
            cantidad_actual REAL DEFAULT 0,
            stock_minimo REAL DEFAULT 0,
            ubicacion TEXT,
            costo_unitario REAL DEFAULT 0,
            fecha_registro TEXT,
            notas TEXT
        )",
        "CREATE TABLE movimientos (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            material_id INTEGER,
            tipo_movimiento TEXT,
            cantidad REAL,
            fecha TEXT,
            responsable TEXT,
            destino_origen TEXT,
            observaciones TEXT,
            FOREIGN KEY (material_id) REFERENCES materiales (id)
        )",
        "CREATE TABLE prestamos (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            material_id INTEGER,
            cantidad REAL,
            fecha_prestamo TEXT,
            fecha_devolucion TEXT,
            prestado_a TEXT,
            area_destino TEXT,
            estado TEXT,
            observaciones TEXT,
            FOREIGN KEY (material_id) REFERENCES materiales (id)
        )",
        "CREATE TABLE material_en_uso (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            material_id INTEGER,
            cantidad REAL,
            equipo_instalacion TEXT,
            fecha_instalacion TEXT,
            responsable TEXT,
            observaciones TEXT,
            FOREIGN KEY (material_id) REFERENCES materiales (id)
        )",
    ];

    const DESKTOP_ROWS: &[&str] = &[
        "INSERT INTO materiales (id, codigo, nombre, categoria, unidad, cantidad_actual, stock_minimo, costo_unitario, fecha_registro)
         VALUES (1, 'FON-001', 'Válvula 2\"', 'Fontanería y Ferretería', 'pieza', 7.3, 5, 150.0, '2024-02-01 08:15:00')",
        "INSERT INTO materiales (id, codigo, nombre, cantidad_actual, stock_minimo, fecha_registro)
         VALUES (2, 'HER-001', 'Taladro', 1, 1, '2024-02-03 09:00:00')",
        "INSERT INTO materiales (id, codigo, nombre, cantidad_actual, fecha_registro)
         VALUES (3, NULL, 'Guantes', 0, 'sin fecha')",
        "INSERT INTO movimientos (material_id, tipo_movimiento, cantidad, fecha, responsable, destino_origen)
         VALUES (1, 'ENTRADA', 10.1, '2024-02-05 10:00:00', 'Ana', 'Compra')",
        "INSERT INTO movimientos (material_id, tipo_movimiento, cantidad, fecha, responsable, destino_origen)
         VALUES (1, 'SALIDA', 2.8, '2024-02-06 11:00:00', 'Ana', 'Taller')",
        "INSERT INTO movimientos (material_id, tipo_movimiento, cantidad, fecha, responsable, destino_origen)
         VALUES (2, 'PRÉSTAMO', 1, '2024-02-07 12:00:00', 'Juan', 'Bombeo')",
        "INSERT INTO movimientos (material_id, tipo_movimiento, cantidad, fecha, responsable, destino_origen)
         VALUES (2, 'DEVOLUCIÓN', 1, '2024-02-08 12:00:00', 'Juan', 'Bombeo')",
        "INSERT INTO movimientos (material_id, tipo_movimiento, cantidad, fecha, responsable, destino_origen)
         VALUES (2, 'PRÉSTAMO', 1, '2024-02-09 12:00:00', 'Luis', 'Lodos')",
        "INSERT INTO movimientos (material_id, tipo_movimiento, cantidad, fecha)
         VALUES (1, 'AJUSTE', 3, '2024-02-10 12:00:00')",
        "INSERT INTO prestamos (material_id, cantidad, fecha_prestamo, fecha_devolucion, prestado_a, area_destino, estado)
         VALUES (2, 1, '2024-02-07 12:00:00', '2024-02-08 12:00:00', 'Juan', 'Bombeo', 'DEVUELTO')",
        "INSERT INTO prestamos (material_id, cantidad, fecha_prestamo, prestado_a, area_destino, estado)
         VALUES (2, 1, '2024-02-09 12:00:00', 'Luis', 'Lodos', 'ACTIVO')",
        "INSERT INTO material_en_uso (material_id, cantidad, equipo_instalacion, fecha_instalacion, responsable)
         VALUES (1, 0.5, 'Bomba 3', '2024-02-11 07:30:00', 'Luis')",
    ];

    async fn desktop_file() -> (tempfile::TempDir, SqlitePool) {
        let dir = tempfile::tempdir().unwrap();
        let pool = connect(&StoreConfig::file(dir.path().join("inventario_ptar.db")))
            .await
            .unwrap();
        for statement in DESKTOP_SCHEMA.iter().chain(DESKTOP_ROWS) {
            sqlx::query(statement).execute(&pool).await.unwrap();
        }
        (dir, pool)
    }

    async fn quantity(pool: &SqlitePool, id: i64) -> Quantity {
        let milli: i64 = sqlx::query_scalar("SELECT current_quantity FROM materials WHERE id = ?")
            .bind(id)
            .fetch_one(pool)
            .await
            .unwrap();
        Quantity::from_milli(milli)
    }

    async fn ledger(pool: &SqlitePool, id: i64) -> Vec<ptar_inventory::Movement> {
        let rows = sqlx::query(
            "SELECT id, material_id, kind, amount, occurred_at, actor, counterparty, notes \
             FROM movements WHERE material_id = ? ORDER BY occurred_at, id",
        )
        .bind(id)
        .fetch_all(pool)
        .await
        .unwrap();
        rows::decode_all(&rows, rows::movement).unwrap()
    }

    #[tokio::test]
    async fn desktop_inventory_is_imported_on_migrate() {
        let (_dir, pool) = desktop_file().await;
        migrate(&pool).await.unwrap();

        assert!(has_column(&pool, "materiales", "imagen_ruta").await.unwrap());

        let valve = sqlx::query(&format!("SELECT {} FROM materials WHERE id = 1", rows::MATERIAL_COLUMNS))
            .fetch_one(&pool)
            .await
            .unwrap();
        let valve = rows::material(&valve).unwrap();
        assert_eq!(valve.code, "FON-001");
        assert_eq!(valve.current_quantity, Quantity::from_milli(7_300));
        assert_eq!(valve.reorder_threshold, Quantity::units(5));
        assert_eq!(valve.status(), StockStatus::Normal);
        assert_eq!(valve.registered_at.to_rfc3339(), "2024-02-01T08:15:00+00:00");
        assert_eq!(valve.image_path, None);

        let gloves_code: String = sqlx::query_scalar("SELECT code FROM materials WHERE id = 3")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(gloves_code, "IMP-003");

        let loans = sqlx::query(
            "SELECT id, material_id, amount, loaned_at, returned_at, borrower, destination_area, status, notes \
             FROM loans ORDER BY id",
        )
        .fetch_all(&pool)
        .await
        .unwrap();
        let loans = rows::decode_all(&loans, rows::loan).unwrap();
        assert_eq!(loans.len(), 2);
        assert_eq!(loans[0].status, LoanStatus::Returned);
        assert!(loans[0].returned_at.is_some());
        assert_eq!(loans[1].status, LoanStatus::Open);
        assert_eq!(loans[1].returned_at, None);
        assert_eq!(loans[1].material_id, MaterialId::new(2));

        let equipment: String = sqlx::query_scalar("SELECT equipment FROM deployments")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(equipment, "Bomba 3");
    }

    #[tokio::test]
    async fn imported_ledgers_replay_to_cached_quantities() {
        let (_dir, pool) = desktop_file().await;
        migrate(&pool).await.unwrap();

        for id in 1..=3 {
            assert_eq!(ledger_balance(&ledger(&pool, id).await), quantity(&pool, id).await);
        }

        // 10.1 in, 2.8 out replays to 7.3; only the unknown AJUSTE row is dropped.
        let valve = ledger(&pool, 1).await;
        let kinds: Vec<_> = valve.iter().map(|m| m.kind).collect();
        assert_eq!(kinds, [MovementKind::Entry, MovementKind::Exit]);

        // The drill starts with a loan, so its opening stock comes from an adjustment.
        let drill = ledger(&pool, 2).await;
        assert_eq!(drill[0].counterparty, OPENING_BALANCE);
        assert_eq!(drill[0].kind, MovementKind::Entry);
        assert_eq!(drill[0].amount, Quantity::units(2));
        assert_eq!(drill[0].occurred_at.to_rfc3339(), "2024-02-03T09:00:00+00:00");
    }

    #[tokio::test]
    async fn import_runs_once() {
        let (_dir, pool) = desktop_file().await;
        migrate(&pool).await.unwrap();
        let movements: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM movements")
            .fetch_one(&pool)
            .await
            .unwrap();

        migrate(&pool).await.unwrap();
        assert_eq!(import(&pool).await.unwrap(), None);
        let again: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM movements")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(again, movements);
    }

    #[tokio::test]
    async fn fresh_store_has_nothing_to_import() {
        let pool = connect(&StoreConfig::in_memory()).await.unwrap();
        migrate(&pool).await.unwrap();
        assert_eq!(import(&pool).await.unwrap(), None);
    }
}
