//! Read-only views: statistics, movement history, low stock and report tables.

use std::sync::Arc;

use sqlx::SqlitePool;
use tracing::instrument;

use ptar_core::{Clock, MaterialId};
use ptar_inventory::report::{
    deployments_table, inventory_table, loans_table, low_stock_table, movements_table,
};
use ptar_inventory::stats::month_bounds;
use ptar_inventory::{
    CatalogTally, InventoryStatistics, Material, MaterialFilter, Movement, MovementKind,
    MovementRecord, ReportKind, Table,
};

use crate::catalog::fetch_materials;
use crate::errors::{LedgerResult, sqlx_err};
use crate::rows::{self, MATERIAL_COLUMNS, MOVEMENT_SELECT, decode_all};
use crate::trackers::{DeploymentTracker, LoanTracker};

/// Default page size of [`QueryService::movement_history`].
pub const DEFAULT_HISTORY_LIMIT: u32 = 100;

#[derive(Debug, Clone)]
pub struct QueryService {
    pool: SqlitePool,
    clock: Arc<dyn Clock>,
    loans: LoanTracker,
    deployments: DeploymentTracker,
}

impl QueryService {
    pub fn new(pool: SqlitePool, clock: Arc<dyn Clock>) -> Self {
        Self {
            loans: LoanTracker::new(pool.clone()),
            deployments: DeploymentTracker::new(pool.clone()),
            pool,
            clock,
        }
    }

    /// Dashboard counters, all read from one snapshot.
    #[instrument(skip(self))]
    pub async fn statistics(&self) -> LedgerResult<InventoryStatistics> {
        let (month_start, month_end) = month_bounds(self.clock.now());
        let mut tx = self.pool.begin().await.map_err(sqlx_err("statistics"))?;

        let rows = sqlx::query(&format!(
            "SELECT {MATERIAL_COLUMNS} FROM materials WHERE archived_at IS NULL"
        ))
        .fetch_all(&mut *tx)
        .await
        .map_err(sqlx_err("statistics"))?;
        let materials = decode_all(&rows, rows::material)?;
        let tally: CatalogTally = materials.iter().collect();

        let open_loans: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM loans WHERE status = 'OPEN'")
            .fetch_one(&mut *tx)
            .await
            .map_err(sqlx_err("statistics"))?;

        let deployments: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM deployments")
            .fetch_one(&mut *tx)
            .await
            .map_err(sqlx_err("statistics"))?;

        let movements_this_month: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM movements WHERE occurred_at >= ? AND occurred_at < ?",
        )
        .bind(month_start)
        .bind(month_end)
        .fetch_one(&mut *tx)
        .await
        .map_err(sqlx_err("statistics"))?;

        tx.commit().await.map_err(sqlx_err("statistics"))?;

        Ok(InventoryStatistics::from_parts(
            tally,
            open_loans,
            deployments,
            movements_this_month,
        ))
    }

    /// Latest movements first, optionally of one kind.
    #[instrument(skip(self))]
    pub async fn movement_history(
        &self,
        kind: Option<MovementKind>,
        limit: Option<u32>,
    ) -> LedgerResult<Vec<MovementRecord>> {
        let limit = i64::from(limit.unwrap_or(DEFAULT_HISTORY_LIMIT));

        let rows = match kind {
            Some(kind) => {
                sqlx::query(&format!(
                    "{MOVEMENT_SELECT} WHERE mv.kind = ? ORDER BY mv.occurred_at DESC, mv.id DESC LIMIT ?"
                ))
                .bind(kind.as_str())
                .bind(limit)
                .fetch_all(&self.pool)
                .await
            }
            None => {
                sqlx::query(&format!(
                    "{MOVEMENT_SELECT} ORDER BY mv.occurred_at DESC, mv.id DESC LIMIT ?"
                ))
                .bind(limit)
                .fetch_all(&self.pool)
                .await
            }
        }
        .map_err(sqlx_err("movement_history"))?;

        decode_all(&rows, rows::movement_record)
    }

    /// Full ledger of one material, oldest first. Archived materials keep theirs.
    #[instrument(skip(self))]
    pub async fn movements_for_material(&self, material_id: MaterialId) -> LedgerResult<Vec<Movement>> {
        let rows = sqlx::query(
            "SELECT id, material_id, kind, amount, occurred_at, actor, counterparty, notes \
             FROM movements WHERE material_id = ? ORDER BY id",
        )
        .bind(material_id.get())
        .fetch_all(&self.pool)
        .await
        .map_err(sqlx_err("movements_for_material"))?;

        decode_all(&rows, rows::movement)
    }

    /// Materials at or below their reorder threshold, emptiest first.
    #[instrument(skip(self))]
    pub async fn low_stock(&self) -> LedgerResult<Vec<Material>> {
        let rows = sqlx::query(&format!(
            "SELECT {MATERIAL_COLUMNS} FROM materials \
             WHERE archived_at IS NULL AND current_quantity <= reorder_threshold \
             ORDER BY current_quantity ASC, name"
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(sqlx_err("low_stock"))?;

        decode_all(&rows, rows::material)
    }

    /// Movements of the current calendar month, newest first.
    #[instrument(skip(self))]
    pub async fn movements_this_month(&self) -> LedgerResult<Vec<MovementRecord>> {
        let (start, end) = month_bounds(self.clock.now());
        let rows = sqlx::query(&format!(
            "{MOVEMENT_SELECT} WHERE mv.occurred_at >= ? AND mv.occurred_at < ? \
             ORDER BY mv.occurred_at DESC, mv.id DESC"
        ))
        .bind(start)
        .bind(end)
        .fetch_all(&self.pool)
        .await
        .map_err(sqlx_err("movements_this_month"))?;

        decode_all(&rows, rows::movement_record)
    }

    #[instrument(skip(self))]
    pub async fn report(&self, kind: ReportKind) -> LedgerResult<Table> {
        let table = match kind {
            ReportKind::Inventory => {
                inventory_table(&fetch_materials(&self.pool, &MaterialFilter::default()).await?)
            }
            ReportKind::LowStock => low_stock_table(&self.low_stock().await?),
            ReportKind::MonthlyMovements => movements_table(&self.movements_this_month().await?),
            ReportKind::Loans => loans_table(&self.loans.list_loans().await?),
            ReportKind::Deployments => deployments_table(&self.deployments.list_deployments().await?),
        };
        Ok(table)
    }
}
