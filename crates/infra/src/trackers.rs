//! Read side of loans and deployments.
//!
//! Lifecycle changes (open, return, deploy, write off) belong to the stock engine;
//! these trackers only list and look up. Rows of archived materials stay visible as
//! history.

use sqlx::SqlitePool;
use tracing::instrument;

use ptar_core::{DeploymentId, LoanId};
use ptar_inventory::{DeploymentRecord, LoanRecord, LoanStatus};

use crate::errors::{LedgerResult, sqlx_err};
use crate::rows::{self, DEPLOYMENT_SELECT, LOAN_SELECT, decode_all};

#[derive(Debug, Clone)]
pub struct LoanTracker {
    pool: SqlitePool,
}

impl LoanTracker {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Open loans, newest first.
    pub async fn list_open_loans(&self) -> LedgerResult<Vec<LoanRecord>> {
        self.list_loans_with_status(LoanStatus::Open).await
    }

    /// Loans in one lifecycle state, newest first.
    #[instrument(skip(self))]
    pub async fn list_loans_with_status(&self, status: LoanStatus) -> LedgerResult<Vec<LoanRecord>> {
        let rows = sqlx::query(&format!(
            "{LOAN_SELECT} WHERE l.status = ? ORDER BY l.loaned_at DESC, l.id DESC"
        ))
        .bind(status.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(sqlx_err("list_loans_with_status"))?;

        decode_all(&rows, rows::loan_record)
    }

    /// Every loan regardless of status, newest first.
    #[instrument(skip(self))]
    pub async fn list_loans(&self) -> LedgerResult<Vec<LoanRecord>> {
        let rows = sqlx::query(&format!("{LOAN_SELECT} ORDER BY l.loaned_at DESC, l.id DESC"))
            .fetch_all(&self.pool)
            .await
            .map_err(sqlx_err("list_loans"))?;

        decode_all(&rows, rows::loan_record)
    }

    #[instrument(skip(self))]
    pub async fn get_loan(&self, id: LoanId) -> LedgerResult<Option<LoanRecord>> {
        let row = sqlx::query(&format!("{LOAN_SELECT} WHERE l.id = ?"))
            .bind(id.get())
            .fetch_optional(&self.pool)
            .await
            .map_err(sqlx_err("get_loan"))?;

        row.as_ref().map(rows::loan_record).transpose()
    }
}

#[derive(Debug, Clone)]
pub struct DeploymentTracker {
    pool: SqlitePool,
}

impl DeploymentTracker {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Deployments, newest installation first.
    #[instrument(skip(self))]
    pub async fn list_deployments(&self) -> LedgerResult<Vec<DeploymentRecord>> {
        let rows = sqlx::query(&format!(
            "{DEPLOYMENT_SELECT} ORDER BY d.installed_at DESC, d.id DESC"
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(sqlx_err("list_deployments"))?;

        decode_all(&rows, rows::deployment_record)
    }

    #[instrument(skip(self))]
    pub async fn get_deployment(&self, id: DeploymentId) -> LedgerResult<Option<DeploymentRecord>> {
        let row = sqlx::query(&format!("{DEPLOYMENT_SELECT} WHERE d.id = ?"))
            .bind(id.get())
            .fetch_optional(&self.pool)
            .await
            .map_err(sqlx_err("get_deployment"))?;

        row.as_ref().map(rows::deployment_record).transpose()
    }
}
