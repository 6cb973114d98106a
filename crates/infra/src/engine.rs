//! Stock mutation engine: the only path by which `current_quantity` changes.
//!
//! ## Transactions and locking
//!
//! Every operation is one SQLite transaction whose first statement is a guarded
//! `UPDATE`. The write lock is therefore taken before the row is read, and a second
//! writer waits in SQLite's busy handler (up to `busy_timeout`) instead of failing on a
//! stale snapshot. When the guard matches no row, the engine reads the row inside the
//! same transaction to tell "missing" from "not enough stock", then rolls back.
//!
//! A `sqlx::Transaction` dropped before `commit` rolls back, so every early return
//! releases the lock and leaves quantity and ledger untouched.
//!
//! ## Retries
//!
//! `Busy` errors (lock wait exhausted, pool exhausted) rerun the whole transaction
//! under the configured [`RetryPolicy`]. Nothing else is retried.

use std::sync::Arc;

use sqlx::{SqliteConnection, SqlitePool};
use tracing::{info, instrument};

use ptar_core::{Clock, DeploymentId, DomainError, LoanId, MaterialId, Quantity};
use ptar_inventory::{
    DeployRequest, Deployment, EntryRequest, ExitRequest, Loan, LoanRequest, LoanStatus, Movement,
    MovementKind, StockCommand,
};

use crate::errors::{LedgerError, LedgerResult, sqlx_err};
use crate::ledger::{self, LedgerEntry};
use crate::retry::{RetryPolicy, with_retry};
use crate::rows;

#[derive(Debug, Clone)]
pub struct StockEngine {
    pool: SqlitePool,
    clock: Arc<dyn Clock>,
    retry: RetryPolicy,
}

impl StockEngine {
    pub fn new(pool: SqlitePool, clock: Arc<dyn Clock>, retry: RetryPolicy) -> Self {
        Self { pool, clock, retry }
    }

    /// Register inbound stock.
    #[instrument(skip(self, request), fields(material_id = %request.material_id, amount = %request.amount))]
    pub async fn entry(&self, request: EntryRequest) -> LedgerResult<Movement> {
        request.validate()?;
        with_retry(&self.retry, "entry", || self.try_entry(&request)).await
    }

    async fn try_entry(&self, request: &EntryRequest) -> LedgerResult<Movement> {
        let at = self.clock.now();
        let mut tx = self.pool.begin().await.map_err(sqlx_err("entry"))?;

        let result = sqlx::query(
            "UPDATE materials SET current_quantity = current_quantity + ? \
             WHERE id = ? AND archived_at IS NULL",
        )
        .bind(request.amount.milli())
        .bind(request.material_id.get())
        .execute(&mut *tx)
        .await
        .map_err(sqlx_err("entry"))?;

        if result.rows_affected() == 0 {
            return Err(LedgerError::MaterialNotFound(request.material_id));
        }

        let movement = ledger::append(&mut *tx, LedgerEntry::for_command(request, at)).await?;
        tx.commit().await.map_err(sqlx_err("entry"))?;

        info!(movement_id = %movement.id, "stock entry recorded");
        Ok(movement)
    }

    /// Take stock out of the warehouse.
    #[instrument(skip(self, request), fields(material_id = %request.material_id, amount = %request.amount))]
    pub async fn exit(&self, request: ExitRequest) -> LedgerResult<Movement> {
        request.validate()?;
        with_retry(&self.retry, "exit", || self.try_exit(&request)).await
    }

    async fn try_exit(&self, request: &ExitRequest) -> LedgerResult<Movement> {
        let at = self.clock.now();
        let mut tx = self.pool.begin().await.map_err(sqlx_err("exit"))?;

        take_stock(&mut *tx, request, "exit").await?;
        let movement = ledger::append(&mut *tx, LedgerEntry::for_command(request, at)).await?;
        tx.commit().await.map_err(sqlx_err("exit"))?;

        info!(movement_id = %movement.id, "stock exit recorded");
        Ok(movement)
    }

    /// Lend stock; the loan stays open until [`StockEngine::return_loan`].
    #[instrument(skip(self, request), fields(material_id = %request.material_id, amount = %request.amount))]
    pub async fn loan(&self, request: LoanRequest) -> LedgerResult<Loan> {
        request.validate()?;
        with_retry(&self.retry, "loan", || self.try_loan(&request)).await
    }

    async fn try_loan(&self, request: &LoanRequest) -> LedgerResult<Loan> {
        let at = self.clock.now();
        let mut tx = self.pool.begin().await.map_err(sqlx_err("loan"))?;

        take_stock(&mut *tx, request, "loan").await?;

        let result = sqlx::query(
            r#"
            INSERT INTO loans (material_id, amount, loaned_at, borrower, destination_area, status, notes)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(request.material_id.get())
        .bind(request.amount.milli())
        .bind(at)
        .bind(request.borrower.trim())
        .bind(request.area.trim())
        .bind(LoanStatus::Open.as_str())
        .bind(&request.notes)
        .execute(&mut *tx)
        .await
        .map_err(sqlx_err("loan"))?;

        ledger::append(&mut *tx, LedgerEntry::for_command(request, at)).await?;
        tx.commit().await.map_err(sqlx_err("loan"))?;

        let loan = Loan {
            id: LoanId::new(result.last_insert_rowid()),
            material_id: request.material_id,
            amount: request.amount,
            loaned_at: at,
            returned_at: None,
            borrower: request.borrower.trim().to_string(),
            destination_area: request.area.trim().to_string(),
            status: LoanStatus::Open,
            notes: request.notes.clone(),
        };

        info!(loan_id = %loan.id, "loan opened");
        Ok(loan)
    }

    /// Close an open loan and put its stock back.
    #[instrument(skip(self))]
    pub async fn return_loan(&self, loan_id: LoanId) -> LedgerResult<Loan> {
        with_retry(&self.retry, "return_loan", || self.try_return_loan(loan_id)).await
    }

    async fn try_return_loan(&self, loan_id: LoanId) -> LedgerResult<Loan> {
        let at = self.clock.now();
        let mut tx = self.pool.begin().await.map_err(sqlx_err("return_loan"))?;

        // Touching the row takes the write lock before it is read. A racing return
        // waits here, then reads the loan as already closed.
        let locked = sqlx::query("UPDATE loans SET status = status WHERE id = ?")
            .bind(loan_id.get())
            .execute(&mut *tx)
            .await
            .map_err(sqlx_err("return_loan"))?;
        if locked.rows_affected() == 0 {
            return Err(DomainError::not_found("loan", loan_id.get()).into());
        }

        let Some(mut loan) = fetch_loan(&mut *tx, loan_id).await? else {
            return Err(LedgerError::storage("return_loan", format!("loan {loan_id} vanished mid-transaction")));
        };
        loan.close(at)?;

        sqlx::query("UPDATE loans SET status = ?, returned_at = ? WHERE id = ?")
            .bind(loan.status.as_str())
            .bind(loan.returned_at)
            .bind(loan.id.get())
            .execute(&mut *tx)
            .await
            .map_err(sqlx_err("return_loan"))?;

        sqlx::query("UPDATE materials SET current_quantity = current_quantity + ? WHERE id = ?")
            .bind(loan.amount.milli())
            .bind(loan.material_id.get())
            .execute(&mut *tx)
            .await
            .map_err(sqlx_err("return_loan"))?;

        let notes = loan.return_note();
        ledger::append(
            &mut *tx,
            LedgerEntry {
                material_id: loan.material_id,
                kind: MovementKind::Return,
                amount: loan.amount,
                at,
                actor: &loan.borrower,
                counterparty: &loan.destination_area,
                notes: &notes,
            },
        )
        .await?;

        tx.commit().await.map_err(sqlx_err("return_loan"))?;

        info!(loan_id = %loan.id, material_id = %loan.material_id, "loan returned");
        Ok(loan)
    }

    /// Install stock into equipment. It never comes back.
    #[instrument(skip(self, request), fields(material_id = %request.material_id, amount = %request.amount))]
    pub async fn deploy(&self, request: DeployRequest) -> LedgerResult<Deployment> {
        request.validate()?;
        with_retry(&self.retry, "deploy", || self.try_deploy(&request)).await
    }

    async fn try_deploy(&self, request: &DeployRequest) -> LedgerResult<Deployment> {
        let at = self.clock.now();
        let mut tx = self.pool.begin().await.map_err(sqlx_err("deploy"))?;

        take_stock(&mut *tx, request, "deploy").await?;

        let result = sqlx::query(
            r#"
            INSERT INTO deployments (material_id, amount, installed_at, equipment, responsible, notes)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(request.material_id.get())
        .bind(request.amount.milli())
        .bind(at)
        .bind(request.equipment.trim())
        .bind(request.responsible.trim())
        .bind(&request.notes)
        .execute(&mut *tx)
        .await
        .map_err(sqlx_err("deploy"))?;

        ledger::append(&mut *tx, LedgerEntry::for_command(request, at)).await?;
        tx.commit().await.map_err(sqlx_err("deploy"))?;

        let deployment = Deployment {
            id: DeploymentId::new(result.last_insert_rowid()),
            material_id: request.material_id,
            amount: request.amount,
            installed_at: at,
            equipment: request.equipment.trim().to_string(),
            responsible: request.responsible.trim().to_string(),
            notes: request.notes.clone(),
        };

        info!(deployment_id = %deployment.id, "material deployed");
        Ok(deployment)
    }

    /// Forget a deployment record. Stock and ledger are left as they are.
    #[instrument(skip(self))]
    pub async fn writeoff_deployment(&self, deployment_id: DeploymentId) -> LedgerResult<()> {
        with_retry(&self.retry, "writeoff_deployment", || self.try_writeoff(deployment_id)).await
    }

    async fn try_writeoff(&self, deployment_id: DeploymentId) -> LedgerResult<()> {
        let result = sqlx::query("DELETE FROM deployments WHERE id = ?")
            .bind(deployment_id.get())
            .execute(&self.pool)
            .await
            .map_err(sqlx_err("writeoff_deployment"))?;

        if result.rows_affected() == 0 {
            return Err(DomainError::not_found("deployment", deployment_id.get()).into());
        }

        info!(deployment_id = %deployment_id, "deployment written off");
        Ok(())
    }
}

/// Guarded decrement shared by exit, loan and deploy.
async fn take_stock<C: StockCommand>(
    conn: &mut SqliteConnection,
    command: &C,
    operation: &'static str,
) -> LedgerResult<()> {
    let material_id = command.material_id();
    let amount = command.amount();

    let result = sqlx::query(
        "UPDATE materials SET current_quantity = current_quantity - ? \
         WHERE id = ? AND archived_at IS NULL AND current_quantity >= ?",
    )
    .bind(amount.milli())
    .bind(material_id.get())
    .bind(amount.milli())
    .execute(&mut *conn)
    .await
    .map_err(sqlx_err(operation))?;

    if result.rows_affected() == 1 {
        return Ok(());
    }

    Err(diagnose_shortfall(conn, material_id, amount, operation).await)
}

async fn diagnose_shortfall(
    conn: &mut SqliteConnection,
    material_id: MaterialId,
    requested: Quantity,
    operation: &'static str,
) -> LedgerError {
    let available: Result<Option<i64>, _> = sqlx::query_scalar(
        "SELECT current_quantity FROM materials WHERE id = ? AND archived_at IS NULL",
    )
    .bind(material_id.get())
    .fetch_optional(&mut *conn)
    .await;

    match available {
        Ok(Some(available)) => {
            DomainError::insufficient_stock(Quantity::from_milli(available), requested).into()
        }
        Ok(None) => LedgerError::MaterialNotFound(material_id),
        Err(e) => sqlx_err(operation)(e),
    }
}

async fn fetch_loan(conn: &mut SqliteConnection, loan_id: LoanId) -> LedgerResult<Option<Loan>> {
    let row = sqlx::query(
        "SELECT id, material_id, amount, loaned_at, returned_at, borrower, destination_area, status, notes \
         FROM loans WHERE id = ?",
    )
    .bind(loan_id.get())
    .fetch_optional(&mut *conn)
    .await
    .map_err(sqlx_err("fetch_loan"))?;

    row.as_ref().map(rows::loan).transpose()
}
