//! Infrastructure layer: SQLite persistence of the warehouse ledger.
//!
//! [`Warehouse`] opens one pool over the database file and hands clones of it to the
//! components every front-end shares:
//!
//! - [`MaterialCatalog`]: material records and code allocation
//! - [`StockEngine`]: every quantity change, each with its ledger movement
//! - [`LoanTracker`] / [`DeploymentTracker`]: listings of loans and deployments
//! - [`QueryService`]: statistics, history, low stock and report tables

pub mod catalog;
pub mod config;
pub mod db;
pub mod engine;
pub mod errors;
pub mod ledger;
pub mod queries;
pub mod retry;
pub mod trackers;

mod legacy;
mod rows;


use std::sync::Arc;

use sqlx::SqlitePool;
use tracing::info;

use ptar_core::{Clock, SystemClock};

pub use catalog::MaterialCatalog;
pub use config::{ConfigError, DatabaseLocation, StoreConfig};
pub use db::HealthReport;
pub use engine::StockEngine;
pub use errors::{LedgerError, LedgerResult};
pub use queries::QueryService;
pub use retry::{BackoffStrategy, RetryPolicy};
pub use trackers::{DeploymentTracker, LoanTracker};

/// Shared handle to one warehouse database.
#[derive(Debug, Clone)]
pub struct Warehouse {
    pool: SqlitePool,
    clock: Arc<dyn Clock>,
    retry: RetryPolicy,
}

impl Warehouse {
    /// Connect, migrate, and stamp operations with the wall clock.
    pub async fn open(config: &StoreConfig) -> LedgerResult<Self> {
        Self::open_with_clock(config, Arc::new(SystemClock)).await
    }

    pub async fn open_with_clock(config: &StoreConfig, clock: Arc<dyn Clock>) -> LedgerResult<Self> {
        let pool = db::connect(config).await?;
        db::migrate(&pool).await?;
        info!(location = ?config.location, "warehouse store opened");

        Ok(Self {
            pool,
            clock,
            retry: config.retry.clone(),
        })
    }

    pub fn catalog(&self) -> MaterialCatalog {
        MaterialCatalog::new(self.pool.clone(), self.clock.clone(), self.retry.clone())
    }

    pub fn engine(&self) -> StockEngine {
        StockEngine::new(self.pool.clone(), self.clock.clone(), self.retry.clone())
    }

    pub fn loans(&self) -> LoanTracker {
        LoanTracker::new(self.pool.clone())
    }

    pub fn deployments(&self) -> DeploymentTracker {
        DeploymentTracker::new(self.pool.clone())
    }

    pub fn queries(&self) -> QueryService {
        QueryService::new(self.pool.clone(), self.clock.clone())
    }

    pub async fn health(&self) -> LedgerResult<HealthReport> {
        db::health(&self.pool).await
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Wait for checked-out connections and close the pool.
    pub async fn close(&self) {
        self.pool.close().await;
    }
}
