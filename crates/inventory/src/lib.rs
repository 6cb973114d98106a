//! Warehouse inventory domain.
//!
//! This crate contains the stock rules of the PTAR warehouse as pure,
//! deterministic logic (no IO, no HTTP, no storage). Persistence and the
//! transactional engine live in `ptar-infra`.

pub mod code;
pub mod deployment;
pub mod loan;
pub mod material;
pub mod movement;
pub mod report;
pub mod stats;
pub mod stock;

pub use code::{category_prefix, next_code};
pub use deployment::{Deployment, DeploymentRecord};
pub use loan::{Loan, LoanRecord, LoanStatus};
pub use material::{Material, MaterialFilter, MaterialUpdate, NewMaterial, StockStatus};
pub use movement::{Movement, MovementKind, MovementRecord, ledger_balance};
pub use report::{Cell, ReportKind, Table};
pub use stats::{CatalogTally, InventoryStatistics};
pub use stock::{DeployRequest, EntryRequest, ExitRequest, LoanRequest, StockCommand};
