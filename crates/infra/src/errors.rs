//! Errors surfaced by the persistent ledger.
//!
//! ## Error Mapping
//!
//! SQLx errors are mapped to `LedgerError` in [`map_sqlx_error`]:
//!
//! | SQLx Error | SQLite result code | LedgerError | Scenario |
//! |------------|--------------------|-------------|----------|
//! | Database (busy) | `SQLITE_BUSY` (5) and extended codes | `Busy` | Another connection holds the write lock past `busy_timeout` |
//! | Database (locked) | `SQLITE_LOCKED` (6) and extended codes | `Busy` | Shared-cache table lock |
//! | Database (unique violation) | `SQLITE_CONSTRAINT_UNIQUE` (2067) | `DuplicateCode` | Second material with the same code |
//! | PoolTimedOut | N/A | `Busy` | Every pooled connection is checked out |
//! | Database (other) | Any other | `Storage` | CHECK/foreign key violations, corrupt file |
//! | Other | N/A | `Storage` | IO errors, decode errors, closed pool |

use thiserror::Error;

use ptar_core::{DomainError, MaterialId, Quantity};

/// Result type of every store operation.
pub type LedgerResult<T> = Result<T, LedgerError>;

/// What collaborators receive from the catalog, engine, trackers and queries.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum LedgerError {
    #[error("validation failed: {0}")]
    Validation(String),

    #[error("material code already exists: {0}")]
    DuplicateCode(String),

    #[error("material not found: {0}")]
    MaterialNotFound(MaterialId),

    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: i64 },

    #[error("insufficient stock: available {available}, requested {requested}")]
    InsufficientStock {
        available: Quantity,
        requested: Quantity,
    },

    #[error("loan {0} was already returned")]
    AlreadyReturned(i64),

    /// Lock contention; safe to retry.
    #[error("database busy in {operation}: {message}")]
    Busy {
        operation: &'static str,
        message: String,
    },

    #[error("storage failure in {operation}: {message}")]
    Storage {
        operation: &'static str,
        message: String,
    },
}

impl LedgerError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, LedgerError::Busy { .. })
    }

    /// Stable machine-readable name, used by HTTP collaborators.
    pub fn code(&self) -> &'static str {
        match self {
            LedgerError::Validation(_) => "validation_error",
            LedgerError::DuplicateCode(_) => "duplicate_code",
            LedgerError::MaterialNotFound(_) => "material_not_found",
            LedgerError::NotFound { .. } => "not_found",
            LedgerError::InsufficientStock { .. } => "insufficient_stock",
            LedgerError::AlreadyReturned(_) => "already_returned",
            LedgerError::Busy { .. } => "busy",
            LedgerError::Storage { .. } => "storage_failure",
        }
    }

    pub(crate) fn storage(operation: &'static str, message: impl Into<String>) -> Self {
        LedgerError::Storage {
            operation,
            message: message.into(),
        }
    }
}

impl From<DomainError> for LedgerError {
    fn from(err: DomainError) -> Self {
        match err {
            DomainError::Validation(msg) => LedgerError::Validation(msg),
            DomainError::NotFound { entity, id } => LedgerError::NotFound { entity, id },
            DomainError::InsufficientStock {
                available,
                requested,
            } => LedgerError::InsufficientStock {
                available,
                requested,
            },
            DomainError::AlreadyReturned(id) => LedgerError::AlreadyReturned(id),
        }
    }
}

const SQLITE_BUSY: i32 = 5;
const SQLITE_LOCKED: i32 = 6;

/// Map a sqlx error raised while running `operation`.
///
/// `code` is the material code being written, if any, so unique violations can name it.
pub(crate) fn map_sqlx_error(operation: &'static str, code: Option<&str>, err: sqlx::Error) -> LedgerError {
    match err {
        sqlx::Error::Database(db_err) => {
            let primary = db_err
                .code()
                .and_then(|c| c.parse::<i32>().ok())
                .map(|c| c & 0xff);
            if matches!(primary, Some(SQLITE_BUSY) | Some(SQLITE_LOCKED)) {
                return LedgerError::Busy {
                    operation,
                    message: db_err.message().to_string(),
                };
            }
            if db_err.is_unique_violation() {
                return LedgerError::DuplicateCode(code.unwrap_or_default().to_string());
            }
            LedgerError::storage(operation, format!("database error: {}", db_err.message()))
        }
        sqlx::Error::PoolTimedOut => LedgerError::Busy {
            operation,
            message: "timed out waiting for a pooled connection".to_string(),
        },
        sqlx::Error::PoolClosed => LedgerError::storage(operation, "connection pool closed"),
        other => LedgerError::storage(operation, other.to_string()),
    }
}

/// Shorthand for `map_err` closures in statements that never write a code.
pub(crate) fn sqlx_err(operation: &'static str) -> impl FnOnce(sqlx::Error) -> LedgerError {
    move |e| map_sqlx_error(operation, None, e)
}
