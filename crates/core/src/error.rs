//! Domain error model.

use thiserror::Error;

use crate::quantity::Quantity;

/// Result type used across the domain layer.
pub type DomainResult<T> = Result<T, DomainError>;

/// Domain-level error.
///
/// Keep this focused on deterministic, business/domain failures (bad input, stock
/// rules, lifecycle rules). Lock contention and storage failures belong to the
/// persistence layer.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum DomainError {
    /// A value failed validation (e.g. blank name, non-positive amount).
    #[error("validation failed: {0}")]
    Validation(String),

    /// A loan, deployment or other referenced record does not exist.
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: i64 },

    /// The requested amount exceeds what is on the shelf.
    #[error("insufficient stock: available {available}, requested {requested}")]
    InsufficientStock {
        available: Quantity,
        requested: Quantity,
    },

    /// The loan was already closed by an earlier return.
    #[error("loan {0} was already returned")]
    AlreadyReturned(i64),
}

impl DomainError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn not_found(entity: &'static str, id: i64) -> Self {
        Self::NotFound { entity, id }
    }

    pub fn insufficient_stock(available: Quantity, requested: Quantity) -> Self {
        Self::InsufficientStock {
            available,
            requested,
        }
    }
}
