//! Domain foundation: row ids, exact quantities, the clock seam and domain errors.
//!
//! This crate contains **pure domain** primitives (no infrastructure concerns).

pub mod clock;
pub mod error;
pub mod id;
pub mod quantity;

pub use clock::{Clock, FixedClock, SystemClock};
pub use error::{DomainError, DomainResult};
pub use id::{DeploymentId, LoanId, MaterialId, MovementId};
pub use quantity::Quantity;
