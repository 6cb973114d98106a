//! Stock mutation commands.
//!
//! These are plain inputs for the stock engine. Validation here is pure; the checks
//! that need current state (material exists, enough on hand) run inside the
//! engine's transaction.

use serde::{Deserialize, Serialize};

use ptar_core::{DomainError, DomainResult, MaterialId, Quantity};

use crate::material::ensure_present;
use crate::movement::MovementKind;

/// Common shape of every command that moves stock and appends one movement.
pub trait StockCommand {
    /// Ledger kind written for this command.
    const KIND: MovementKind;

    fn material_id(&self) -> MaterialId;
    fn amount(&self) -> Quantity;
    fn actor(&self) -> &str;
    fn counterparty(&self) -> &str;
    fn notes(&self) -> &str;

    fn validate(&self) -> DomainResult<()> {
        ensure_positive_amount(self.amount())
    }
}

/// Command: register inbound stock (purchase, donation, found stock).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntryRequest {
    pub material_id: MaterialId,
    pub amount: Quantity,
    #[serde(default)]
    pub origin: String,
    #[serde(default)]
    pub actor: String,
    #[serde(default)]
    pub notes: String,
}

/// Command: take stock out of the warehouse.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExitRequest {
    pub material_id: MaterialId,
    pub amount: Quantity,
    #[serde(default)]
    pub destination: String,
    #[serde(default)]
    pub actor: String,
    #[serde(default)]
    pub notes: String,
}

/// Command: lend stock to another area; it comes back through a return.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoanRequest {
    pub material_id: MaterialId,
    pub amount: Quantity,
    pub borrower: String,
    #[serde(default)]
    pub area: String,
    #[serde(default)]
    pub notes: String,
}

/// Command: install stock into equipment permanently.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeployRequest {
    pub material_id: MaterialId,
    pub amount: Quantity,
    pub equipment: String,
    #[serde(default)]
    pub responsible: String,
    #[serde(default)]
    pub notes: String,
}

impl StockCommand for EntryRequest {
    const KIND: MovementKind = MovementKind::Entry;

    fn material_id(&self) -> MaterialId {
        self.material_id
    }
    fn amount(&self) -> Quantity {
        self.amount
    }
    fn actor(&self) -> &str {
        &self.actor
    }
    fn counterparty(&self) -> &str {
        &self.origin
    }
    fn notes(&self) -> &str {
        &self.notes
    }
}

impl StockCommand for ExitRequest {
    const KIND: MovementKind = MovementKind::Exit;

    fn material_id(&self) -> MaterialId {
        self.material_id
    }
    fn amount(&self) -> Quantity {
        self.amount
    }
    fn actor(&self) -> &str {
        &self.actor
    }
    fn counterparty(&self) -> &str {
        &self.destination
    }
    fn notes(&self) -> &str {
        &self.notes
    }
}

impl StockCommand for LoanRequest {
    const KIND: MovementKind = MovementKind::Loan;

    fn material_id(&self) -> MaterialId {
        self.material_id
    }
    fn amount(&self) -> Quantity {
        self.amount
    }
    fn actor(&self) -> &str {
        &self.borrower
    }
    fn counterparty(&self) -> &str {
        &self.area
    }
    fn notes(&self) -> &str {
        &self.notes
    }

    fn validate(&self) -> DomainResult<()> {
        ensure_positive_amount(self.amount)?;
        ensure_present("borrower", &self.borrower)
    }
}

impl StockCommand for DeployRequest {
    const KIND: MovementKind = MovementKind::Deploy;

    fn material_id(&self) -> MaterialId {
        self.material_id
    }
    fn amount(&self) -> Quantity {
        self.amount
    }
    fn actor(&self) -> &str {
        &self.responsible
    }
    fn counterparty(&self) -> &str {
        &self.equipment
    }
    fn notes(&self) -> &str {
        &self.notes
    }

    fn validate(&self) -> DomainResult<()> {
        ensure_positive_amount(self.amount)?;
        ensure_present("equipment", &self.equipment)
    }
}

pub fn ensure_positive_amount(amount: Quantity) -> DomainResult<()> {
    if !amount.is_positive() {
        return Err(DomainError::validation(format!(
            "amount must be greater than zero (got {amount})"
        )));
    }
    Ok(())
}
