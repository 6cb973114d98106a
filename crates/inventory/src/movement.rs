use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use ptar_core::{DomainError, MaterialId, MovementId, Quantity};

/// Kind of ledger entry. The kind alone decides the sign of the quantity effect.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum MovementKind {
    Entry,
    Exit,
    Loan,
    Return,
    Deploy,
}

impl MovementKind {
    pub const ALL: [MovementKind; 5] = [
        MovementKind::Entry,
        MovementKind::Exit,
        MovementKind::Loan,
        MovementKind::Return,
        MovementKind::Deploy,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            MovementKind::Entry => "ENTRY",
            MovementKind::Exit => "EXIT",
            MovementKind::Loan => "LOAN",
            MovementKind::Return => "RETURN",
            MovementKind::Deploy => "DEPLOY",
        }
    }

    /// Whether this kind adds stock to the warehouse.
    pub fn is_inbound(&self) -> bool {
        matches!(self, MovementKind::Entry | MovementKind::Return)
    }

    /// Signed quantity effect of moving `amount` units with this kind.
    pub fn signed(&self, amount: Quantity) -> Quantity {
        if self.is_inbound() { amount } else { -amount }
    }
}

impl core::fmt::Display for MovementKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl core::str::FromStr for MovementKind {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_uppercase();
        MovementKind::ALL
            .into_iter()
            .find(|k| k.as_str() == wanted)
            .ok_or_else(|| DomainError::validation(format!("unknown movement kind: {s}")))
    }
}

/// Immutable ledger entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Movement {
    pub id: MovementId,
    pub material_id: MaterialId,
    pub kind: MovementKind,
    /// Always positive; see [`Movement::signed_amount`].
    pub amount: Quantity,
    pub occurred_at: DateTime<Utc>,
    pub actor: String,
    /// Origin, destination, borrowing area or equipment depending on `kind`.
    pub counterparty: String,
    pub notes: String,
}

impl Movement {
    pub fn signed_amount(&self) -> Quantity {
        self.kind.signed(self.amount)
    }
}

/// A movement joined with the owning material's display fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MovementRecord {
    #[serde(flatten)]
    pub movement: Movement,
    pub material_code: String,
    pub material_name: String,
}

/// Replay a ledger: the quantity a material must hold given its movements.
pub fn ledger_balance<'a>(movements: impl IntoIterator<Item = &'a Movement>) -> Quantity {
    movements.into_iter().map(Movement::signed_amount).sum()
}
