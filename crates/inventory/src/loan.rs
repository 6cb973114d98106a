use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use ptar_core::{DomainError, DomainResult, LoanId, MaterialId, Quantity};

/// Loan lifecycle: `Open` → `Returned`, one way.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LoanStatus {
    Open,
    Returned,
}

impl LoanStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            LoanStatus::Open => "OPEN",
            LoanStatus::Returned => "RETURNED",
        }
    }
}

impl core::fmt::Display for LoanStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl core::str::FromStr for LoanStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "OPEN" => Ok(LoanStatus::Open),
            "RETURNED" => Ok(LoanStatus::Returned),
            other => Err(DomainError::validation(format!("unknown loan status: {other}"))),
        }
    }
}

/// Stock lent outward. While open, `amount` is already subtracted from the
/// material's on-hand quantity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Loan {
    pub id: LoanId,
    pub material_id: MaterialId,
    pub amount: Quantity,
    pub loaned_at: DateTime<Utc>,
    pub returned_at: Option<DateTime<Utc>>,
    pub borrower: String,
    pub destination_area: String,
    pub status: LoanStatus,
    pub notes: String,
}

impl Loan {
    pub fn is_open(&self) -> bool {
        self.status == LoanStatus::Open
    }

    pub fn ensure_open(&self) -> DomainResult<()> {
        if !self.is_open() {
            return Err(DomainError::AlreadyReturned(self.id.get()));
        }
        Ok(())
    }

    /// Close the loan at `at`.
    pub fn close(&mut self, at: DateTime<Utc>) -> DomainResult<()> {
        self.ensure_open()?;
        self.status = LoanStatus::Returned;
        self.returned_at = Some(at);
        Ok(())
    }

    /// Notes written on the RETURN movement that closes this loan.
    pub fn return_note(&self) -> String {
        format!("Devolución de préstamo #{}", self.id)
    }
}

/// A loan joined with the owning material's display fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoanRecord {
    #[serde(flatten)]
    pub loan: Loan,
    pub material_code: String,
    pub material_name: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn open_loan() -> Loan {
        Loan {
            id: LoanId::new(9),
            material_id: MaterialId::new(1),
            amount: Quantity::units(2),
            loaned_at: Utc::now(),
            returned_at: None,
            borrower: "Juan".to_string(),
            destination_area: "Bombeo".to_string(),
            status: LoanStatus::Open,
            notes: String::new(),
        }
    }

    #[test]
    fn close_moves_open_loan_to_returned() {
        let mut loan = open_loan();
        let at = Utc::now();
        loan.close(at).unwrap();
        assert_eq!(loan.status, LoanStatus::Returned);
        assert_eq!(loan.returned_at, Some(at));
    }

    #[test]
    fn closing_twice_fails_and_keeps_first_return_time() {
        let mut loan = open_loan();
        let first = Utc::now();
        loan.close(first).unwrap();

        let err = loan.close(first + chrono::Duration::hours(1)).unwrap_err();
        assert_eq!(err, DomainError::AlreadyReturned(9));
        assert_eq!(loan.returned_at, Some(first));
    }

    #[test]
    fn status_parses_storage_names() {
        assert_eq!("OPEN".parse::<LoanStatus>().unwrap(), LoanStatus::Open);
        assert_eq!("returned".parse::<LoanStatus>().unwrap(), LoanStatus::Returned);
        assert!("ACTIVO".parse::<LoanStatus>().is_err());
    }
}
