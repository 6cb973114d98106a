//! Exact stock quantities.
//!
//! Materials are counted in pieces, metres, litres or kilograms, often with a
//! fractional part. Quantities are kept as an integer number of thousandths of a
//! unit so that ledger sums, the stock guard and status classification are exact.
//! On the wire they are plain decimal numbers (`2.5`), rounded to the nearest
//! thousandth when parsed.

use core::fmt;
use core::iter::Sum;
use core::ops::{Add, AddAssign, Neg, Sub, SubAssign};

use serde::{Deserialize, Serialize};

use crate::error::{DomainError, DomainResult};

/// A signed amount of stock, in thousandths of a unit.
#[derive(
    Debug, Copy, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(try_from = "f64", into = "f64")]
pub struct Quantity(i64);

impl Quantity {
    /// Thousandths per unit.
    pub const SCALE: i64 = 1_000;

    pub const ZERO: Quantity = Quantity(0);

    /// Largest magnitude accepted from decimal input. Every value up to it
    /// converts to `f64` and back without loss.
    pub const MAX_MILLI: i64 = 1 << 53;

    pub const fn from_milli(milli: i64) -> Self {
        Self(milli)
    }

    /// Whole units.
    pub const fn units(units: i64) -> Self {
        Self(units.saturating_mul(Self::SCALE))
    }

    pub const fn milli(self) -> i64 {
        self.0
    }

    /// Parse a decimal amount, rounding to the nearest thousandth.
    pub fn from_f64(value: f64) -> DomainResult<Self> {
        if !value.is_finite() {
            return Err(DomainError::validation(format!(
                "quantity must be a finite number (got {value})"
            )));
        }

        let scaled = (value * Self::SCALE as f64).round();
        if scaled.abs() > Self::MAX_MILLI as f64 {
            return Err(DomainError::validation(format!(
                "quantity out of range (got {value})"
            )));
        }

        Ok(Self(scaled as i64))
    }

    pub fn to_f64(self) -> f64 {
        self.0 as f64 / Self::SCALE as f64
    }

    pub const fn is_zero(self) -> bool {
        self.0 == 0
    }

    pub const fn is_positive(self) -> bool {
        self.0 > 0
    }

    pub const fn is_negative(self) -> bool {
        self.0 < 0
    }
}

impl TryFrom<f64> for Quantity {
    type Error = DomainError;

    fn try_from(value: f64) -> Result<Self, Self::Error> {
        Self::from_f64(value)
    }
}

impl From<Quantity> for f64 {
    fn from(value: Quantity) -> Self {
        value.to_f64()
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        let scale = Self::SCALE.unsigned_abs();
        let (whole, frac) = (abs / scale, abs % scale);

        if frac == 0 {
            write!(f, "{sign}{whole}")
        } else {
            let digits = format!("{frac:03}");
            write!(f, "{sign}{whole}.{}", digits.trim_end_matches('0'))
        }
    }
}

impl Add for Quantity {
    type Output = Quantity;

    fn add(self, rhs: Quantity) -> Quantity {
        Quantity(self.0 + rhs.0)
    }
}

impl Sub for Quantity {
    type Output = Quantity;

    fn sub(self, rhs: Quantity) -> Quantity {
        Quantity(self.0 - rhs.0)
    }
}

impl Neg for Quantity {
    type Output = Quantity;

    fn neg(self) -> Quantity {
        Quantity(-self.0)
    }
}

impl AddAssign for Quantity {
    fn add_assign(&mut self, rhs: Quantity) {
        self.0 += rhs.0;
    }
}

impl SubAssign for Quantity {
    fn sub_assign(&mut self, rhs: Quantity) {
        self.0 -= rhs.0;
    }
}

impl Sum for Quantity {
    fn sum<I: Iterator<Item = Quantity>>(iter: I) -> Quantity {
        iter.fold(Quantity::ZERO, Add::add)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn qty(value: f64) -> Quantity {
        Quantity::from_f64(value).unwrap()
    }

    #[test]
    fn decimal_tenths_sum_exactly() {
        assert_eq!(qty(0.7) + qty(0.1), qty(0.8));
        assert_eq!(qty(0.1) + qty(0.1) + qty(0.1) - qty(0.3), Quantity::ZERO);
    }

    #[test]
    fn parsing_rounds_to_thousandths() {
        assert_eq!(qty(2.5).milli(), 2_500);
        assert_eq!(qty(0.0004).milli(), 0);
        assert_eq!(qty(0.0006).milli(), 1);
        assert_eq!(qty(-1.25).milli(), -1_250);
    }

    #[test]
    fn non_finite_and_huge_values_are_rejected() {
        assert!(Quantity::from_f64(f64::NAN).is_err());
        assert!(Quantity::from_f64(f64::INFINITY).is_err());
        assert!(Quantity::from_f64(1e300).is_err());
    }

    #[test]
    fn display_trims_trailing_zeros() {
        assert_eq!(Quantity::units(4).to_string(), "4");
        assert_eq!(qty(0.8).to_string(), "0.8");
        assert_eq!(qty(12.125).to_string(), "12.125");
        assert_eq!(qty(-0.05).to_string(), "-0.05");
    }

    #[test]
    fn json_is_a_plain_number() {
        assert_eq!(serde_json::to_string(&qty(2.5)).unwrap(), "2.5");
        let parsed: Quantity = serde_json::from_str("0.1").unwrap();
        assert_eq!(parsed, Quantity::from_milli(100));
        assert!(serde_json::from_str::<Quantity>("\"lots\"").is_err());
    }

    proptest! {
        /// Property: every thousandth survives the f64 round trip used on the wire.
        #[test]
        fn thousandths_survive_f64(milli in -1_000_000_000i64..1_000_000_000) {
            let q = Quantity::from_milli(milli);
            prop_assert_eq!(Quantity::from_f64(q.to_f64()).unwrap(), q);
        }
    }
}
