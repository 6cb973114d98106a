use chrono::{DateTime, Datelike, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::material::{Material, StockStatus};

/// Dashboard summary of the warehouse.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct InventoryStatistics {
    pub total_materials: i64,
    pub low_stock: i64,
    pub out_of_stock: i64,
    pub open_loans: i64,
    pub deployments: i64,
    pub movements_this_month: i64,
    /// Σ(quantity × unit cost), rounded to cents.
    pub total_value: f64,
}

/// Per-status counts and stock value over a set of materials.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct CatalogTally {
    pub total: i64,
    pub low: i64,
    pub out_of_stock: i64,
    pub value: f64,
}

impl CatalogTally {
    pub fn add(&mut self, material: &Material) {
        self.total += 1;
        match material.status() {
            StockStatus::Low => self.low += 1,
            StockStatus::OutOfStock => self.out_of_stock += 1,
            StockStatus::Normal => {}
        }
        self.value += material.stock_value();
    }
}

impl<'a> FromIterator<&'a Material> for CatalogTally {
    fn from_iter<I: IntoIterator<Item = &'a Material>>(iter: I) -> Self {
        let mut tally = CatalogTally::default();
        for material in iter {
            tally.add(material);
        }
        tally
    }
}

impl InventoryStatistics {
    pub fn from_parts(
        tally: CatalogTally,
        open_loans: i64,
        deployments: i64,
        movements_this_month: i64,
    ) -> Self {
        Self {
            total_materials: tally.total,
            low_stock: tally.low,
            out_of_stock: tally.out_of_stock,
            open_loans,
            deployments,
            movements_this_month,
            total_value: round_to_cents(tally.value),
        }
    }
}

pub fn round_to_cents(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Half-open `[start, end)` range of the UTC calendar month containing `now`.
pub fn month_bounds(now: DateTime<Utc>) -> (DateTime<Utc>, DateTime<Utc>) {
    let (year, month) = (now.year(), now.month());
    let (next_year, next_month) = if month == 12 {
        (year + 1, 1)
    } else {
        (year, month + 1)
    };
    // First-of-month at midnight is always a valid, unambiguous UTC instant.
    let start = Utc
        .with_ymd_and_hms(year, month, 1, 0, 0, 0)
        .single()
        .unwrap_or(now);
    let end = Utc
        .with_ymd_and_hms(next_year, next_month, 1, 0, 0, 0)
        .single()
        .unwrap_or(now);
    (start, end)
}
