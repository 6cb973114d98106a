use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use ptar_core::{DomainError, DomainResult, MaterialId, Quantity};

/// Derived stock classification of a material.
///
/// Never stored: always recomputed from quantity and reorder threshold through
/// [`StockStatus::classify`].
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StockStatus {
    #[serde(rename = "SIN_STOCK")]
    OutOfStock,
    #[serde(rename = "STOCK_BAJO")]
    Low,
    #[serde(rename = "STOCK_NORMAL")]
    Normal,
}

impl StockStatus {
    /// Classify a quantity against its reorder threshold.
    ///
    /// The zero check wins over the threshold check: a material with
    /// `quantity == 0` and `threshold == 0` is out of stock, not low.
    pub fn classify(quantity: Quantity, threshold: Quantity) -> Self {
        if !quantity.is_positive() {
            StockStatus::OutOfStock
        } else if quantity <= threshold {
            StockStatus::Low
        } else {
            StockStatus::Normal
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            StockStatus::OutOfStock => "SIN_STOCK",
            StockStatus::Low => "STOCK_BAJO",
            StockStatus::Normal => "STOCK_NORMAL",
        }
    }
}

impl core::fmt::Display for StockStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl core::str::FromStr for StockStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().replace('-', "_").as_str() {
            "SIN_STOCK" => Ok(StockStatus::OutOfStock),
            "STOCK_BAJO" => Ok(StockStatus::Low),
            "STOCK_NORMAL" => Ok(StockStatus::Normal),
            other => Err(DomainError::validation(format!("unknown stock status: {other}"))),
        }
    }
}

/// A catalog row: one trackable item and its cached on-hand quantity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Material {
    pub id: MaterialId,
    pub code: String,
    pub name: String,
    pub description: String,
    pub category: String,
    pub unit: String,
    pub location: String,
    pub notes: String,
    pub current_quantity: Quantity,
    pub reorder_threshold: Quantity,
    pub unit_cost: f64,
    pub registered_at: DateTime<Utc>,
    pub image_path: Option<String>,
}

impl Material {
    pub fn status(&self) -> StockStatus {
        StockStatus::classify(self.current_quantity, self.reorder_threshold)
    }

    /// Quantity × unit cost (unrounded).
    pub fn stock_value(&self) -> f64 {
        self.current_quantity.to_f64() * self.unit_cost
    }
}

/// Input for creating a material.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct NewMaterial {
    pub code: String,
    pub name: String,
    pub description: String,
    pub category: String,
    pub unit: String,
    pub location: String,
    pub notes: String,
    /// Opening balance; recorded as an ENTRY movement when positive.
    pub initial_quantity: Quantity,
    pub reorder_threshold: Quantity,
    pub unit_cost: f64,
    pub image_path: Option<String>,
}

impl NewMaterial {
    pub fn new(code: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = category.into();
        self
    }

    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = location.into();
        self
    }

    pub fn with_initial_quantity(mut self, quantity: Quantity) -> Self {
        self.initial_quantity = quantity;
        self
    }

    pub fn with_reorder_threshold(mut self, threshold: Quantity) -> Self {
        self.reorder_threshold = threshold;
        self
    }

    pub fn with_unit_cost(mut self, unit_cost: f64) -> Self {
        self.unit_cost = unit_cost;
        self
    }

    pub fn validate(&self) -> DomainResult<()> {
        ensure_present("code", &self.code)?;
        ensure_present("name", &self.name)?;
        ensure_non_negative_quantity("initial_quantity", self.initial_quantity)?;
        ensure_non_negative_quantity("reorder_threshold", self.reorder_threshold)?;
        ensure_non_negative("unit_cost", self.unit_cost)?;
        Ok(())
    }
}

/// Replacement of a material's descriptive fields.
///
/// No quantity here: `current_quantity` only moves through the
/// stock engine. Collaborators deserializing JSON that carries a quantity get it
/// dropped silently.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MaterialUpdate {
    pub code: String,
    pub name: String,
    pub description: String,
    pub category: String,
    pub unit: String,
    pub location: String,
    pub notes: String,
    pub reorder_threshold: Quantity,
    pub unit_cost: f64,
    pub image_path: Option<String>,
}

impl MaterialUpdate {
    pub fn validate(&self) -> DomainResult<()> {
        ensure_present("code", &self.code)?;
        ensure_present("name", &self.name)?;
        ensure_non_negative_quantity("reorder_threshold", self.reorder_threshold)?;
        ensure_non_negative("unit_cost", self.unit_cost)?;
        Ok(())
    }
}

impl From<&Material> for MaterialUpdate {
    fn from(m: &Material) -> Self {
        Self {
            code: m.code.clone(),
            name: m.name.clone(),
            description: m.description.clone(),
            category: m.category.clone(),
            unit: m.unit.clone(),
            location: m.location.clone(),
            notes: m.notes.clone(),
            reorder_threshold: m.reorder_threshold,
            unit_cost: m.unit_cost,
            image_path: m.image_path.clone(),
        }
    }
}

/// Catalog search criteria. Empty fields match everything.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MaterialFilter {
    /// Case-insensitive substring over code, name and description.
    pub search: Option<String>,
    pub category: Option<String>,
    pub location: Option<String>,
    pub status: Option<StockStatus>,
}

impl MaterialFilter {
    pub fn search(mut self, term: impl Into<String>) -> Self {
        self.search = Some(term.into());
        self
    }

    pub fn category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    pub fn status(mut self, status: StockStatus) -> Self {
        self.status = Some(status);
        self
    }

    /// Category constraint to push down to storage, if any.
    pub fn category_eq(&self) -> Option<&str> {
        non_blank(self.category.as_deref())
    }

    /// Location constraint to push down to storage, if any.
    pub fn location_eq(&self) -> Option<&str> {
        non_blank(self.location.as_deref())
    }

    /// Post-retrieval predicate: search term and derived status.
    pub fn matches_derived(&self, material: &Material) -> bool {
        if let Some(term) = non_blank(self.search.as_deref()) {
            let needle = term.to_lowercase();
            let hit = [&material.code, &material.name, &material.description]
                .iter()
                .any(|field| field.to_lowercase().contains(&needle));
            if !hit {
                return false;
            }
        }

        match self.status {
            Some(status) => material.status() == status,
            None => true,
        }
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

pub(crate) fn ensure_present(field: &str, value: &str) -> DomainResult<()> {
    if value.trim().is_empty() {
        return Err(DomainError::validation(format!("{field} cannot be empty")));
    }
    Ok(())
}

pub(crate) fn ensure_non_negative_quantity(field: &str, value: Quantity) -> DomainResult<()> {
    if value.is_negative() {
        return Err(DomainError::validation(format!(
            "{field} cannot be negative (got {value})"
        )));
    }
    Ok(())
}

pub(crate) fn ensure_non_negative(field: &str, value: f64) -> DomainResult<()> {
    if !value.is_finite() || value < 0.0 {
        return Err(DomainError::validation(format!(
            "{field} must be a non-negative number (got {value})"
        )));
    }
    Ok(())
}
