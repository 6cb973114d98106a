//! Tabular report projections.
//!
//! A [`Table`] is the export contract handed to collaborators: ordered column names and
//! rows of primitive cells. Spreadsheet or CSV formatting happens outside this crate.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use ptar_core::{DomainError, Quantity};

use crate::deployment::DeploymentRecord;
use crate::loan::LoanRecord;
use crate::material::Material;
use crate::movement::MovementRecord;

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// One primitive value in a report row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Cell {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
}

impl From<i64> for Cell {
    fn from(v: i64) -> Self {
        Cell::Integer(v)
    }
}

impl From<f64> for Cell {
    fn from(v: f64) -> Self {
        Cell::Real(v)
    }
}

impl From<Quantity> for Cell {
    fn from(v: Quantity) -> Self {
        Cell::Real(v.to_f64())
    }
}

impl From<String> for Cell {
    fn from(v: String) -> Self {
        Cell::Text(v)
    }
}

impl From<&str> for Cell {
    fn from(v: &str) -> Self {
        Cell::Text(v.to_string())
    }
}

impl From<DateTime<Utc>> for Cell {
    fn from(v: DateTime<Utc>) -> Self {
        Cell::Text(v.format(TIMESTAMP_FORMAT).to_string())
    }
}

impl<T: Into<Cell>> From<Option<T>> for Cell {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(Cell::Null)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Table {
    pub name: String,
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Cell>>,
}

impl Table {
    fn new(kind: ReportKind, columns: &[&str]) -> Self {
        Self {
            name: kind.as_str().to_string(),
            columns: columns.iter().map(|c| c.to_string()).collect(),
            rows: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Index of a column by header.
    pub fn column(&self, header: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == header)
    }
}

/// The reports the warehouse can produce.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportKind {
    Inventory,
    LowStock,
    MonthlyMovements,
    Loans,
    Deployments,
}

impl ReportKind {
    pub const ALL: [ReportKind; 5] = [
        ReportKind::Inventory,
        ReportKind::LowStock,
        ReportKind::MonthlyMovements,
        ReportKind::Loans,
        ReportKind::Deployments,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ReportKind::Inventory => "inventory",
            ReportKind::LowStock => "low_stock",
            ReportKind::MonthlyMovements => "monthly_movements",
            ReportKind::Loans => "loans",
            ReportKind::Deployments => "deployments",
        }
    }
}

impl core::fmt::Display for ReportKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl core::str::FromStr for ReportKind {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase().replace('-', "_");
        ReportKind::ALL
            .into_iter()
            .find(|k| k.as_str() == wanted)
            .ok_or_else(|| DomainError::validation(format!("unknown report: {s}")))
    }
}

/// Full catalog, one row per material.
pub fn inventory_table(materials: &[Material]) -> Table {
    let mut table = Table::new(
        ReportKind::Inventory,
        &[
            "ID",
            "Código",
            "Nombre",
            "Descripción",
            "Categoría",
            "Unidad",
            "Cantidad",
            "Stock Mín",
            "Ubicación",
            "Costo Unit",
            "Fecha Registro",
            "Notas",
            "Estado",
        ],
    );
    table.rows = materials
        .iter()
        .map(|m| {
            vec![
                m.id.get().into(),
                m.code.as_str().into(),
                m.name.as_str().into(),
                m.description.as_str().into(),
                m.category.as_str().into(),
                m.unit.as_str().into(),
                m.current_quantity.into(),
                m.reorder_threshold.into(),
                m.location.as_str().into(),
                m.unit_cost.into(),
                m.registered_at.into(),
                m.notes.as_str().into(),
                m.status().as_str().into(),
            ]
        })
        .collect();
    table
}

/// Materials at or below their reorder threshold. Rows keep the caller's order.
pub fn low_stock_table(materials: &[Material]) -> Table {
    let mut table = Table::new(
        ReportKind::LowStock,
        &["Código", "Nombre", "Categoría", "Cantidad", "Stock Mín", "Ubicación"],
    );
    table.rows = materials
        .iter()
        .map(|m| {
            vec![
                m.code.as_str().into(),
                m.name.as_str().into(),
                m.category.as_str().into(),
                m.current_quantity.into(),
                m.reorder_threshold.into(),
                m.location.as_str().into(),
            ]
        })
        .collect();
    table
}

pub fn movements_table(movements: &[MovementRecord]) -> Table {
    let mut table = Table::new(
        ReportKind::MonthlyMovements,
        &[
            "Fecha",
            "Código",
            "Material",
            "Tipo",
            "Cantidad",
            "Responsable",
            "Destino/Origen",
            "Observaciones",
        ],
    );
    table.rows = movements
        .iter()
        .map(|r| {
            let m = &r.movement;
            vec![
                m.occurred_at.into(),
                r.material_code.as_str().into(),
                r.material_name.as_str().into(),
                m.kind.as_str().into(),
                m.amount.into(),
                m.actor.as_str().into(),
                m.counterparty.as_str().into(),
                m.notes.as_str().into(),
            ]
        })
        .collect();
    table
}

pub fn loans_table(loans: &[LoanRecord]) -> Table {
    let mut table = Table::new(
        ReportKind::Loans,
        &[
            "ID",
            "Fecha Préstamo",
            "Material",
            "Cantidad",
            "Prestado a",
            "Área",
            "Estado",
            "Fecha Devolución",
        ],
    );
    table.rows = loans
        .iter()
        .map(|r| {
            let l = &r.loan;
            vec![
                l.id.get().into(),
                l.loaned_at.into(),
                r.material_name.as_str().into(),
                l.amount.into(),
                l.borrower.as_str().into(),
                l.destination_area.as_str().into(),
                l.status.as_str().into(),
                l.returned_at.into(),
            ]
        })
        .collect();
    table
}

pub fn deployments_table(deployments: &[DeploymentRecord]) -> Table {
    let mut table = Table::new(
        ReportKind::Deployments,
        &[
            "ID",
            "Fecha Instalación",
            "Material",
            "Cantidad",
            "Equipo/Instalación",
            "Responsable",
            "Observaciones",
        ],
    );
    table.rows = deployments
        .iter()
        .map(|r| {
            let d = &r.deployment;
            vec![
                d.id.get().into(),
                d.installed_at.into(),
                r.material_name.as_str().into(),
                d.amount.into(),
                d.equipment.as_str().into(),
                d.responsible.as_str().into(),
                d.notes.as_str().into(),
            ]
        })
        .collect();
    table
}
