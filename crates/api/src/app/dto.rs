use serde::{Deserialize, Serialize};

use ptar_core::DomainError;
use ptar_inventory::{LoanStatus, Material, MaterialFilter, MovementKind, StockStatus};

// -------------------------
// Query DTOs
// -------------------------

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ListMaterialsQuery {
    pub search: Option<String>,
    pub category: Option<String>,
    pub location: Option<String>,
    pub status: Option<String>,
}

impl ListMaterialsQuery {
    pub fn into_filter(self) -> Result<MaterialFilter, DomainError> {
        let status = non_blank(self.status)
            .map(|s| s.parse::<StockStatus>())
            .transpose()?;

        Ok(MaterialFilter {
            search: non_blank(self.search),
            category: non_blank(self.category),
            location: non_blank(self.location),
            status,
        })
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct NextCodeQuery {
    pub category: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct MovementsQuery {
    pub kind: Option<String>,
    pub limit: Option<u32>,
    pub material_id: Option<i64>,
}

impl MovementsQuery {
    pub fn kind(&self) -> Result<Option<MovementKind>, DomainError> {
        non_blank(self.kind.clone())
            .map(|k| k.parse::<MovementKind>())
            .transpose()
    }
}

/// `?status=open` or `?status=returned` narrows the listing; absent or `all` lists
/// every loan.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct LoansQuery {
    pub status: Option<String>,
}

impl LoansQuery {
    pub fn status(&self) -> Result<Option<LoanStatus>, DomainError> {
        match non_blank(self.status.clone()) {
            None => Ok(None),
            Some(s) if s.trim().eq_ignore_ascii_case("all") => Ok(None),
            Some(s) => s.parse::<LoanStatus>().map(Some),
        }
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

// -------------------------
// Response DTOs
// -------------------------

/// A material with its derived status, as every listing shows it.
#[derive(Debug, Serialize)]
pub struct MaterialView {
    #[serde(flatten)]
    pub material: Material,
    pub status: StockStatus,
}

impl From<Material> for MaterialView {
    fn from(material: Material) -> Self {
        Self {
            status: material.status(),
            material,
        }
    }
}

pub fn material_views(materials: Vec<Material>) -> Vec<MaterialView> {
    materials.into_iter().map(MaterialView::from).collect()
}
