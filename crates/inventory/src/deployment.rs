use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use ptar_core::{DeploymentId, MaterialId, Quantity};

/// Stock installed into equipment ("material en uso").
///
/// There is no way back into the warehouse: writing a deployment off removes the
/// record and leaves both stock and ledger untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Deployment {
    pub id: DeploymentId,
    pub material_id: MaterialId,
    pub amount: Quantity,
    pub installed_at: DateTime<Utc>,
    pub equipment: String,
    pub responsible: String,
    pub notes: String,
}

/// A deployment joined with the owning material's display fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeploymentRecord {
    #[serde(flatten)]
    pub deployment: Deployment,
    pub material_code: String,
    pub material_name: String,
}
