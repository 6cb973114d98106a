//! Row decoding shared by the store components.

use sqlx::Row;
use sqlx::sqlite::SqliteRow;

use ptar_core::{DeploymentId, LoanId, MaterialId, MovementId, Quantity};
use ptar_inventory::{
    Deployment, DeploymentRecord, Loan, LoanRecord, LoanStatus, Material, Movement, MovementKind,
    MovementRecord,
};

use crate::errors::{LedgerError, LedgerResult, sqlx_err};

pub(crate) const MATERIAL_COLUMNS: &str = "id, code, name, description, category, unit, location, notes, \
     current_quantity, reorder_threshold, unit_cost, registered_at, image_path";

pub(crate) const MOVEMENT_SELECT: &str = "SELECT mv.id, mv.material_id, mv.kind, mv.amount, mv.occurred_at, \
     mv.actor, mv.counterparty, mv.notes, m.code AS material_code, m.name AS material_name \
     FROM movements mv JOIN materials m ON m.id = mv.material_id";

pub(crate) const LOAN_SELECT: &str = "SELECT l.id, l.material_id, l.amount, l.loaned_at, l.returned_at, \
     l.borrower, l.destination_area, l.status, l.notes, m.code AS material_code, m.name AS material_name \
     FROM loans l JOIN materials m ON m.id = l.material_id";

pub(crate) const DEPLOYMENT_SELECT: &str = "SELECT d.id, d.material_id, d.amount, d.installed_at, \
     d.equipment, d.responsible, d.notes, m.code AS material_code, m.name AS material_name \
     FROM deployments d JOIN materials m ON m.id = d.material_id";

const OP: &str = "decode_row";

pub(crate) fn material(row: &SqliteRow) -> LedgerResult<Material> {
    Ok(Material {
        id: MaterialId::new(row.try_get("id").map_err(sqlx_err(OP))?),
        code: row.try_get("code").map_err(sqlx_err(OP))?,
        name: row.try_get("name").map_err(sqlx_err(OP))?,
        description: row.try_get("description").map_err(sqlx_err(OP))?,
        category: row.try_get("category").map_err(sqlx_err(OP))?,
        unit: row.try_get("unit").map_err(sqlx_err(OP))?,
        location: row.try_get("location").map_err(sqlx_err(OP))?,
        notes: row.try_get("notes").map_err(sqlx_err(OP))?,
        current_quantity: quantity(row, "current_quantity")?,
        reorder_threshold: quantity(row, "reorder_threshold")?,
        unit_cost: row.try_get("unit_cost").map_err(sqlx_err(OP))?,
        registered_at: row.try_get("registered_at").map_err(sqlx_err(OP))?,
        image_path: row.try_get("image_path").map_err(sqlx_err(OP))?,
    })
}

pub(crate) fn movement(row: &SqliteRow) -> LedgerResult<Movement> {
    let kind: String = row.try_get("kind").map_err(sqlx_err(OP))?;
    let kind: MovementKind = kind
        .parse()
        .map_err(|e| LedgerError::storage(OP, format!("corrupt movement kind: {e}")))?;

    Ok(Movement {
        id: MovementId::new(row.try_get("id").map_err(sqlx_err(OP))?),
        material_id: MaterialId::new(row.try_get("material_id").map_err(sqlx_err(OP))?),
        kind,
        amount: quantity(row, "amount")?,
        occurred_at: row.try_get("occurred_at").map_err(sqlx_err(OP))?,
        actor: row.try_get("actor").map_err(sqlx_err(OP))?,
        counterparty: row.try_get("counterparty").map_err(sqlx_err(OP))?,
        notes: row.try_get("notes").map_err(sqlx_err(OP))?,
    })
}

pub(crate) fn movement_record(row: &SqliteRow) -> LedgerResult<MovementRecord> {
    Ok(MovementRecord {
        movement: movement(row)?,
        material_code: row.try_get("material_code").map_err(sqlx_err(OP))?,
        material_name: row.try_get("material_name").map_err(sqlx_err(OP))?,
    })
}

pub(crate) fn loan(row: &SqliteRow) -> LedgerResult<Loan> {
    let status: String = row.try_get("status").map_err(sqlx_err(OP))?;
    let status: LoanStatus = status
        .parse()
        .map_err(|e| LedgerError::storage(OP, format!("corrupt loan status: {e}")))?;

    Ok(Loan {
        id: LoanId::new(row.try_get("id").map_err(sqlx_err(OP))?),
        material_id: MaterialId::new(row.try_get("material_id").map_err(sqlx_err(OP))?),
        amount: quantity(row, "amount")?,
        loaned_at: row.try_get("loaned_at").map_err(sqlx_err(OP))?,
        returned_at: row.try_get("returned_at").map_err(sqlx_err(OP))?,
        borrower: row.try_get("borrower").map_err(sqlx_err(OP))?,
        destination_area: row.try_get("destination_area").map_err(sqlx_err(OP))?,
        status,
        notes: row.try_get("notes").map_err(sqlx_err(OP))?,
    })
}

pub(crate) fn loan_record(row: &SqliteRow) -> LedgerResult<LoanRecord> {
    Ok(LoanRecord {
        loan: loan(row)?,
        material_code: row.try_get("material_code").map_err(sqlx_err(OP))?,
        material_name: row.try_get("material_name").map_err(sqlx_err(OP))?,
    })
}

pub(crate) fn deployment(row: &SqliteRow) -> LedgerResult<Deployment> {
    Ok(Deployment {
        id: DeploymentId::new(row.try_get("id").map_err(sqlx_err(OP))?),
        material_id: MaterialId::new(row.try_get("material_id").map_err(sqlx_err(OP))?),
        amount: quantity(row, "amount")?,
        installed_at: row.try_get("installed_at").map_err(sqlx_err(OP))?,
        equipment: row.try_get("equipment").map_err(sqlx_err(OP))?,
        responsible: row.try_get("responsible").map_err(sqlx_err(OP))?,
        notes: row.try_get("notes").map_err(sqlx_err(OP))?,
    })
}

pub(crate) fn deployment_record(row: &SqliteRow) -> LedgerResult<DeploymentRecord> {
    Ok(DeploymentRecord {
        deployment: deployment(row)?,
        material_code: row.try_get("material_code").map_err(sqlx_err(OP))?,
        material_name: row.try_get("material_name").map_err(sqlx_err(OP))?,
    })
}

/// Quantities are stored as INTEGER thousandths of a unit.
fn quantity(row: &SqliteRow, column: &str) -> LedgerResult<Quantity> {
    let milli: i64 = row.try_get(column).map_err(sqlx_err(OP))?;
    Ok(Quantity::from_milli(milli))
}

/// Decode every row with `decode`, stopping at the first failure.
pub(crate) fn decode_all<T>(
    rows: &[SqliteRow],
    decode: impl Fn(&SqliteRow) -> LedgerResult<T>,
) -> LedgerResult<Vec<T>> {
    rows.iter().map(decode).collect()
}
