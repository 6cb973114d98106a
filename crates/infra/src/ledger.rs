//! Append-only movement ledger.
//!
//! Rows are only ever inserted, always on the connection of a transaction that also
//! changes the material's quantity, so a quantity change and its movement commit or
//! vanish together.

use chrono::{DateTime, Utc};
use sqlx::SqliteConnection;

use ptar_core::{MaterialId, MovementId, Quantity};
use ptar_inventory::{Movement, MovementKind, StockCommand};

use crate::errors::{LedgerResult, sqlx_err};

/// Counterparty written on the opening ENTRY of a material created with stock.
pub const OPENING_BALANCE: &str = "Saldo inicial";

/// A movement about to be appended.
#[derive(Debug, Clone)]
pub(crate) struct LedgerEntry<'a> {
    pub material_id: MaterialId,
    pub kind: MovementKind,
    pub amount: Quantity,
    pub at: DateTime<Utc>,
    pub actor: &'a str,
    pub counterparty: &'a str,
    pub notes: &'a str,
}

impl<'a> LedgerEntry<'a> {
    pub fn for_command<C: StockCommand>(command: &'a C, at: DateTime<Utc>) -> Self {
        Self {
            material_id: command.material_id(),
            kind: C::KIND,
            amount: command.amount(),
            at,
            actor: command.actor(),
            counterparty: command.counterparty(),
            notes: command.notes(),
        }
    }

    pub fn opening_balance(material_id: MaterialId, amount: Quantity, at: DateTime<Utc>) -> Self {
        Self {
            material_id,
            kind: MovementKind::Entry,
            amount,
            at,
            actor: "",
            counterparty: OPENING_BALANCE,
            notes: "",
        }
    }
}

pub(crate) async fn append(conn: &mut SqliteConnection, entry: LedgerEntry<'_>) -> LedgerResult<Movement> {
    let result = sqlx::query(
        r#"
        INSERT INTO movements (material_id, kind, amount, occurred_at, actor, counterparty, notes)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(entry.material_id.get())
    .bind(entry.kind.as_str())
    .bind(entry.amount.milli())
    .bind(entry.at)
    .bind(entry.actor)
    .bind(entry.counterparty)
    .bind(entry.notes)
    .execute(&mut *conn)
    .await
    .map_err(sqlx_err("append_movement"))?;

    Ok(Movement {
        id: MovementId::new(result.last_insert_rowid()),
        material_id: entry.material_id,
        kind: entry.kind,
        amount: entry.amount,
        occurred_at: entry.at,
        actor: entry.actor.to_string(),
        counterparty: entry.counterparty.to_string(),
        notes: entry.notes.to_string(),
    })
}
