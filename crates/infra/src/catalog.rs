//! SQLite-backed material catalog.
//!
//! Owns material records. `current_quantity` is written here only once, as the opening
//! balance of a new material; every later change goes through the stock engine.
//!
//! Deleting a material archives it: the row stays (its code remains reserved and its
//! movements, loans and deployments keep their history) but it disappears from every
//! read and rejects new stock mutations.

use std::sync::Arc;

use sqlx::{Row, SqlitePool};
use tracing::{info, instrument};

use ptar_core::{Clock, MaterialId, Quantity};
use ptar_inventory::code::{category_prefix, like_pattern, next_code};
use ptar_inventory::{Material, MaterialFilter, MaterialUpdate, NewMaterial};

use crate::errors::{LedgerError, LedgerResult, map_sqlx_error, sqlx_err};
use crate::ledger::{self, LedgerEntry};
use crate::retry::{RetryPolicy, with_retry};
use crate::rows::{self, MATERIAL_COLUMNS};

#[derive(Debug, Clone)]
pub struct MaterialCatalog {
    pool: SqlitePool,
    clock: Arc<dyn Clock>,
    retry: RetryPolicy,
}

impl MaterialCatalog {
    pub fn new(pool: SqlitePool, clock: Arc<dyn Clock>, retry: RetryPolicy) -> Self {
        Self { pool, clock, retry }
    }

    /// Register a material. A positive initial quantity is recorded as an opening
    /// ENTRY movement in the same transaction.
    #[instrument(skip(self, new), fields(code = %new.code))]
    pub async fn create(&self, new: NewMaterial) -> LedgerResult<MaterialId> {
        new.validate()?;
        with_retry(&self.retry, "create_material", || self.try_create(&new)).await
    }

    async fn try_create(&self, new: &NewMaterial) -> LedgerResult<MaterialId> {
        let at = self.clock.now();
        let code = new.code.trim();

        let mut tx = self.pool.begin().await.map_err(sqlx_err("create_material"))?;

        let result = sqlx::query(
            r#"
            INSERT INTO materials (
                code, name, description, category, unit, location, notes,
                current_quantity, reorder_threshold, unit_cost, registered_at, image_path
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(code)
        .bind(new.name.trim())
        .bind(&new.description)
        .bind(new.category.trim())
        .bind(&new.unit)
        .bind(new.location.trim())
        .bind(&new.notes)
        .bind(new.initial_quantity.milli())
        .bind(new.reorder_threshold.milli())
        .bind(new.unit_cost)
        .bind(at)
        .bind(new.image_path.as_deref())
        .execute(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("create_material", Some(code), e))?;

        let id = MaterialId::new(result.last_insert_rowid());

        if new.initial_quantity.is_positive() {
            ledger::append(&mut *tx, LedgerEntry::opening_balance(id, new.initial_quantity, at)).await?;
        }

        tx.commit().await.map_err(sqlx_err("create_material"))?;

        info!(material_id = %id, code, "material created");
        Ok(id)
    }

    /// Active material by id.
    #[instrument(skip(self))]
    pub async fn get(&self, id: MaterialId) -> LedgerResult<Option<Material>> {
        let row = sqlx::query(&format!(
            "SELECT {MATERIAL_COLUMNS} FROM materials WHERE id = ? AND archived_at IS NULL"
        ))
        .bind(id.get())
        .fetch_optional(&self.pool)
        .await
        .map_err(sqlx_err("get_material"))?;

        row.as_ref().map(rows::material).transpose()
    }

    /// Like [`MaterialCatalog::get`] but missing materials are an error.
    pub async fn require(&self, id: MaterialId) -> LedgerResult<Material> {
        self.get(id).await?.ok_or(LedgerError::MaterialNotFound(id))
    }

    #[instrument(skip(self))]
    pub async fn get_by_code(&self, code: &str) -> LedgerResult<Option<Material>> {
        let row = sqlx::query(&format!(
            "SELECT {MATERIAL_COLUMNS} FROM materials WHERE code = ? AND archived_at IS NULL"
        ))
        .bind(code.trim())
        .fetch_optional(&self.pool)
        .await
        .map_err(sqlx_err("get_material_by_code"))?;

        row.as_ref().map(rows::material).transpose()
    }

    /// First active material with exactly this name (oldest wins on duplicates).
    #[instrument(skip(self))]
    pub async fn find_by_name(&self, name: &str) -> LedgerResult<Option<Material>> {
        let row = sqlx::query(&format!(
            "SELECT {MATERIAL_COLUMNS} FROM materials \
             WHERE name = ? AND archived_at IS NULL ORDER BY id LIMIT 1"
        ))
        .bind(name.trim())
        .fetch_optional(&self.pool)
        .await
        .map_err(sqlx_err("find_material_by_name"))?;

        row.as_ref().map(rows::material).transpose()
    }

    /// Active materials matching `filter`, ordered by name.
    #[instrument(skip(self))]
    pub async fn list(&self, filter: &MaterialFilter) -> LedgerResult<Vec<Material>> {
        fetch_materials(&self.pool, filter).await
    }

    /// Replace the descriptive fields of a material. Quantity is never touched.
    #[instrument(skip(self, update), fields(code = %update.code))]
    pub async fn update(&self, id: MaterialId, update: MaterialUpdate) -> LedgerResult<Material> {
        update.validate()?;
        with_retry(&self.retry, "update_material", || self.try_update(id, &update)).await
    }

    async fn try_update(&self, id: MaterialId, update: &MaterialUpdate) -> LedgerResult<Material> {
        let code = update.code.trim();
        let mut tx = self.pool.begin().await.map_err(sqlx_err("update_material"))?;

        let result = sqlx::query(
            r#"
            UPDATE materials
            SET code = ?, name = ?, description = ?, category = ?, unit = ?, location = ?,
                notes = ?, reorder_threshold = ?, unit_cost = ?, image_path = ?
            WHERE id = ? AND archived_at IS NULL
            "#,
        )
        .bind(code)
        .bind(update.name.trim())
        .bind(&update.description)
        .bind(update.category.trim())
        .bind(&update.unit)
        .bind(update.location.trim())
        .bind(&update.notes)
        .bind(update.reorder_threshold.milli())
        .bind(update.unit_cost)
        .bind(update.image_path.as_deref())
        .bind(id.get())
        .execute(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("update_material", Some(code), e))?;

        if result.rows_affected() == 0 {
            return Err(LedgerError::MaterialNotFound(id));
        }

        let row = sqlx::query(&format!("SELECT {MATERIAL_COLUMNS} FROM materials WHERE id = ?"))
            .bind(id.get())
            .fetch_one(&mut *tx)
            .await
            .map_err(sqlx_err("update_material"))?;
        let material = rows::material(&row)?;

        tx.commit().await.map_err(sqlx_err("update_material"))?;

        info!(material_id = %id, "material updated");
        Ok(material)
    }

    /// Archive a material. Refused while it still has open loans.
    #[instrument(skip(self))]
    pub async fn delete(&self, id: MaterialId) -> LedgerResult<()> {
        with_retry(&self.retry, "delete_material", || self.try_delete(id)).await
    }

    async fn try_delete(&self, id: MaterialId) -> LedgerResult<()> {
        let at = self.clock.now();
        let mut tx = self.pool.begin().await.map_err(sqlx_err("delete_material"))?;

        let result = sqlx::query(
            r#"
            UPDATE materials SET archived_at = ?
            WHERE id = ? AND archived_at IS NULL
              AND NOT EXISTS (SELECT 1 FROM loans WHERE material_id = ? AND status = 'OPEN')
            "#,
        )
        .bind(at)
        .bind(id.get())
        .bind(id.get())
        .execute(&mut *tx)
        .await
        .map_err(sqlx_err("delete_material"))?;

        if result.rows_affected() == 0 {
            let active: Option<i64> =
                sqlx::query_scalar("SELECT id FROM materials WHERE id = ? AND archived_at IS NULL")
                    .bind(id.get())
                    .fetch_optional(&mut *tx)
                    .await
                    .map_err(sqlx_err("delete_material"))?;
            return Err(match active {
                Some(_) => LedgerError::Validation(format!(
                    "material {id} has open loans; return them before deleting"
                )),
                None => LedgerError::MaterialNotFound(id),
            });
        }

        tx.commit().await.map_err(sqlx_err("delete_material"))?;

        info!(material_id = %id, "material archived");
        Ok(())
    }

    /// Next free code for `category`. Archived materials keep their codes reserved.
    #[instrument(skip(self))]
    pub async fn next_code(&self, category: &str) -> LedgerResult<String> {
        let prefix = category_prefix(category);
        let rows = sqlx::query("SELECT code FROM materials WHERE code LIKE ?")
            .bind(like_pattern(prefix))
            .fetch_all(&self.pool)
            .await
            .map_err(sqlx_err("next_code"))?;

        let codes = rows
            .iter()
            .map(|row| row.try_get::<String, _>("code"))
            .collect::<Result<Vec<_>, _>>()
            .map_err(sqlx_err("next_code"))?;

        Ok(next_code(category, codes.iter().map(String::as_str))?)
    }
}

/// Active materials, category and location filtered in SQL, search and status after.
pub(crate) async fn fetch_materials(pool: &SqlitePool, filter: &MaterialFilter) -> LedgerResult<Vec<Material>> {
    let mut sql = format!("SELECT {MATERIAL_COLUMNS} FROM materials WHERE archived_at IS NULL");
    if filter.category_eq().is_some() {
        sql.push_str(" AND category = ?");
    }
    if filter.location_eq().is_some() {
        sql.push_str(" AND location = ?");
    }
    sql.push_str(" ORDER BY name, id");

    let mut query = sqlx::query(&sql);
    if let Some(category) = filter.category_eq() {
        query = query.bind(category);
    }
    if let Some(location) = filter.location_eq() {
        query = query.bind(location);
    }

    let rows = query
        .fetch_all(pool)
        .await
        .map_err(sqlx_err("list_materials"))?;

    let mut materials = Vec::with_capacity(rows.len());
    for row in &rows {
        let material = rows::material(row)?;
        if filter.matches_derived(&material) {
            materials.push(material);
        }
    }
    Ok(materials)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::test_warehouse;
    use ptar_inventory::{MovementKind, StockStatus};

    fn valve() -> NewMaterial {
        NewMaterial::new("FON-001", "Válvula 2\"")
            .with_category("Fontanería y Ferretería")
            .with_location("Anaquel A")
            .with_initial_quantity(Quantity::units(10))
            .with_reorder_threshold(Quantity::units(5))
            .with_unit_cost(150.0)
    }

    #[tokio::test]
    async fn create_records_opening_balance() {
        let warehouse = test_warehouse().await;
        let id = warehouse.catalog().create(valve()).await.unwrap();

        let material = warehouse.catalog().require(id).await.unwrap();
        assert_eq!(material.current_quantity, Quantity::units(10));
        assert_eq!(material.status(), StockStatus::Normal);

        let ledger = warehouse.queries().movements_for_material(id).await.unwrap();
        assert_eq!(ledger.len(), 1);
        assert_eq!(ledger[0].kind, MovementKind::Entry);
        assert_eq!(ledger[0].amount, Quantity::units(10));
        assert_eq!(ledger[0].counterparty, ledger::OPENING_BALANCE);
    }

    #[tokio::test]
    async fn material_without_stock_has_empty_ledger() {
        let warehouse = test_warehouse().await;
        let id = warehouse
            .catalog()
            .create(NewMaterial::new("SEG-001", "Casco"))
            .await
            .unwrap();

        assert!(warehouse.queries().movements_for_material(id).await.unwrap().is_empty());
        assert_eq!(
            warehouse.catalog().require(id).await.unwrap().status(),
            StockStatus::OutOfStock
        );
    }

    #[tokio::test]
    async fn duplicate_code_is_rejected_and_first_record_survives() {
        let warehouse = test_warehouse().await;
        let catalog = warehouse.catalog();
        let first = catalog.create(valve()).await.unwrap();

        let err = catalog
            .create(NewMaterial::new("FON-001", "Otra válvula"))
            .await
            .unwrap_err();
        assert_eq!(err, LedgerError::DuplicateCode("FON-001".to_string()));

        let kept = catalog.get_by_code("FON-001").await.unwrap().unwrap();
        assert_eq!(kept.id, first);
        assert_eq!(kept.name, "Válvula 2\"");
        assert_eq!(catalog.list(&MaterialFilter::default()).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn blank_fields_fail_validation_before_touching_storage() {
        let warehouse = test_warehouse().await;
        let err = warehouse
            .catalog()
            .create(NewMaterial::new("LIM-001", "  "))
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::Validation(_)));
        assert!(warehouse.catalog().list(&MaterialFilter::default()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn update_changes_fields_but_never_quantity() {
        let warehouse = test_warehouse().await;
        let catalog = warehouse.catalog();
        let id = catalog.create(valve()).await.unwrap();

        let mut update = MaterialUpdate::from(&catalog.require(id).await.unwrap());
        update.name = "Válvula de bola 2\"".to_string();
        update.reorder_threshold = Quantity::units(12);

        let updated = catalog.update(id, update).await.unwrap();
        assert_eq!(updated.name, "Válvula de bola 2\"");
        assert_eq!(updated.current_quantity, Quantity::units(10));
        assert_eq!(updated.status(), StockStatus::Low);
    }

    #[tokio::test]
    async fn update_to_taken_code_is_duplicate() {
        let warehouse = test_warehouse().await;
        let catalog = warehouse.catalog();
        catalog.create(valve()).await.unwrap();
        let other = catalog.create(NewMaterial::new("FON-002", "Codo")).await.unwrap();

        let mut update = MaterialUpdate::from(&catalog.require(other).await.unwrap());
        update.code = "FON-001".to_string();
        let err = catalog.update(other, update).await.unwrap_err();
        assert_eq!(err, LedgerError::DuplicateCode("FON-001".to_string()));
    }

    #[tokio::test]
    async fn update_of_missing_material_is_not_found() {
        let warehouse = test_warehouse().await;
        let update = MaterialUpdate {
            code: "MAT-001".to_string(),
            name: "Cinta".to_string(),
            ..MaterialUpdate::default()
        };
        let err = warehouse
            .catalog()
            .update(MaterialId::new(42), update)
            .await
            .unwrap_err();
        assert_eq!(err, LedgerError::MaterialNotFound(MaterialId::new(42)));
    }

    #[tokio::test]
    async fn list_filters_and_orders_by_name() {
        let warehouse = test_warehouse().await;
        let catalog = warehouse.catalog();
        catalog.create(valve()).await.unwrap();
        catalog
            .create(
                NewMaterial::new("FON-002", "Codo PVC")
                    .with_category("Fontanería y Ferretería")
                    .with_location("Anaquel B")
                    .with_initial_quantity(Quantity::units(2))
                    .with_reorder_threshold(Quantity::units(5)),
            )
            .await
            .unwrap();
        catalog
            .create(NewMaterial::new("SEG-001", "Casco").with_category("Seguridad"))
            .await
            .unwrap();

        let all = catalog.list(&MaterialFilter::default()).await.unwrap();
        let names: Vec<_> = all.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names, ["Casco", "Codo PVC", "Válvula 2\""]);

        let plumbing = catalog
            .list(&MaterialFilter::default().category("Fontanería y Ferretería"))
            .await
            .unwrap();
        assert_eq!(plumbing.len(), 2);

        let low = catalog
            .list(&MaterialFilter::default().status(StockStatus::Low))
            .await
            .unwrap();
        assert_eq!(low.len(), 1);
        assert_eq!(low[0].code, "FON-002");

        let searched = catalog
            .list(&MaterialFilter::default().search("válvula").location("Anaquel A"))
            .await
            .unwrap();
        assert_eq!(searched.len(), 1);
        assert_eq!(searched[0].code, "FON-001");
    }

    #[tokio::test]
    async fn find_by_name_matches_exactly() {
        let warehouse = test_warehouse().await;
        let id = warehouse.catalog().create(valve()).await.unwrap();

        let found = warehouse.catalog().find_by_name("Válvula 2\"").await.unwrap();
        assert_eq!(found.map(|m| m.id), Some(id));
        assert!(warehouse.catalog().find_by_name("Válvula").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn delete_archives_and_keeps_code_reserved() {
        let warehouse = test_warehouse().await;
        let catalog = warehouse.catalog();
        let id = catalog.create(valve()).await.unwrap();

        catalog.delete(id).await.unwrap();
        assert!(catalog.get(id).await.unwrap().is_none());
        assert!(catalog.list(&MaterialFilter::default()).await.unwrap().is_empty());

        let err = catalog.create(NewMaterial::new("FON-001", "Reemplazo")).await.unwrap_err();
        assert!(matches!(err, LedgerError::DuplicateCode(_)));
        assert_eq!(catalog.next_code("Fontanería y Ferretería").await.unwrap(), "FON-002");

        assert_eq!(catalog.delete(id).await.unwrap_err(), LedgerError::MaterialNotFound(id));
        assert_eq!(warehouse.queries().movements_for_material(id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn next_code_uses_numeric_maximum_per_prefix() {
        let warehouse = test_warehouse().await;
        let catalog = warehouse.catalog();
        assert_eq!(catalog.next_code("Herramientas y Equipos").await.unwrap(), "HER-001");

        catalog.create(NewMaterial::new("HER-009", "Pinzas")).await.unwrap();
        catalog.create(NewMaterial::new("HER-010", "Llave")).await.unwrap();
        catalog.create(NewMaterial::new("MAT-077", "Cable")).await.unwrap();

        assert_eq!(catalog.next_code("Herramientas y Equipos").await.unwrap(), "HER-011");
        assert_eq!(catalog.next_code("Eléctrico").await.unwrap(), "MAT-078");
    }
}
