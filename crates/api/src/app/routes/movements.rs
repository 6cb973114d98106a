use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Query},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};

use ptar_core::MaterialId;
use ptar_inventory::{EntryRequest, ExitRequest};

use crate::app::services::AppServices;
use crate::app::{dto, errors};

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_movements))
        .route("/entry", post(register_entry))
        .route("/exit", post(register_exit))
}

/// History, newest first. `?material_id=` switches to that material's full ledger.
pub async fn list_movements(
    Extension(services): Extension<Arc<AppServices>>,
    Query(query): Query<dto::MovementsQuery>,
) -> axum::response::Response {
    if let Some(material_id) = query.material_id {
        return match services
            .queries()
            .movements_for_material(MaterialId::new(material_id))
            .await
        {
            Ok(movements) => (StatusCode::OK, Json(movements)).into_response(),
            Err(e) => errors::ledger_error_to_response(e),
        };
    }

    let kind = match query.kind() {
        Ok(k) => k,
        Err(e) => return errors::domain_error_to_response(e),
    };

    match services.queries().movement_history(kind, query.limit).await {
        Ok(records) => (StatusCode::OK, Json(records)).into_response(),
        Err(e) => errors::ledger_error_to_response(e),
    }
}

pub async fn register_entry(
    Extension(services): Extension<Arc<AppServices>>,
    Json(body): Json<EntryRequest>,
) -> axum::response::Response {
    match services.engine().entry(body).await {
        Ok(movement) => (StatusCode::CREATED, Json(movement)).into_response(),
        Err(e) => errors::ledger_error_to_response(e),
    }
}

pub async fn register_exit(
    Extension(services): Extension<Arc<AppServices>>,
    Json(body): Json<ExitRequest>,
) -> axum::response::Response {
    match services.engine().exit(body).await {
        Ok(movement) => (StatusCode::CREATED, Json(movement)).into_response(),
        Err(e) => errors::ledger_error_to_response(e),
    }
}
