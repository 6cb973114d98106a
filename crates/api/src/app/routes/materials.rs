use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path, Query},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
};

use ptar_core::MaterialId;
use ptar_inventory::{MaterialUpdate, NewMaterial};

use crate::app::services::AppServices;
use crate::app::{dto, errors};

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_materials).post(create_material))
        .route("/next-code", get(next_code))
        .route(
            "/:id",
            get(get_material).put(update_material).delete(delete_material),
        )
}

fn parse_id(id: &str) -> Result<MaterialId, axum::response::Response> {
    id.parse().map_err(|_| errors::invalid_id("material"))
}

pub async fn list_materials(
    Extension(services): Extension<Arc<AppServices>>,
    Query(query): Query<dto::ListMaterialsQuery>,
) -> axum::response::Response {
    let filter = match query.into_filter() {
        Ok(f) => f,
        Err(e) => return errors::domain_error_to_response(e),
    };

    match services.catalog().list(&filter).await {
        Ok(materials) => (StatusCode::OK, Json(dto::material_views(materials))).into_response(),
        Err(e) => errors::ledger_error_to_response(e),
    }
}

pub async fn create_material(
    Extension(services): Extension<Arc<AppServices>>,
    Json(body): Json<NewMaterial>,
) -> axum::response::Response {
    let id = match services.catalog().create(body).await {
        Ok(id) => id,
        Err(e) => return errors::ledger_error_to_response(e),
    };

    match services.catalog().require(id).await {
        Ok(material) => (StatusCode::CREATED, Json(dto::MaterialView::from(material))).into_response(),
        Err(e) => errors::ledger_error_to_response(e),
    }
}

pub async fn get_material(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id = match parse_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    match services.catalog().require(id).await {
        Ok(material) => (StatusCode::OK, Json(dto::MaterialView::from(material))).into_response(),
        Err(e) => errors::ledger_error_to_response(e),
    }
}

pub async fn update_material(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
    Json(body): Json<MaterialUpdate>,
) -> axum::response::Response {
    let id = match parse_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    match services.catalog().update(id, body).await {
        Ok(material) => (StatusCode::OK, Json(dto::MaterialView::from(material))).into_response(),
        Err(e) => errors::ledger_error_to_response(e),
    }
}

pub async fn delete_material(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id = match parse_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    match services.catalog().delete(id).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => errors::ledger_error_to_response(e),
    }
}

pub async fn next_code(
    Extension(services): Extension<Arc<AppServices>>,
    Query(query): Query<dto::NextCodeQuery>,
) -> axum::response::Response {
    match services.catalog().next_code(&query.category).await {
        Ok(code) => (StatusCode::OK, Json(serde_json::json!({ "code": code }))).into_response(),
        Err(e) => errors::ledger_error_to_response(e),
    }
}
