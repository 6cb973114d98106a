use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    routing::{delete, get},
};

use ptar_core::DeploymentId;
use ptar_inventory::DeployRequest;

use crate::app::errors;
use crate::app::services::AppServices;

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_deployments).post(register_deployment))
        .route("/:id", delete(writeoff_deployment))
}

pub async fn list_deployments(
    Extension(services): Extension<Arc<AppServices>>,
) -> axum::response::Response {
    match services.deployments().list_deployments().await {
        Ok(deployments) => (StatusCode::OK, Json(deployments)).into_response(),
        Err(e) => errors::ledger_error_to_response(e),
    }
}

pub async fn register_deployment(
    Extension(services): Extension<Arc<AppServices>>,
    Json(body): Json<DeployRequest>,
) -> axum::response::Response {
    match services.engine().deploy(body).await {
        Ok(deployment) => (StatusCode::CREATED, Json(deployment)).into_response(),
        Err(e) => errors::ledger_error_to_response(e),
    }
}

/// Removes the deployment record; its stock stays consumed.
pub async fn writeoff_deployment(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id: DeploymentId = match id.parse() {
        Ok(v) => v,
        Err(_) => return errors::invalid_id("deployment"),
    };

    match services.engine().writeoff_deployment(id).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => errors::ledger_error_to_response(e),
    }
}
