use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
};

use ptar_inventory::ReportKind;

use crate::app::errors;
use crate::app::services::AppServices;

pub fn router() -> Router {
    Router::new()
        .route("/statistics", get(statistics))
        .route("/reports/:kind", get(report))
}

pub async fn statistics(Extension(services): Extension<Arc<AppServices>>) -> axum::response::Response {
    match services.queries().statistics().await {
        Ok(stats) => (StatusCode::OK, Json(stats)).into_response(),
        Err(e) => errors::ledger_error_to_response(e),
    }
}

/// One of the five export tables, as JSON `{ name, columns, rows }`.
pub async fn report(
    Extension(services): Extension<Arc<AppServices>>,
    Path(kind): Path<String>,
) -> axum::response::Response {
    let kind: ReportKind = match kind.parse() {
        Ok(k) => k,
        Err(e) => return errors::domain_error_to_response(e),
    };

    match services.queries().report(kind).await {
        Ok(table) => (StatusCode::OK, Json(table)).into_response(),
        Err(e) => errors::ledger_error_to_response(e),
    }
}
