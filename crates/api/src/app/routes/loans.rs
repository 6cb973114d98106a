use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path, Query},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};

use ptar_core::LoanId;
use ptar_inventory::{LoanRequest, LoanStatus};

use crate::app::services::AppServices;
use crate::app::{dto, errors};

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_loans).post(open_loan))
        .route("/:id/return", post(return_loan))
}

pub async fn list_loans(
    Extension(services): Extension<Arc<AppServices>>,
    Query(query): Query<dto::LoansQuery>,
) -> axum::response::Response {
    let status = match query.status() {
        Ok(v) => v,
        Err(e) => return errors::domain_error_to_response(e),
    };

    let loans = match status {
        Some(LoanStatus::Open) => services.loans().list_open_loans().await,
        Some(status) => services.loans().list_loans_with_status(status).await,
        None => services.loans().list_loans().await,
    };

    match loans {
        Ok(loans) => (StatusCode::OK, Json(loans)).into_response(),
        Err(e) => errors::ledger_error_to_response(e),
    }
}

pub async fn open_loan(
    Extension(services): Extension<Arc<AppServices>>,
    Json(body): Json<LoanRequest>,
) -> axum::response::Response {
    match services.engine().loan(body).await {
        Ok(loan) => (StatusCode::CREATED, Json(loan)).into_response(),
        Err(e) => errors::ledger_error_to_response(e),
    }
}

pub async fn return_loan(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id: LoanId = match id.parse() {
        Ok(v) => v,
        Err(_) => return errors::invalid_id("loan"),
    };

    match services.engine().return_loan(id).await {
        Ok(loan) => (StatusCode::OK, Json(loan)).into_response(),
        Err(e) => errors::ledger_error_to_response(e),
    }
}
