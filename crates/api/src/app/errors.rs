use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::json;

use ptar_core::DomainError;
use ptar_infra::LedgerError;

/// The one place store errors become HTTP statuses.
pub fn ledger_error_to_response(err: LedgerError) -> axum::response::Response {
    let status = match &err {
        LedgerError::Validation(_) => StatusCode::BAD_REQUEST,
        LedgerError::DuplicateCode(_) => StatusCode::CONFLICT,
        LedgerError::MaterialNotFound(_) | LedgerError::NotFound { .. } => StatusCode::NOT_FOUND,
        LedgerError::InsufficientStock { .. } => StatusCode::UNPROCESSABLE_ENTITY,
        LedgerError::AlreadyReturned(_) => StatusCode::CONFLICT,
        LedgerError::Busy { .. } => {
            tracing::warn!(error = %err, "request failed on a busy database");
            StatusCode::SERVICE_UNAVAILABLE
        }
        LedgerError::Storage { .. } => {
            tracing::error!(error = %err, "request failed in storage");
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };

    json_error(status, err.code(), err.to_string())
}

/// Request-parsing failures (unknown kind, malformed filter value).
pub fn domain_error_to_response(err: DomainError) -> axum::response::Response {
    ledger_error_to_response(err.into())
}

pub fn json_error(
    status: StatusCode,
    code: &'static str,
    message: impl Into<String>,
) -> axum::response::Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}

pub fn invalid_id(entity: &str) -> axum::response::Response {
    json_error(
        StatusCode::BAD_REQUEST,
        "invalid_id",
        format!("invalid {entity} id"),
    )
}
