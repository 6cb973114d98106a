use axum::Router;

pub mod deployments;
pub mod loans;
pub mod materials;
pub mod movements;
pub mod reports;
pub mod system;

/// Router for every warehouse endpoint except `/health`.
pub fn router() -> Router {
    Router::new()
        .nest("/materials", materials::router())
        .nest("/movements", movements::router())
        .nest("/loans", loans::router())
        .nest("/deployments", deployments::router())
        .merge(reports::router())
}
