use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub mod config;
pub mod db;
pub mod routes;

#[derive(Clone)]
pub struct AppState {
    pub db: db::Database,
}

/// Builds the full application router over `state`.
pub fn app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .merge(routes::companies::router())
        .merge(routes::invoices::router())
        .merge(routes::industries::router())
        .fallback(routes::fallback)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
