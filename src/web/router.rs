use axum::{routing::{get, post}, Router};
use tower_http::cors::{Any, CorsLayer};

use crate::state::AppState;
use crate::telemetry::http_trace_layer;
use super::handlers::{healthz, index, solve, solve_runs, solve_status};

pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(index))
        .route("/healthz", get(healthz))
        .route("/solve", post(solve))
        .route("/solve/status", get(solve_status))
        .route("/solve/runs", get(solve_runs))
        .layer(http_trace_layer())
        .layer(cors)
        .with_state(state)
}
