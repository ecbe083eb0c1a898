use axum::{extract::rejection::JsonRejection, extract::State, Json};
use serde_json::{json, Value};
use tracing::{info, warn};

use crate::domain::solve::{RunRecord, SolveRequest};
use crate::error::{AppError, Result};
use crate::state::AppState;

pub async fn index() -> Json<Value> {
    Json(json!({
        "message": "LLM Analysis Quiz Solver API",
        "endpoints": {
            "GET /": "This endpoint (API information)",
            "GET /healthz": "Health check endpoint",
            "POST /solve": "Solve quiz endpoint (requires email, secret, and url in JSON body)",
            "GET /solve/status": "Outcome of the most recent solve",
            "GET /solve/runs": "Recent solves, newest first"
        },
        "status": "running"
    }))
}

pub async fn healthz(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "uptime_seconds": state.started_at.elapsed().as_secs()
    }))
}

pub async fn solve(
    State(state): State<AppState>,
    payload: std::result::Result<Json<SolveRequest>, JsonRejection>,
) -> Result<Json<Value>> {
    let Json(req) = payload.map_err(|e| AppError::Validation(e.body_text()))?;

    if req.secret != *state.secret {
        warn!(email = %req.email, "rejected solve with invalid secret");
        return Err(AppError::InvalidSecret);
    }

    let run = state.runner.start(&state.store, &req.url).await;
    info!(run_id = %run.id, url = %req.url, email = %req.email, "verified, solve scheduled");

    Ok(Json(json!({ "status": "ok" })))
}

pub async fn solve_status(State(state): State<AppState>) -> Result<Json<RunRecord>> {
    state
        .runner
        .current()
        .await
        .map(Json)
        .ok_or_else(|| AppError::NotFound("no solve has been started".into()))
}

pub async fn solve_runs(State(state): State<AppState>) -> Json<Vec<RunRecord>> {
    Json(state.runner.history().await)
}
