use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;

use quiz_solver::clients::agent::Agent;
use quiz_solver::domain::solve::SolveContext;
use quiz_solver::services::runner::AgentRunner;
use quiz_solver::state::AppState;
use quiz_solver::web::router::build_router;

const SECRET: &str = "test-secret";

/// Records the URLs it was asked to solve, then never finishes.
#[derive(Clone, Default)]
struct RecordingAgent {
    seen: Arc<Mutex<Vec<String>>>,
}

#[async_trait]
impl Agent for RecordingAgent {
    async fn run(&self, ctx: SolveContext) -> anyhow::Result<()> {
        self.seen.lock().unwrap().push(ctx.url.clone());
        std::future::pending::<()>().await;
        Ok(())
    }
}

struct QuickAgent;

#[async_trait]
impl Agent for QuickAgent {
    async fn run(&self, _ctx: SolveContext) -> anyhow::Result<()> {
        Ok(())
    }
}

fn test_state(agent: impl Agent + 'static) -> AppState {
    AppState::new(SECRET, AgentRunner::new(Arc::new(agent), Duration::from_secs(60)))
}

async fn call(app: Router, req: Request<Body>) -> (StatusCode, Value) {
    let response = app.oneshot(req).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn solve_body(secret: &str, url: &str) -> Value {
    json!({ "email": "student@example.com", "secret": secret, "url": url })
}

#[tokio::test]
async fn root_reports_running() {
    let (status, body) = call(build_router(test_state(QuickAgent)), get("/")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "running");
    assert_eq!(body["message"], "LLM Analysis Quiz Solver API");
    for route in ["GET /", "GET /healthz", "POST /solve", "GET /solve/status", "GET /solve/runs"] {
        assert!(body["endpoints"][route].is_string(), "missing {route}");
    }
}

#[tokio::test]
async fn healthz_uptime_is_non_decreasing() {
    let app = build_router(test_state(QuickAgent));
    let (status, first) = call(app.clone(), get("/healthz")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(first["status"], "ok");
    let (_, second) = call(app, get("/healthz")).await;

    let a = first["uptime_seconds"].as_u64().unwrap();
    let b = second["uptime_seconds"].as_u64().unwrap();
    assert!(b >= a);
}

#[tokio::test]
async fn wrong_secret_is_forbidden_and_changes_nothing() {
    let agent = RecordingAgent::default();
    let state = test_state(agent.clone());
    state.store.reset("https://example.com/previous", 1.0).await;

    let (status, body) = call(
        build_router(state.clone()),
        post_json("/solve", solve_body("nope", "https://example.com/quiz")),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["detail"], "Invalid secret");

    let url_time = state.store.url_time().await;
    assert_eq!(url_time.len(), 1);
    assert!(url_time.contains_key("https://example.com/previous"));
    assert!(state.runner.current().await.is_none());
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert!(agent.seen.lock().unwrap().is_empty());
}

#[tokio::test]
async fn valid_solve_resets_store_and_schedules_agent() {
    let agent = RecordingAgent::default();
    let state = test_state(agent.clone());
    let previous = state.store.reset("https://example.com/old", 1.0).await;
    previous.insert("b2xk").await;

    let (status, body) = call(
        build_router(state.clone()),
        post_json("/solve", solve_body(SECRET, "https://example.com/quiz")),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "status": "ok" }));

    let url_time = state.store.url_time().await;
    assert_eq!(url_time.len(), 1);
    assert!(url_time.contains_key("https://example.com/quiz"));
    assert!(state.store.encoded().await.is_empty().await);

    for _ in 0..100 {
        if !agent.seen.lock().unwrap().is_empty() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert_eq!(*agent.seen.lock().unwrap(), vec!["https://example.com/quiz".to_string()]);
}

#[tokio::test]
async fn second_solve_keeps_only_second_url() {
    let state = test_state(RecordingAgent::default());
    let app = build_router(state.clone());

    let (status, _) = call(app.clone(), post_json("/solve", solve_body(SECRET, "https://example.com/one"))).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = call(app.clone(), post_json("/solve", solve_body(SECRET, "https://example.com/two"))).await;
    assert_eq!(status, StatusCode::OK);

    let url_time = state.store.url_time().await;
    assert_eq!(url_time.len(), 1);
    assert!(url_time.contains_key("https://example.com/two"));

    let (status, runs) = call(app, get("/solve/runs")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(runs[0]["url"], "https://example.com/two");
    assert_eq!(runs[0]["state"], "running");
    assert_eq!(runs[1]["url"], "https://example.com/one");
    assert_eq!(runs[1]["state"], "cancelled");
}

#[tokio::test]
async fn missing_url_is_unprocessable_and_changes_nothing() {
    let state = test_state(RecordingAgent::default());
    let (status, body) = call(
        build_router(state.clone()),
        post_json("/solve", json!({ "email": "a@b.c", "secret": SECRET })),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body["detail"].is_string());
    assert!(state.store.url_time().await.is_empty());
    assert!(state.runner.current().await.is_none());
}

#[tokio::test]
async fn malformed_json_is_unprocessable() {
    let req = Request::builder()
        .method("POST")
        .uri("/solve")
        .header("content-type", "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let (status, _) = call(build_router(test_state(QuickAgent)), req).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn missing_content_type_is_unprocessable_and_changes_nothing() {
    let state = test_state(RecordingAgent::default());
    let req = Request::builder()
        .method("POST")
        .uri("/solve")
        .body(Body::from(solve_body(SECRET, "https://example.com/quiz").to_string()))
        .unwrap();
    let (status, body) = call(build_router(state.clone()), req).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body["detail"].is_string());
    assert!(state.store.url_time().await.is_empty());
    assert!(state.runner.current().await.is_none());
}

#[tokio::test]
async fn status_before_any_solve_is_not_found() {
    let (status, body) = call(build_router(test_state(QuickAgent)), get("/solve/status")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["detail"], "no solve has been started");
}

#[tokio::test]
async fn status_reports_solved_run() {
    let state = test_state(QuickAgent);
    let app = build_router(state);
    call(app.clone(), post_json("/solve", solve_body(SECRET, "https://example.com/quiz"))).await;

    let mut last = Value::Null;
    for _ in 0..100 {
        let (status, body) = call(app.clone(), get("/solve/status")).await;
        assert_eq!(status, StatusCode::OK);
        last = body;
        if last["state"] != "running" {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert_eq!(last["state"], "solved");
    assert_eq!(last["url"], "https://example.com/quiz");
    assert!(last["finished_at"].is_number());
}

#[tokio::test]
async fn cors_allows_any_origin() {
    let req = Request::builder()
        .uri("/healthz")
        .header("origin", "https://somewhere.example")
        .body(Body::empty())
        .unwrap();
    let response = build_router(test_state(QuickAgent)).oneshot(req).await.unwrap();
    assert_eq!(
        response.headers().get("access-control-allow-origin").unwrap(),
        "*"
    );
}
