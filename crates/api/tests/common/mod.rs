#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Method, Request};
use axum::response::Response;
use axum::Router;
use http_body_util::BodyExt;
use roomcraft_api::config::{LogFormat, ServerConfig};
use roomcraft_api::router::build_app_router;
use roomcraft_api::state::AppState;
use roomcraft_gateway::ImageOptions;
use roomcraft_pipeline::testing::{InMemoryProjectStore, ScriptedGateway};
use roomcraft_pipeline::{PipelineOrchestrator, RetryPolicy};
use tower::ServiceExt;

pub const USER_ID: i64 = 7;

/// Build a test `ServerConfig` with safe defaults.
pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        request_timeout_secs: 30,
        shutdown_timeout_secs: 5,
        database_url: "postgres://unused".to_string(),
        log_format: LogFormat::Text,
    }
}

/// The application router wired to an in-memory store and a scripted
/// gateway, with handles to both for arranging and inspecting a test.
pub struct TestApp {
    pub router: Router,
    pub store: Arc<InMemoryProjectStore>,
    pub gateway: Arc<ScriptedGateway>,
}

/// Build the full application router with the production middleware stack.
pub fn build_test_app() -> TestApp {
    let store = Arc::new(InMemoryProjectStore::new());
    let gateway = Arc::new(ScriptedGateway::new());
    let retry = RetryPolicy {
        max_retries: 1,
        base_delay: Duration::from_millis(1),
        max_delay: Duration::from_millis(5),
    };
    let orchestrator =
        PipelineOrchestrator::new(gateway.clone(), store.clone(), retry, ImageOptions::default());

    let state = AppState {
        config: Arc::new(test_config()),
        orchestrator: Arc::new(orchestrator),
    };

    TestApp {
        router: build_app_router(state),
        store,
        gateway,
    }
}

/// Send a GET request, optionally as `user_id`.
pub async fn get(app: &TestApp, uri: &str, user_id: Option<i64>) -> Response {
    send(app, Method::GET, uri, user_id, Body::empty()).await
}

/// Send a JSON POST request as `user_id`.
pub async fn post_json(
    app: &TestApp,
    uri: &str,
    user_id: Option<i64>,
    body: serde_json::Value,
) -> Response {
    send(app, Method::POST, uri, user_id, Body::from(body.to_string())).await
}

async fn send(
    app: &TestApp,
    method: Method,
    uri: &str,
    user_id: Option<i64>,
    body: Body,
) -> Response {
    let mut request = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json");
    if let Some(id) = user_id {
        request = request.header("x-user-id", id.to_string());
    }
    app.router
        .clone()
        .oneshot(request.body(body).unwrap())
        .await
        .unwrap()
}

/// Collect a response body and parse it as JSON.
pub async fn body_json(response: Response) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}
