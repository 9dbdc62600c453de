use axum::{Json, Router, http::StatusCode, routing::get};
use futures::future::join_all;
use serde::Serialize;
use serde_json::{Map, Value, json};
use std::future::Future;
use std::pin::Pin;

#[derive(Clone, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub name: &'static str,
    pub version: &'static str,
}

/// A boxed readiness probe; `Err` carries the reason.
pub type HealthCheckFuture<'a> = Pin<Box<dyn Future<Output = Result<(), String>> + Send + 'a>>;

/// Runs probes concurrently.
///
/// 200 with `"status": "ready"` when all pass, otherwise 503 with each
/// failing probe's reason under its name.
pub async fn run_health_checks(
    checks: Vec<(&'static str, HealthCheckFuture<'_>)>,
) -> (StatusCode, Json<Value>) {
    let (names, futures): (Vec<_>, Vec<_>) = checks.into_iter().unzip();
    let results = join_all(futures).await;

    let mut body = Map::new();
    let mut all_healthy = true;
    for (name, result) in names.into_iter().zip(results) {
        match result {
            Ok(()) => {
                body.insert(name.to_string(), json!("ok"));
            }
            Err(reason) => {
                all_healthy = false;
                tracing::warn!(check = name, %reason, "Readiness check failed");
                body.insert(name.to_string(), json!(reason));
            }
        }
    }

    let (status, label) = if all_healthy {
        (StatusCode::OK, "ready")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "not ready")
    };
    body.insert("status".to_string(), json!(label));
    (status, Json(Value::Object(body)))
}

/// `GET /health`: liveness only, never touches a backend.
pub fn health_router(name: &'static str, version: &'static str) -> Router {
    let response = HealthResponse {
        status: "healthy",
        name,
        version,
    };
    Router::new().route("/health", get(move || async move { Json(response) }))
}
