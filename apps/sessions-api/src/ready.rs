use axum::{Json, Router, extract::State, http::StatusCode, routing::get};
use axum_helpers::{HealthCheckFuture, run_health_checks};
use database::postgres::DatabaseConnection;
use database::redis::ConnectionManager;
use serde_json::Value;

#[derive(Clone)]
pub struct ReadyState {
    pub db: DatabaseConnection,
    pub redis: ConnectionManager,
}

/// `GET /ready`: pings PostgreSQL and Redis.
pub fn ready_router(state: ReadyState) -> Router {
    Router::new()
        .route("/ready", get(ready))
        .with_state(state)
}

async fn ready(State(state): State<ReadyState>) -> (StatusCode, Json<Value>) {
    let database: HealthCheckFuture<'_> = Box::pin(async {
        database::postgres::check_health(&state.db)
            .await
            .map_err(|e| e.to_string())
    });
    let redis: HealthCheckFuture<'_> = Box::pin(async {
        database::redis::check_health(&state.redis)
            .await
            .map_err(|e| e.to_string())
    });

    run_health_checks(vec![("database", database), ("redis", redis)]).await
}
