//! Server bootstrap: layers, health endpoints, graceful shutdown.

mod app;
mod health;
mod shutdown;

pub use app::{serve, with_http_layers};
pub use health::{HealthCheckFuture, HealthResponse, health_router, run_health_checks};
pub use shutdown::{ShutdownCoordinator, shutdown_signal};
