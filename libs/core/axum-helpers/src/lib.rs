//! # Axum Helpers
//!
//! HTTP glue shared by the session service:
//!
//! - **[`errors`]**: the JSON error envelope every handler returns
//! - **[`extractors`]**: `ValidatedJson` and bearer-token parsing
//! - **[`server`]**: tracing layers, health/readiness routes, graceful shutdown

pub mod errors;
pub mod extractors;
pub mod server;

pub use errors::{ErrorResponse, not_found};
pub use extractors::{ValidatedJson, bearer_token};
pub use server::{
    HealthCheckFuture, ShutdownCoordinator, health_router, run_health_checks, serve,
    shutdown_signal, with_http_layers,
};
