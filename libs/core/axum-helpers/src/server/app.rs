use super::shutdown::ShutdownCoordinator;
use crate::errors::not_found;
use axum::Router;
use core_config::server::ServerConfig;
use std::future::Future;
use std::io;
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::{Level, info, warn};

/// Adds request tracing and the JSON 404 fallback.
pub fn with_http_layers(router: Router) -> Router {
    router.fallback(not_found).layer(
        TraceLayer::new_for_http()
            .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
            .on_response(DefaultOnResponse::new().level(Level::INFO)),
    )
}

/// Runs the server until `coordinator` fires, then runs `cleanup` bounded by
/// `server_config.shutdown_grace`.
///
/// Signal handling is wired here, so callers only need to hand the same
/// coordinator to their background jobs.
pub async fn serve<F>(
    router: Router,
    server_config: &ServerConfig,
    coordinator: ShutdownCoordinator,
    cleanup: F,
) -> io::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let listener = tokio::net::TcpListener::bind(server_config.address()).await?;
    info!("Server starting on {}", listener.local_addr()?);

    let signals = coordinator.clone();
    tokio::spawn(async move { signals.listen_for_signals().await });

    let drain = coordinator.clone();
    let serve_result = axum::serve(listener, router.into_make_service())
        .with_graceful_shutdown(async move { drain.wait().await })
        .await
        .inspect_err(|e| tracing::error!("Server encountered an error: {:?}", e));

    let grace = server_config.shutdown_grace;
    match tokio::time::timeout(grace, cleanup).await {
        Ok(()) => info!("Cleanup completed"),
        Err(_) => warn!(?grace, "Cleanup exceeded grace period, forcing shutdown"),
    }

    serve_result
}
