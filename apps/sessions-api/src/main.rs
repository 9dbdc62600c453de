//! Sessions API - token and session lifecycle over HTTP

use axum_helpers::{ShutdownCoordinator, health_router, serve, with_http_layers};
use core_config::tracing::{init_tracing, install_color_eyre};
use domain_sessions::{
    AuthBackends, AuthService, LogNotificationSender, PostgresAccountStore,
    PostgresSessionRepository, RedisTtlStore, SystemClock, ensure_schema, handlers,
    spawn_purge_job,
};
use std::sync::Arc;
use tracing::info;

mod config;
mod ready;

use config::Config;
use ready::{ReadyState, ready_router};

#[tokio::main]
async fn main() -> eyre::Result<()> {
    // Install color-eyre first for colored error output (before any fallible operations)
    install_color_eyre();

    let config = Config::from_env()?;
    init_tracing(&config.environment);

    // Initialize database connections concurrently
    let postgres_future = async {
        database::postgres::connect_with_retry(&config.database, None)
            .await
            .map_err(|e| eyre::eyre!("PostgreSQL connection failed: {}", e))
    };
    let redis_future = async {
        database::redis::connect_with_retry(&config.redis, None)
            .await
            .map_err(|e| eyre::eyre!("Redis connection failed: {}", e))
    };
    let (db, redis) = tokio::try_join!(postgres_future, redis_future)?;

    ensure_schema(&db).await?;

    let clock = Arc::new(SystemClock);
    let service = AuthService::build(
        config.auth.clone(),
        Arc::new(config.signing_key.clone()),
        AuthBackends {
            accounts: Arc::new(PostgresAccountStore::new(db.clone())),
            sessions: Arc::new(PostgresSessionRepository::new(db.clone())),
            ttl_store: Arc::new(RedisTtlStore::new(
                redis.clone(),
                config.auth.store_op_timeout,
            )),
            notifier: Arc::new(LogNotificationSender),
            clock,
        },
    );

    let coordinator = ShutdownCoordinator::new();

    let purge_shutdown = coordinator.clone();
    let purge_job = spawn_purge_job(
        service.sessions(),
        config.auth.sessions.purge_interval,
        async move { purge_shutdown.wait().await },
    );

    let app = with_http_layers(
        handlers::router(service)
            .merge(health_router(config.name, config.version))
            .merge(ready_router(ReadyState {
                db: db.clone(),
                redis: redis.clone(),
            })),
    );

    info!(
        name = config.name,
        version = config.version,
        "Starting sessions API"
    );

    serve(app, &config.server, coordinator, async move {
        info!("Shutting down: waiting for purge job and closing connections");
        if let Err(e) = purge_job.await {
            tracing::error!("Purge job ended abnormally: {}", e);
        }

        match db.close().await {
            Ok(_) => info!("PostgreSQL connection closed successfully"),
            Err(e) => tracing::error!("Error closing PostgreSQL: {}", e),
        }
        // Redis ConnectionManager closes automatically on drop
        drop(redis);
    })
    .await
    .map_err(|e| eyre::eyre!("Server error: {}", e))?;

    info!("Sessions API shutdown complete");
    Ok(())
}
