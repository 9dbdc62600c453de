use redis::Client;
use redis::aio::ConnectionManager;
use tracing::info;

use super::RedisConfig;
use crate::common::{RetryConfig, retry, retry_with_backoff};

/// Opens a `ConnectionManager` and proves it with a `PING`.
///
/// The manager reconnects on its own after this point.
pub async fn connect(config: &RedisConfig) -> redis::RedisResult<ConnectionManager> {
    let client = Client::open(config.connection_url())?;
    let manager = ConnectionManager::new(client).await?;

    let mut conn = manager.clone();
    let _: String = redis::cmd("PING").query_async(&mut conn).await?;

    info!(database = ?config.database, "Connected to Redis");
    Ok(manager)
}

pub async fn connect_with_retry(
    config: &RedisConfig,
    retry_config: Option<RetryConfig>,
) -> redis::RedisResult<ConnectionManager> {
    match retry_config {
        Some(policy) => retry_with_backoff(|| connect(config), policy).await,
        None => retry(|| connect(config)).await,
    }
}
