use redis::aio::ConnectionManager;
use tracing::debug;

use crate::common::{DatabaseError, DatabaseResult};

/// `PING`, expecting `PONG`.
pub async fn check_health(conn: &ConnectionManager) -> DatabaseResult<()> {
    let mut conn = conn.clone();
    let response: String = redis::cmd("PING")
        .query_async(&mut conn)
        .await
        .map_err(|e| DatabaseError::HealthCheckFailed(format!("Redis health check failed: {}", e)))?;

    if response != "PONG" {
        return Err(DatabaseError::HealthCheckFailed(format!(
            "Redis PING returned unexpected response: {}",
            response
        )));
    }

    debug!("Redis health check passed");
    Ok(())
}
