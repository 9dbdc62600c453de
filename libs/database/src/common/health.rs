use std::future::Future;
use std::time::Instant;

use super::DatabaseResult;

/// Outcome of a single readiness probe.
#[derive(Debug, Clone)]
pub struct HealthStatus {
    pub healthy: bool,
    pub message: Option<String>,
    pub response_time_ms: u64,
}

impl HealthStatus {
    pub fn healthy(response_time_ms: u64) -> Self {
        Self {
            healthy: true,
            message: None,
            response_time_ms,
        }
    }

    pub fn unhealthy(message: String, response_time_ms: u64) -> Self {
        Self {
            healthy: false,
            message: Some(message),
            response_time_ms,
        }
    }

    /// Runs `check` and records how long it took.
    pub async fn measure<F>(check: F) -> Self
    where
        F: Future<Output = DatabaseResult<()>>,
    {
        let start = Instant::now();
        let result = check.await;
        let elapsed = start.elapsed().as_millis() as u64;

        match result {
            Ok(()) => Self::healthy(elapsed),
            Err(e) => Self::unhealthy(e.to_string(), elapsed),
        }
    }
}
