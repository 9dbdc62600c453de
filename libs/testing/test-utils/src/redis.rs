//! Redis container for tests that need real TTL and script semantics.

use redis::Client;
use redis::aio::ConnectionManager;
use testcontainers::runners::AsyncRunner;
use testcontainers::{ContainerAsync, ImageExt};
use testcontainers_modules::redis::Redis;

/// Running Redis 8 container; stopped and removed on drop.
pub struct TestRedis {
    #[allow(dead_code)]
    container: ContainerAsync<Redis>,
    pub connection_string: String,
}

impl TestRedis {
    pub async fn new() -> Self {
        let container = Redis::default()
            .with_tag("8-alpine")
            .start()
            .await
            .expect("Failed to start Redis container");

        let host_port = container
            .get_host_port_ipv4(6379)
            .await
            .expect("Failed to get Redis port");

        let connection_string = format!("redis://127.0.0.1:{}", host_port);
        tracing::info!(port = host_port, "Test Redis ready");

        Self {
            container,
            connection_string,
        }
    }

    /// A fresh `ConnectionManager`, the same handle production code receives.
    pub async fn manager(&self) -> ConnectionManager {
        let client =
            Client::open(self.connection_string.as_str()).expect("Failed to create Redis client");
        ConnectionManager::new(client)
            .await
            .expect("Failed to connect to Redis")
    }
}

impl Drop for TestRedis {
    fn drop(&mut self) {
        tracing::debug!("Cleaning up test Redis container");
    }
}
