use async_trait::async_trait;
use redis::{AsyncCommands, Script, aio::ConnectionManager};
use std::future::Future;
use std::time::Duration;

use super::TtlStore;
use crate::error::{StoreError, StoreResult};

// Attaches the TTL only to a counter that has none, so a key created by SET
// keeps its original expiry.
const INCREMENT_SCRIPT: &str = r"
local n = redis.call('INCR', KEYS[1])
if redis.call('PTTL', KEYS[1]) == -1 then
    redis.call('PEXPIRE', KEYS[1], ARGV[1])
end
return n
";

/// Redis-backed [`TtlStore`]. Every command runs under `op_timeout`.
#[derive(Clone)]
pub struct RedisTtlStore {
    conn: ConnectionManager,
    op_timeout: Duration,
    increment: Script,
}

impl RedisTtlStore {
    pub fn new(conn: ConnectionManager, op_timeout: Duration) -> Self {
        tracing::info!(?op_timeout, "Redis TTL store initialized");
        Self {
            conn,
            op_timeout,
            increment: Script::new(INCREMENT_SCRIPT),
        }
    }

    async fn bounded<T, F>(&self, op: F) -> StoreResult<T>
    where
        F: Future<Output = redis::RedisResult<T>>,
    {
        match tokio::time::timeout(self.op_timeout, op).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => Err(StoreError::Unavailable(e.to_string())),
            Err(_) => Err(StoreError::Timeout(self.op_timeout)),
        }
    }
}

fn millis(ttl: Duration) -> u64 {
    (ttl.as_millis() as u64).max(1)
}

#[async_trait]
impl TtlStore for RedisTtlStore {
    async fn set(&self, key: &str, value: &str, ttl: Duration) -> StoreResult<()> {
        let mut conn = self.conn.clone();
        self.bounded(conn.pset_ex::<_, _, ()>(key, value, millis(ttl)))
            .await
    }

    async fn get(&self, key: &str) -> StoreResult<Option<String>> {
        let mut conn = self.conn.clone();
        self.bounded(conn.get::<_, Option<String>>(key)).await
    }

    async fn exists(&self, key: &str) -> StoreResult<bool> {
        let mut conn = self.conn.clone();
        self.bounded(conn.exists::<_, bool>(key)).await
    }

    async fn delete(&self, keys: &[String]) -> StoreResult<u64> {
        if keys.is_empty() {
            return Ok(0);
        }
        let mut conn = self.conn.clone();
        self.bounded(conn.del::<_, u64>(keys)).await
    }

    async fn increment(&self, key: &str, first_ttl: Duration) -> StoreResult<i64> {
        let mut conn = self.conn.clone();
        let mut invocation = self.increment.key(key);
        invocation.arg(millis(first_ttl));
        self.bounded(invocation.invoke_async::<i64>(&mut conn)).await
    }

    async fn remaining_ttl(&self, key: &str) -> StoreResult<Option<Duration>> {
        let mut conn = self.conn.clone();
        let pttl: i64 = self.bounded(conn.pttl::<_, i64>(key)).await?;
        // -2: no key, -1: no expiry
        Ok((pttl >= 0).then(|| Duration::from_millis(pttl as u64)))
    }
}
