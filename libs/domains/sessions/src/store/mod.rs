//! TTL key-value store shared by revocation and OTP state.
//!
//! Every counter and flag lives here rather than in process memory, so
//! several service instances see the same state.

mod memory;
mod redis;

pub use memory::InMemoryTtlStore;
pub use self::redis::RedisTtlStore;

use async_trait::async_trait;
use std::time::Duration;

use crate::error::StoreResult;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TtlStore: Send + Sync {
    /// Writes `value` and replaces any previous TTL.
    async fn set(&self, key: &str, value: &str, ttl: Duration) -> StoreResult<()>;

    async fn get(&self, key: &str) -> StoreResult<Option<String>>;

    async fn exists(&self, key: &str) -> StoreResult<bool>;

    /// Returns how many of `keys` were present.
    async fn delete(&self, keys: &[String]) -> StoreResult<u64>;

    /// Atomic increment. `first_ttl` is attached only when the key has no expiry
    /// yet; a counter preset by [`set`](Self::set) keeps its own.
    async fn increment(&self, key: &str, first_ttl: Duration) -> StoreResult<i64>;

    /// `None` when the key is missing or has no expiry.
    async fn remaining_ttl(&self, key: &str) -> StoreResult<Option<Duration>>;
}
