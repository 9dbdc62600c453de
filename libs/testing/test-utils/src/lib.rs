//! Shared test infrastructure for the session service.
//!
//! - `TestRedis`: Redis container with automatic cleanup (feature: "redis")
//! - `TestDataBuilder`: deterministic per-test identities (always available)
//!
//! ```rust,ignore
//! use test_utils::{TestDataBuilder, TestRedis};
//!
//! #[tokio::test]
//! #[ignore] // Requires Docker
//! async fn my_redis_test() {
//!     let redis = TestRedis::new().await;
//!     let manager = redis.manager().await;
//!     let builder = TestDataBuilder::from_test_name("my_redis_test");
//!     let email = builder.email("alice");
//! }
//! ```

use uuid::Uuid;

#[cfg(feature = "redis")]
pub mod redis;

#[cfg(feature = "redis")]
pub use redis::TestRedis;

/// Generates identities that are stable for one test and distinct across tests,
/// so tests sharing a store never collide on keys.
pub struct TestDataBuilder {
    seed: u64,
}

impl TestDataBuilder {
    pub fn new(seed: u64) -> Self {
        Self { seed }
    }

    pub fn from_test_name(name: &str) -> Self {
        use std::collections::hash_map::DefaultHasher;
        use std::hash::{Hash, Hasher};

        let mut hasher = DefaultHasher::new();
        name.hash(&mut hasher);
        Self::new(hasher.finish())
    }

    pub fn user_id(&self) -> Uuid {
        let bytes = self.seed.to_le_bytes();
        let mut uuid_bytes = [0u8; 16];
        uuid_bytes[..8].copy_from_slice(&bytes);
        uuid_bytes[8..16].copy_from_slice(&bytes);
        Uuid::from_bytes(uuid_bytes)
    }

    /// Lowercase address unique to this builder, e.g. `alice-1234@example.test`.
    pub fn email(&self, local: &str) -> String {
        format!("{}-{}@example.test", local.to_lowercase(), self.seed)
    }
}
