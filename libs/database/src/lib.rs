//! Connectors for the two backing stores of the session service.
//!
//! - `postgres` (default): SeaORM connection pool for refresh-token records and accounts
//! - `redis` (default): `ConnectionManager` for the TTL key-value store
//! - `config`: `core_config::FromEnv` support for both configs
//!
//! ```ignore
//! use database::{postgres, redis, RetryConfig};
//!
//! let db = postgres::connect_with_retry(&pg_config, Some(RetryConfig::new().with_max_retries(5))).await?;
//! let manager = redis::connect_with_retry(&redis_config, None).await?;
//! ```

pub mod common;

#[cfg(feature = "postgres")]
pub mod postgres;

#[cfg(feature = "redis")]
pub mod redis;

pub use common::{DatabaseError, DatabaseResult, HealthStatus, RetryConfig};
