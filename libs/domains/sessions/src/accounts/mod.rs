//! Account lookup boundary: the store contract, its PostgreSQL and in-memory
//! implementations, the read-through cache and password hashing.

mod cache;
mod models;
mod password;
mod postgres;
mod store;

pub use cache::CachedAccountStore;
pub use models::{Account, AccountSummary, Role, normalize_email};
pub use password::{hash_password, verify_password};
pub use postgres::PostgresAccountStore;
pub use store::{AccountStore, InMemoryAccountStore};
