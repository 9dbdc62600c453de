//! PostgreSQL pool setup and health probe.

mod config;
mod connector;
mod health;

pub use config::PostgresConfig;
pub use connector::{connect, connect_with_retry};
pub use health::check_health;

pub use sea_orm::{DatabaseConnection, DbErr};
