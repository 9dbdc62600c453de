use core_config::{ConfigError, FromEnv, server::ServerConfig};
use database::postgres::PostgresConfig;
use database::redis::RedisConfig;
use domain_sessions::{AuthConfig, SigningKey};

pub use core_config::Environment;

/// Application-specific configuration
/// Composes the shared config pieces with the session settings
#[derive(Clone, Debug)]
pub struct Config {
    pub name: &'static str,
    pub version: &'static str,
    pub environment: Environment,
    pub server: ServerConfig,
    pub database: PostgresConfig,
    pub redis: RedisConfig,
    pub auth: AuthConfig,
    pub signing_key: SigningKey,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            name: env!("CARGO_PKG_NAME"),
            version: env!("CARGO_PKG_VERSION"),
            environment: Environment::from_env(),
            server: ServerConfig::from_env()?, // HOST=0.0.0.0, PORT=8080 by default
            database: PostgresConfig::from_env()?, // Required - DATABASE_URL
            redis: RedisConfig::from_env()?,       // Required - REDIS_URL
            auth: AuthConfig::from_env()?,
            signing_key: SigningKey::from_env()?, // Required - JWT_SECRET
        })
    }
}
