#[cfg(feature = "config")]
use core_config::{ConfigError, FromEnv, env_optional};

/// Connection settings for the TTL store.
#[derive(Clone, Debug)]
pub struct RedisConfig {
    pub url: String,
    /// Logical database index appended to the URL when set.
    pub database: Option<u8>,
}

impl RedisConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            database: None,
        }
    }

    /// URL with the database index applied, unless the URL already selects one.
    pub fn connection_url(&self) -> String {
        match self.database {
            Some(db) if !has_db_path(&self.url) => {
                format!("{}/{}", self.url.trim_end_matches('/'), db)
            }
            _ => self.url.clone(),
        }
    }
}

fn has_db_path(url: &str) -> bool {
    url.split("://")
        .nth(1)
        .and_then(|rest| rest.split_once('/'))
        .is_some_and(|(_, path)| !path.is_empty())
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self::new("redis://127.0.0.1:6379")
    }
}

/// - `REDIS_URL` (required; `REDIS_HOST` accepted as a fallback)
/// - `REDIS_DATABASE` (optional)
#[cfg(feature = "config")]
impl FromEnv for RedisConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let url = env_optional("REDIS_URL")
            .or_else(|| env_optional("REDIS_HOST"))
            .ok_or_else(|| ConfigError::MissingEnvVar("REDIS_URL".to_string()))?;

        let database = env_optional("REDIS_DATABASE")
            .map(|raw| raw.parse().map_err(|e| ConfigError::parse("REDIS_DATABASE", e)))
            .transpose()?;

        Ok(Self { url, database })
    }
}
