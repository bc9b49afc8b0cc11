//! Application configuration.

use serde::Deserialize;
use std::path::Path;

/// Application configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Server configuration.
    pub server: ServerConfig,
    /// Database configuration.
    pub database: DatabaseConfig,
    /// Redis configuration.
    pub redis: RedisConfig,
    /// Cache tuning.
    #[serde(default)]
    pub cache: CacheConfig,
}

/// Server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Host to bind to.
    #[serde(default = "default_host")]
    pub host: String,
    /// Port to bind to.
    #[serde(default = "default_port")]
    pub port: u16,
}

/// Database connection configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// `PostgreSQL` connection URL.
    pub url: String,
    /// Maximum number of connections in the pool.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    /// Minimum number of connections in the pool.
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,
}

/// Redis configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct RedisConfig {
    /// Redis connection URL.
    pub url: String,
    /// Key prefix for all Redis keys.
    #[serde(default = "default_redis_prefix")]
    pub prefix: String,
}

/// Cache tuning knobs.
#[derive(Debug, Clone, Deserialize)]
pub struct CacheConfig {
    /// TTL for cached message pages, in seconds.
    #[serde(default = "default_page_ttl_secs")]
    pub page_ttl_secs: i64,
    /// TTL for cached chat lists, in seconds. Short by design: a stale
    /// unseen-count self-heals within one window even if an invalidation
    /// was lost.
    #[serde(default = "default_chat_list_ttl_secs")]
    pub chat_list_ttl_secs: i64,
    /// TTL for cached user profiles, in seconds.
    #[serde(default = "default_profile_ttl_secs")]
    pub profile_ttl_secs: i64,
    /// Upper bound on any single cache operation, in milliseconds. A timeout
    /// counts as that operation failing, never as success.
    #[serde(default = "default_op_timeout_ms")]
    pub op_timeout_ms: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            page_ttl_secs: default_page_ttl_secs(),
            chat_list_ttl_secs: default_chat_list_ttl_secs(),
            profile_ttl_secs: default_profile_ttl_secs(),
            op_timeout_ms: default_op_timeout_ms(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

const fn default_port() -> u16 {
    3000
}

const fn default_max_connections() -> u32 {
    100
}

const fn default_min_connections() -> u32 {
    5
}

fn default_redis_prefix() -> String {
    "huddle".to_string()
}

const fn default_page_ttl_secs() -> i64 {
    300
}

const fn default_chat_list_ttl_secs() -> i64 {
    120
}

const fn default_profile_ttl_secs() -> i64 {
    3600
}

const fn default_op_timeout_ms() -> u64 {
    2000
}

impl Config {
    /// Load configuration from files and environment variables.
    ///
    /// Configuration is loaded in the following order:
    /// 1. `config/default.toml`
    /// 2. `config/{environment}.toml` (based on `HUDDLE_ENV`)
    /// 3. Environment variables with `HUDDLE_` prefix
    pub fn load() -> Result<Self, config::ConfigError> {
        let env = std::env::var("HUDDLE_ENV").unwrap_or_else(|_| "development".to_string());

        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{env}")).required(false))
            .add_source(
                config::Environment::with_prefix("HUDDLE")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }

    /// Load configuration from a specific file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, config::ConfigError> {
        let config = config::Config::builder()
            .add_source(config::File::from(path.as_ref()))
            .add_source(
                config::Environment::with_prefix("HUDDLE")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_config_defaults() {
        let cache = CacheConfig::default();
        assert_eq!(cache.page_ttl_secs, 300);
        assert_eq!(cache.chat_list_ttl_secs, 120);
        assert_eq!(cache.op_timeout_ms, 2000);
    }

    #[test]
    fn test_chat_list_ttl_is_minutes_not_hours() {
        let cache = CacheConfig::default();
        assert!(cache.chat_list_ttl_secs <= 600);
    }
}
