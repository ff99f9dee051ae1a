pub mod database;

pub use database::DatabaseConfig;

use std::env;
use std::str::FromStr;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    Missing(String),
    #[error("Invalid value for {name}: {reason}")]
    Invalid { name: String, reason: String },
}

/// Argon2 work factor used for every credential the tools write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HashingConfig {
    pub memory_kib: u32,
    pub iterations: u32,
    pub parallelism: u32,
}

impl Default for HashingConfig {
    fn default() -> Self {
        Self {
            memory_kib: argon2::Params::DEFAULT_M_COST,
            iterations: argon2::Params::DEFAULT_T_COST,
            parallelism: argon2::Params::DEFAULT_P_COST,
        }
    }
}

#[derive(Debug, Clone)]
pub struct AdminConfig {
    pub database: DatabaseConfig,
    pub hashing: HashingConfig,
    pub session_ttl_hours: i64,
    pub run_migrations: bool,
}

impl AdminConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let defaults = HashingConfig::default();

        Ok(Self {
            database: DatabaseConfig {
                url: get_env("DATABASE_URL")?,
                max_connections: get_env_or("DATABASE_MAX_CONNECTIONS", 5)?,
                acquire_timeout_secs: get_env_or("DATABASE_ACQUIRE_TIMEOUT_SECS", 30)?,
                slow_query_threshold_ms: get_env_or("DATABASE_SLOW_QUERY_MS", 250)?,
            },
            hashing: HashingConfig {
                memory_kib: get_env_or("PASSWORD_HASH_MEMORY_KIB", defaults.memory_kib)?,
                iterations: get_env_or("PASSWORD_HASH_ITERATIONS", defaults.iterations)?,
                parallelism: get_env_or("PASSWORD_HASH_PARALLELISM", defaults.parallelism)?,
            },
            session_ttl_hours: get_env_or("SESSION_TTL_HOURS", 24)?,
            run_migrations: env_flag("AUTHADMIN_RUN_MIGRATIONS", true),
        })
    }
}

fn get_env(name: &str) -> Result<String, ConfigError> {
    match env::var(name) {
        Ok(value) if !value.trim().is_empty() => Ok(value),
        _ => Err(ConfigError::Missing(name.to_string())),
    }
}

fn get_env_or<T>(name: &str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(name) {
        Ok(raw) => raw.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
            name: name.to_string(),
            reason: e.to_string(),
        }),
        Err(_) => Ok(default),
    }
}

fn env_flag(name: &str, default: bool) -> bool {
    env::var(name)
        .map(|value| matches!(value.as_str(), "1" | "true" | "TRUE" | "True" | "yes"))
        .unwrap_or(default)
}
