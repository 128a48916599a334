//! Server configuration parsed from environment variables.
//!
//! Every key is optional. Tuning knobs fall back to their defaults when unset
//! or unparseable; values that would make the server unusable (a zero port or
//! a zero-capacity queue) are rejected at startup instead.

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;

pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_DATABASE_URL: &str = "sqlite://blocks.db?mode=rwc";
pub const DEFAULT_DB_MAX_CONNECTIONS: u32 = 5;
pub const DEFAULT_STATIC_DIR: &str = "public";
pub const DEFAULT_HUB_QUEUE_CAPACITY: usize = 1024;
pub const DEFAULT_CLIENT_QUEUE_CAPACITY: usize = 256;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{key} must be greater than zero")]
    Zero { key: &'static str },
    #[error("{key} must not be empty")]
    Empty { key: &'static str },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub port: u16,
    pub database_url: String,
    pub db_max_connections: u32,
    pub static_dir: String,
    /// Bound on commands waiting for the hub task.
    pub hub_queue_capacity: usize,
    /// Bound on frames waiting for one participant's socket.
    pub client_queue_capacity: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            database_url: DEFAULT_DATABASE_URL.to_owned(),
            db_max_connections: DEFAULT_DB_MAX_CONNECTIONS,
            static_dir: DEFAULT_STATIC_DIR.to_owned(),
            hub_queue_capacity: DEFAULT_HUB_QUEUE_CAPACITY,
            client_queue_capacity: DEFAULT_CLIENT_QUEUE_CAPACITY,
        }
    }
}

impl Config {
    /// Build config from the process environment.
    ///
    /// Recognised keys: `PORT`, `DATABASE_URL`, `DB_MAX_CONNECTIONS`,
    /// `STATIC_DIR`, `HUB_QUEUE_CAPACITY`, `CLIENT_QUEUE_CAPACITY`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if a value parses but is unusable.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build config from an arbitrary key lookup.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if a value parses but is unusable.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let config = Self {
            port: env_parse(&lookup, "PORT", DEFAULT_PORT),
            database_url: lookup("DATABASE_URL").unwrap_or_else(|| DEFAULT_DATABASE_URL.to_owned()),
            db_max_connections: env_parse(&lookup, "DB_MAX_CONNECTIONS", DEFAULT_DB_MAX_CONNECTIONS),
            static_dir: lookup("STATIC_DIR").unwrap_or_else(|| DEFAULT_STATIC_DIR.to_owned()),
            hub_queue_capacity: env_parse(&lookup, "HUB_QUEUE_CAPACITY", DEFAULT_HUB_QUEUE_CAPACITY),
            client_queue_capacity: env_parse(&lookup, "CLIENT_QUEUE_CAPACITY", DEFAULT_CLIENT_QUEUE_CAPACITY),
        };
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.port == 0 {
            return Err(ConfigError::Zero { key: "PORT" });
        }
        if self.db_max_connections == 0 {
            return Err(ConfigError::Zero { key: "DB_MAX_CONNECTIONS" });
        }
        if self.hub_queue_capacity == 0 {
            return Err(ConfigError::Zero { key: "HUB_QUEUE_CAPACITY" });
        }
        if self.client_queue_capacity == 0 {
            return Err(ConfigError::Zero { key: "CLIENT_QUEUE_CAPACITY" });
        }
        if self.database_url.trim().is_empty() {
            return Err(ConfigError::Empty { key: "DATABASE_URL" });
        }
        Ok(())
    }
}

fn env_parse<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> T
where
    T: std::str::FromStr + Copy,
{
    lookup(key)
        .and_then(|v| v.trim().parse::<T>().ok())
        .unwrap_or(default)
}
