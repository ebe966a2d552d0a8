//! PostgreSQL pool sizing, read from the environment.

use std::time::{Duration, Instant};

use sqlx::postgres::{PgPool, PgPoolOptions};
use tracing::{info, warn};

use docweave_core::{defaults, Error, Result};

/// Sizing and timeouts for the shared connection pool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolConfig {
    pub max_connections: u32,
    pub min_connections: u32,
    pub acquire_timeout: Duration,
    pub idle_timeout: Duration,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_connections: defaults::DB_MAX_CONNECTIONS,
            min_connections: defaults::DB_MIN_CONNECTIONS,
            acquire_timeout: Duration::from_secs(defaults::DB_ACQUIRE_TIMEOUT_SECS),
            idle_timeout: Duration::from_secs(defaults::DB_IDLE_TIMEOUT_SECS),
        }
    }
}

impl PoolConfig {
    /// Read overrides from the process environment.
    ///
    /// | Variable | Default |
    /// |----------|---------|
    /// | `DB_MAX_CONNECTIONS` | 10 |
    /// | `DB_MIN_CONNECTIONS` | 1 |
    /// | `DB_ACQUIRE_TIMEOUT_SECS` | 30 |
    /// | `DB_IDLE_TIMEOUT_SECS` | 600 |
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Like [`PoolConfig::from_env`], over an arbitrary variable source.
    ///
    /// Unparseable or zero values fall back to the default. The minimum is
    /// clamped so it never exceeds the maximum.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let positive = |name: &str| -> Option<u64> {
            let raw = lookup(name)?;
            match raw.trim().parse::<u64>() {
                Ok(n) if n > 0 => Some(n),
                _ => {
                    warn!(
                        subsystem = "database",
                        component = "pool",
                        variable = name,
                        value = %raw,
                        "Ignoring invalid pool setting"
                    );
                    None
                }
            }
        };

        let mut config = Self::default();
        if let Some(n) = positive(defaults::ENV_DB_MAX_CONNECTIONS) {
            config.max_connections = u32::try_from(n).unwrap_or(u32::MAX);
        }
        if let Some(n) = positive(defaults::ENV_DB_MIN_CONNECTIONS) {
            config.min_connections = u32::try_from(n).unwrap_or(u32::MAX);
        }
        if let Some(secs) = positive(defaults::ENV_DB_ACQUIRE_TIMEOUT_SECS) {
            config.acquire_timeout = Duration::from_secs(secs);
        }
        if let Some(secs) = positive(defaults::ENV_DB_IDLE_TIMEOUT_SECS) {
            config.idle_timeout = Duration::from_secs(secs);
        }
        config.min_connections = config.min_connections.min(config.max_connections);
        config
    }

    fn options(&self) -> PgPoolOptions {
        PgPoolOptions::new()
            .max_connections(self.max_connections)
            .min_connections(self.min_connections)
            .acquire_timeout(self.acquire_timeout)
            .idle_timeout(self.idle_timeout)
    }

    /// Open a pool against `database_url`.
    pub async fn connect(&self, database_url: &str) -> Result<PgPool> {
        let start = Instant::now();
        let pool = self
            .options()
            .connect(database_url)
            .await
            .map_err(Error::Database)?;

        info!(
            subsystem = "database",
            component = "pool",
            op = "connect",
            max_connections = self.max_connections,
            min_connections = self.min_connections,
            acquire_timeout_secs = self.acquire_timeout.as_secs(),
            duration_ms = start.elapsed().as_millis() as u64,
            "Database pool ready"
        );
        Ok(pool)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| vars.get(name).cloned()
    }

    #[test]
    fn test_unset_environment_uses_defaults() {
        assert_eq!(PoolConfig::from_lookup(|_| None), PoolConfig::default());
        assert_eq!(PoolConfig::default().max_connections, 10);
    }

    #[test]
    fn test_overrides_are_applied() {
        let config = PoolConfig::from_lookup(lookup_from(&[
            ("DB_MAX_CONNECTIONS", "32"),
            ("DB_MIN_CONNECTIONS", "4"),
            ("DB_ACQUIRE_TIMEOUT_SECS", " 5 "),
            ("DB_IDLE_TIMEOUT_SECS", "60"),
        ]));
        assert_eq!(config.max_connections, 32);
        assert_eq!(config.min_connections, 4);
        assert_eq!(config.acquire_timeout, Duration::from_secs(5));
        assert_eq!(config.idle_timeout, Duration::from_secs(60));
    }

    #[test]
    fn test_invalid_values_fall_back() {
        let config = PoolConfig::from_lookup(lookup_from(&[
            ("DB_MAX_CONNECTIONS", "0"),
            ("DB_ACQUIRE_TIMEOUT_SECS", "soon"),
        ]));
        assert_eq!(config.max_connections, defaults::DB_MAX_CONNECTIONS);
        assert_eq!(
            config.acquire_timeout,
            Duration::from_secs(defaults::DB_ACQUIRE_TIMEOUT_SECS)
        );
    }

    #[test]
    fn test_min_never_exceeds_max() {
        let config = PoolConfig::from_lookup(lookup_from(&[
            ("DB_MAX_CONNECTIONS", "3"),
            ("DB_MIN_CONNECTIONS", "8"),
        ]));
        assert_eq!(config.max_connections, 3);
        assert_eq!(config.min_connections, 3);
    }
}
