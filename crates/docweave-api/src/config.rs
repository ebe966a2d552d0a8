//! Server configuration from the environment.

use std::path::PathBuf;
use std::str::FromStr;

use docweave_core::{defaults, Error, Result};
use docweave_db::PoolConfig;

/// Where documents, file assets and summaries are kept.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
    Postgres,
    /// In-process only; everything is lost on restart.
    Memory,
}

impl FromStr for StorageBackend {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "postgres" | "postgresql" | "pg" => Ok(Self::Postgres),
            "memory" | "mem" => Ok(Self::Memory),
            other => Err(Error::Config(format!("Unknown STORAGE_BACKEND '{}'", other))),
        }
    }
}

/// HTTP server settings.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    pub max_upload_bytes: usize,
    pub storage_backend: StorageBackend,
    pub upload_dir: PathBuf,
    pub pool: PoolConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: defaults::SERVER_PORT,
            database_url: "postgres://localhost/docweave".to_string(),
            max_upload_bytes: defaults::MAX_UPLOAD_BYTES,
            storage_backend: StorageBackend::Postgres,
            upload_dir: PathBuf::from(defaults::UPLOAD_DIR),
            pool: PoolConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Create config from environment variables (with defaults).
    ///
    /// | Variable | Default |
    /// |----------|---------|
    /// | `HOST` | `0.0.0.0` |
    /// | `PORT` | `3000` |
    /// | `DATABASE_URL` | `postgres://localhost/docweave` |
    /// | `MAX_UPLOAD_BYTES` | 25 MiB |
    /// | `STORAGE_BACKEND` | `postgres` (`memory` runs without a database) |
    /// | `UPLOAD_DIR` | `uploads` |
    ///
    /// Pool sizing comes from [`PoolConfig::from_env`].
    pub fn from_env() -> Result<Self> {
        let mut config = Self {
            pool: PoolConfig::from_env(),
            ..Self::default()
        };
        if let Ok(host) = std::env::var("HOST") {
            config.host = host;
        }
        if let Some(port) = std::env::var("PORT").ok().and_then(|v| v.parse().ok()) {
            config.port = port;
        }
        if let Ok(url) = std::env::var("DATABASE_URL") {
            config.database_url = url;
        }
        if let Some(max) = std::env::var("MAX_UPLOAD_BYTES")
            .ok()
            .and_then(|v| v.parse::<usize>().ok())
            .filter(|n| *n > 0)
        {
            config.max_upload_bytes = max;
        }
        if let Ok(backend) = std::env::var("STORAGE_BACKEND") {
            config.storage_backend = backend.parse()?;
        }
        if let Ok(dir) = std::env::var(defaults::ENV_UPLOAD_DIR) {
            if !dir.trim().is_empty() {
                config.upload_dir = PathBuf::from(dir);
            }
        }
        Ok(config)
    }

    /// `host:port` to bind.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
