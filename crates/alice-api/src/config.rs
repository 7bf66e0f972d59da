//! Server configuration from environment variables.
//!
//! | Variable                   | Default                  |
//! |----------------------------|--------------------------|
//! | `HOST`                     | `0.0.0.0`                |
//! | `PORT`                     | `8081`                   |
//! | `DATABASE_URL`             | required for `postgres`  |
//! | `DATABASE_MAX_CONNECTIONS` | 10                       |
//! | `ALICE_STORAGE`            | `postgres` (or `memory`) |
//! | `UPLOAD_DIR`               | `uploads`                |
//! | `MAX_UPLOAD_BYTES`         | 50 MiB                   |
//! | `CORS_ALLOWED_ORIGINS`     | `http://localhost:3000`  |

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use axum::http::HeaderValue;
use serde::{Deserialize, Serialize};

use alice_core::defaults::{
    ENV_DATABASE_MAX_CONNECTIONS, ENV_MAX_UPLOAD_BYTES, ENV_STORAGE, ENV_UPLOAD_DIR,
    MAX_UPLOAD_BYTES, SERVER_PORT, UPLOAD_DIR,
};
use alice_core::{Error, Result};

const DEFAULT_ORIGINS: &str = "http://localhost:3000";

/// Where analysis results and upload records live.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageMode {
    #[default]
    Postgres,
    /// Process-local storage, lost on restart.
    Memory,
}

impl FromStr for StorageMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "postgres" | "postgresql" => Ok(Self::Postgres),
            "memory" => Ok(Self::Memory),
            other => Err(Error::Config(format!(
                "unknown storage mode '{}' (expected postgres or memory)",
                other
            ))),
        }
    }
}

impl fmt::Display for StorageMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Postgres => write!(f, "postgres"),
            Self::Memory => write!(f, "memory"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub database_url: Option<String>,
    /// Pool size override; `None` keeps the pool default.
    pub database_max_connections: Option<u32>,
    pub storage: StorageMode,
    pub upload_dir: PathBuf,
    pub max_upload_bytes: usize,
    pub allowed_origins: Vec<HeaderValue>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: SERVER_PORT,
            database_url: None,
            database_max_connections: None,
            storage: StorageMode::default(),
            upload_dir: PathBuf::from(UPLOAD_DIR),
            max_upload_bytes: MAX_UPLOAD_BYTES,
            allowed_origins: parse_allowed_origins(DEFAULT_ORIGINS),
        }
    }
}

impl ServerConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let defaults = Self::default();
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let port = match var("PORT") {
            Some(v) => v
                .trim()
                .parse()
                .map_err(|_| Error::Config(format!("PORT must be a port number, got '{}'", v)))?,
            None => defaults.port,
        };
        let max_upload_bytes = match var(ENV_MAX_UPLOAD_BYTES) {
            Some(v) => v.trim().parse().map_err(|_| {
                Error::Config(format!(
                    "{} must be a byte count, got '{}'",
                    ENV_MAX_UPLOAD_BYTES, v
                ))
            })?,
            None => defaults.max_upload_bytes,
        };
        let storage = match var(ENV_STORAGE) {
            Some(v) => v.parse()?,
            None => defaults.storage,
        };
        let database_max_connections = match var(ENV_DATABASE_MAX_CONNECTIONS) {
            Some(v) => match v.trim().parse::<u32>() {
                Ok(n) if n > 0 => Some(n),
                _ => {
                    return Err(Error::Config(format!(
                        "{} must be a positive integer, got '{}'",
                        ENV_DATABASE_MAX_CONNECTIONS, v
                    )))
                }
            },
            None => None,
        };
        let database_url = var("DATABASE_URL");
        if storage == StorageMode::Postgres && database_url.is_none() {
            return Err(Error::Config(format!(
                "DATABASE_URL is required when {}=postgres",
                ENV_STORAGE
            )));
        }

        Ok(Self {
            host: var("HOST").unwrap_or(defaults.host),
            port,
            database_url,
            database_max_connections,
            storage,
            upload_dir: var(ENV_UPLOAD_DIR)
                .map(PathBuf::from)
                .unwrap_or(defaults.upload_dir),
            max_upload_bytes,
            allowed_origins: parse_allowed_origins(
                var("CORS_ALLOWED_ORIGINS").as_deref().unwrap_or(DEFAULT_ORIGINS),
            ),
        })
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Parse a comma-separated origin list, dropping invalid entries.
pub fn parse_allowed_origins(raw: &str) -> Vec<HeaderValue> {
    raw.split(',')
        .filter_map(|s| {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                return None;
            }
            match trimmed.parse::<HeaderValue>() {
                Ok(v) => Some(v),
                Err(e) => {
                    tracing::warn!("Invalid CORS origin '{}': {}", trimmed, e);
                    None
                }
            }
        })
        .collect()
}
