//! Configuration module for environment variables and application settings

use anyhow::{anyhow, Result};
use std::env;
use std::fmt::{self, Display};
use std::str::FromStr;

use crate::database::connection::DatabaseConfig;

/// Secret used when `ACCESS_TOKEN_SECRET` is missing; fine for local runs only
const DEV_TOKEN_SECRET: &str = "dev_secret";

#[derive(Debug, Clone)]
pub struct Config {
    /// Server configuration
    pub server: ServerConfig,

    /// Which document store backs the collections
    pub store: StoreBackend,

    /// Session token configuration
    pub auth: AuthConfig,

    /// Cross-origin policy
    pub cors: CorsConfig,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone)]
pub enum StoreBackend {
    Postgres(DatabaseConfig),
    Memory,
}

#[derive(Clone)]
pub struct AuthConfig {
    pub token_secret: String,
}

impl fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthConfig").field("token_secret", &"<redacted>").finish()
    }
}

#[derive(Debug, Clone)]
pub struct CorsConfig {
    /// The single front-end origin allowed to call with credentials
    pub allowed_origin: String,
}

/// Backend names accepted by `STORE_BACKEND`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    Postgres,
    Memory,
}

impl FromStr for BackendKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "postgres" | "postgresql" | "pg" => Ok(BackendKind::Postgres),
            "memory" | "in-memory" => Ok(BackendKind::Memory),
            other => Err(anyhow!("Unknown STORE_BACKEND {other:?}, expected postgres or memory")),
        }
    }
}

/// Parse `key` if set, keeping `default` when unset or invalid
fn parse_or<T: FromStr>(key: &str, default: T) -> T
where
    T::Err: Display,
{
    match env::var(key) {
        Ok(raw) => raw.parse().unwrap_or_else(|e| {
            tracing::warn!("Invalid {key} value {raw:?}: {e}, using default");
            default
        }),
        Err(_) => default,
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let backend: BackendKind = env::var("STORE_BACKEND")
            .unwrap_or_else(|_| "postgres".to_string())
            .parse()?;

        let store = match backend {
            BackendKind::Postgres => StoreBackend::Postgres(DatabaseConfig::from_env()?),
            BackendKind::Memory => StoreBackend::Memory,
        };

        let token_secret = env::var("ACCESS_TOKEN_SECRET").unwrap_or_else(|_| {
            tracing::warn!("ACCESS_TOKEN_SECRET not set, using the development secret");
            DEV_TOKEN_SECRET.to_string()
        });

        Ok(Self {
            server: ServerConfig {
                host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
                port: parse_or("PORT", 9000),
            },
            store,
            auth: AuthConfig { token_secret },
            cors: CorsConfig {
                allowed_origin: env::var("CLIENT_ORIGIN")
                    .unwrap_or_else(|_| "http://localhost:5173".to_string()),
            },
        })
    }
}
