//! Process settings from the environment (`.env` honored via dotenvy).

use crate::error::ConfigError;
use std::net::SocketAddr;
use std::path::PathBuf;

pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:3000";
pub const DEFAULT_PG_SCHEMA: &str = "admin";
pub const DEFAULT_BODY_LIMIT: usize = 1024 * 1024;

#[derive(Clone, Debug)]
pub struct Settings {
    /// PostgreSQL backend when set; in-memory collections otherwise.
    pub database_url: Option<String>,
    pub config_path: Option<PathBuf>,
    pub bind_addr: SocketAddr,
    pub pg_schema: String,
    pub username: Option<String>,
    pub password: Option<String>,
    pub body_limit: usize,
}

impl Settings {
    pub fn from_env() -> Result<Self, ConfigError> {
        if let Err(e) = dotenvy::dotenv() {
            if !e.not_found() {
                return Err(ConfigError::Load(format!(".env: {}", e)));
            }
        }
        Self::from_lookup(|k| std::env::var(k).ok())
    }

    /// Build from any key lookup; blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |k: &str| lookup(k).filter(|v| !v.trim().is_empty());

        let bind = get("BIND_ADDR").unwrap_or_else(|| DEFAULT_BIND_ADDR.into());
        let bind_addr = bind
            .parse()
            .map_err(|_| ConfigError::Validation(format!("BIND_ADDR: invalid socket address: {}", bind)))?;
        let body_limit = match get("ADMIN_BODY_LIMIT") {
            Some(raw) => raw
                .trim()
                .parse()
                .map_err(|_| ConfigError::Validation(format!("ADMIN_BODY_LIMIT: not a byte count: {}", raw)))?,
            None => DEFAULT_BODY_LIMIT,
        };

        Ok(Settings {
            database_url: get("DATABASE_URL"),
            config_path: get("ADMIN_CONFIG").map(PathBuf::from),
            bind_addr,
            pg_schema: get("ADMIN_SCHEMA").unwrap_or_else(|| DEFAULT_PG_SCHEMA.into()),
            username: get("ADMIN_USERNAME"),
            password: get("ADMIN_PASSWORD"),
            body_limit,
        })
    }
}
