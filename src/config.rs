//! Runtime configuration loaded from the environment.

use std::env;
use std::fmt::Display;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;

use thiserror::Error;
use tracing::{info, warn};

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("invalid value for {key}: {reason}")]
    Invalid { key: &'static str, reason: String },
}

/// Server configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Directory holding the SQLite file when no database URL is given
    pub data_dir: PathBuf,
    /// Explicit database URL (`QA_DATABASE_URL`)
    pub database_url: Option<String>,
    pub bind_addr: SocketAddr,
    /// Questions per listing page
    pub page_size: u64,
    pub session_ttl_hours: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: env::temp_dir().join("qa-server"),
            database_url: None,
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 8080)),
            page_size: 10,
            session_ttl_hours: 24,
        }
    }
}

impl Config {
    /// Load configuration from `QA_*` environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let data_dir = env::var("QA_DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or(defaults.data_dir);
        let database_url = env::var("QA_DATABASE_URL").ok().filter(|u| !u.is_empty());
        let bind_addr = try_load("QA_BIND_ADDR", defaults.bind_addr)?;
        let page_size = try_load("QA_PAGE_SIZE", defaults.page_size)?;
        let session_ttl_hours = try_load("QA_SESSION_TTL_HOURS", defaults.session_ttl_hours)?;

        let config = Self {
            data_dir,
            database_url,
            bind_addr,
            page_size,
            session_ttl_hours,
        };
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if !(1..=100).contains(&self.page_size) {
            return Err(ConfigError::Invalid {
                key: "QA_PAGE_SIZE",
                reason: format!("{} is outside 1..=100", self.page_size),
            });
        }
        if self.session_ttl_hours == 0 {
            return Err(ConfigError::Invalid {
                key: "QA_SESSION_TTL_HOURS",
                reason: "must be at least 1".to_string(),
            });
        }
        Ok(())
    }

    /// Effective database URL
    pub fn database_url(&self) -> String {
        match &self.database_url {
            Some(url) => url.clone(),
            None => format!("sqlite:{}?mode=rwc", self.data_dir.join("qa.db").display()),
        }
    }
}

fn try_load<T>(key: &'static str, default: T) -> Result<T, ConfigError>
where
    T: FromStr + Display,
    T::Err: Display,
{
    match env::var(key) {
        Ok(raw) => parse_value(key, &raw),
        Err(_) => {
            info!("{key} not set, using default: {default}");
            Ok(default)
        }
    }
}

fn parse_value<T>(key: &'static str, raw: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: Display,
{
    raw.trim().parse().map_err(|e: T::Err| {
        warn!("Invalid {key} value: {e}");
        ConfigError::Invalid {
            key,
            reason: e.to_string(),
        }
    })
}
