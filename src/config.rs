use std::time::Duration;

use anyhow::{anyhow, Result};
use tracing::info;

use crate::util::env as env_util;

pub const DEFAULT_HOST: &str = "localhost";
pub const DEFAULT_PORT: u16 = 3306;
pub const DEFAULT_NAME: &str = "food_pantry";
pub const DEFAULT_USER: &str = "root";
pub const DEFAULT_PASSWORD: &str = "rootpass";

/// Connection settings, resolved once at startup and handed to the connector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DbSettings {
    pub host: String,
    pub port: u16,
    pub database: String,
    pub user: String,
    pub password: String,
    /// Full DSN from `DATABASE_URL`; wins over the DB_* components.
    pub url_override: Option<String>,
}

impl Default for DbSettings {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            database: DEFAULT_NAME.to_string(),
            user: DEFAULT_USER.to_string(),
            password: DEFAULT_PASSWORD.to_string(),
            url_override: None,
        }
    }
}

impl DbSettings {
    /// Read DB_HOST / DB_PORT / DB_NAME / DB_USER / DB_PASSWORD / DATABASE_URL.
    pub fn from_env() -> Self {
        Self::from_lookup(env_util::env_opt)
    }

    /// Build settings from an arbitrary key lookup. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let defaults = Self::default();
        Self {
            host: get("DB_HOST").unwrap_or(defaults.host),
            port: get("DB_PORT")
                .and_then(|p| p.trim().parse::<u16>().ok())
                .unwrap_or(defaults.port),
            database: get("DB_NAME").unwrap_or(defaults.database),
            user: get("DB_USER").unwrap_or(defaults.user),
            password: get("DB_PASSWORD").unwrap_or(defaults.password),
            url_override: get("DATABASE_URL"),
        }
    }

    /// The DSN handed to sqlx. Credentials are percent-encoded via `url::Url`.
    pub fn database_url(&self) -> Result<String> {
        if let Some(url) = &self.url_override {
            return Ok(url.trim().to_string());
        }

        let mut out = url::Url::parse("mysql://localhost")?;
        out.set_username(&self.user)
            .map_err(|_| anyhow!("invalid DB_USER for connection URL"))?;
        out.set_password(Some(&self.password))
            .map_err(|_| anyhow!("invalid DB_PASSWORD for connection URL"))?;

        let host = self.host.trim().trim_matches(|c| c == '[' || c == ']');
        if host.contains(':') {
            out.set_host(Some(&format!("[{host}]")))?;
        } else {
            out.set_host(Some(host))?;
        }
        out.set_port(Some(self.port))
            .map_err(|_| anyhow!("invalid DB_PORT for connection URL"))?;
        out.set_path(&format!("/{}", self.database));
        Ok(out.to_string())
    }

    /// Log a redacted snapshot of the resolved configuration.
    pub fn log_snapshot(&self) {
        let location = match &self.url_override {
            Some(url) => env_util::redact_value("DATABASE_URL", url),
            None => format!("{}:{}/{}", self.host, self.port, self.database),
        };
        info!(
            target = "config",
            db = %location,
            user = %self.user,
            password = %env_util::redact_value("DB_PASSWORD", &self.password),
            "database configuration"
        );
    }
}

pub const DEFAULT_CONNECT_ATTEMPTS: u32 = 30;
pub const DEFAULT_CONNECT_DELAY: Duration = Duration::from_secs(2);

/// Fixed-interval bounded retry used while the database is starting up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_CONNECT_ATTEMPTS,
            delay: DEFAULT_CONNECT_DELAY,
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            delay,
        }
    }

    /// No sleeping between attempts; for tests and local sqlite runs.
    pub fn immediate(max_attempts: u32) -> Self {
        Self::new(max_attempts, Duration::ZERO)
    }

    /// Read DB_CONNECT_ATTEMPTS / DB_CONNECT_DELAY_SECS.
    pub fn from_env() -> Self {
        Self::from_lookup(env_util::env_opt)
    }

    /// Build a policy from an arbitrary key lookup. Unset, empty or
    /// unparseable values fall back to the defaults.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let parsed = |key: &str| lookup(key).and_then(|v| v.trim().parse::<u64>().ok());
        let attempts = parsed("DB_CONNECT_ATTEMPTS")
            .map(|n| u32::try_from(n).unwrap_or(u32::MAX))
            .unwrap_or(defaults.max_attempts);
        let delay = parsed("DB_CONNECT_DELAY_SECS")
            .map(Duration::from_secs)
            .unwrap_or(defaults.delay);
        Self::new(attempts, delay)
    }
}
