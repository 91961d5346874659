//! Runtime configuration
//!
//! Settings are read from `DM_E2E_*` environment variables.

use std::env;

use url::Url;

use crate::crypto::DEFAULT_CACHE_CAPACITY;
use crate::error::{AppError, AppResult};
use crate::vault::VaultSecret;

/// Default database file
pub const DEFAULT_DATABASE_PATH: &str = "dm-e2e.db";

/// Default HTTP timeout for the remote key directory
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;

/// Service configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// SQLite database path (default: dm-e2e.db)
    pub database_path: String,
    /// Maximum number of imported public keys kept in memory (default: 256)
    pub key_cache_capacity: usize,
    /// Device secret protecting the key vault
    pub vault_secret: VaultSecret,
    /// Remote key directory base URL; the local table is used when unset
    pub directory_url: Option<Url>,
    /// Bearer token for the remote key directory
    pub directory_token: Option<String>,
    /// Remote directory request timeout in seconds (default: 30)
    pub http_timeout_secs: u64,
}

impl Config {
    /// Configuration with defaults for everything but the two required values
    pub fn new(database_path: impl Into<String>, vault_secret: VaultSecret) -> Self {
        Self {
            database_path: database_path.into(),
            key_cache_capacity: DEFAULT_CACHE_CAPACITY,
            vault_secret,
            directory_url: None,
            directory_token: None,
            http_timeout_secs: DEFAULT_HTTP_TIMEOUT_SECS,
        }
    }

    /// Load configuration from environment variables
    pub fn from_env() -> AppResult<Self> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Load configuration through an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: F) -> AppResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let secret = lookup("DM_E2E_VAULT_SECRET")
            .ok_or_else(|| AppError::Config("DM_E2E_VAULT_SECRET is not set".to_string()))?;

        let mut config = Self::new(
            lookup("DM_E2E_DATABASE_PATH").unwrap_or_else(|| DEFAULT_DATABASE_PATH.to_string()),
            VaultSecret::from_base64(&secret)?,
        );

        if let Some(capacity) = lookup("DM_E2E_KEY_CACHE_CAPACITY") {
            config.key_cache_capacity = parse_number("DM_E2E_KEY_CACHE_CAPACITY", &capacity)?;
        }
        if let Some(timeout) = lookup("DM_E2E_HTTP_TIMEOUT_SECS") {
            config.http_timeout_secs = parse_number("DM_E2E_HTTP_TIMEOUT_SECS", &timeout)?;
        }
        if let Some(raw) = lookup("DM_E2E_DIRECTORY_URL").filter(|v| !v.trim().is_empty()) {
            let url = Url::parse(raw.trim()).map_err(|e| {
                AppError::Config(format!("DM_E2E_DIRECTORY_URL is not a valid URL: {}", e))
            })?;
            config.directory_url = Some(url);
        }
        config.directory_token = lookup("DM_E2E_DIRECTORY_TOKEN").filter(|v| !v.is_empty());

        config.validate()?;
        Ok(config)
    }

    /// Validate configuration values
    pub fn validate(&self) -> AppResult<()> {
        if self.database_path.is_empty() {
            return Err(AppError::Config("database_path must not be empty".to_string()));
        }
        if self.key_cache_capacity == 0 {
            return Err(AppError::Config("key_cache_capacity must be at least 1".to_string()));
        }
        if self.http_timeout_secs == 0 {
            return Err(AppError::Config("http_timeout_secs must be at least 1".to_string()));
        }
        if let Some(url) = &self.directory_url {
            if !matches!(url.scheme(), "http" | "https") {
                return Err(AppError::Config(format!(
                    "Unsupported directory URL scheme: {}",
                    url.scheme()
                )));
            }
        }
        Ok(())
    }
}

fn parse_number<T: std::str::FromStr>(name: &str, value: &str) -> AppResult<T> {
    value
        .trim()
        .parse()
        .map_err(|_| AppError::Config(format!("{} must be a positive integer, got {:?}", name, value)))
}
