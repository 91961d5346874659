//! Application state management
//!
//! Builds the database, key storage and messenger from a [`Config`] and
//! shares them behind an `Arc`.

use sqlx::SqlitePool;
use std::sync::Arc;
use std::time::Duration;

use crate::config::Config;
use crate::crypto::CryptoService;
use crate::db;
use crate::directory::{KeyDirectory, RemoteKeyDirectory, SqliteKeyDirectory};
use crate::error::AppResult;
use crate::messaging::Messenger;
use crate::vault::{KeyVault, SqliteKeyVault};

/// Global application state
pub struct AppState {
    /// Database connection pool
    pub db: SqlitePool,

    /// Encrypt/decrypt entry point
    pub messenger: Messenger,

    /// Configuration the state was built from
    pub config: Config,
}

impl AppState {
    /// Create new application state with database connection
    pub async fn new(config: Config) -> AppResult<Self> {
        config.validate()?;
        let db = db::connect(&config.database_path).await?;
        Self::with_pool(config, db)
    }

    /// Create application state over an existing pool
    pub fn with_pool(config: Config, db: SqlitePool) -> AppResult<Self> {
        let vault: Arc<dyn KeyVault> =
            Arc::new(SqliteKeyVault::new(db.clone(), config.vault_secret.clone()));

        let directory: Arc<dyn KeyDirectory> = match &config.directory_url {
            Some(url) => {
                tracing::info!("Using remote key directory at {}", url);
                Arc::new(RemoteKeyDirectory::new(
                    url.clone(),
                    config.directory_token.clone(),
                    Duration::from_secs(config.http_timeout_secs),
                )?)
            }
            None => {
                tracing::info!("Using local key directory");
                Arc::new(SqliteKeyDirectory::new(db.clone()))
            }
        };

        let crypto = CryptoService::new(config.key_cache_capacity);
        let messenger = Messenger::new(crypto, vault, directory);

        Ok(Self {
            db,
            messenger,
            config,
        })
    }
}

/// Thread-safe shared state type
pub type SharedState = Arc<AppState>;

/// Create a new shared state instance
pub async fn create_shared_state(config: Config) -> AppResult<SharedState> {
    let state = AppState::new(config).await?;
    Ok(Arc::new(state))
}
