//! Error types for the direct-message encryption service

use thiserror::Error;

use crate::crypto::CryptoError;

/// Application-wide error type
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error(transparent)]
    Crypto(#[from] CryptoError),

    #[error("No public key published for user: {0}")]
    PublicKeyNotFound(String),

    #[error("No private key stored for user: {0}")]
    PrivateKeyNotFound(String),

    #[error("Key vault error: {0}")]
    Vault(String),

    #[error("Key directory error: {0}")]
    Directory(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

/// Result type alias for application operations
pub type AppResult<T> = Result<T, AppError>;

// Serialized as the display string for callers that forward errors as text
impl serde::Serialize for AppError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}
