//! Cryptographic error types
//!
//! This module defines all error types for the direct-message encryption core.

use thiserror::Error;

/// Errors that can occur during cryptographic operations
///
/// `DecryptionFailed` carries no detail: RSA unwrap failures, malformed nonces
/// and AES-GCM tag mismatches all surface as this one value.
#[derive(Debug, Error)]
pub enum CryptoError {
    /// Malformed base64 or text
    #[error("Encoding error: {0}")]
    EncodingError(String),

    /// Failed to generate a key pair
    #[error("Key generation failed: {0}")]
    KeyGenerationFailed(String),

    /// Key string does not decode to a key of the expected algorithm or size
    #[error("Key import failed: {0}")]
    KeyImportFailed(String),

    /// Encryption failed
    #[error("Encryption failed: {0}")]
    EncryptionError(String),

    /// Key unwrap or authentication failure
    #[error("Decryption failed")]
    DecryptionFailed,

    /// Internal error
    #[error("Internal crypto error: {0}")]
    InternalError(String),
}

impl From<base64::DecodeError> for CryptoError {
    fn from(e: base64::DecodeError) -> Self {
        CryptoError::EncodingError(e.to_string())
    }
}

impl From<tokio::task::JoinError> for CryptoError {
    fn from(e: tokio::task::JoinError) -> Self {
        CryptoError::InternalError(format!("crypto task did not complete: {}", e))
    }
}

/// Result type for cryptographic operations
pub type CryptoResult<T> = Result<T, CryptoError>;
