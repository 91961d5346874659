//! CryptoService - High-level encryption API
//!
//! This module provides the main interface for direct-message encryption.
//! It owns the public key import cache and moves every CPU-bound RSA or
//! AES operation onto Tokio's blocking pool.
//!
//! ## Example
//!
//! ```rust,ignore
//! use dm_e2e::crypto::CryptoService;
//!
//! let service = CryptoService::new(256);
//!
//! // Each user generates a key pair once
//! let bob = service.generate_key_pair().await?;
//!
//! // Alice encrypts for Bob's published public key
//! let envelope = service.encrypt("hello", &bob.public_key).await?;
//!
//! // Bob decrypts with his private key
//! let plaintext = service.decrypt(&envelope, &bob.private_key).await?;
//! ```

use std::num::NonZeroUsize;
use std::sync::Arc;

use zeroize::Zeroizing;

use crate::crypto::cache::{
    CacheStats, KeyCache, KeyImportCache, LruKeyCache, PublicKeyImporter, DEFAULT_CACHE_CAPACITY,
};
use crate::crypto::decryptor::decrypt_message;
use crate::crypto::encryptor::encrypt_message;
use crate::crypto::envelope::EncryptedEnvelope;
use crate::crypto::errors::CryptoResult;
use crate::crypto::keys::{self, KeyPair};

/// High-level encryption service
///
/// Cheap to clone; clones share one import cache. Separate instances never
/// share state.
#[derive(Clone)]
pub struct CryptoService {
    /// Imported recipient public keys
    cache: Arc<KeyImportCache>,
}

impl CryptoService {
    /// Create a service with an LRU import cache of `capacity` keys
    ///
    /// A zero capacity falls back to the default.
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity)
            .or(NonZeroUsize::new(DEFAULT_CACHE_CAPACITY))
            .unwrap_or(NonZeroUsize::MIN);
        Self::with_cache(Arc::new(LruKeyCache::new(capacity)))
    }

    /// Create a service over a caller-provided cache
    pub fn with_cache(cache: Arc<dyn KeyCache>) -> Self {
        Self {
            cache: Arc::new(KeyImportCache::new(cache)),
        }
    }

    /// Create a service with both the cache and the key importer injected
    pub fn with_parts(cache: Arc<dyn KeyCache>, importer: Arc<dyn PublicKeyImporter>) -> Self {
        Self {
            cache: Arc::new(KeyImportCache::with_importer(cache, importer)),
        }
    }

    /// Generate a new RSA-OAEP key pair
    pub async fn generate_key_pair(&self) -> CryptoResult<KeyPair> {
        let pair = tokio::task::spawn_blocking(keys::generate_key_pair).await??;
        tracing::info!(
            "Generated key pair (fingerprint {})",
            pair.fingerprint().unwrap_or_default()
        );
        Ok(pair)
    }

    /// Encrypt a message for a recipient's encoded public key
    pub async fn encrypt(
        &self,
        plaintext: &str,
        recipient_public_key: &str,
    ) -> CryptoResult<EncryptedEnvelope> {
        let cache = self.cache.clone();
        let plaintext = Zeroizing::new(plaintext.to_string());
        let recipient = recipient_public_key.to_string();

        tokio::task::spawn_blocking(move || encrypt_message(&plaintext, &recipient, &cache)).await?
    }

    /// Decrypt an envelope with the reader's encoded private key
    pub async fn decrypt(
        &self,
        envelope: &EncryptedEnvelope,
        private_key: &str,
    ) -> CryptoResult<String> {
        let envelope = envelope.clone();
        let private_key = Zeroizing::new(private_key.to_string());

        tokio::task::spawn_blocking(move || decrypt_message(&envelope, &private_key)).await?
    }

    /// Re-derive the encoded public key belonging to an encoded private key
    pub async fn public_key_for(&self, private_key: &str) -> CryptoResult<String> {
        let private_key = Zeroizing::new(private_key.to_string());
        tokio::task::spawn_blocking(move || keys::public_key_from_private(&private_key)).await?
    }

    /// Drop a cached recipient key so the next encrypt re-imports it
    pub fn forget_public_key(&self, encoded: &str) {
        self.cache.forget(encoded);
    }

    /// Drop all cached recipient keys
    pub fn clear_cache(&self) {
        self.cache.clear();
    }

    /// Get import cache statistics
    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    /// Get a public key fingerprint for verification
    pub fn fingerprint(&self, public_key: &str) -> CryptoResult<String> {
        keys::public_key_fingerprint(public_key)
    }
}

impl Default for CryptoService {
    fn default() -> Self {
        Self::new(DEFAULT_CACHE_CAPACITY)
    }
}
