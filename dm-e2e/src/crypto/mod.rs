//! Direct-message cryptography module
//!
//! Hybrid encryption of message content: a one-time AES-256-GCM key per
//! message, wrapped with the recipient's RSA-OAEP/SHA-256 public key.
//!
//! ## Components
//!
//! - **codec**: base64 transcoding for keys and envelope fields
//! - **keys**: RSA key pair generation, SPKI/PKCS#8 import, fingerprints
//! - **cache**: Memoized public key imports with pluggable eviction
//! - **envelope**: The three-field wire format
//! - **encryptor** / **decryptor**: The hybrid encrypt and decrypt steps
//! - **service**: High-level async CryptoService facade
//!
//! ## Usage
//!
//! ```rust,ignore
//! use dm_e2e::crypto::{CryptoService, CryptoResult};
//!
//! let service = CryptoService::default();
//! let envelope = service.encrypt("hello", &recipient_public_key).await?;
//! let plaintext = service.decrypt(&envelope, &my_private_key).await?;
//! ```

pub mod cache;
pub mod codec;
pub mod decryptor;
pub mod encryptor;
pub mod envelope;
pub mod errors;
pub mod keys;
pub mod service;

#[cfg(test)]
pub(crate) mod test_support;

// Re-export commonly used types
pub use cache::{
    CacheStats, KeyCache, KeyImportCache, LruKeyCache, PublicKeyHandle, PublicKeyImporter,
    SpkiImporter, UnboundedKeyCache, DEFAULT_CACHE_CAPACITY,
};
pub use decryptor::decrypt_message;
pub use encryptor::{encrypt_for, encrypt_message};
pub use envelope::EncryptedEnvelope;
pub use errors::{CryptoError, CryptoResult};
pub use keys::{
    generate_key_pair, import_private_key, import_public_key, public_key_fingerprint,
    public_key_from_private, KeyPair,
};
pub use service::CryptoService;
