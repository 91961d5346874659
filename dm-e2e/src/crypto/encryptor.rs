//! Hybrid message encryption
//!
//! Each message gets its own AES-256-GCM key and nonce. The key is wrapped
//! with the recipient's RSA-OAEP/SHA-256 public key; only the wrapped form
//! ever leaves this module.

use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Nonce};
use rand::rngs::OsRng;
use rand::RngCore;
use rsa::{Oaep, RsaPublicKey};
use sha2::Sha256;
use zeroize::Zeroizing;

use crate::crypto::cache::KeyImportCache;
use crate::crypto::envelope::{EncryptedEnvelope, AES_KEY_SIZE, IV_SIZE};
use crate::crypto::errors::{CryptoError, CryptoResult};

/// Encrypt `plaintext` for the holder of `recipient`
///
/// A fresh key and nonce are drawn from the OS RNG on every call, so two
/// calls never share either even for identical inputs.
pub fn encrypt_for(plaintext: &str, recipient: &RsaPublicKey) -> CryptoResult<EncryptedEnvelope> {
    let mut key = Zeroizing::new([0u8; AES_KEY_SIZE]);
    OsRng.fill_bytes(&mut key[..]);

    let mut iv = [0u8; IV_SIZE];
    OsRng.fill_bytes(&mut iv);

    let cipher = Aes256Gcm::new_from_slice(&key[..])
        .map_err(|e| CryptoError::EncryptionError(format!("Invalid AES key: {}", e)))?;
    let ciphertext = cipher
        .encrypt(Nonce::from_slice(&iv), plaintext.as_bytes())
        .map_err(|_| CryptoError::EncryptionError("AES-GCM operation failed".to_string()))?;

    let wrapped_key = recipient
        .encrypt(&mut OsRng, Oaep::new::<Sha256>(), &key[..])
        .map_err(|e| CryptoError::EncryptionError(format!("RSA-OAEP key wrap failed: {}", e)))?;

    Ok(EncryptedEnvelope::from_parts(&ciphertext, &wrapped_key, &iv))
}

/// Encrypt `plaintext` for an encoded recipient public key
///
/// The recipient key is resolved through `cache`, which is the only side
/// effect of this call.
pub fn encrypt_message(
    plaintext: &str,
    recipient_public_key: &str,
    cache: &KeyImportCache,
) -> CryptoResult<EncryptedEnvelope> {
    let recipient = cache.resolve_public_key(recipient_public_key)?;
    encrypt_for(plaintext, &recipient)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::crypto::cache::UnboundedKeyCache;
    use crate::crypto::codec;
    use crate::crypto::envelope::TAG_SIZE;
    use crate::crypto::keys::RSA_MODULUS_BITS;
    use crate::crypto::test_support::bob;

    fn cache() -> KeyImportCache {
        KeyImportCache::new(Arc::new(UnboundedKeyCache::new()))
    }

    #[test]
    fn test_envelope_field_sizes() {
        let envelope = encrypt_message("hello", &bob().public_key, &cache()).unwrap();

        assert_eq!(codec::decode(&envelope.iv).unwrap().len(), IV_SIZE);
        assert_eq!(
            codec::decode(&envelope.encrypted_key).unwrap().len(),
            RSA_MODULUS_BITS / 8
        );
        assert_eq!(
            codec::decode(&envelope.encrypted_content).unwrap().len(),
            "hello".len() + TAG_SIZE
        );
    }

    #[test]
    fn test_identical_inputs_produce_distinct_envelopes() {
        let cache = cache();
        let first = encrypt_message("same text", &bob().public_key, &cache).unwrap();
        let second = encrypt_message("same text", &bob().public_key, &cache).unwrap();

        assert_ne!(first.iv, second.iv);
        assert_ne!(first.encrypted_content, second.encrypted_content);
        assert_ne!(first.encrypted_key, second.encrypted_key);
    }

    #[test]
    fn test_ivs_unique_across_many_calls() {
        let cache = cache();
        let ivs: std::collections::HashSet<_> = (0..64)
            .map(|_| encrypt_message("x", &bob().public_key, &cache).unwrap().iv)
            .collect();
        assert_eq!(ivs.len(), 64);
    }

    #[test]
    fn test_invalid_recipient_key() {
        let garbage = codec::encode(b"garbage");
        let err = encrypt_message("hi", &garbage, &cache()).unwrap_err();
        assert!(matches!(err, CryptoError::KeyImportFailed(_)));
    }
}
