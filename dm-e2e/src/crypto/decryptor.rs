//! Hybrid message decryption
//!
//! Reverses [`crate::crypto::encryptor`]. Every failure after the private key
//! has been imported collapses into [`CryptoError::DecryptionFailed`].

use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Nonce};
use rsa::{Oaep, RsaPrivateKey};
use sha2::Sha256;
use zeroize::Zeroizing;

use crate::crypto::envelope::{EncryptedEnvelope, AES_KEY_SIZE, IV_SIZE};
use crate::crypto::errors::{CryptoError, CryptoResult};
use crate::crypto::keys;

/// Decrypt an envelope with an encoded PKCS#8 private key
///
/// The private key is imported for this call only and dropped on return.
/// Envelope fields are decoded before any cryptography runs.
pub fn decrypt_message(envelope: &EncryptedEnvelope, private_key: &str) -> CryptoResult<String> {
    let decoded = envelope.decode()?;
    let private = keys::import_private_key(private_key)?;

    let plaintext = open(&private, &decoded.wrapped_key, &decoded.iv, &decoded.ciphertext)?;

    std::str::from_utf8(&plaintext)
        .map(str::to_owned)
        .map_err(|_| CryptoError::EncodingError("Decrypted content is not valid UTF-8".to_string()))
}

/// Unwrap the message key and open the ciphertext
fn open(
    private: &RsaPrivateKey,
    wrapped_key: &[u8],
    iv: &[u8],
    ciphertext: &[u8],
) -> CryptoResult<Zeroizing<Vec<u8>>> {
    let key = Zeroizing::new(
        private
            .decrypt(Oaep::new::<Sha256>(), wrapped_key)
            .map_err(|_| CryptoError::DecryptionFailed)?,
    );
    if key.len() != AES_KEY_SIZE || iv.len() != IV_SIZE {
        return Err(CryptoError::DecryptionFailed);
    }

    let cipher = Aes256Gcm::new_from_slice(&key).map_err(|_| CryptoError::DecryptionFailed)?;
    cipher
        .decrypt(Nonce::from_slice(iv), ciphertext)
        .map(Zeroizing::new)
        .map_err(|_| CryptoError::DecryptionFailed)
}
