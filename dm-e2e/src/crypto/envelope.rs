//! Wire envelope for one encrypted direct message
//!
//! ```text
//! encryptedContent: base64(AES-GCM(plaintext_utf8))   // ciphertext || tag
//! encryptedKey:     base64(RSA-OAEP-SHA256(aes_key_raw_bytes))
//! iv:               base64(96-bit random nonce)
//! ```

use serde::{Deserialize, Serialize};

use crate::crypto::codec;
use crate::crypto::errors::CryptoResult;

/// Size of the per-message AES-256 key in bytes
pub const AES_KEY_SIZE: usize = 32;

/// Size of the AES-GCM nonce in bytes
pub const IV_SIZE: usize = 12;

/// Size of the AES-GCM authentication tag in bytes
pub const TAG_SIZE: usize = 16;

/// Three-field envelope handed to the message store
///
/// Produced by exactly one encrypt call; never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EncryptedEnvelope {
    /// AES-GCM ciphertext with the authentication tag appended
    pub encrypted_content: String,
    /// RSA-OAEP wrapped AES key
    pub encrypted_key: String,
    /// AES-GCM nonce
    pub iv: String,
}

/// Envelope fields after base64 decoding
pub(crate) struct DecodedEnvelope {
    pub ciphertext: Vec<u8>,
    pub wrapped_key: Vec<u8>,
    pub iv: Vec<u8>,
}

impl EncryptedEnvelope {
    /// Build an envelope from raw binary parts
    pub(crate) fn from_parts(ciphertext: &[u8], wrapped_key: &[u8], iv: &[u8]) -> Self {
        Self {
            encrypted_content: codec::encode(ciphertext),
            encrypted_key: codec::encode(wrapped_key),
            iv: codec::encode(iv),
        }
    }

    /// Decode all three fields, failing before any cryptography is attempted
    pub(crate) fn decode(&self) -> CryptoResult<DecodedEnvelope> {
        Ok(DecodedEnvelope {
            ciphertext: codec::decode(&self.encrypted_content)?,
            wrapped_key: codec::decode(&self.encrypted_key)?,
            iv: codec::decode(&self.iv)?,
        })
    }
}
