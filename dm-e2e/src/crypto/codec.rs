//! Binary <-> text transcoding
//!
//! Every key, ciphertext and nonce crosses the storage and wire boundary as
//! standard-alphabet, padded base64.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;

use crate::crypto::errors::CryptoResult;

/// Encode raw bytes as base64 text
pub fn encode(bytes: &[u8]) -> String {
    STANDARD.encode(bytes)
}

/// Decode base64 text into raw bytes
///
/// Rejects characters outside the standard alphabet, missing or extra
/// padding, and non-canonical trailing bits.
pub fn decode(text: &str) -> CryptoResult<Vec<u8>> {
    Ok(STANDARD.decode(text)?)
}
