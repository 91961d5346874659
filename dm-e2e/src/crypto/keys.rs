//! Key types and generation for direct-message encryption
//!
//! Every user owns one RSA-OAEP key pair:
//! - The public half is exported as SPKI DER and shared through the key directory
//! - The private half is exported as PKCS#8 DER and never leaves the key vault
//!
//! Both halves travel as base64 text produced by [`crate::crypto::codec`].

use std::fmt;

use rand::rngs::OsRng;
use rsa::pkcs8::{DecodePrivateKey, DecodePublicKey, EncodePrivateKey, EncodePublicKey};
use rsa::traits::PublicKeyParts;
use rsa::{BigUint, RsaPrivateKey, RsaPublicKey};
use serde::{Deserialize, Serialize};
use zeroize::Zeroizing;

use crate::crypto::codec;
use crate::crypto::errors::{CryptoError, CryptoResult};

/// RSA modulus size for generated key pairs
pub const RSA_MODULUS_BITS: usize = 2048;

/// RSA public exponent (F4)
pub const RSA_PUBLIC_EXPONENT: u32 = 65537;

/// A user's exportable key pair
///
/// `public_key` is base64(SPKI DER), `private_key` is base64(PKCS#8 DER).
#[derive(Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyPair {
    /// Public key (safe to share)
    pub public_key: String,
    /// Private key (never leaves the user's vault)
    pub private_key: Zeroizing<String>,
}

impl fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyPair")
            .field("public_key", &self.public_key)
            .field("private_key", &"<redacted>")
            .finish()
    }
}

impl KeyPair {
    /// Compute a fingerprint of the public half for verification
    pub fn fingerprint(&self) -> CryptoResult<String> {
        public_key_fingerprint(&self.public_key)
    }
}

/// Generate a new RSA-OAEP key pair
///
/// 2048-bit modulus, exponent 65537. Errors are fatal to the caller; nothing
/// is retried here.
pub fn generate_key_pair() -> CryptoResult<KeyPair> {
    let exponent = BigUint::from(RSA_PUBLIC_EXPONENT);
    let private = RsaPrivateKey::new_with_exp(&mut OsRng, RSA_MODULUS_BITS, &exponent)
        .map_err(|e| CryptoError::KeyGenerationFailed(e.to_string()))?;
    let public = RsaPublicKey::from(&private);

    let private_der = private
        .to_pkcs8_der()
        .map_err(|e| CryptoError::KeyGenerationFailed(format!("PKCS#8 export failed: {}", e)))?;
    let public_der = public
        .to_public_key_der()
        .map_err(|e| CryptoError::KeyGenerationFailed(format!("SPKI export failed: {}", e)))?;

    Ok(KeyPair {
        public_key: codec::encode(public_der.as_bytes()),
        private_key: Zeroizing::new(codec::encode(private_der.as_bytes())),
    })
}

/// Import a base64(SPKI DER) public key
pub fn import_public_key(encoded: &str) -> CryptoResult<RsaPublicKey> {
    let der = codec::decode(encoded)?;
    let key = RsaPublicKey::from_public_key_der(&der)
        .map_err(|e| CryptoError::KeyImportFailed(format!("Invalid SPKI public key: {}", e)))?;
    check_modulus(key.n().bits())?;
    Ok(key)
}

/// Import a base64(PKCS#8 DER) private key
pub fn import_private_key(encoded: &str) -> CryptoResult<RsaPrivateKey> {
    let der = Zeroizing::new(codec::decode(encoded)?);
    let key = RsaPrivateKey::from_pkcs8_der(&der)
        .map_err(|e| CryptoError::KeyImportFailed(format!("Invalid PKCS#8 private key: {}", e)))?;
    check_modulus(key.n().bits())?;
    Ok(key)
}

/// Compute a short fingerprint of a public key for out-of-band verification
///
/// First 8 bytes of SHA-256 over the SPKI DER, hex encoded. Only importable
/// public keys have a fingerprint.
pub fn public_key_fingerprint(encoded: &str) -> CryptoResult<String> {
    use sha2::{Digest, Sha256};
    import_public_key(encoded)?;
    let der = codec::decode(encoded)?;
    let hash = Sha256::digest(&der);
    Ok(hex::encode(&hash[..8]))
}

/// Re-derive the encoded public half of an encoded private key
pub fn public_key_from_private(private_key: &str) -> CryptoResult<String> {
    let private = import_private_key(private_key)?;
    let der = RsaPublicKey::from(&private)
        .to_public_key_der()
        .map_err(|e| CryptoError::KeyImportFailed(format!("SPKI export failed: {}", e)))?;
    Ok(codec::encode(der.as_bytes()))
}

fn check_modulus(bits: usize) -> CryptoResult<()> {
    if bits < RSA_MODULUS_BITS {
        return Err(CryptoError::KeyImportFailed(format!(
            "RSA modulus must be at least {} bits, got {}",
            RSA_MODULUS_BITS, bits
        )));
    }
    Ok(())
}
