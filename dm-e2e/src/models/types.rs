//! Shared data types for the message store

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::crypto::{CryptoError, CryptoResult, EncryptedEnvelope};

// ============================================================================
// Message Types
// ============================================================================

/// A direct message as stored by the external message store
///
/// Encrypted messages carry the three envelope fields and an empty
/// `content`; plaintext messages carry only `content`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DirectMessagePayload {
    pub sender_id: String,
    pub receiver_id: String,
    #[serde(default)]
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub encrypted_content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub encrypted_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub iv: Option<String>,
    #[serde(default)]
    pub is_encrypted: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

impl DirectMessagePayload {
    /// Payload carrying an encrypted envelope
    pub fn encrypted(sender_id: &str, receiver_id: &str, envelope: EncryptedEnvelope) -> Self {
        Self {
            sender_id: sender_id.to_string(),
            receiver_id: receiver_id.to_string(),
            content: String::new(),
            encrypted_content: Some(envelope.encrypted_content),
            encrypted_key: Some(envelope.encrypted_key),
            iv: Some(envelope.iv),
            is_encrypted: true,
            created_at: Some(Utc::now()),
        }
    }

    /// Unencrypted payload
    pub fn plaintext(sender_id: &str, receiver_id: &str, content: &str) -> Self {
        Self {
            sender_id: sender_id.to_string(),
            receiver_id: receiver_id.to_string(),
            content: content.to_string(),
            encrypted_content: None,
            encrypted_key: None,
            iv: None,
            is_encrypted: false,
            created_at: Some(Utc::now()),
        }
    }

    /// Extract the envelope of an encrypted payload
    pub fn envelope(&self) -> CryptoResult<EncryptedEnvelope> {
        match (&self.encrypted_content, &self.encrypted_key, &self.iv) {
            (Some(encrypted_content), Some(encrypted_key), Some(iv)) => Ok(EncryptedEnvelope {
                encrypted_content: encrypted_content.clone(),
                encrypted_key: encrypted_key.clone(),
                iv: iv.clone(),
            }),
            _ => Err(CryptoError::EncodingError(
                "Encrypted payload is missing envelope fields".to_string(),
            )),
        }
    }
}

// ============================================================================
// Key Setup Types
// ============================================================================

/// Outcome of making sure a user has a key pair
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum KeySetup {
    /// The vault already held a private key
    Existing,
    /// A new pair was generated and published
    Generated { fingerprint: String },
    /// The vault key was kept and its public half published again
    Republished { fingerprint: String },
}
