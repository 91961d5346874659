//! Direct message sealing and opening
//!
//! Glues the crypto service to key storage: the sender's side looks up the
//! receiver's public key in the directory, the reader's side loads its own
//! private key from the vault.

use std::sync::Arc;

use crate::crypto::{CryptoError, CryptoService};
use crate::directory::KeyDirectory;
use crate::error::{AppError, AppResult};
use crate::models::{DirectMessagePayload, KeySetup};
use crate::vault::KeyVault;

/// Sends and reads end-to-end encrypted direct messages
#[derive(Clone)]
pub struct Messenger {
    crypto: CryptoService,
    vault: Arc<dyn KeyVault>,
    directory: Arc<dyn KeyDirectory>,
}

impl Messenger {
    pub fn new(
        crypto: CryptoService,
        vault: Arc<dyn KeyVault>,
        directory: Arc<dyn KeyDirectory>,
    ) -> Self {
        Self {
            crypto,
            vault,
            directory,
        }
    }

    /// Make sure `user_id` has a key pair, generating and publishing one if not
    ///
    /// When the vault already holds a key, the directory entry is checked too
    /// and republished from the vault if it is missing or does not match.
    pub async fn ensure_user_keys(&self, user_id: &str) -> AppResult<KeySetup> {
        if let Some(private_key) = self.vault.retrieve(user_id).await? {
            return self.sync_published_key(user_id, &private_key).await;
        }

        let pair = self.crypto.generate_key_pair().await?;
        let fingerprint = pair.fingerprint()?;

        // Vault first: a published key without its private half is unreadable
        self.vault.store(user_id, &pair.private_key).await?;
        self.directory.publish(user_id, &pair.public_key).await?;

        tracing::info!("Set up keys for {} (fingerprint {})", user_id, fingerprint);
        Ok(KeySetup::Generated { fingerprint })
    }

    async fn sync_published_key(&self, user_id: &str, private_key: &str) -> AppResult<KeySetup> {
        let public_key = self.crypto.public_key_for(private_key).await?;
        let fingerprint = self.crypto.fingerprint(&public_key)?;

        let published = self
            .directory
            .lookup(user_id)
            .await?
            .and_then(|key| self.crypto.fingerprint(&key).ok());
        if published.as_deref() == Some(fingerprint.as_str()) {
            tracing::debug!("Vault and directory agree on the key for {}", user_id);
            return Ok(KeySetup::Existing);
        }

        tracing::warn!(
            "Directory key for {} is missing or stale, republishing {}",
            user_id,
            fingerprint
        );
        self.directory.publish(user_id, &public_key).await?;
        Ok(KeySetup::Republished { fingerprint })
    }

    /// Encrypt `plaintext` for `receiver_id`
    ///
    /// A directory entry that cannot be decoded or imported is fetched once
    /// more before giving up.
    pub async fn seal(
        &self,
        sender_id: &str,
        receiver_id: &str,
        plaintext: &str,
    ) -> AppResult<DirectMessagePayload> {
        let public_key = self.receiver_key(receiver_id).await?;

        let envelope = match self.crypto.encrypt(plaintext, &public_key).await {
            Err(CryptoError::KeyImportFailed(reason) | CryptoError::EncodingError(reason)) => {
                tracing::warn!(
                    "Public key for {} is unusable ({}), refetching",
                    receiver_id,
                    reason
                );
                let public_key = self.receiver_key(receiver_id).await?;
                self.crypto.encrypt(plaintext, &public_key).await?
            }
            result => result?,
        };

        tracing::debug!("Sealed message from {} to {}", sender_id, receiver_id);
        Ok(DirectMessagePayload::encrypted(sender_id, receiver_id, envelope))
    }

    /// Read a stored message as `reader_id`
    pub async fn open(&self, reader_id: &str, payload: &DirectMessagePayload) -> AppResult<String> {
        if !payload.is_encrypted {
            return Ok(payload.content.clone());
        }

        let envelope = payload.envelope()?;
        let private_key = self
            .vault
            .retrieve(reader_id)
            .await?
            .ok_or_else(|| AppError::PrivateKeyNotFound(reader_id.to_string()))?;

        let plaintext = self.crypto.decrypt(&envelope, &private_key).await?;
        Ok(plaintext)
    }

    async fn receiver_key(&self, receiver_id: &str) -> AppResult<String> {
        self.directory
            .lookup(receiver_id)
            .await?
            .ok_or_else(|| AppError::PublicKeyNotFound(receiver_id.to_string()))
    }
}
