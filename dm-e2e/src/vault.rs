//! Private key vault
//!
//! The vault holds each local user's PKCS#8 private key. Keys are never
//! stored in the clear: every row is sealed with AES-256-GCM under a key
//! derived from the device's vault secret and a per-row salt, with the user
//! id bound in as associated data.

use aes_gcm::aead::{Aead, KeyInit, Payload};
use aes_gcm::{Aes256Gcm, Nonce};
use async_trait::async_trait;
use hkdf::Hkdf;
use rand::rngs::OsRng;
use rand::RngCore;
use sha2::Sha256;
use sqlx::{Row, SqlitePool};
use zeroize::Zeroizing;

use crate::crypto::codec;
use crate::crypto::envelope::{AES_KEY_SIZE, IV_SIZE};
use crate::error::{AppError, AppResult};

/// Minimum length of the device vault secret in bytes
pub const VAULT_SECRET_MIN_LEN: usize = 32;

const SALT_SIZE: usize = 16;
const VAULT_KEY_INFO: &[u8] = b"dm-e2e vault key v1";

/// Storage for the current user's private key
///
/// Implementations must keep keys confidential at rest and scoped to one user.
#[async_trait]
pub trait KeyVault: Send + Sync {
    /// Store (or replace) a user's encoded private key
    async fn store(&self, user_id: &str, private_key: &str) -> AppResult<()>;

    /// Retrieve a user's encoded private key
    async fn retrieve(&self, user_id: &str) -> AppResult<Option<Zeroizing<String>>>;

    /// Delete a user's private key (for logout or account removal)
    async fn remove(&self, user_id: &str) -> AppResult<()>;
}

/// Device secret from which per-row vault keys are derived
pub struct VaultSecret(Zeroizing<Vec<u8>>);

impl VaultSecret {
    pub fn new(bytes: Vec<u8>) -> AppResult<Self> {
        let bytes = Zeroizing::new(bytes);
        if bytes.len() < VAULT_SECRET_MIN_LEN {
            return Err(AppError::Config(format!(
                "Vault secret must be at least {} bytes, got {}",
                VAULT_SECRET_MIN_LEN,
                bytes.len()
            )));
        }
        Ok(Self(bytes))
    }

    /// Parse a base64-encoded secret
    pub fn from_base64(encoded: &str) -> AppResult<Self> {
        let bytes = codec::decode(encoded.trim())
            .map_err(|e| AppError::Config(format!("Vault secret is not valid base64: {}", e)))?;
        Self::new(bytes)
    }

    /// Derive the AES key for one vault row
    fn row_key(&self, salt: &[u8]) -> AppResult<Zeroizing<[u8; AES_KEY_SIZE]>> {
        let hkdf = Hkdf::<Sha256>::new(Some(salt), &self.0);
        let mut key = Zeroizing::new([0u8; AES_KEY_SIZE]);
        hkdf.expand(VAULT_KEY_INFO, &mut key[..])
            .map_err(|e| AppError::Vault(format!("Key derivation failed: {}", e)))?;
        Ok(key)
    }
}

impl Clone for VaultSecret {
    fn clone(&self) -> Self {
        Self(Zeroizing::new(self.0.to_vec()))
    }
}

impl std::fmt::Debug for VaultSecret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("VaultSecret(<redacted>)")
    }
}

/// Generate a random vault secret (for first-run setup), base64 encoded
pub fn generate_vault_secret() -> String {
    let mut secret = Zeroizing::new([0u8; VAULT_SECRET_MIN_LEN]);
    OsRng.fill_bytes(&mut secret[..]);
    codec::encode(&secret[..])
}

/// SQLite-backed vault with at-rest encryption
pub struct SqliteKeyVault {
    /// Database connection pool
    db: SqlitePool,
    /// Device secret for deriving row keys
    secret: VaultSecret,
}

impl SqliteKeyVault {
    /// Create a new vault
    pub fn new(db: SqlitePool, secret: VaultSecret) -> Self {
        Self { db, secret }
    }

    fn seal(&self, user_id: &str, private_key: &str) -> AppResult<SealedRow> {
        let mut salt = [0u8; SALT_SIZE];
        OsRng.fill_bytes(&mut salt);
        let mut nonce = [0u8; IV_SIZE];
        OsRng.fill_bytes(&mut nonce);

        let key = self.secret.row_key(&salt)?;
        let cipher = Aes256Gcm::new_from_slice(&key[..])
            .map_err(|e| AppError::Vault(format!("Invalid vault key: {}", e)))?;
        let wrapped = cipher
            .encrypt(
                Nonce::from_slice(&nonce),
                Payload {
                    msg: private_key.as_bytes(),
                    aad: user_id.as_bytes(),
                },
            )
            .map_err(|_| AppError::Vault("Failed to seal private key".to_string()))?;

        Ok(SealedRow {
            wrapped_key: codec::encode(&wrapped),
            nonce: codec::encode(&nonce),
            salt: codec::encode(&salt),
        })
    }

    fn unseal(&self, user_id: &str, row: &SealedRow) -> AppResult<Zeroizing<String>> {
        let corrupted = || AppError::Vault(format!("Stored key for {} cannot be opened", user_id));

        let wrapped = codec::decode(&row.wrapped_key).map_err(|_| corrupted())?;
        let nonce = codec::decode(&row.nonce).map_err(|_| corrupted())?;
        let salt = codec::decode(&row.salt).map_err(|_| corrupted())?;
        if nonce.len() != IV_SIZE {
            return Err(corrupted());
        }

        let key = self.secret.row_key(&salt)?;
        let cipher = Aes256Gcm::new_from_slice(&key[..]).map_err(|_| corrupted())?;
        let plaintext = Zeroizing::new(
            cipher
                .decrypt(
                    Nonce::from_slice(&nonce),
                    Payload {
                        msg: &wrapped,
                        aad: user_id.as_bytes(),
                    },
                )
                .map_err(|_| corrupted())?,
        );

        std::str::from_utf8(&plaintext)
            .map(|s| Zeroizing::new(s.to_string()))
            .map_err(|_| corrupted())
    }
}

/// Encrypted columns of one vault row
struct SealedRow {
    wrapped_key: String,
    nonce: String,
    salt: String,
}

#[async_trait]
impl KeyVault for SqliteKeyVault {
    async fn store(&self, user_id: &str, private_key: &str) -> AppResult<()> {
        let row = self.seal(user_id, private_key)?;

        sqlx::query(
            r#"
            INSERT INTO vault_keys (user_id, wrapped_key, nonce, salt, created_at, updated_at)
            VALUES (?, ?, ?, ?, datetime('now'), datetime('now'))
            ON CONFLICT(user_id) DO UPDATE SET
                wrapped_key = excluded.wrapped_key,
                nonce = excluded.nonce,
                salt = excluded.salt,
                updated_at = datetime('now')
            "#,
        )
        .bind(user_id)
        .bind(&row.wrapped_key)
        .bind(&row.nonce)
        .bind(&row.salt)
        .execute(&self.db)
        .await?;

        tracing::info!("Stored private key in vault for user: {}", user_id);
        Ok(())
    }

    async fn retrieve(&self, user_id: &str) -> AppResult<Option<Zeroizing<String>>> {
        let result = sqlx::query(r#"SELECT wrapped_key, nonce, salt FROM vault_keys WHERE user_id = ?"#)
            .bind(user_id)
            .fetch_optional(&self.db)
            .await?;

        match result {
            Some(row) => {
                let sealed = SealedRow {
                    wrapped_key: row.get("wrapped_key"),
                    nonce: row.get("nonce"),
                    salt: row.get("salt"),
                };
                self.unseal(user_id, &sealed).map(Some)
            }
            None => Ok(None),
        }
    }

    async fn remove(&self, user_id: &str) -> AppResult<()> {
        sqlx::query(r#"DELETE FROM vault_keys WHERE user_id = ?"#)
            .bind(user_id)
            .execute(&self.db)
            .await?;

        tracing::info!("Removed private key from vault for user: {}", user_id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;

    const PRIVATE_KEY: &str = "MIIEvQIBADANBgkqhkiG9w0BAQEFAASC-not-a-real-key";

    async fn vault() -> SqliteKeyVault {
        let db = db::connect_in_memory().await.unwrap();
        SqliteKeyVault::new(db, VaultSecret::from_base64(&generate_vault_secret()).unwrap())
    }

    #[tokio::test]
    async fn test_store_and_retrieve() {
        let vault = vault().await;
        vault.store("alice", PRIVATE_KEY).await.unwrap();

        let retrieved = vault.retrieve("alice").await.unwrap().unwrap();
        assert_eq!(retrieved.as_str(), PRIVATE_KEY);
        assert!(vault.retrieve("bob").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_key_is_not_stored_in_clear() {
        let vault = vault().await;
        vault.store("alice", PRIVATE_KEY).await.unwrap();

        let (wrapped, salt): (String, String) =
            sqlx::query_as("SELECT wrapped_key, salt FROM vault_keys WHERE user_id = 'alice'")
                .fetch_one(&vault.db)
                .await
                .unwrap();

        assert!(!wrapped.contains(PRIVATE_KEY));
        assert_ne!(codec::decode(&wrapped).unwrap(), PRIVATE_KEY.as_bytes());
        assert_eq!(codec::decode(&salt).unwrap().len(), SALT_SIZE);
    }

    #[tokio::test]
    async fn test_store_replaces_existing_key() {
        let vault = vault().await;
        vault.store("alice", "first").await.unwrap();
        vault.store("alice", "second").await.unwrap();

        assert_eq!(vault.retrieve("alice").await.unwrap().unwrap().as_str(), "second");
    }

    #[tokio::test]
    async fn test_row_bound_to_user() {
        let vault = vault().await;
        vault.store("alice", PRIVATE_KEY).await.unwrap();

        // Copy alice's sealed row onto bob
        sqlx::query(
            "INSERT INTO vault_keys (user_id, wrapped_key, nonce, salt) \
             SELECT 'bob', wrapped_key, nonce, salt FROM vault_keys WHERE user_id = 'alice'",
        )
        .execute(&vault.db)
        .await
        .unwrap();

        assert!(matches!(vault.retrieve("bob").await, Err(AppError::Vault(_))));
    }

    #[tokio::test]
    async fn test_wrong_secret_cannot_open() {
        let db = db::connect_in_memory().await.unwrap();
        let writer = SqliteKeyVault::new(db.clone(), VaultSecret::new(vec![1u8; 32]).unwrap());
        writer.store("alice", PRIVATE_KEY).await.unwrap();

        let reader = SqliteKeyVault::new(db, VaultSecret::new(vec![2u8; 32]).unwrap());
        let err = reader.retrieve("alice").await.unwrap_err();
        assert!(matches!(err, AppError::Vault(_)));
        assert!(!err.to_string().contains(PRIVATE_KEY));
    }

    #[tokio::test]
    async fn test_remove() {
        let vault = vault().await;
        vault.store("alice", PRIVATE_KEY).await.unwrap();
        vault.remove("alice").await.unwrap();
        assert!(vault.retrieve("alice").await.unwrap().is_none());
    }

    #[test]
    fn test_secret_validation() {
        assert!(matches!(VaultSecret::new(vec![0u8; 16]), Err(AppError::Config(_))));
        assert!(matches!(VaultSecret::from_base64("***"), Err(AppError::Config(_))));
        assert!(VaultSecret::from_base64(&generate_vault_secret()).is_ok());
    }

    #[test]
    fn test_secret_debug_is_redacted() {
        let secret = VaultSecret::new(vec![7u8; 32]).unwrap();
        assert_eq!(format!("{:?}", secret), "VaultSecret(<redacted>)");
    }
}
