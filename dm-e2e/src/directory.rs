//! Public key directory
//!
//! Maps user ids to their published SPKI public keys. Senders look up the
//! recipient here before encrypting. Two implementations are provided: a
//! local SQLite table and an HTTP client for a remote directory service.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::{Deserialize, Serialize};
use sqlx::{Row, SqlitePool};
use url::Url;

use crate::crypto::keys::{import_public_key, public_key_fingerprint};
use crate::error::{AppError, AppResult};

/// Lookup and publication of users' public keys
#[async_trait]
pub trait KeyDirectory: Send + Sync {
    /// Publish (or replace) a user's encoded public key
    async fn publish(&self, user_id: &str, public_key: &str) -> AppResult<()>;

    /// Look up a user's encoded public key
    async fn lookup(&self, user_id: &str) -> AppResult<Option<String>>;
}

/// Reject keys that would fail to import on the sender's side
fn validate_public_key(public_key: &str) -> AppResult<String> {
    import_public_key(public_key)?;
    Ok(public_key_fingerprint(public_key)?)
}

/// Directory kept in the local database
pub struct SqliteKeyDirectory {
    db: SqlitePool,
}

impl SqliteKeyDirectory {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    /// Stored fingerprint for a user's key
    pub async fn fingerprint(&self, user_id: &str) -> AppResult<Option<String>> {
        let result = sqlx::query(r#"SELECT fingerprint FROM public_keys WHERE user_id = ?"#)
            .bind(user_id)
            .fetch_optional(&self.db)
            .await?;

        Ok(result.map(|row| row.get("fingerprint")))
    }
}

#[async_trait]
impl KeyDirectory for SqliteKeyDirectory {
    async fn publish(&self, user_id: &str, public_key: &str) -> AppResult<()> {
        let fingerprint = validate_public_key(public_key)?;

        sqlx::query(
            r#"
            INSERT INTO public_keys (user_id, public_key, fingerprint, updated_at)
            VALUES (?, ?, ?, datetime('now'))
            ON CONFLICT(user_id) DO UPDATE SET
                public_key = excluded.public_key,
                fingerprint = excluded.fingerprint,
                updated_at = datetime('now')
            "#,
        )
        .bind(user_id)
        .bind(public_key)
        .bind(&fingerprint)
        .execute(&self.db)
        .await?;

        tracing::info!("Published public key for {} (fingerprint {})", user_id, fingerprint);
        Ok(())
    }

    async fn lookup(&self, user_id: &str) -> AppResult<Option<String>> {
        let result = sqlx::query(r#"SELECT public_key FROM public_keys WHERE user_id = ?"#)
            .bind(user_id)
            .fetch_optional(&self.db)
            .await?;

        Ok(result.map(|row| row.get("public_key")))
    }
}

/// Body of the public key endpoint
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PublicKeyBody {
    public_key: String,
}

/// HTTP client for a remote key directory
#[derive(Debug, Clone)]
pub struct RemoteKeyDirectory {
    client: Client,
    base_url: Url,
    token: Option<String>,
}

impl RemoteKeyDirectory {
    /// Create a new directory client
    pub fn new(base_url: Url, token: Option<String>, timeout: Duration) -> AppResult<Self> {
        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            base_url,
            token,
        })
    }

    /// Build URL for a user's key
    fn key_url(&self, user_id: &str) -> String {
        format!(
            "{}/api/users/{}/public-key",
            self.base_url.as_str().trim_end_matches('/'),
            urlencoding::encode(user_id)
        )
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.token {
            Some(token) => request.header("Authorization", format!("Bearer {}", token)),
            None => request,
        }
    }
}

#[async_trait]
impl KeyDirectory for RemoteKeyDirectory {
    async fn publish(&self, user_id: &str, public_key: &str) -> AppResult<()> {
        let fingerprint = validate_public_key(public_key)?;

        let body = PublicKeyBody {
            public_key: public_key.to_string(),
        };
        let response = self
            .authorize(self.client.put(self.key_url(user_id)).json(&body))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(AppError::Directory(format!(
                "Publish failed ({}): {}",
                status, error_text
            )));
        }

        tracing::info!("Published public key for {} (fingerprint {})", user_id, fingerprint);
        Ok(())
    }

    async fn lookup(&self, user_id: &str) -> AppResult<Option<String>> {
        let response = self
            .authorize(self.client.get(self.key_url(user_id)))
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            tracing::debug!("No public key published for {}", user_id);
            return Ok(None);
        }
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(AppError::Directory(format!(
                "Lookup failed ({}): {}",
                status, error_text
            )));
        }

        let body: PublicKeyBody = response.json().await?;
        Ok(Some(body.public_key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::test_support::{alice, bob};
    use crate::crypto::CryptoError;
    use crate::db;

    async fn directory() -> SqliteKeyDirectory {
        SqliteKeyDirectory::new(db::connect_in_memory().await.unwrap())
    }

    #[tokio::test]
    async fn test_publish_and_lookup() {
        let directory = directory().await;
        directory.publish("alice", &alice().public_key).await.unwrap();

        assert_eq!(
            directory.lookup("alice").await.unwrap().as_deref(),
            Some(alice().public_key.as_str())
        );
        assert!(directory.lookup("bob").await.unwrap().is_none());
        assert_eq!(
            directory.fingerprint("alice").await.unwrap(),
            Some(alice().fingerprint().unwrap())
        );
    }

    #[tokio::test]
    async fn test_publish_replaces_key() {
        let directory = directory().await;
        directory.publish("alice", &alice().public_key).await.unwrap();
        directory.publish("alice", &bob().public_key).await.unwrap();

        assert_eq!(
            directory.lookup("alice").await.unwrap().as_deref(),
            Some(bob().public_key.as_str())
        );
    }

    #[tokio::test]
    async fn test_publish_rejects_invalid_keys() {
        let directory = directory().await;

        let err = directory.publish("alice", "not base64!").await.unwrap_err();
        assert!(matches!(err, AppError::Crypto(CryptoError::EncodingError(_))));

        let err = directory.publish("alice", "AAAA").await.unwrap_err();
        assert!(matches!(err, AppError::Crypto(CryptoError::KeyImportFailed(_))));

        // A private key is not a publishable public key
        let err = directory.publish("alice", &alice().private_key).await.unwrap_err();
        assert!(matches!(err, AppError::Crypto(CryptoError::KeyImportFailed(_))));

        assert!(directory.lookup("alice").await.unwrap().is_none());
    }

    #[test]
    fn test_remote_key_url() {
        let timeout = Duration::from_secs(5);
        let base = Url::parse("https://keys.example.com/").unwrap();
        let directory = RemoteKeyDirectory::new(base, None, timeout).unwrap();
        assert_eq!(
            directory.key_url("bob"),
            "https://keys.example.com/api/users/bob/public-key"
        );
        assert_eq!(
            directory.key_url("a/b c"),
            "https://keys.example.com/api/users/a%2Fb%20c/public-key"
        );

        let base = Url::parse("https://example.com/directory").unwrap();
        let directory = RemoteKeyDirectory::new(base, None, timeout).unwrap();
        assert_eq!(
            directory.key_url("bob"),
            "https://example.com/directory/api/users/bob/public-key"
        );
    }

    mod remote {
        use super::*;
        use wiremock::matchers::{body_json, header, method, path};
        use wiremock::{Mock, MockServer, ResponseTemplate};

        fn remote(server: &MockServer, token: Option<&str>) -> RemoteKeyDirectory {
            RemoteKeyDirectory::new(
                Url::parse(&server.uri()).unwrap(),
                token.map(str::to_string),
                Duration::from_secs(5),
            )
            .unwrap()
        }

        #[tokio::test]
        async fn test_lookup_sends_bearer_token() {
            let server = MockServer::start().await;
            Mock::given(method("GET"))
                .and(path("/api/users/bob/public-key"))
                .and(header("Authorization", "Bearer directory-token"))
                .respond_with(
                    ResponseTemplate::new(200)
                        .set_body_json(serde_json::json!({ "publicKey": bob().public_key.as_str() })),
                )
                .expect(1)
                .mount(&server)
                .await;

            let directory = remote(&server, Some("directory-token"));
            assert_eq!(
                directory.lookup("bob").await.unwrap().as_deref(),
                Some(bob().public_key.as_str())
            );
        }

        #[tokio::test]
        async fn test_lookup_without_token_has_no_auth_header() {
            let server = MockServer::start().await;
            Mock::given(method("GET"))
                .and(path("/api/users/bob/public-key"))
                .respond_with(
                    ResponseTemplate::new(200)
                        .set_body_json(serde_json::json!({ "publicKey": bob().public_key.as_str() })),
                )
                .mount(&server)
                .await;

            remote(&server, None).lookup("bob").await.unwrap();

            let requests = server.received_requests().await.unwrap();
            assert_eq!(requests.len(), 1);
            assert!(requests[0].headers.get("authorization").is_none());
        }

        #[tokio::test]
        async fn test_lookup_not_found_is_absent() {
            let server = MockServer::start().await;
            Mock::given(method("GET"))
                .and(path("/api/users/carol/public-key"))
                .respond_with(ResponseTemplate::new(404))
                .mount(&server)
                .await;

            assert!(remote(&server, None).lookup("carol").await.unwrap().is_none());
        }

        #[tokio::test]
        async fn test_lookup_server_error() {
            let server = MockServer::start().await;
            Mock::given(method("GET"))
                .and(path("/api/users/bob/public-key"))
                .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
                .mount(&server)
                .await;

            let err = remote(&server, None).lookup("bob").await.unwrap_err();
            match err {
                AppError::Directory(message) => assert!(message.contains("boom")),
                other => panic!("unexpected error: {:?}", other),
            }
        }

        #[tokio::test]
        async fn test_publish_puts_camel_case_body() {
            let server = MockServer::start().await;
            Mock::given(method("PUT"))
                .and(path("/api/users/alice/public-key"))
                .and(header("Authorization", "Bearer directory-token"))
                .and(body_json(serde_json::json!({ "publicKey": alice().public_key.as_str() })))
                .respond_with(ResponseTemplate::new(204))
                .expect(1)
                .mount(&server)
                .await;

            remote(&server, Some("directory-token"))
                .publish("alice", &alice().public_key)
                .await
                .unwrap();
        }

        #[tokio::test]
        async fn test_publish_server_error() {
            let server = MockServer::start().await;
            Mock::given(method("PUT"))
                .and(path("/api/users/alice/public-key"))
                .respond_with(ResponseTemplate::new(503))
                .mount(&server)
                .await;

            let err = remote(&server, None)
                .publish("alice", &alice().public_key)
                .await
                .unwrap_err();
            assert!(matches!(err, AppError::Directory(_)));
        }

        #[tokio::test]
        async fn test_publish_validates_before_sending() {
            let server = MockServer::start().await;
            let directory = remote(&server, None);

            let err = directory.publish("alice", "AAAA").await.unwrap_err();
            assert!(matches!(err, AppError::Crypto(CryptoError::KeyImportFailed(_))));
            let err = directory.publish("alice", &alice().private_key).await.unwrap_err();
            assert!(matches!(err, AppError::Crypto(CryptoError::KeyImportFailed(_))));

            assert!(server.received_requests().await.unwrap().is_empty());
        }
    }

    #[test]
    fn test_remote_body_is_camel_case() {
        let body = PublicKeyBody {
            public_key: "AAAA".to_string(),
        };
        assert_eq!(
            serde_json::to_value(&body).unwrap(),
            serde_json::json!({ "publicKey": "AAAA" })
        );
    }
}
