//! Public key import cache
//!
//! Parsing an SPKI RSA key is far more expensive than a symmetric operation,
//! and the same recipient key is reused for every outgoing message to that
//! user. Imported handles are therefore memoized, keyed by the exact encoded
//! string. Private keys are never cached.
//!
//! Both the storage policy ([`KeyCache`]) and the import step
//! ([`PublicKeyImporter`]) are injected so independent instances can be built
//! per service, per test.

use std::collections::HashMap;
use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use lru::LruCache;
use rsa::RsaPublicKey;

use crate::crypto::errors::CryptoResult;
use crate::crypto::keys;

/// Opaque handle to an imported public key
pub type PublicKeyHandle = Arc<RsaPublicKey>;

/// Default number of imported public keys kept by [`LruKeyCache`]
pub const DEFAULT_CACHE_CAPACITY: usize = 256;

/// Storage policy for imported public keys
pub trait KeyCache: Send + Sync {
    /// Look up a handle by its encoded key string
    fn get(&self, encoded: &str) -> Option<PublicKeyHandle>;
    /// Store a handle under its encoded key string
    fn insert(&self, encoded: String, handle: PublicKeyHandle);
    /// Drop a single entry
    fn remove(&self, encoded: &str);
    /// Number of cached handles
    fn len(&self) -> usize;
    /// Drop every entry
    fn clear(&self);

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Bounded cache that evicts the least recently used key first
pub struct LruKeyCache {
    entries: Mutex<LruCache<String, PublicKeyHandle>>,
}

impl LruKeyCache {
    pub fn new(capacity: NonZeroUsize) -> Self {
        Self {
            entries: Mutex::new(LruCache::new(capacity)),
        }
    }
}

impl Default for LruKeyCache {
    fn default() -> Self {
        Self::new(NonZeroUsize::new(DEFAULT_CACHE_CAPACITY).unwrap_or(NonZeroUsize::MIN))
    }
}

impl KeyCache for LruKeyCache {
    fn get(&self, encoded: &str) -> Option<PublicKeyHandle> {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.get(encoded).cloned()
    }

    fn insert(&self, encoded: String, handle: PublicKeyHandle) {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.put(encoded, handle);
    }

    fn remove(&self, encoded: &str) {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.pop(encoded);
    }

    fn len(&self) -> usize {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    fn clear(&self) {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner).clear();
    }
}

/// Cache without eviction
///
/// Grows with the number of distinct recipients seen by the process.
#[derive(Default)]
pub struct UnboundedKeyCache {
    entries: RwLock<HashMap<String, PublicKeyHandle>>,
}

impl UnboundedKeyCache {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyCache for UnboundedKeyCache {
    fn get(&self, encoded: &str) -> Option<PublicKeyHandle> {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        entries.get(encoded).cloned()
    }

    fn insert(&self, encoded: String, handle: PublicKeyHandle) {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        entries.insert(encoded, handle);
    }

    fn remove(&self, encoded: &str) {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        entries.remove(encoded);
    }

    fn len(&self) -> usize {
        self.entries.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    fn clear(&self) {
        self.entries.write().unwrap_or_else(PoisonError::into_inner).clear();
    }
}

/// Turns an encoded public key into a usable RSA key
pub trait PublicKeyImporter: Send + Sync {
    fn import(&self, encoded: &str) -> CryptoResult<RsaPublicKey>;
}

/// Production importer: base64(SPKI DER) RSA-OAEP/SHA-256 keys
#[derive(Debug, Default, Clone, Copy)]
pub struct SpkiImporter;

impl PublicKeyImporter for SpkiImporter {
    fn import(&self, encoded: &str) -> CryptoResult<RsaPublicKey> {
        keys::import_public_key(encoded)
    }
}

/// Cache statistics
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub entries: usize,
}

/// Lookup-or-import front end over a [`KeyCache`]
pub struct KeyImportCache {
    cache: Arc<dyn KeyCache>,
    importer: Arc<dyn PublicKeyImporter>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl KeyImportCache {
    /// Create an import cache with the production importer
    pub fn new(cache: Arc<dyn KeyCache>) -> Self {
        Self::with_importer(cache, Arc::new(SpkiImporter))
    }

    /// Create an import cache with a custom importer
    pub fn with_importer(cache: Arc<dyn KeyCache>, importer: Arc<dyn PublicKeyImporter>) -> Self {
        Self {
            cache,
            importer,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    /// Resolve an encoded public key to an imported handle
    ///
    /// Imports on first sight and caches the result; failed imports are not
    /// cached. Two concurrent misses for the same key may both import, which
    /// only costs time.
    pub fn resolve_public_key(&self, encoded: &str) -> CryptoResult<PublicKeyHandle> {
        if let Some(handle) = self.cache.get(encoded) {
            self.hits.fetch_add(1, Ordering::Relaxed);
            return Ok(handle);
        }

        self.misses.fetch_add(1, Ordering::Relaxed);
        let handle = Arc::new(self.importer.import(encoded)?);
        self.cache.insert(encoded.to_string(), handle.clone());
        tracing::debug!("Imported public key into cache ({} cached)", self.cache.len());
        Ok(handle)
    }

    /// Forget one cached key, e.g. before re-fetching a possibly stale one
    pub fn forget(&self, encoded: &str) {
        self.cache.remove(encoded);
    }

    /// Drop every cached key
    pub fn clear(&self) {
        self.cache.clear();
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            entries: self.cache.len(),
        }
    }
}
