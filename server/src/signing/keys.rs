//! Public Key Store
//!
//! Caches the platform's request-signing keys with a TTL. Concurrent
//! misses are collapsed into one outbound fetch: callers serialize on a
//! refresh lock and compare the generation they observed with the current
//! one, so only the first of them talks to the key authority.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use relay_common::{PublicKeyEntry, PublicKeysResponse};
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, instrument};

use super::error::{KeyFetchError, KeyStoreError};

/// Upper bound for one key authority round trip.
const FETCH_TIMEOUT: Duration = Duration::from_secs(10);

/// A trusted public key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublicKey {
    pub identifier: String,
    /// SPKI PEM encoded key.
    pub material: String,
    pub is_current: bool,
}

impl From<PublicKeyEntry> for PublicKey {
    fn from(entry: PublicKeyEntry) -> Self {
        Self {
            identifier: entry.key_identifier,
            material: entry.key,
            is_current: entry.is_current,
        }
    }
}

/// Keys indexed by identifier.
#[derive(Debug, Clone, Default)]
pub struct KeySet {
    keys: HashMap<String, PublicKey>,
}

impl KeySet {
    /// Build a set from the authority's entries. The first entry wins on
    /// duplicate identifiers.
    pub fn from_entries(entries: impl IntoIterator<Item = PublicKeyEntry>) -> Self {
        let mut keys = HashMap::new();
        for entry in entries {
            keys.entry(entry.key_identifier.clone())
                .or_insert_with(|| PublicKey::from(entry));
        }
        Self { keys }
    }

    pub fn get(&self, identifier: &str) -> Option<&PublicKey> {
        self.keys.get(identifier)
    }

    /// The key the platform currently signs with, if flagged.
    pub fn current(&self) -> Option<&PublicKey> {
        self.keys.values().find(|k| k.is_current)
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

/// Key set paired with the moment and generation it was fetched at.
struct CachedKeys {
    set: Arc<KeySet>,
    fetched_at: Instant,
    generation: u64,
}

/// Point-in-time view of the cache handed to callers.
struct Snapshot {
    set: Arc<KeySet>,
    age: Duration,
    generation: u64,
}

/// TTL cache in front of the key authority.
pub struct KeyStore {
    http: reqwest::Client,
    url: String,
    ttl: Duration,
    refresh_cooldown: Duration,
    cached: RwLock<Option<CachedKeys>>,
    /// Held while fetching so concurrent misses wait instead of fetching.
    refresh_lock: Mutex<()>,
    generation: AtomicU64,
    fetches: AtomicU64,
}

impl KeyStore {
    /// Create an empty store. Nothing is fetched until the first lookup.
    pub fn new(
        http: reqwest::Client,
        url: impl Into<String>,
        ttl: Duration,
        refresh_cooldown: Duration,
    ) -> Self {
        Self {
            http,
            url: url.into(),
            ttl,
            refresh_cooldown,
            cached: RwLock::new(None),
            refresh_lock: Mutex::new(()),
            generation: AtomicU64::new(0),
            fetches: AtomicU64::new(0),
        }
    }

    /// Resolve the key for `identifier`.
    ///
    /// An identifier missing from a cached set triggers one refetch when the
    /// set is older than the refresh cooldown, which picks up rotated keys
    /// without letting unknown identifiers force a fetch on every request.
    #[instrument(skip(self))]
    pub async fn get_key(&self, identifier: &str) -> Result<PublicKey, KeyStoreError> {
        let (snapshot, just_fetched) = match self.snapshot().await {
            Some(snapshot) if snapshot.age < self.ttl => (snapshot, false),
            stale => {
                let seen = stale.map_or(0, |s| s.generation);
                (self.refresh(seen).await?, true)
            }
        };

        if let Some(key) = snapshot.set.get(identifier) {
            return Ok(key.clone());
        }

        if just_fetched || snapshot.age < self.refresh_cooldown {
            return Err(KeyStoreError::NotFound);
        }

        debug!("Unknown key identifier, refetching key set");
        let refreshed = self.refresh(snapshot.generation).await?;
        refreshed
            .set
            .get(identifier)
            .cloned()
            .ok_or(KeyStoreError::NotFound)
    }

    /// Current key set, fetching it if the cache is empty or expired.
    pub async fn key_set(&self) -> Result<Arc<KeySet>, KeyFetchError> {
        match self.snapshot().await {
            Some(snapshot) if snapshot.age < self.ttl => Ok(snapshot.set),
            stale => {
                let seen = stale.map_or(0, |s| s.generation);
                Ok(self.refresh(seen).await?.set)
            }
        }
    }

    /// The key flagged as current by the authority.
    pub async fn current_key(&self) -> Result<Option<PublicKey>, KeyFetchError> {
        Ok(self.key_set().await?.current().cloned())
    }

    /// Drop the cached key set; the next lookup refetches.
    pub async fn invalidate(&self) {
        self.cached.write().await.take();
    }

    /// Number of outbound fetches performed so far.
    pub fn fetch_count(&self) -> u64 {
        self.fetches.load(Ordering::Relaxed)
    }

    async fn snapshot(&self) -> Option<Snapshot> {
        self.cached.read().await.as_ref().map(|c| Snapshot {
            set: Arc::clone(&c.set),
            age: c.fetched_at.elapsed(),
            generation: c.generation,
        })
    }

    /// Fetch a new key set unless someone else already replaced generation
    /// `seen` while we waited for the refresh lock.
    async fn refresh(&self, seen: u64) -> Result<Snapshot, KeyFetchError> {
        let _guard = self.refresh_lock.lock().await;

        if let Some(snapshot) = self.snapshot().await {
            if snapshot.generation != seen {
                return Ok(snapshot);
            }
        }

        let set = Arc::new(self.fetch().await?);
        let generation = self.generation.fetch_add(1, Ordering::AcqRel) + 1;
        info!(keys = set.len(), generation, "Fetched public key set");

        *self.cached.write().await = Some(CachedKeys {
            set: Arc::clone(&set),
            fetched_at: Instant::now(),
            generation,
        });

        Ok(Snapshot {
            set,
            age: Duration::ZERO,
            generation,
        })
    }

    async fn fetch(&self) -> Result<KeySet, KeyFetchError> {
        self.fetches.fetch_add(1, Ordering::Relaxed);

        let response = self
            .http
            .get(&self.url)
            .timeout(FETCH_TIMEOUT)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(KeyFetchError::Status(status.as_u16()));
        }

        let body = response.bytes().await?;
        let parsed: PublicKeysResponse = serde_json::from_slice(&body)?;
        Ok(KeySet::from_entries(parsed.public_keys))
    }
}
