//! Analysis results cache
//!
//! Completed analyses are kept in an LRU keyed by the normalized request and
//! expire after a TTL. Population is single-flight: the first caller to miss
//! on a key receives a [`CacheClaim`] and becomes the only writer for it.
//! Callers that arrive while that claim is outstanding wait for its result
//! instead of starting a duplicate run.
//!
//! # Example
//!
//! ```ignore
//! match cache.lookup(&key).await {
//!     Lookup::Hit(entry) => reuse(entry),
//!     Lookup::Miss(Some(claim)) => {
//!         let entry = run_analysis().await?;
//!         claim.publish(entry);
//!     }
//!     // waited too long on another writer; compute without writing
//!     Lookup::Miss(None) => { run_analysis().await?; }
//! }
//! ```

use crate::quality::Score;
use crate::research::ResearchMaterial;
use crate::types::AnalysisRequest;
use crate::utils::toml_config::CacheConfig;
use lru::LruCache;
use parking_lot::Mutex;
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::Instant;
use tracing::debug;

/// SHA-256 of the normalized company, ticker and focus
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    pub fn for_request(request: &AnalysisRequest) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(request.company.trim().to_lowercase().as_bytes());
        hasher.update(b"|");
        hasher.update(
            request
                .ticker
                .as_deref()
                .unwrap_or("")
                .trim()
                .to_uppercase()
                .as_bytes(),
        );
        hasher.update(b"|");
        hasher.update(request.focus().trim().to_lowercase().as_bytes());
        CacheKey(format!("{:x}", hasher.finalize()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// What a finished analysis leaves behind for later identical requests
#[derive(Debug, Clone)]
pub struct CachedAnalysis {
    pub material: ResearchMaterial,
    pub draft: String,
    pub critique: String,
    pub score: Score,
    pub revision_count: u8,
    pub provider_used: Option<String>,
}

pub enum Lookup {
    Hit(Arc<CachedAnalysis>),
    /// `Some` makes the caller the writer for this key
    Miss(Option<CacheClaim>),
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    /// Lookups served by waiting on another caller's run
    pub coalesced: u64,
    pub entry_count: usize,
}

struct Ready {
    value: Arc<CachedAnalysis>,
    inserted: Instant,
}

type Slot = watch::Sender<Option<Arc<CachedAnalysis>>>;

struct Inner {
    ready: LruCache<CacheKey, Ready>,
    in_flight: HashMap<CacheKey, (u64, Slot)>,
    next_claim: u64,
}

pub struct AnalysisCache {
    inner: Arc<Mutex<Inner>>,
    ttl: Duration,
    inflight_wait: Duration,
    hits: AtomicU64,
    misses: AtomicU64,
    coalesced: AtomicU64,
}

impl AnalysisCache {
    pub fn new(capacity: usize, ttl: Duration, inflight_wait: Duration) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            inner: Arc::new(Mutex::new(Inner {
                ready: LruCache::new(capacity),
                in_flight: HashMap::new(),
                next_claim: 0,
            })),
            ttl,
            inflight_wait,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            coalesced: AtomicU64::new(0),
        }
    }

    pub fn from_config(config: &CacheConfig) -> Self {
        Self::new(config.capacity, config.ttl(), config.inflight_wait())
    }

    pub async fn lookup(&self, key: &CacheKey) -> Lookup {
        loop {
            let mut rx = {
                let mut inner = self.inner.lock();

                let fresh = inner
                    .ready
                    .get(key)
                    .filter(|r| r.inserted.elapsed() < self.ttl)
                    .map(|r| r.value.clone());
                if let Some(value) = fresh {
                    self.hits.fetch_add(1, Ordering::Relaxed);
                    return Lookup::Hit(value);
                }
                inner.ready.pop(key);

                match inner.in_flight.get(key) {
                    Some((_, slot)) => slot.subscribe(),
                    None => {
                        inner.next_claim += 1;
                        let id = inner.next_claim;
                        let (slot, _) = watch::channel(None);
                        inner.in_flight.insert(key.clone(), (id, slot));
                        self.misses.fetch_add(1, Ordering::Relaxed);
                        debug!(key = %key.as_str(), "Cache miss, claim taken");
                        return Lookup::Miss(Some(CacheClaim {
                            inner: self.inner.clone(),
                            key: key.clone(),
                            id,
                            published: false,
                        }));
                    }
                }
            };

            let waited = tokio::time::timeout(self.inflight_wait, async {
                rx.wait_for(Option::is_some).await.map(|v| (*v).clone())
            })
            .await;

            match waited {
                Ok(Ok(Some(value))) => {
                    self.coalesced.fetch_add(1, Ordering::Relaxed);
                    return Lookup::Hit(value);
                }
                // The writer gave up without publishing; try to take over.
                Ok(Ok(None)) | Ok(Err(_)) => continue,
                Err(_) => {
                    self.misses.fetch_add(1, Ordering::Relaxed);
                    debug!(key = %key.as_str(), "Gave up waiting on in-flight analysis");
                    return Lookup::Miss(None);
                }
            }
        }
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            coalesced: self.coalesced.load(Ordering::Relaxed),
            entry_count: self.inner.lock().ready.len(),
        }
    }
}

/// Exclusive right to populate one key. Dropping it unpublished releases the
/// key so a waiting caller can take over.
pub struct CacheClaim {
    inner: Arc<Mutex<Inner>>,
    key: CacheKey,
    id: u64,
    published: bool,
}

impl CacheClaim {
    pub fn publish(mut self, value: CachedAnalysis) {
        let value = Arc::new(value);
        let mut inner = self.inner.lock();
        inner.ready.put(
            self.key.clone(),
            Ready {
                value: value.clone(),
                inserted: Instant::now(),
            },
        );
        if let Some((id, slot)) = inner.in_flight.remove(&self.key) {
            if id == self.id {
                slot.send_replace(Some(value));
            } else {
                inner.in_flight.insert(self.key.clone(), (id, slot));
            }
        }
        self.published = true;
    }
}

impl Drop for CacheClaim {
    fn drop(&mut self) {
        if self.published {
            return;
        }
        let mut inner = self.inner.lock();
        let ours = inner
            .in_flight
            .get(&self.key)
            .is_some_and(|(id, _)| *id == self.id);
        if ours {
            inner.in_flight.remove(&self.key);
        }
    }
}
