// src/cache.rs
// Per-hostname enrichment cache with single-flight coordination.
//
// Layout: a capacity-bounded LRU of per-hostname slots, each slot an async
// mutex around the (possibly absent) stored result. The first caller for an
// uncached hostname takes the slot lock and becomes the leader running the
// pipeline; concurrent callers for the same hostname queue on the lock and
// read the leader's result instead of duplicating upstream calls. A leader
// whose future is dropped mid-flight releases the lock with nothing stored,
// so a cancelled computation never pollutes the cache.

use std::future::Future;
use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use lru::LruCache;
use tokio::sync::Mutex as AsyncMutex;

use crate::error::EnrichError;
use crate::model::EnrichmentResult;

/// Whether a response was served from cache. Reported to callers via the
/// `X-Enrichment-Cache` header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheStatus {
    Hit,
    Miss,
}

#[derive(Debug, Clone)]
struct StoredEntry {
    result: EnrichmentResult,
    stored_at: Instant,
}

type Slot = Arc<AsyncMutex<Option<StoredEntry>>>;

/// In-process cache keyed by case-normalized hostname. A write always
/// replaces the prior entry wholesale; there is at most one entry per key.
pub struct EnrichmentCache {
    slots: Mutex<LruCache<String, Slot>>,
    capacity: usize,
    ttl: Option<Duration>,
}

impl EnrichmentCache {
    /// `ttl: None` keeps entries for the process lifetime (the base design);
    /// long-running deployments opt into expiry via configuration.
    pub fn new(capacity: usize, ttl: Option<Duration>) -> Self {
        let capacity = capacity.max(1);
        let bound = NonZeroUsize::new(capacity).expect("capacity clamped above zero");
        Self {
            slots: Mutex::new(LruCache::new(bound)),
            capacity,
            ttl,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of hostnames currently tracked (including in-flight slots).
    pub fn len(&self) -> usize {
        self.lock_slots().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Serve `hostname` from cache, or run `compute` exactly once across all
    /// concurrent callers for the key and store its result.
    pub async fn get_or_compute<F, Fut>(
        &self,
        hostname: &str,
        compute: F,
    ) -> Result<(EnrichmentResult, CacheStatus), EnrichError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<EnrichmentResult, EnrichError>>,
    {
        let slot = self.slot(hostname);
        let mut guard = slot.lock().await;

        if let Some(entry) = guard.as_ref() {
            if !self.expired(entry) {
                return Ok((entry.result.clone(), CacheStatus::Hit));
            }
        }

        let result = compute().await?;
        *guard = Some(StoredEntry {
            result: result.clone(),
            stored_at: Instant::now(),
        });
        Ok((result, CacheStatus::Miss))
    }

    /// Non-computing read, mainly for tests and diagnostics. Does not
    /// allocate a slot for an unknown hostname.
    pub async fn lookup(&self, hostname: &str) -> Option<EnrichmentResult> {
        let slot = self.lock_slots().get(hostname).cloned()?;
        let guard = slot.lock().await;
        guard
            .as_ref()
            .filter(|entry| !self.expired(entry))
            .map(|entry| entry.result.clone())
    }

    /// Unconditionally replace the entry for `hostname`.
    pub async fn store(&self, hostname: &str, result: EnrichmentResult) {
        let slot = self.slot(hostname);
        let mut guard = slot.lock().await;
        *guard = Some(StoredEntry {
            result,
            stored_at: Instant::now(),
        });
    }

    fn slot(&self, hostname: &str) -> Slot {
        let mut slots = self.lock_slots();
        slots
            .get_or_insert(hostname.to_string(), || Arc::new(AsyncMutex::new(None)))
            .clone()
    }

    fn expired(&self, entry: &StoredEntry) -> bool {
        match self.ttl {
            Some(ttl) => entry.stored_at.elapsed() > ttl,
            None => false,
        }
    }

    fn lock_slots(&self) -> std::sync::MutexGuard<'_, LruCache<String, Slot>> {
        match self.slots.lock() {
            Ok(g) => g,
            Err(poison) => poison.into_inner(),
        }
    }
}
