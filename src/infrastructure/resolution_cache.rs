//! Resolution cache with per-kind retention
//!
//! One keyed store for every memoized lookup: page markup, extracted image URLs and
//! image bytes. Entries are keyed by `(kind, input)` and expire after the TTL of
//! their kind. Absent results are cached as well, so a known-bad URL is not fetched
//! again until its entry expires.
//!
//! Cached absent results cannot be invalidated early by fixing the root cause
//! (e.g. a proxy misconfiguration); `clear()` is the only way to drop them.

use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

use crate::infrastructure::config::CacheConfig;

/// What a cache entry memoizes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CacheKind {
    PageHtml,
    ExtractedImageUrl,
    ImageBytes,
}

impl CacheKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::PageHtml => "page-html",
            Self::ExtractedImageUrl => "extracted-image-url",
            Self::ImageBytes => "image-bytes",
        }
    }
}

impl fmt::Display for CacheKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Retention per kind
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CachePolicy {
    pub page_html: Duration,
    pub extracted_image_url: Duration,
    pub image_bytes: Duration,
}

impl CachePolicy {
    pub fn ttl(&self, kind: CacheKind) -> Duration {
        match kind {
            CacheKind::PageHtml => self.page_html,
            CacheKind::ExtractedImageUrl => self.extracted_image_url,
            CacheKind::ImageBytes => self.image_bytes,
        }
    }
}

impl From<&CacheConfig> for CachePolicy {
    fn from(config: &CacheConfig) -> Self {
        Self {
            page_html: Duration::from_secs(config.page_html_ttl_seconds),
            extracted_image_url: Duration::from_secs(config.extracted_image_url_ttl_seconds),
            image_bytes: Duration::from_secs(config.image_bytes_ttl_seconds),
        }
    }
}

impl Default for CachePolicy {
    fn default() -> Self {
        Self::from(&CacheConfig::default())
    }
}

/// Cached payload. Text and bytes are shared so a hit is a reference-count bump.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CachedValue {
    Text(Arc<str>),
    Bytes(Arc<[u8]>),
}

impl CachedValue {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            Self::Bytes(_) => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Self::Bytes(bytes) => Some(bytes),
            Self::Text(_) => None,
        }
    }

    fn weight(&self) -> usize {
        match self {
            Self::Text(text) => text.len(),
            Self::Bytes(bytes) => bytes.len(),
        }
    }
}

/// Time source, injectable so expiry can be tested without sleeping
pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
}

/// Wall clock
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct CacheKey {
    kind: CacheKind,
    input: String,
}

#[derive(Debug, Clone)]
struct CacheEntry {
    /// `None` is the cached "no result" sentinel
    value: Option<CachedValue>,
    expires_at: Instant,
}

/// Snapshot of cache counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub entries: usize,
    pub negative_entries: usize,
    pub payload_bytes: usize,
    pub hits: u64,
    pub negative_hits: u64,
    pub misses: u64,
}

impl fmt::Display for CacheStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} entries ({} empty, {} KiB), {} hits ({} empty), {} misses",
            self.entries,
            self.negative_entries,
            self.payload_bytes / 1024,
            self.hits,
            self.negative_hits,
            self.misses
        )
    }
}

/// Memoization store keyed by `(kind, input)` with per-kind TTL.
///
/// Thread-safe: the lock is never held while a value is being computed, so two
/// concurrent misses on the same key may both compute. Results are idempotent, so
/// the last write simply wins.
pub struct ResolutionCache {
    entries: Mutex<HashMap<CacheKey, CacheEntry>>,
    policy: CachePolicy,
    clock: Arc<dyn Clock>,
    hits: AtomicU64,
    negative_hits: AtomicU64,
    misses: AtomicU64,
}

impl ResolutionCache {
    pub fn new(policy: CachePolicy) -> Self {
        Self::with_clock(policy, Arc::new(SystemClock))
    }

    pub fn with_clock(policy: CachePolicy, clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            policy,
            clock,
            hits: AtomicU64::new(0),
            negative_hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    pub fn policy(&self) -> &CachePolicy {
        &self.policy
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<CacheKey, CacheEntry>> {
        // A panic while holding the lock cannot leave a half-written entry behind
        self.entries.lock().unwrap_or_else(|poisoned| {
            warn!("Resolution cache lock was poisoned; continuing with existing entries");
            poisoned.into_inner()
        })
    }

    /// Look up a live entry. Outer `None` is a miss; `Some(None)` is a cached absent result.
    pub fn lookup(&self, kind: CacheKind, input: &str) -> Option<Option<CachedValue>> {
        let now = self.clock.now();
        let key = CacheKey {
            kind,
            input: input.to_string(),
        };
        let mut entries = self.lock();
        let state = entries
            .get(&key)
            .map(|entry| (entry.expires_at > now, entry.value.clone()));

        match state {
            Some((true, value)) => {
                if value.is_some() {
                    self.hits.fetch_add(1, Ordering::Relaxed);
                } else {
                    self.negative_hits.fetch_add(1, Ordering::Relaxed);
                }
                Some(value)
            }
            Some((false, _)) => {
                entries.remove(&key);
                self.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    /// Store a result (or the absent sentinel) with the TTL of its kind
    pub fn store(&self, kind: CacheKind, input: &str, value: Option<CachedValue>) {
        let expires_at = self.clock.now() + self.policy.ttl(kind);
        let key = CacheKey {
            kind,
            input: input.to_string(),
        };
        self.lock().insert(key, CacheEntry { value, expires_at });
    }

    /// Return the cached value for `(kind, input)`, computing and storing it on a miss
    pub async fn get_or_compute<F, Fut>(
        &self,
        kind: CacheKind,
        input: &str,
        compute: F,
    ) -> Option<CachedValue>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Option<CachedValue>>,
    {
        if let Some(cached) = self.lookup(kind, input) {
            debug!("Cache hit [{}] {}", kind, input);
            return cached;
        }

        debug!("Cache miss [{}] {}", kind, input);
        let value = compute().await;
        self.store(kind, input, value.clone());
        value
    }

    /// Drop every expired entry; returns how many were removed
    pub fn purge_expired(&self) -> usize {
        let now = self.clock.now();
        let mut entries = self.lock();
        let before = entries.len();
        entries.retain(|_, entry| entry.expires_at > now);
        before - entries.len()
    }

    /// Drop every entry, including cached absent results
    pub fn clear(&self) {
        let mut entries = self.lock();
        debug!("Clearing resolution cache ({} entries)", entries.len());
        entries.clear();
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn stats(&self) -> CacheStats {
        let entries = self.lock();
        CacheStats {
            entries: entries.len(),
            negative_entries: entries.values().filter(|e| e.value.is_none()).count(),
            payload_bytes: entries
                .values()
                .filter_map(|e| e.value.as_ref())
                .map(CachedValue::weight)
                .sum(),
            hits: self.hits.load(Ordering::Relaxed),
            negative_hits: self.negative_hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }
}

impl Default for ResolutionCache {
    fn default() -> Self {
        Self::new(CachePolicy::default())
    }
}
