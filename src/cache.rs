//! Memo cache for loader results.
//!
//! Keys are the normalized loader input. Upload and query entries live until
//! invalidated; API entries carry an expiry and are recomputed on access once
//! it has passed. The clock is injected so expiry can be tested without waiting.

use crate::error::LoadError;
use crate::table::Table;
use sha2::{Digest, Sha256};
use std::cell::Cell;
use std::collections::HashMap;
use std::rc::Rc;
use std::time::{Duration, Instant};

/// Time source for expiry decisions.
pub trait Clock {
    fn now(&self) -> Instant;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Clock that only moves when told to. Clones share the same offset.
#[derive(Debug, Clone)]
pub struct ManualClock {
    origin: Instant,
    offset: Rc<Cell<Duration>>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
            offset: Rc::new(Cell::new(Duration::ZERO)),
        }
    }

    pub fn advance(&self, by: Duration) {
        self.offset.set(self.offset.get() + by);
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.origin + self.offset.get()
    }
}

/// Normalized loader input.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CacheKey {
    /// SHA-256 of the uploaded bytes
    Upload([u8; 32]),
    Query(String),
    Api(String),
}

impl CacheKey {
    pub fn upload(bytes: &[u8]) -> Self {
        let digest = Sha256::digest(bytes);
        let mut key = [0u8; 32];
        key.copy_from_slice(&digest);
        Self::Upload(key)
    }

    pub fn query(sql: &str) -> Self {
        Self::Query(sql.trim().to_string())
    }

    pub fn api(url: &str) -> Self {
        Self::Api(url.trim().to_string())
    }
}

pub type CachedLoad = Result<Table, LoadError>;

#[derive(Debug, Clone)]
struct CacheEntry {
    result: CachedLoad,
    expires_at: Option<Instant>,
}

impl CacheEntry {
    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|at| now >= at)
    }
}

/// How a lookup was served.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheStatus {
    Hit,
    Miss,
    /// An entry existed but had expired; the loader ran again.
    Expired,
}

pub struct LoaderCache<C: Clock = SystemClock> {
    entries: HashMap<CacheKey, CacheEntry>,
    clock: C,
    memoize_failures: bool,
}

impl LoaderCache<SystemClock> {
    pub fn new() -> Self {
        Self::with_clock(SystemClock)
    }
}

impl Default for LoaderCache<SystemClock> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Clock> LoaderCache<C> {
    pub fn with_clock(clock: C) -> Self {
        Self {
            entries: HashMap::new(),
            clock,
            memoize_failures: false,
        }
    }

    /// When true, failed loads are stored like successes (and served until they expire).
    pub fn with_memoize_failures(mut self, memoize: bool) -> Self {
        self.memoize_failures = memoize;
        self
    }

    pub fn memoizes_failures(&self) -> bool {
        self.memoize_failures
    }

    /// Return the cached result for `key`, or run `load` and store what it returns.
    ///
    /// `ttl` of `None` means the entry never expires.
    pub fn get_or_load<F>(
        &mut self,
        key: CacheKey,
        ttl: Option<Duration>,
        load: F,
    ) -> (CachedLoad, CacheStatus)
    where
        F: FnOnce() -> CachedLoad,
    {
        let now = self.clock.now();
        let status = match self.entries.get(&key) {
            Some(entry) if !entry.is_expired(now) => return (entry.result.clone(), CacheStatus::Hit),
            Some(_) => {
                self.entries.remove(&key);
                CacheStatus::Expired
            }
            None => CacheStatus::Miss,
        };

        let result = load();
        if result.is_ok() || self.memoize_failures {
            self.insert(key, result.clone(), ttl);
        }
        (result, status)
    }

    /// Cached result if present and not expired.
    pub fn get(&self, key: &CacheKey) -> Option<&CachedLoad> {
        let now = self.clock.now();
        self.entries
            .get(key)
            .filter(|e| !e.is_expired(now))
            .map(|e| &e.result)
    }

    pub fn insert(&mut self, key: CacheKey, result: CachedLoad, ttl: Option<Duration>) {
        let expires_at = ttl.map(|d| self.clock.now() + d);
        self.entries.insert(key, CacheEntry { result, expires_at });
    }

    pub fn invalidate(&mut self, key: &CacheKey) -> bool {
        self.entries.remove(key).is_some()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Drop every expired entry. Returns how many were removed.
    pub fn purge_expired(&mut self) -> usize {
        let now = self.clock.now();
        let before = self.entries.len();
        self.entries.retain(|_, e| !e.is_expired(now));
        before - self.entries.len()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use polars::prelude::df;

    fn table(v: i64) -> Table {
        Table::new(df!("a" => &[v]).unwrap())
    }

    #[test]
    fn hit_does_not_reload() {
        let mut cache = LoaderCache::new();
        let mut calls = 0;
        let key = CacheKey::query("select 1");
        let (first, status) = cache.get_or_load(key.clone(), None, || {
            calls += 1;
            Ok(table(1))
        });
        assert_eq!(status, CacheStatus::Miss);
        let (second, status) = cache.get_or_load(key, None, || {
            calls += 1;
            Ok(table(2))
        });
        assert_eq!(status, CacheStatus::Hit);
        assert_eq!(calls, 1);
        assert_eq!(first.unwrap(), second.unwrap());
    }

    #[test]
    fn expired_entry_reloads() {
        let clock = ManualClock::new();
        let mut cache = LoaderCache::with_clock(clock.clone());
        let key = CacheKey::api("https://example.com/data");
        let ttl = Some(Duration::from_secs(3600));

        let (_, status) = cache.get_or_load(key.clone(), ttl, || Ok(table(1)));
        assert_eq!(status, CacheStatus::Miss);

        clock.advance(Duration::from_secs(3599));
        let (_, status) = cache.get_or_load(key.clone(), ttl, || Ok(table(2)));
        assert_eq!(status, CacheStatus::Hit);

        clock.advance(Duration::from_secs(1));
        let (result, status) = cache.get_or_load(key, ttl, || Ok(table(3)));
        assert_eq!(status, CacheStatus::Expired);
        assert_eq!(result.unwrap(), table(3));
    }

    #[test]
    fn entries_without_ttl_never_expire() {
        let clock = ManualClock::new();
        let mut cache = LoaderCache::with_clock(clock.clone());
        let key = CacheKey::upload(b"a\n1\n");
        cache.insert(key.clone(), Ok(table(1)), None);
        clock.advance(Duration::from_secs(365 * 24 * 3600));
        assert!(cache.get(&key).is_some());
        assert_eq!(cache.purge_expired(), 0);
    }

    #[test]
    fn failures_are_not_memoized_by_default() {
        let mut cache = LoaderCache::new();
        let key = CacheKey::api("https://example.com");
        let (result, _) = cache.get_or_load(key.clone(), None, || {
            Err(LoadError::Transport("refused".to_string()))
        });
        assert!(result.is_err());
        assert!(cache.is_empty());

        let (result, status) = cache.get_or_load(key, None, || Ok(table(1)));
        assert_eq!(status, CacheStatus::Miss);
        assert!(result.is_ok());
    }

    #[test]
    fn memoized_failures_are_served_until_expiry() {
        let clock = ManualClock::new();
        let mut cache = LoaderCache::with_clock(clock.clone()).with_memoize_failures(true);
        let key = CacheKey::api("https://example.com");
        let ttl = Some(Duration::from_secs(10));
        cache.get_or_load(key.clone(), ttl, || Err(LoadError::Timeout { secs: 30 }));
        let (result, status) = cache.get_or_load(key.clone(), ttl, || Ok(table(1)));
        assert_eq!(status, CacheStatus::Hit);
        assert_eq!(result, Err(LoadError::Timeout { secs: 30 }));

        clock.advance(Duration::from_secs(10));
        assert_eq!(cache.purge_expired(), 1);
        assert!(cache.get(&key).is_none());
    }

    #[test]
    fn keys_are_normalized() {
        assert_eq!(CacheKey::query("  select 1 "), CacheKey::query("select 1"));
        assert_eq!(CacheKey::api("https://x/ "), CacheKey::api("https://x/"));
        assert_eq!(CacheKey::upload(b"abc"), CacheKey::upload(b"abc"));
        assert_ne!(CacheKey::upload(b"abc"), CacheKey::upload(b"abd"));
    }

    #[test]
    fn invalidate_and_clear() {
        let mut cache = LoaderCache::new();
        cache.insert(CacheKey::query("a"), Ok(table(1)), None);
        cache.insert(CacheKey::query("b"), Ok(table(2)), None);
        assert!(cache.invalidate(&CacheKey::query("a")));
        assert!(!cache.invalidate(&CacheKey::query("a")));
        assert_eq!(cache.len(), 1);
        cache.clear();
        assert!(cache.is_empty());
    }
}
