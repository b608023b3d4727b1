//! LRU+TTL cache fronting the resolver, with single-flight
//! deduplication of concurrent lookups for the same key.
//!
//! Grounded on the `lru` crate the way the rest of the corpus uses it for
//! bounded in-memory caches, with the secondary (byte-budget) eviction
//! axis layered manually since `lru::LruCache` only enforces entry count.

mod entry;

pub use entry::CachedResolution;

use aural_resolver::{Resolve, ResolverError};
use futures::future::{BoxFuture, FutureExt, Shared};
use lru::LruCache;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration as StdDuration;
use tracing::{debug, info};

#[derive(Debug, Clone)]
pub struct CacheConfig {
    pub max_entries: usize,
    pub max_bytes: u64,
    pub ttl: chrono::Duration,
    pub sweep_interval: StdDuration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_entries: 1000,
            max_bytes: 64 * 1024 * 1024,
            ttl: chrono::Duration::hours(2),
            sweep_interval: StdDuration::from_secs(3600),
        }
    }
}

struct State {
    entries: LruCache<String, CachedResolution>,
    total_bytes: u64,
}

type SharedResult = Result<CachedResolution, Arc<ResolverError>>;
type InFlight = Shared<BoxFuture<'static, SharedResult>>;

/// An LRU+TTL cache of resolved lookups, deduplicating concurrent
/// requests for the same canonical key via a single in-flight slot.
pub struct Cache<R: Resolve> {
    resolver: Arc<R>,
    config: CacheConfig,
    state: Mutex<State>,
    in_flight: Mutex<HashMap<String, InFlight>>,
}

impl<R: Resolve + 'static> Cache<R> {
    pub fn new(resolver: Arc<R>, config: CacheConfig) -> Arc<Self> {
        let cache = Arc::new(Self {
            resolver,
            config: config.clone(),
            state: Mutex::new(State {
                entries: LruCache::unbounded(),
                total_bytes: 0,
            }),
            in_flight: Mutex::new(HashMap::new()),
        });
        cache.clone().spawn_sweep();
        cache
    }

    /// Resolves `original_input`, serving from cache when possible and
    /// collapsing concurrent lookups for the same canonical key into one
    /// underlying resolver call: every caller for a key in flight awaits
    /// clones of the same `Shared` future.
    pub async fn get_or_resolve(self: &Arc<Self>, original_input: &str) -> SharedResult {
        let key = aural_resolver::canonicalize(original_input);

        if let Some(hit) = self.get_fresh(&key) {
            return Ok(hit);
        }

        let shared = {
            let mut in_flight = self.in_flight.lock().unwrap();
            if let Some(existing) = in_flight.get(&key) {
                existing.clone()
            } else {
                let shared = self.spawn_resolve(key.clone(), original_input.to_string());
                in_flight.insert(key.clone(), shared.clone());
                shared
            }
        };

        shared.await
    }

    /// Builds the future a key's single-flight slot resolves to. Runs
    /// exactly once per key regardless of how many clones of the
    /// `Shared` wrapper are polled — the cache insert and in-flight
    /// cleanup happen inside it so only the driving poll performs them.
    fn spawn_resolve(self: &Arc<Self>, key: String, original_input: String) -> InFlight {
        let this = self.clone();
        async move {
            let result = this
                .resolver
                .resolve(&original_input)
                .await
                .map(CachedResolution::from_resolution)
                .map_err(Arc::new);

            if let Ok(resolved) = &result {
                this.insert(key.clone(), resolved.clone());
            }
            this.in_flight.lock().unwrap().remove(&key);
            result
        }
        .boxed()
        .shared()
    }

    fn get_fresh(&self, key: &str) -> Option<CachedResolution> {
        let mut state = self.state.lock().unwrap();
        let expired = state
            .entries
            .peek(key)
            .map(|e| chrono::Utc::now() - e.resolved_at > self.config.ttl)
            .unwrap_or(false);

        if expired {
            if let Some(evicted) = state.entries.pop(key) {
                state.total_bytes = state.total_bytes.saturating_sub(evicted.size_bytes);
            }
            return None;
        }

        let entry = state.entries.get_mut(key)?;
        entry.hit_count += 1;
        entry.last_access = chrono::Utc::now();
        Some(entry.clone())
    }

    fn insert(&self, key: String, resolution: CachedResolution) {
        let mut state = self.state.lock().unwrap();
        state.total_bytes += resolution.size_bytes;
        if let Some(previous) = state.entries.put(key, resolution) {
            state.total_bytes = state.total_bytes.saturating_sub(previous.size_bytes);
        }
        Self::evict_excess(&mut state, self.config.max_entries, self.config.max_bytes);
    }

    fn evict_excess(state: &mut State, max_entries: usize, max_bytes: u64) {
        while state.entries.len() > max_entries || state.total_bytes > max_bytes {
            match state.entries.pop_lru() {
                Some((_, evicted)) => {
                    state.total_bytes = state.total_bytes.saturating_sub(evicted.size_bytes);
                }
                None => break,
            }
        }
    }

    /// Removes entries past their TTL. Runs from the background sweep and
    /// is also safe to call directly (e.g. from tests).
    pub fn sweep_expired(&self) -> usize {
        let mut state = self.state.lock().unwrap();
        let ttl = self.config.ttl;
        let expired_keys: Vec<String> = state
            .entries
            .iter()
            .filter(|(_, e)| chrono::Utc::now() - e.resolved_at > ttl)
            .map(|(k, _)| k.clone())
            .collect();
        let removed = expired_keys.len();
        for key in expired_keys {
            if let Some(evicted) = state.entries.pop(&key) {
                state.total_bytes = state.total_bytes.saturating_sub(evicted.size_bytes);
            }
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.state.lock().unwrap().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn spawn_sweep(self: Arc<Self>) {
        let interval = self.config.sweep_interval;
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.tick().await; // first tick fires immediately; skip it
            loop {
                ticker.tick().await;
                let removed = self.sweep_expired();
                if removed > 0 {
                    info!(removed, "cache sweep removed expired entries");
                } else {
                    debug!("cache sweep found nothing to remove");
                }
            }
        });
    }
}
