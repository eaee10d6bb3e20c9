//! Slot image resolution: process-wide cache plus single-flight fetches.
//!
//! Every page component asks for the slots it displays; the resolver answers
//! from its cache, and on a miss lets exactly one caller query the store
//! while everyone else attaches to that in-flight fetch. Only positive
//! results are cached: a slot with no override row keeps falling back to
//! the caller's default and stays eligible for a fresh lookup on the next
//! call. Cached values never expire within a process; a new upload becomes
//! visible to fresh processes only.
//!
//! The per-key tracker and the batch tracker do not coordinate, so a key
//! can in principle be fetched once via each path if both are triggered
//! concurrently. Accepted: the second fetch writes the same value.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tokio::sync::broadcast;

use crate::slot::Slot;
use crate::store::OverrideStore;

/// Batch-fetch lifecycle. After one successful full-table fetch the store
/// contents are fully known, so the batch path never refetches; a failed
/// batch returns to `Idle` and a later call retries.
enum BatchState {
    Idle,
    InFlight(broadcast::Sender<()>),
    Done,
}

/// Resolves slot keys to their currently-effective image URL.
///
/// Construct one per process (or per test) and share it by `Arc`; all state
/// is internal and lives until the resolver is dropped.
pub struct SlotResolver {
    store: Arc<dyn OverrideStore>,
    /// Positive results only: slot key -> override URL.
    cache: Mutex<HashMap<String, String>>,
    /// Outstanding per-key fetches; joiners subscribe instead of refetching.
    inflight: Mutex<HashMap<String, broadcast::Sender<Option<String>>>>,
    batch: Mutex<BatchState>,
}

impl SlotResolver {
    pub fn new(store: Arc<dyn OverrideStore>) -> Self {
        Self {
            store,
            cache: Mutex::new(HashMap::new()),
            inflight: Mutex::new(HashMap::new()),
            batch: Mutex::new(BatchState::Idle),
        }
    }

    /// Cached value for a key, if resolution already succeeded.
    pub fn peek(&self, key: &str) -> Option<String> {
        self.cache.lock().unwrap().get(key).cloned()
    }

    /// Resolve one slot, awaiting the store on a cache miss.
    ///
    /// Returns the cached override if present. Otherwise at most one fetch
    /// for `key` runs at a time; concurrent callers share its outcome. On
    /// success the value is cached; on failure or a missing row every caller
    /// gets its own `default_url` and nothing is cached.
    pub async fn resolve_one(&self, key: &str, default_url: &str) -> String {
        if let Some(url) = self.peek(key) {
            return url;
        }

        let role = {
            let mut inflight = self.inflight.lock().unwrap();
            match inflight.get(key) {
                Some(tx) => Role::Follower(tx.subscribe()),
                None => {
                    let (tx, _) = broadcast::channel(1);
                    inflight.insert(key.to_string(), tx.clone());
                    Role::Leader(tx)
                }
            }
        };

        let resolved = match role {
            Role::Leader(tx) => {
                // Entry removal must survive cancellation at the await
                // point, otherwise the key would be stuck pending forever.
                let guard = InflightGuard {
                    resolver: self,
                    key,
                };
                let fetched = match self.store.fetch_one(key).await {
                    Ok(Some(url)) if !url.is_empty() => Some(url),
                    Ok(_) => None,
                    Err(err) => {
                        tracing::debug!("override fetch for '{}' failed: {}", key, err);
                        None
                    }
                };
                if let Some(url) = &fetched {
                    self.cache
                        .lock()
                        .unwrap()
                        .insert(key.to_string(), url.clone());
                }
                // Release the slot before notifying so a caller arriving
                // after a failure starts a fresh fetch instead of attaching
                // to a settled one.
                drop(guard);
                let _ = tx.send(fetched.clone());
                fetched
            }
            // A closed channel means the leader was cancelled before
            // sending; treat as absence and fall back to the default.
            Role::Follower(mut rx) => rx.recv().await.ok().flatten(),
        };

        resolved.unwrap_or_else(|| default_url.to_string())
    }

    /// Resolve one slot without awaiting: returns the cached value if
    /// present, otherwise returns `default_url` immediately and refreshes
    /// the cache in the background so a later call sees the override.
    /// Callers that can await should prefer [`SlotResolver::resolve_one`].
    pub fn resolve_one_detached(self: &Arc<Self>, key: &str, default_url: &str) -> String {
        if let Some(url) = self.peek(key) {
            return url;
        }
        let resolver = Arc::clone(self);
        let key = key.to_string();
        let default_url_owned = default_url.to_string();
        tokio::spawn(async move {
            resolver.resolve_one(&key, &default_url_owned).await;
        });
        default_url.to_string()
    }

    /// Resolve a set of slots, awaiting the store if any key is uncached.
    ///
    /// A miss triggers at most one full-table fetch per process; concurrent
    /// callers share the in-flight batch. Every fetched row lands in the
    /// cache (also for keys nobody asked about yet), and the returned map
    /// holds the cached URL or the slot's default. A failed batch degrades
    /// to all-defaults and stays retryable.
    pub async fn resolve_many(&self, slots: &[Slot]) -> HashMap<String, String> {
        let all_cached = {
            let cache = self.cache.lock().unwrap();
            slots.iter().all(|s| cache.contains_key(&s.key))
        };
        if !all_cached {
            self.run_batch().await;
        }
        self.mapping_for(slots)
    }

    /// Join or lead the full-table fetch. No-op once a batch has succeeded.
    async fn run_batch(&self) {
        let role = {
            let mut batch = self.batch.lock().unwrap();
            match &*batch {
                BatchState::Done => return,
                BatchState::InFlight(tx) => BatchRole::Follower(tx.subscribe()),
                BatchState::Idle => {
                    let (tx, _) = broadcast::channel(1);
                    *batch = BatchState::InFlight(tx.clone());
                    BatchRole::Leader(tx)
                }
            }
        };

        match role {
            BatchRole::Leader(tx) => {
                let guard = BatchGuard { resolver: self };
                let outcome = self.store.fetch_all().await;
                match outcome {
                    Ok(records) => {
                        {
                            let mut cache = self.cache.lock().unwrap();
                            for rec in records {
                                if !rec.image_url.is_empty() {
                                    cache.insert(rec.slot_key, rec.image_url);
                                }
                            }
                        }
                        guard.settle(BatchState::Done);
                    }
                    Err(err) => {
                        tracing::debug!("batch override fetch failed: {}", err);
                        guard.settle(BatchState::Idle);
                    }
                }
                let _ = tx.send(());
            }
            BatchRole::Follower(mut rx) => {
                let _ = rx.recv().await;
            }
        }
    }

    fn mapping_for(&self, slots: &[Slot]) -> HashMap<String, String> {
        let cache = self.cache.lock().unwrap();
        slots
            .iter()
            .map(|s| {
                let url = cache.get(&s.key).cloned().unwrap_or_else(|| s.default_url.clone());
                (s.key.clone(), url)
            })
            .collect()
    }
}

enum Role {
    Leader(broadcast::Sender<Option<String>>),
    Follower(broadcast::Receiver<Option<String>>),
}

enum BatchRole {
    Leader(broadcast::Sender<()>),
    Follower(broadcast::Receiver<()>),
}

/// Removes the in-flight entry for a key when dropped, so both settled and
/// cancelled fetches release the slot for future attempts.
struct InflightGuard<'a> {
    resolver: &'a SlotResolver,
    key: &'a str,
}

impl Drop for InflightGuard<'_> {
    fn drop(&mut self) {
        self.resolver.inflight.lock().unwrap().remove(self.key);
    }
}

/// Resets the batch tracker when dropped (cancellation safety); `settle`
/// records the final state instead.
struct BatchGuard<'a> {
    resolver: &'a SlotResolver,
}

impl BatchGuard<'_> {
    fn settle(self, state: BatchState) {
        *self.resolver.batch.lock().unwrap() = state;
        std::mem::forget(self);
    }
}

impl Drop for BatchGuard<'_> {
    fn drop(&mut self) {
        *self.resolver.batch.lock().unwrap() = BatchState::Idle;
    }
}
