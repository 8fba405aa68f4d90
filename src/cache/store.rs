//! The keyed entity cache.
//!
//! One `EntityCache` instance holds every mirrored entity, keyed by
//! `CacheKey`. Each entry carries a monotonic generation counter that is
//! bumped on every value-producing event (a fetch result being applied, an
//! explicit `set`, a `clear`). An async fetch captures the generation at
//! launch and re-validates it at completion; a completion whose generation
//! no longer matches is discarded without touching the entry. That check is
//! the only synchronization between in-flight fetches and the synchronous
//! mutators, which is what lets `set` and `clear` overwrite-and-cancel an
//! outstanding fetch instead of racing it.
//!
//! Subscriber callbacks run synchronously with the triggering mutation, but
//! outside the cache lock, so a callback may re-enter the cache. Callers are
//! expected to drive mutations from one logical thread; fetch completions
//! are serialized through the entry lock.

use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use tokio::task::JoinHandle;
use tracing::{debug, trace, warn};

use crate::api::{ApiError, ErrorKind};

use super::key::CacheKey;

// ============================================================================
// Public entry types
// ============================================================================

/// Lifecycle state of one cache entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryStatus {
    /// No value-producing activity; also the state after `clear`.
    Idle,
    /// A loader is outstanding for this key.
    Fetching,
    /// The value reflects the last applied fetch or `set`.
    Fresh,
    /// The last fetch failed; any previous value is retained.
    Errored(ErrorKind),
}

/// Immutable snapshot of one cache entry.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub key: CacheKey,
    pub value: Option<Value>,
    pub status: EntryStatus,
    pub generation: u64,
    pub updated_at: Option<DateTime<Utc>>,
}

impl CacheEntry {
    /// Decode the value into a concrete model type.
    /// Returns `None` when the entry is absent or the shape does not match.
    pub fn decode<T: DeserializeOwned>(&self) -> Option<T> {
        let value = self.value.as_ref()?;
        match serde_json::from_value(value.clone()) {
            Ok(decoded) => Some(decoded),
            Err(e) => {
                debug!(key = %self.key, error = %e, "cached value failed to decode");
                None
            }
        }
    }

    pub fn is_fetching(&self) -> bool {
        self.status == EntryStatus::Fetching
    }
}

/// Options controlling a `fetch` call.
#[derive(Debug, Clone, Copy)]
pub struct FetchOptions {
    /// Gate for conditional fetches: when false the loader is not launched,
    /// and a loader already in flight has its result discarded.
    pub enabled: bool,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self { enabled: true }
    }
}

// ============================================================================
// Internal state
// ============================================================================

type Callback = Arc<dyn Fn(&CacheEntry) + Send + Sync>;

struct EntryState {
    value: Option<Value>,
    status: EntryStatus,
    generation: u64,
    enabled: bool,
    updated_at: Option<DateTime<Utc>>,
    subscribers: HashMap<u64, Callback>,
}

impl EntryState {
    fn new() -> Self {
        Self {
            value: None,
            status: EntryStatus::Idle,
            generation: 0,
            enabled: true,
            updated_at: None,
            subscribers: HashMap::new(),
        }
    }

    fn snapshot(&self, key: &CacheKey) -> CacheEntry {
        CacheEntry {
            key: key.clone(),
            value: self.value.clone(),
            status: self.status,
            generation: self.generation,
            updated_at: self.updated_at,
        }
    }

    fn callbacks(&self) -> Vec<Callback> {
        self.subscribers.values().cloned().collect()
    }

    /// Already in the post-`clear` state, so another clear is a no-op.
    fn is_cleared(&self) -> bool {
        self.value.is_none() && self.status == EntryStatus::Idle && !self.enabled
    }
}

struct CacheInner {
    entries: Mutex<HashMap<CacheKey, EntryState>>,
    next_subscriber_id: AtomicU64,
}

// ============================================================================
// EntityCache
// ============================================================================

/// Process-wide keyed store for mirrored entities.
/// Clone is cheap - instances share state through an Arc.
#[derive(Clone)]
pub struct EntityCache {
    inner: Arc<CacheInner>,
}

impl Default for EntityCache {
    fn default() -> Self {
        Self::new()
    }
}

impl EntityCache {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(CacheInner {
                entries: Mutex::new(HashMap::new()),
                next_subscriber_id: AtomicU64::new(0),
            }),
        }
    }

    /// Critical sections are plain field writes; a panic can only come from a
    /// subscriber callback, which runs outside the lock. Recover from poison
    /// rather than propagating it to unrelated callers.
    fn entries(&self) -> MutexGuard<'_, HashMap<CacheKey, EntryState>> {
        self.inner
            .entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Current snapshot for a key; never blocks on a fetch.
    pub fn get(&self, key: &CacheKey) -> CacheEntry {
        let entries = self.entries();
        match entries.get(key) {
            Some(state) => state.snapshot(key),
            None => EntryState::new().snapshot(key),
        }
    }

    /// Synchronous write. Bumps the generation, so any outstanding fetch for
    /// this key is cancelled in the only sense that matters: its result can
    /// no longer be applied.
    pub fn set<T: Serialize>(&self, key: &CacheKey, value: &T) -> Result<()> {
        let json = serde_json::to_value(value)
            .with_context(|| format!("Failed to serialize cache value for {}", key))?;

        let (snapshot, callbacks) = {
            let mut entries = self.entries();
            let state = entries.entry(key.clone()).or_insert_with(EntryState::new);
            state.value = Some(json);
            state.status = EntryStatus::Fresh;
            state.generation += 1;
            state.updated_at = Some(Utc::now());
            trace!(key = %key, generation = state.generation, "cache set");
            (state.snapshot(key), state.callbacks())
        };
        notify(&snapshot, callbacks);
        Ok(())
    }

    /// Synchronous overwrite-and-cancel to the absent state.
    ///
    /// Advances the generation and marks the key disabled, so an in-flight
    /// fetch result is discarded and a pending conditional fetch is skipped.
    /// Idempotent: clearing an already-cleared entry changes nothing.
    pub fn clear(&self, key: &CacheKey) {
        let notification = {
            let mut entries = self.entries();
            let state = entries.entry(key.clone()).or_insert_with(EntryState::new);
            if state.is_cleared() {
                None
            } else {
                state.value = None;
                state.status = EntryStatus::Idle;
                state.generation += 1;
                state.enabled = false;
                state.updated_at = None;
                trace!(key = %key, generation = state.generation, "cache cleared");
                Some((state.snapshot(key), state.callbacks()))
            }
        };
        if let Some((snapshot, callbacks)) = notification {
            notify(&snapshot, callbacks);
        }
    }

    /// Evict every entry whose key starts with `prefix`, dropping their
    /// subscriber registrations. Subscribers receive one final absent
    /// snapshot; consumers that outlive the eviction must resubscribe.
    ///
    /// This is removal rather than invalidate-and-refetch: a dependent
    /// collection must never show another user's leftover data after logout.
    pub fn remove_prefix(&self, prefix: &str) {
        let mut notifications = Vec::new();
        {
            let mut entries = self.entries();
            entries.retain(|key, state| {
                if !key.as_str().starts_with(prefix) {
                    return true;
                }
                state.value = None;
                state.status = EntryStatus::Idle;
                state.generation += 1;
                state.enabled = false;
                state.updated_at = None;
                debug!(key = %key, "cache entry evicted");
                notifications.push((state.snapshot(key), state.callbacks()));
                false
            });
        }
        for (snapshot, callbacks) in notifications {
            notify(&snapshot, callbacks);
        }
    }

    /// Launch a loader for a key unless one is already outstanding.
    ///
    /// Returns the task handle when a loader was launched, `None` when the
    /// call attached to an in-flight fetch (de-duplication) or the gate was
    /// disabled. The handle can be dropped freely; awaiting it is only
    /// useful to observe completion.
    ///
    /// On success the value is applied only if the entry's generation still
    /// matches the one captured at launch; a superseded result is discarded
    /// without notifying anyone. On failure the entry is marked errored and
    /// the previous value retained. A loader that panics counts as a failure
    /// too, so the key is never left in `Fetching` with no way out. No
    /// automatic retry.
    ///
    /// Must be called from within a tokio runtime.
    pub fn fetch<T, F>(
        &self,
        key: &CacheKey,
        options: FetchOptions,
        loader: F,
    ) -> Option<JoinHandle<()>>
    where
        T: Serialize + Send + 'static,
        F: Future<Output = Result<T, ApiError>> + Send + 'static,
    {
        let (launch_generation, snapshot, callbacks) = {
            let mut entries = self.entries();
            let state = entries.entry(key.clone()).or_insert_with(EntryState::new);
            state.enabled = options.enabled;
            if !options.enabled {
                trace!(key = %key, "fetch gate disabled, loader not launched");
                return None;
            }
            if state.status == EntryStatus::Fetching {
                trace!(key = %key, "fetch already in flight, attaching");
                return None;
            }
            state.status = EntryStatus::Fetching;
            (state.generation, state.snapshot(key), state.callbacks())
        };
        notify(&snapshot, callbacks);

        let cache = self.clone();
        let key = key.clone();
        Some(tokio::spawn(async move {
            // The loader runs as its own task so a panic inside it comes
            // back as a JoinError here instead of aborting before the entry
            // is resolved, which would wedge the key in `Fetching` and block
            // every later fetch through the de-dup guard.
            let result = match tokio::spawn(loader).await {
                Ok(outcome) => outcome.and_then(|value| {
                    serde_json::to_value(&value).map_err(|e| {
                        ApiError::InvalidResponse(format!("unserializable value: {}", e))
                    })
                }),
                Err(e) => Err(ApiError::InvalidResponse(format!("loader task failed: {}", e))),
            };
            cache.apply_fetch_result(&key, launch_generation, result);
        }))
    }

    fn apply_fetch_result(
        &self,
        key: &CacheKey,
        launch_generation: u64,
        result: Result<Value, ApiError>,
    ) {
        let notification = {
            let mut entries = self.entries();
            let Some(state) = entries.get_mut(key) else {
                trace!(key = %key, "entry evicted mid-flight, result discarded");
                return;
            };
            if state.generation != launch_generation {
                // Superseded by a set/clear since launch. Internal only;
                // subscribers never observe a stale result.
                trace!(
                    key = %key,
                    launch_generation,
                    current_generation = state.generation,
                    "stale fetch result discarded"
                );
                return;
            }
            if !state.enabled {
                trace!(key = %key, "fetch gate disabled mid-flight, result discarded");
                state.status = EntryStatus::Idle;
                Some((state.snapshot(key), state.callbacks()))
            } else {
                match result {
                    Ok(value) => {
                        state.value = Some(value);
                        state.status = EntryStatus::Fresh;
                        state.generation += 1;
                        state.updated_at = Some(Utc::now());
                        trace!(key = %key, generation = state.generation, "fetch result applied");
                    }
                    Err(e) => {
                        warn!(key = %key, error = %e, "fetch failed");
                        state.status = EntryStatus::Errored(e.kind());
                    }
                }
                Some((state.snapshot(key), state.callbacks()))
            }
        };
        if let Some((snapshot, callbacks)) = notification {
            notify(&snapshot, callbacks);
        }
    }

    /// Register a callback invoked on every value or status change for a key.
    ///
    /// If the entry already holds a value the callback is invoked once
    /// immediately with the current snapshot, so a late subscriber does not
    /// need a redundant fetch. Dropping the returned `Subscription`
    /// unregisters the callback.
    pub fn subscribe<F>(&self, key: &CacheKey, callback: F) -> Subscription
    where
        F: Fn(&CacheEntry) + Send + Sync + 'static,
    {
        let id = self.inner.next_subscriber_id.fetch_add(1, Ordering::Relaxed);
        let callback: Callback = Arc::new(callback);
        let replay = {
            let mut entries = self.entries();
            let state = entries.entry(key.clone()).or_insert_with(EntryState::new);
            state.subscribers.insert(id, callback.clone());
            state.value.is_some().then(|| state.snapshot(key))
        };
        if let Some(snapshot) = replay {
            callback(&snapshot);
        }
        Subscription {
            inner: Arc::downgrade(&self.inner),
            key: key.clone(),
            id,
        }
    }
}

fn notify(snapshot: &CacheEntry, callbacks: Vec<Callback>) {
    for callback in callbacks {
        callback(snapshot);
    }
}

/// Registration handle for a cache subscriber; unsubscribes on drop.
#[must_use = "dropping a Subscription unsubscribes immediately"]
pub struct Subscription {
    inner: Weak<CacheInner>,
    key: CacheKey,
    id: u64,
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(inner) = self.inner.upgrade() {
            let mut entries = inner
                .entries
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            if let Some(state) = entries.get_mut(&self.key) {
                state.subscribers.remove(&self.id);
            }
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::atomic::AtomicUsize;
    use std::sync::mpsc;
    use tokio::sync::oneshot;

    /// RUST_LOG=booksync=trace shows the generation bookkeeping while
    /// debugging a failing test.
    fn init_tracing() {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .try_init();
    }

    #[tokio::test]
    async fn test_set_then_get() {
        let cache = EntityCache::new();
        let key = CacheKey::current_user();

        cache.set(&key, &json!({ "id": 1 })).unwrap();

        let entry = cache.get(&key);
        assert_eq!(entry.status, EntryStatus::Fresh);
        assert_eq!(entry.generation, 1);
        assert_eq!(entry.value, Some(json!({ "id": 1 })));
        assert!(entry.updated_at.is_some());
    }

    #[tokio::test]
    async fn test_get_missing_key_is_idle_and_absent() {
        let cache = EntityCache::new();
        let entry = cache.get(&CacheKey::staff_roster());
        assert_eq!(entry.status, EntryStatus::Idle);
        assert_eq!(entry.generation, 0);
        assert!(entry.value.is_none());
    }

    #[tokio::test]
    async fn test_clear_is_idempotent() {
        let cache = EntityCache::new();
        let key = CacheKey::current_user();
        cache.set(&key, &json!({ "id": 1 })).unwrap();

        cache.clear(&key);
        let first = cache.get(&key);
        cache.clear(&key);
        let second = cache.get(&key);

        assert_eq!(first.generation, 2);
        assert_eq!(second.generation, first.generation);
        assert_eq!(second.status, EntryStatus::Idle);
        assert!(second.value.is_none());
    }

    #[tokio::test]
    async fn test_fetch_applies_result() {
        let cache = EntityCache::new();
        let key = CacheKey::current_user();

        let handle = cache
            .fetch(
                &key,
                FetchOptions::default(),
                futures::future::ready(Ok(json!({ "id": 7 }))),
            )
            .expect("loader should launch");
        handle.await.unwrap();

        let entry = cache.get(&key);
        assert_eq!(entry.status, EntryStatus::Fresh);
        assert_eq!(entry.generation, 1);
        assert_eq!(entry.value, Some(json!({ "id": 7 })));
    }

    #[tokio::test]
    async fn test_clear_discards_in_flight_fetch() {
        init_tracing();
        let cache = EntityCache::new();
        let key = CacheKey::current_user();
        cache.set(&key, &json!({ "id": 1 })).unwrap(); // generation 1

        let (gate, gated) = oneshot::channel();
        let handle = cache
            .fetch(&key, FetchOptions::default(), async move {
                gated.await.expect("gate dropped");
                Ok(json!({ "id": 1, "name": "A" }))
            })
            .expect("loader should launch");

        cache.clear(&key); // generation 2, value absent
        gate.send(()).unwrap();
        handle.await.unwrap();

        let entry = cache.get(&key);
        assert!(entry.value.is_none(), "stale result must not resurrect");
        assert_eq!(entry.generation, 2);
        assert_eq!(entry.status, EntryStatus::Idle);
    }

    #[tokio::test]
    async fn test_set_supersedes_in_flight_fetch() {
        let cache = EntityCache::new();
        let key = CacheKey::current_user();

        let (gate, gated) = oneshot::channel();
        let handle = cache
            .fetch(&key, FetchOptions::default(), async move {
                gated.await.expect("gate dropped");
                Ok(json!({ "id": 1, "name": "old" }))
            })
            .expect("loader should launch");

        cache.set(&key, &json!({ "id": 1, "name": "new" })).unwrap();
        gate.send(()).unwrap();
        handle.await.unwrap();

        let entry = cache.get(&key);
        assert_eq!(entry.value, Some(json!({ "id": 1, "name": "new" })));
        assert_eq!(entry.status, EntryStatus::Fresh);
    }

    #[tokio::test]
    async fn test_concurrent_fetches_deduplicate() {
        let cache = EntityCache::new();
        let key = CacheKey::staff_roster();
        let calls = Arc::new(AtomicUsize::new(0));

        let (gate, gated) = oneshot::channel();
        let first_calls = calls.clone();
        let first = cache
            .fetch(&key, FetchOptions::default(), async move {
                first_calls.fetch_add(1, Ordering::SeqCst);
                gated.await.expect("gate dropped");
                Ok(json!([{ "id": 1 }]))
            })
            .expect("first loader should launch");

        let second_calls = calls.clone();
        let second = cache.fetch(&key, FetchOptions::default(), async move {
            second_calls.fetch_add(1, Ordering::SeqCst);
            Ok(json!([{ "id": 99 }]))
        });
        assert!(second.is_none(), "second call must attach, not launch");

        gate.send(()).unwrap();
        first.await.unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        let entry = cache.get(&key);
        assert_eq!(entry.value, Some(json!([{ "id": 1 }])));
    }

    #[tokio::test]
    async fn test_disabled_fetch_never_launches() {
        let cache = EntityCache::new();
        let key = CacheKey::user_appointments(1);

        let handle = cache.fetch(&key, FetchOptions { enabled: false }, async {
            Ok(json!([]))
        });

        assert!(handle.is_none());
        assert_eq!(cache.get(&key).status, EntryStatus::Idle);
    }

    #[tokio::test]
    async fn test_disabling_mid_flight_discards_result() {
        let cache = EntityCache::new();
        let key = CacheKey::user_appointments(1);

        let (gate, gated) = oneshot::channel();
        let handle = cache
            .fetch(&key, FetchOptions::default(), async move {
                gated.await.expect("gate dropped");
                Ok(json!([{ "id": 5 }]))
            })
            .expect("loader should launch");

        // Same generation, but the gate flips off while the loader runs.
        let second = cache.fetch(&key, FetchOptions { enabled: false }, async {
            Ok(json!([]))
        });
        assert!(second.is_none());

        gate.send(()).unwrap();
        handle.await.unwrap();

        let entry = cache.get(&key);
        assert!(entry.value.is_none());
        assert_eq!(entry.status, EntryStatus::Idle);
    }

    #[tokio::test]
    async fn test_eviction_mid_flight_discards_result() {
        let cache = EntityCache::new();
        let key = CacheKey::user_appointments(1);

        let (gate, gated) = oneshot::channel();
        let handle = cache
            .fetch(&key, FetchOptions::default(), async move {
                gated.await.expect("gate dropped");
                Ok(json!([{ "id": 5 }]))
            })
            .expect("loader should launch");

        cache.remove_prefix(CacheKey::user_appointments_prefix());
        gate.send(()).unwrap();
        handle.await.unwrap();

        let entry = cache.get(&key);
        assert!(entry.value.is_none(), "result for an evicted key must be dropped");
        assert_eq!(entry.status, EntryStatus::Idle);
        assert_eq!(entry.generation, 0, "the entry is gone, not merely cleared");
    }

    #[tokio::test]
    async fn test_loader_panic_marks_entry_errored() {
        let cache = EntityCache::new();
        let key = CacheKey::staff_roster();

        let explode = true;
        let handle = cache
            .fetch(&key, FetchOptions::default(), async move {
                if explode {
                    panic!("loader blew up");
                }
                Ok(json!([]))
            })
            .expect("loader should launch");
        handle.await.unwrap();

        let entry = cache.get(&key);
        assert_eq!(entry.status, EntryStatus::Errored(ErrorKind::Invalid));

        // The key must not be wedged: a later fetch launches normally.
        let retry = cache
            .fetch(
                &key,
                FetchOptions::default(),
                futures::future::ready(Ok(json!([{ "id": 1 }]))),
            )
            .expect("retry should launch");
        retry.await.unwrap();
        assert_eq!(cache.get(&key).status, EntryStatus::Fresh);
    }

    #[tokio::test]
    async fn test_loader_error_keeps_previous_value() {
        let cache = EntityCache::new();
        let key = CacheKey::current_user();
        cache.set(&key, &json!({ "id": 1 })).unwrap();

        let handle = cache
            .fetch(&key, FetchOptions::default(), async {
                Err::<Value, _>(ApiError::Unauthorized)
            })
            .expect("loader should launch");
        handle.await.unwrap();

        let entry = cache.get(&key);
        assert_eq!(entry.status, EntryStatus::Errored(ErrorKind::Unauthorized));
        assert_eq!(entry.value, Some(json!({ "id": 1 })));
        assert_eq!(entry.generation, 1, "errors are not value-producing");
    }

    #[tokio::test]
    async fn test_loader_error_confined_to_its_key() {
        let cache = EntityCache::new();
        let events = Arc::new(AtomicUsize::new(0));

        let observed = events.clone();
        let _sub = cache.subscribe(&CacheKey::staff_roster(), move |_| {
            observed.fetch_add(1, Ordering::SeqCst);
        });

        let handle = cache
            .fetch(&CacheKey::current_user(), FetchOptions::default(), async {
                Err::<Value, _>(ApiError::ServerError("boom".into()))
            })
            .expect("loader should launch");
        handle.await.unwrap();

        assert_eq!(events.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_subscribe_replays_existing_value() {
        let cache = EntityCache::new();
        let key = CacheKey::current_user();
        cache.set(&key, &json!({ "id": 3 })).unwrap();

        let (tx, rx) = mpsc::channel();
        let _sub = cache.subscribe(&key, move |entry| {
            tx.send(entry.clone()).unwrap();
        });

        // Replay happens synchronously inside subscribe.
        let entry = rx.try_recv().expect("replay not delivered");
        assert_eq!(entry.status, EntryStatus::Fresh);
        assert_eq!(entry.value, Some(json!({ "id": 3 })));
    }

    #[tokio::test]
    async fn test_subscribe_without_value_does_not_replay() {
        let cache = EntityCache::new();
        let (tx, rx) = mpsc::channel::<CacheEntry>();
        let _sub = cache.subscribe(&CacheKey::current_user(), move |entry| {
            tx.send(entry.clone()).unwrap();
        });
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_subscriber_sees_set_and_clear() {
        let cache = EntityCache::new();
        let key = CacheKey::current_user();

        let (tx, rx) = mpsc::channel();
        let _sub = cache.subscribe(&key, move |entry| {
            tx.send((entry.status, entry.value.is_some())).unwrap();
        });

        cache.set(&key, &json!({ "id": 1 })).unwrap();
        cache.clear(&key);

        assert_eq!(rx.try_recv().unwrap(), (EntryStatus::Fresh, true));
        assert_eq!(rx.try_recv().unwrap(), (EntryStatus::Idle, false));
    }

    #[tokio::test]
    async fn test_dropped_subscription_stops_notifications() {
        let cache = EntityCache::new();
        let key = CacheKey::current_user();
        let events = Arc::new(AtomicUsize::new(0));

        let observed = events.clone();
        let sub = cache.subscribe(&key, move |_| {
            observed.fetch_add(1, Ordering::SeqCst);
        });

        cache.set(&key, &json!({ "id": 1 })).unwrap();
        assert_eq!(events.load(Ordering::SeqCst), 1);

        drop(sub);
        cache.set(&key, &json!({ "id": 2 })).unwrap();
        assert_eq!(events.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_remove_prefix_evicts_matching_entries() {
        let cache = EntityCache::new();
        cache
            .set(&CacheKey::user_appointments(1), &json!([{ "id": 10 }]))
            .unwrap();
        cache
            .set(&CacheKey::user_appointments(2), &json!([{ "id": 20 }]))
            .unwrap();
        cache.set(&CacheKey::staff_roster(), &json!([])).unwrap();

        let (tx, rx) = mpsc::channel();
        let sub = cache.subscribe(&CacheKey::user_appointments(1), move |entry| {
            tx.send(entry.value.is_some()).unwrap();
        });

        cache.remove_prefix(CacheKey::user_appointments_prefix());

        // Replay of the pre-eviction value, then the final absent snapshot.
        assert!(rx.try_recv().unwrap());
        assert!(!rx.try_recv().unwrap());

        assert!(cache.get(&CacheKey::user_appointments(1)).value.is_none());
        assert!(cache.get(&CacheKey::user_appointments(2)).value.is_none());
        assert!(cache.get(&CacheKey::staff_roster()).value.is_some());
        drop(sub);
    }

    #[tokio::test]
    async fn test_decode_roundtrips_model() {
        let cache = EntityCache::new();
        let key = CacheKey::current_user();
        let user = crate::models::User {
            id: 9,
            email: "a@b.c".into(),
            name: None,
            address: None,
            phone: None,
            token: "t".into(),
        };
        cache.set(&key, &user).unwrap();

        let decoded: crate::models::User = cache.get(&key).decode().unwrap();
        assert_eq!(decoded, user);
    }
}
