//! The identity synchronizer.
//!
//! `UserSync` owns the current-user cache entry. It seeds the entry from the
//! persisted identity store at startup, keeps a background reconciliation
//! fetch running against the server copy while an identity is present, and
//! exposes the `update`/`clear` entry points used by the authentication
//! flow.
//!
//! The hazard this module is built around: a logout can race a
//! reconciliation fetch that is already in flight. `clear` therefore goes
//! through the cache's overwrite-and-cancel path (generation bump plus gate
//! disable) rather than a bare entry removal, so the in-flight result is
//! discarded instead of resurrecting the just-cleared identity.

use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::task::JoinHandle;
use tracing::{debug, info, trace};

use crate::api::{ApiError, IdentitySource};
use crate::auth::IdentityStore;
use crate::cache::{CacheEntry, CacheKey, EntityCache, FetchOptions, Subscription};
use crate::models::User;

struct Inner<S, P> {
    cache: EntityCache,
    source: S,
    store: P,
}

/// Cache client owning the current-user key.
/// Clone is cheap - instances share state through an Arc.
pub struct UserSync<S, P> {
    inner: Arc<Inner<S, P>>,
}

impl<S, P> Clone for UserSync<S, P> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<S, P> UserSync<S, P>
where
    S: IdentitySource,
    P: IdentityStore + 'static,
{
    /// Create the synchronizer, seeding the cache from the persisted store.
    ///
    /// When a persisted identity exists, a reconciliation fetch against the
    /// server copy is launched immediately; the seeded value stays readable
    /// in the meantime.
    pub fn new(cache: EntityCache, source: S, store: P) -> Result<Self> {
        let sync = Self {
            inner: Arc::new(Inner {
                cache,
                source,
                store,
            }),
        };
        if let Some(user) = sync
            .inner
            .store
            .load()
            .context("Failed to load persisted identity")?
        {
            info!(user_id = user.id, "restoring persisted identity");
            sync.inner.cache.set(&CacheKey::current_user(), &user)?;
            sync.reconcile();
        }
        Ok(sync)
    }

    /// The locally authoritative identity, if any. Eagerly readable; a
    /// background reconciliation may overwrite it later.
    pub fn current(&self) -> Option<User> {
        self.entry().decode()
    }

    /// Snapshot of the current-user cache entry, including status and
    /// generation.
    pub fn entry(&self) -> CacheEntry {
        self.inner.cache.get(&CacheKey::current_user())
    }

    /// Observe every change to the current-user entry.
    pub fn subscribe<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&CacheEntry) + Send + Sync + 'static,
    {
        self.inner.cache.subscribe(&CacheKey::current_user(), callback)
    }

    /// Install a new identity, e.g. after a successful sign-in.
    ///
    /// Writes through to the cache and the persisted store, then launches a
    /// reconciliation fetch seeded by the new identity. The write itself
    /// supersedes any fetch that was in flight, so the reconciliation always
    /// launches; its task handle is returned and may be dropped freely.
    pub fn update(&self, user: &User) -> Result<Option<JoinHandle<()>>> {
        debug!(user_id = user.id, "identity updated");
        self.inner.cache.set(&CacheKey::current_user(), user)?;
        self.inner
            .store
            .save(user)
            .context("Failed to persist identity")?;
        Ok(self.reconcile())
    }

    /// Log out: forget the identity everywhere.
    ///
    /// Ordering matters. The cache clear comes first and is synchronous: it
    /// advances the generation and disables the reconciliation gate before
    /// any in-flight fetch can apply its result. Every dependent collection
    /// keyed off the identity is then evicted outright, so no subscriber can
    /// observe a flash of the previous user's data. The cache purge is
    /// unconditional: a failing persisted-store clear is surfaced only after
    /// all cache state is gone.
    pub fn clear(&self) -> Result<()> {
        info!("clearing identity");
        self.inner.cache.clear(&CacheKey::current_user());
        let store_result = self.inner.store.clear();
        self.inner
            .cache
            .remove_prefix(CacheKey::user_appointments_prefix());
        store_result.context("Failed to clear persisted identity")
    }

    /// Launch a background reconciliation of the cached identity against
    /// the authoritative server copy.
    ///
    /// Gated on identity presence: with no identity the loader is never
    /// launched. On success the server copy overwrites the cached value (and
    /// bumps the generation); on failure the cached value is left as-is and
    /// the entry marked errored. A failure is never treated as a logout.
    pub fn reconcile(&self) -> Option<JoinHandle<()>> {
        let current = self.current();
        let options = FetchOptions {
            enabled: current.is_some(),
        };
        if !options.enabled {
            trace!("no identity present, reconciliation gate disabled");
        }

        let inner = self.inner.clone();
        let loader = async move {
            // Only polled when the fetch launched, i.e. an identity was
            // present when the gate was checked.
            let seed = current.ok_or_else(|| {
                ApiError::InvalidResponse("reconciliation launched without identity".into())
            })?;
            inner.source.fetch_by_id(seed.id, &seed.token).await
        };
        self.inner
            .cache
            .fetch(&CacheKey::current_user(), options, loader)
    }
}

// ============================================================================
// Tests
// ============================================================================
