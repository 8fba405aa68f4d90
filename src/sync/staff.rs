//! Staff roster client.
//!
//! Mirrors the staff roster into the cache and serves filtered views of it.
//! The roster is not keyed off the identity: it is public data, fetched the
//! same way whether or not anyone is signed in, and it survives logout.

use tokio::task::JoinHandle;

use crate::api::ApiClient;
use crate::cache::{CacheEntry, CacheKey, EntityCache, FetchOptions, Subscription};
use crate::models::{filter_by_treatment, Staff};

/// Filter value meaning "no treatment filter".
pub const ALL_TREATMENTS: &str = "all";

/// Cache client owning the staff-roster key.
#[derive(Clone)]
pub struct StaffSync {
    cache: EntityCache,
    api: ApiClient,
}

impl StaffSync {
    pub fn new(cache: EntityCache, api: ApiClient) -> Self {
        Self { cache, api }
    }

    /// Launch a background refresh of the roster. De-duplicated by the
    /// cache: a refresh while one is in flight attaches instead of
    /// launching a second request.
    pub fn refresh(&self) -> Option<JoinHandle<()>> {
        let api = self.api.clone();
        self.cache.fetch(
            &CacheKey::staff_roster(),
            FetchOptions::default(),
            async move { api.fetch_staff().await },
        )
    }

    /// The cached roster; empty until the first refresh completes.
    pub fn staff(&self) -> Vec<Staff> {
        self.cache
            .get(&CacheKey::staff_roster())
            .decode()
            .unwrap_or_default()
    }

    /// The cached roster narrowed to one treatment, or the whole roster for
    /// [`ALL_TREATMENTS`].
    pub fn staff_for_treatment(&self, treatment: &str) -> Vec<Staff> {
        let roster = self.staff();
        if treatment == ALL_TREATMENTS {
            roster
        } else {
            filter_by_treatment(&roster, treatment)
        }
    }

    /// Observe every change to the roster entry.
    pub fn subscribe<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&CacheEntry) + Send + Sync + 'static,
    {
        self.cache.subscribe(&CacheKey::staff_roster(), callback)
    }
}
