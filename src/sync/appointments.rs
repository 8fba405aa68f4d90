//! The signed-in user's appointment collection, plus the reservation write.
//!
//! The collection is a dependent fetch: its cache key carries the owner's id
//! and the fetch only runs while an identity is present. At logout the
//! identity synchronizer evicts the collection outright (see
//! `UserSync::clear`), so nothing here needs to defend against leftover
//! data from a previous user.

use tokio::task::JoinHandle;
use tracing::{debug, trace};

use crate::api::{ApiClient, ApiError, IdentitySource};
use crate::auth::IdentityStore;
use crate::cache::{CacheEntry, CacheKey, EntityCache, FetchOptions, Subscription};
use crate::models::Appointment;

use super::user::UserSync;

/// Cache client for the per-user appointment collection.
pub struct AppointmentsSync<S, P> {
    cache: EntityCache,
    api: ApiClient,
    users: UserSync<S, P>,
}

impl<S, P> Clone for AppointmentsSync<S, P> {
    fn clone(&self) -> Self {
        Self {
            cache: self.cache.clone(),
            api: self.api.clone(),
            users: self.users.clone(),
        }
    }
}

impl<S, P> AppointmentsSync<S, P>
where
    S: IdentitySource,
    P: IdentityStore + 'static,
{
    pub fn new(cache: EntityCache, api: ApiClient, users: UserSync<S, P>) -> Self {
        Self { cache, api, users }
    }

    fn key(&self) -> Option<CacheKey> {
        self.users.current().map(|user| CacheKey::user_appointments(user.id))
    }

    /// Launch a background refresh of the signed-in user's appointments.
    ///
    /// With no identity present the loader is never launched; there is not
    /// even a key to fetch under. Returns the task handle when a loader was
    /// launched.
    pub fn refresh(&self) -> Option<JoinHandle<()>> {
        let Some(user) = self.users.current() else {
            trace!("no identity present, appointments fetch not launched");
            return None;
        };
        let key = CacheKey::user_appointments(user.id);
        let api = self.api.clone();
        let (id, token) = (user.id, user.token);
        self.cache.fetch(&key, FetchOptions { enabled: true }, async move {
            api.fetch_user_appointments(id, &token).await
        })
    }

    /// The cached collection for the signed-in user; empty when logged out
    /// or before the first refresh completes.
    pub fn appointments(&self) -> Vec<Appointment> {
        self.key()
            .and_then(|key| self.cache.get(&key).decode())
            .unwrap_or_default()
    }

    /// Observe changes to the signed-in user's collection.
    /// Returns `None` when logged out (no key exists to observe).
    pub fn subscribe<F>(&self, callback: F) -> Option<Subscription>
    where
        F: Fn(&CacheEntry) + Send + Sync + 'static,
    {
        let key = self.key()?;
        Some(self.cache.subscribe(&key, callback))
    }

    /// Reserve an appointment for the signed-in user.
    ///
    /// Pure mutation dispatch: the server copy changes, the cached
    /// collection is deliberately left untouched and picks the change up on
    /// the next refresh.
    pub async fn reserve(&self, appointment: &Appointment) -> Result<(), ApiError> {
        let Some(user) = self.users.current() else {
            debug!(appointment_id = appointment.id, "reservation without identity rejected");
            return Err(ApiError::Unauthorized);
        };
        self.api.patch_appointment_owner(appointment, user.id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::IdentityStore;
    use crate::models::User;
    use anyhow::Result;
    use chrono::{TimeZone, Utc};
    use std::future::Future;
    use std::sync::Mutex;

    /// Identity source that always answers Unauthorized; these tests never
    /// reach reconciliation.
    struct DeadSource;

    impl IdentitySource for DeadSource {
        fn fetch_by_id(
            &self,
            _id: i64,
            _token: &str,
        ) -> impl Future<Output = Result<User, ApiError>> + Send {
            async { Err(ApiError::Unauthorized) }
        }
    }

    #[derive(Default)]
    struct MemoryStore(Mutex<Option<User>>);

    impl IdentityStore for MemoryStore {
        fn load(&self) -> Result<Option<User>> {
            Ok(self.0.lock().unwrap().clone())
        }
        fn save(&self, user: &User) -> Result<()> {
            *self.0.lock().unwrap() = Some(user.clone());
            Ok(())
        }
        fn clear(&self) -> Result<()> {
            *self.0.lock().unwrap() = None;
            Ok(())
        }
    }

    fn appointment(id: i64) -> Appointment {
        Appointment {
            id,
            date_time: Utc.with_ymd_and_hms(2024, 3, 1, 14, 0, 0).unwrap(),
            treatment_name: "Massage".into(),
            user_id: None,
        }
    }

    fn signed_in_user() -> User {
        User {
            id: 5,
            email: "five@test.com".into(),
            name: None,
            address: None,
            phone: None,
            token: "jwt".into(),
        }
    }

    fn sync_under_test(
        signed_in: bool,
    ) -> (AppointmentsSync<DeadSource, MemoryStore>, EntityCache) {
        let cache = EntityCache::new();
        let users = UserSync::new(cache.clone(), DeadSource, MemoryStore::default()).unwrap();
        if signed_in {
            // The reconciliation launched by update fails with Unauthorized,
            // which leaves the cached identity in place.
            users.update(&signed_in_user()).unwrap();
        }
        let api = ApiClient::new("http://localhost:0").unwrap();
        (AppointmentsSync::new(cache.clone(), api, users), cache)
    }

    #[tokio::test]
    async fn test_logout_mid_refresh_leaves_collection_absent() {
        use crate::cache::EntryStatus;

        let cache = EntityCache::new();
        let users = UserSync::new(cache.clone(), DeadSource, MemoryStore::default()).unwrap();
        users.update(&signed_in_user()).unwrap();
        let api = ApiClient::new("http://localhost:0").unwrap();
        let sync = AppointmentsSync::new(cache.clone(), api, users.clone());

        let handle = sync.refresh().expect("loader should launch");
        // On the single-threaded test runtime the loader has not run yet;
        // the logout evicts the collection entry while it is in flight.
        users.clear().unwrap();
        handle.await.unwrap();

        let entry = cache.get(&CacheKey::user_appointments(5));
        assert!(entry.value.is_none(), "evicted key must stay absent");
        assert_eq!(entry.status, EntryStatus::Idle);
        assert!(sync.appointments().is_empty());
    }

    #[tokio::test]
    async fn test_refresh_gated_off_when_logged_out() {
        let (sync, cache) = sync_under_test(false);
        assert!(sync.refresh().is_none());
        assert!(cache.get(&CacheKey::user_appointments(5)).value.is_none());
    }

    #[tokio::test]
    async fn test_appointments_read_from_owner_key() {
        let (sync, cache) = sync_under_test(true);
        cache
            .set(&CacheKey::user_appointments(5), &vec![appointment(10)])
            .unwrap();

        let appointments = sync.appointments();
        assert_eq!(appointments.len(), 1);
        assert_eq!(appointments[0].id, 10);
    }

    #[tokio::test]
    async fn test_appointments_empty_when_logged_out() {
        let (sync, cache) = sync_under_test(false);
        // Leftover data under some user's key must not leak to a logged-out
        // reader.
        cache
            .set(&CacheKey::user_appointments(5), &vec![appointment(10)])
            .unwrap();
        assert!(sync.appointments().is_empty());
    }

    #[tokio::test]
    async fn test_reserve_without_identity_is_unauthorized() {
        let (sync, _cache) = sync_under_test(false);
        let result = sync.reserve(&appointment(10)).await;
        assert!(matches!(result, Err(ApiError::Unauthorized)));
    }

    #[tokio::test]
    async fn test_subscribe_requires_identity() {
        let (sync, _cache) = sync_under_test(false);
        assert!(sync.subscribe(|_| {}).is_none());
    }
}
