use std::fmt;

/// Key for the current-user entry.
const CURRENT_USER: &str = "current-user";

/// Key for the staff roster entry.
const STAFF_ROSTER: &str = "staff-roster";

/// Prefix for per-user appointment collections; the full key carries the
/// owner's id so a login change never reads another user's collection.
const USER_APPOINTMENTS: &str = "user-appointments";

/// Opaque identifier for one cached value stream.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheKey(String);

impl CacheKey {
    pub fn new(raw: impl Into<String>) -> Self {
        CacheKey(raw.into())
    }

    /// The signed-in user's identity entry.
    pub fn current_user() -> Self {
        CacheKey::new(CURRENT_USER)
    }

    /// The staff roster entry.
    pub fn staff_roster() -> Self {
        CacheKey::new(STAFF_ROSTER)
    }

    /// The appointment collection reserved by one user.
    pub fn user_appointments(user_id: i64) -> Self {
        CacheKey::new(format!("{}:{}", USER_APPOINTMENTS, user_id))
    }

    /// Prefix matching every user's appointment collection, for eviction
    /// at logout.
    pub fn user_appointments_prefix() -> &'static str {
        USER_APPOINTMENTS
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_appointments_key_carries_owner_id() {
        let key = CacheKey::user_appointments(42);
        assert_eq!(key.as_str(), "user-appointments:42");
        assert!(key
            .as_str()
            .starts_with(CacheKey::user_appointments_prefix()));
    }

    #[test]
    fn test_keys_compare_by_value() {
        assert_eq!(CacheKey::current_user(), CacheKey::new("current-user"));
        assert_ne!(CacheKey::current_user(), CacheKey::staff_roster());
    }
}
