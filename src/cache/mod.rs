//! In-memory entity cache with generation-based invalidation.
//!
//! This module provides the `EntityCache`, a process-wide keyed store for
//! remotely-sourced entities. Each entry tracks a monotonic generation
//! counter used to discard superseded fetch results, which is what makes
//! `set`/`clear` safe against an in-flight fetch racing a logout.
//!
//! Consumers that need live updates subscribe per key; there is no implicit
//! observer machinery.

pub mod key;
pub mod store;

pub use key::CacheKey;
pub use store::{CacheEntry, EntityCache, EntryStatus, FetchOptions, Subscription};
