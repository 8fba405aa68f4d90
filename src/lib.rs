//! booksync - client-side data synchronization for the booking app.
//!
//! This crate keeps a small set of remotely-sourced entities (the signed-in
//! user, the staff roster, the user's appointments) mirrored in local
//! memory, serves them to a presentation layer on demand, and keeps them
//! consistent across login, logout, and reservation writes.
//!
//! The core is the identity-cache synchronization protocol in [`cache`] and
//! [`sync::user`]: a locally authoritative identity that is eagerly
//! readable, a best-effort background reconciliation against the server
//! copy, and a per-entry generation counter that lets logout
//! overwrite-and-cancel a reconciliation fetch still in flight.
//!
//! Typical wiring:
//!
//! ```no_run
//! use booksync::{ApiClient, AuthService, Config, EntityCache, FileIdentityStore, UserSync};
//!
//! # fn main() -> anyhow::Result<()> {
//! # let rt = tokio::runtime::Runtime::new()?;
//! # rt.block_on(async {
//! let config = Config::load()?;
//! let cache = EntityCache::new();
//! let api = ApiClient::new(config.server_url())?;
//! let store = FileIdentityStore::new(config.data_dir()?);
//! let users = UserSync::new(cache.clone(), api.clone(), store)?;
//! let auth = AuthService::new(api, users);
//! # anyhow::Ok(())
//! # })?;
//! # Ok(())
//! # }
//! ```

pub mod api;
pub mod auth;
pub mod cache;
pub mod config;
pub mod models;
pub mod sync;

pub use api::{ApiClient, ApiError, ErrorKind, IdentitySource};
pub use auth::{AuthService, FileIdentityStore, IdentityStore};
pub use cache::{CacheEntry, CacheKey, EntityCache, EntryStatus, FetchOptions, Subscription};
pub use config::Config;
pub use models::{Appointment, Staff, User};
pub use sync::{AppointmentsSync, StaffSync, UserSync};
