//! Authentication: the persisted identity and the sign-in/out flow.
//!
//! This module provides:
//! - `IdentityStore` / `FileIdentityStore`: durable storage of the
//!   last-known signed-in user across process restarts
//! - `AuthService`: sign-in, sign-up, and sign-out wired into the identity
//!   synchronizer

pub mod service;
pub mod storage;

pub use service::AuthService;
pub use storage::{FileIdentityStore, IdentityStore};
