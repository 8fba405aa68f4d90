//! REST API client module for the booking server.
//!
//! This module provides the `ApiClient` for authentication, the canonical
//! user record, the staff roster, the user's appointments, and the
//! appointment-reservation write.
//!
//! User-scoped endpoints use JWT bearer authentication with the token
//! carried on the `User` record itself.

pub mod client;
pub mod error;

pub use client::{ApiClient, IdentitySource, DEFAULT_BASE_URL};
pub use error::{ApiError, ErrorKind};
