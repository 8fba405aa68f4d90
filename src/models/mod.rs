//! Data models for booking entities.
//!
//! This module contains the data structures mirrored from the booking
//! server:
//!
//! - `User`: the authenticated user record, including the bearer token
//! - `Staff`, `StaffImage`: the staff roster with treatment offerings
//! - `Appointment`: a bookable slot, optionally owned by a user
//!
//! All wire shapes are camelCase JSON, matching the server.

pub mod appointment;
pub mod staff;
pub mod user;

pub use appointment::Appointment;
pub use staff::{filter_by_treatment, Staff, StaffImage};
pub use user::User;
