//! Cache clients for the mirrored entities.
//!
//! Each synchronizer owns one family of cache keys:
//!
//! - `UserSync`: the current-user identity, with background reconciliation
//!   against the server copy and the login/logout entry points
//! - `StaffSync`: the public staff roster, with treatment filtering
//! - `AppointmentsSync`: the signed-in user's appointment collection and
//!   the reservation write
//!
//! All of them share one injected `EntityCache` instance.

pub mod appointments;
pub mod staff;
pub mod user;

pub use appointments::AppointmentsSync;
pub use staff::{StaffSync, ALL_TREATMENTS};
pub use user::UserSync;
