use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A bookable appointment slot.
///
/// `user_id` is `None` while the slot is open; reserving a slot writes the
/// owner's id to the server (see `sync::appointments`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Appointment {
    pub id: i64,
    pub date_time: DateTime<Utc>,
    pub treatment_name: String,
    #[serde(default)]
    pub user_id: Option<i64>,
}

impl Appointment {
    /// Whether the slot already has an owner.
    pub fn is_reserved(&self) -> bool {
        self.user_id.is_some()
    }
}
