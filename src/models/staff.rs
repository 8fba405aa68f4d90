use serde::{Deserialize, Serialize};

/// A staff member offering one or more treatments.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Staff {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub treatment_names: Vec<String>,
    #[serde(default)]
    pub image: Option<StaffImage>,
}

/// Attribution metadata for a staff member's photo.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StaffImage {
    pub file_name: String,
    #[serde(default)]
    pub author_name: Option<String>,
    #[serde(default)]
    pub author_link: Option<String>,
    #[serde(default)]
    pub platform_name: Option<String>,
    #[serde(default)]
    pub platform_link: Option<String>,
}

/// Filter the roster down to members who offer the named treatment.
/// Matching is case-insensitive on the treatment name.
pub fn filter_by_treatment(staff: &[Staff], treatment: &str) -> Vec<Staff> {
    let wanted = treatment.to_lowercase();
    staff
        .iter()
        .filter(|member| {
            member
                .treatment_names
                .iter()
                .any(|name| name.to_lowercase() == wanted)
        })
        .cloned()
        .collect()
}
