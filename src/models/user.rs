use serde::{Deserialize, Serialize};

/// The authenticated user record as the booking server returns it.
///
/// `token` is the JWT issued at sign-in; it is sent as a bearer credential on
/// every user-scoped request and travels with the record through the cache
/// and the persisted identity store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: i64,
    pub email: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    pub token: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_deserializes_server_shape() {
        let json = r#"{
            "id": 1,
            "email": "test@test.com",
            "name": "Test Q. User",
            "address": null,
            "phone": "555-1212",
            "token": "eyJhbGciOiJIUzI1NiJ9.abc.def"
        }"#;
        let user: User = serde_json::from_str(json).unwrap();
        assert_eq!(user.id, 1);
        assert_eq!(user.email, "test@test.com");
        assert_eq!(user.address, None);
        assert!(user.token.starts_with("eyJ"));
    }

    #[test]
    fn test_user_tolerates_missing_profile_fields() {
        let json = r#"{"id": 2, "email": "new@test.com", "token": "t"}"#;
        let user: User = serde_json::from_str(json).unwrap();
        assert_eq!(user.name, None);
        assert_eq!(user.phone, None);
    }
}
