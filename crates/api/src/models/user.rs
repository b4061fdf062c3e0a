//! User domain types.

use chrono::{DateTime, Utc};
use serde::Serialize;

use storeline_core::{Email, UserId};

/// A registered customer.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: UserId,
    pub email: Email,
    pub name: String,
    /// Argon2id PHC string. Never leaves the server.
    #[serde(skip)]
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields needed to insert a user.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: Email,
    pub name: String,
    pub password_hash: String,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_password_hash_not_serialized() {
        let now = Utc::now();
        let user = User {
            id: UserId::new(),
            email: Email::parse("jane@example.com").unwrap(),
            name: "Jane".to_owned(),
            password_hash: "$argon2id$v=19$secret".to_owned(),
            created_at: now,
            updated_at: now,
        };
        let json = serde_json::to_value(&user).unwrap();
        assert!(json.get("passwordHash").is_none());
        assert!(!json.to_string().contains("argon2"));
        assert_eq!(json["email"], "jane@example.com");
        assert!(json.get("createdAt").is_some());
    }
}
