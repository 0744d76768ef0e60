use std::fmt;

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

/// Authorization tier. Stored as lowercase text in the `users.role` column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Admin => "admin",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, thiserror::Error)]
#[error("unknown role: {0}")]
pub struct UnknownRole(String);

impl TryFrom<String> for Role {
    type Error = UnknownRole;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        match value.as_str() {
            "user" => Ok(Role::User),
            "admin" => Ok(Role::Admin),
            other => Err(UnknownRole(other.to_string())),
        }
    }
}

/// Profile image reference: storage id plus display URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Avatar {
    pub public_id: String,
    pub url: String,
}

impl Default for Avatar {
    fn default() -> Self {
        Self {
            public_id: "1234_id".into(),
            url: "https://cdn0.iconfinder.com/data/icons/communication-456/24/account_profile_user_contact_person_avatar_placeholder-512.png".into(),
        }
    }
}

/// User record in the database.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String, // Argon2 PHC string, never exposed in JSON
    pub avatar_public_id: String,
    pub avatar_url: String,
    #[sqlx(try_from = "String")]
    pub role: Role,
    #[serde(skip_serializing)]
    pub reset_password_token: Option<String>, // SHA-256 hex of the one-time value
    #[serde(skip_serializing)]
    pub reset_password_expire: Option<OffsetDateTime>,
    pub created_at: OffsetDateTime,
}

impl User {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    pub fn avatar(&self) -> Avatar {
        Avatar {
            public_id: self.avatar_public_id.clone(),
            url: self.avatar_url.clone(),
        }
    }

    /// The reset pair, only when both halves are present.
    pub fn pending_reset(&self) -> Option<(&str, OffsetDateTime)> {
        match (&self.reset_password_token, self.reset_password_expire) {
            (Some(token_hash), Some(expires)) => Some((token_hash.as_str(), expires)),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    fn sample_user() -> User {
        User {
            id: Uuid::new_v4(),
            name: "Alice".into(),
            email: "alice@example.com".into(),
            password_hash: "$argon2id$fake".into(),
            avatar_public_id: "1234_id".into(),
            avatar_url: "https://example.com/avatar.png".into(),
            role: Role::User,
            reset_password_token: None,
            reset_password_expire: None,
            created_at: datetime!(2024-01-01 00:00 UTC),
        }
    }

    #[test]
    fn serialized_user_never_contains_secret_fields() {
        let mut user = sample_user();
        user.reset_password_token = Some("deadbeef".into());
        user.reset_password_expire = Some(datetime!(2024-01-01 01:00 UTC));

        let json = serde_json::to_string(&user).unwrap();
        assert!(!json.contains("password_hash"));
        assert!(!json.contains("$argon2id"));
        assert!(!json.contains("reset_password_token"));
        assert!(!json.contains("deadbeef"));
        assert!(!json.contains("reset_password_expire"));
    }

    #[test]
    fn role_parses_only_known_values() {
        assert_eq!(Role::try_from("user".to_string()).unwrap(), Role::User);
        assert_eq!(Role::try_from("admin".to_string()).unwrap(), Role::Admin);
        assert!(Role::try_from("root".to_string()).is_err());
        assert!(Role::try_from("Admin".to_string()).is_err());
    }

    #[test]
    fn role_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&Role::Admin).unwrap(), r#""admin""#);
        let parsed: Role = serde_json::from_str(r#""user""#).unwrap();
        assert_eq!(parsed, Role::User);
        assert!(serde_json::from_str::<Role>(r#""superuser""#).is_err());
    }

    #[test]
    fn pending_reset_requires_both_halves() {
        let mut user = sample_user();
        assert!(user.pending_reset().is_none());

        user.reset_password_token = Some("abc123".into());
        user.reset_password_expire = Some(datetime!(2024-01-01 01:00 UTC));
        let (token_hash, expires) = user.pending_reset().unwrap();
        assert_eq!(token_hash, "abc123");
        assert_eq!(expires, datetime!(2024-01-01 01:00 UTC));
    }

    #[test]
    fn default_avatar_is_the_placeholder() {
        let avatar = Avatar::default();
        assert_eq!(avatar.public_id, "1234_id");
        assert!(avatar.url.starts_with("https://"));
    }
}
