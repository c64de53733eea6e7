use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::activity::ActivityEntry;
use crate::domain::error::DomainError;
use crate::domain::preferences::Preferences;

const MAX_USER_ID_LEN: usize = 64;

/// Opaque identifier of a user record, stored as the document `_id`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn parse(raw: &str) -> Result<Self, DomainError> {
        let raw = raw.trim();
        if raw.is_empty() || raw.len() > MAX_USER_ID_LEN {
            return Err(DomainError::Validation(format!(
                "user id must be 1..={MAX_USER_ID_LEN} characters"
            )));
        }
        if !raw
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        {
            return Err(DomainError::Validation(
                "user id contains invalid characters".to_string(),
            ));
        }
        Ok(Self(raw.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Address {
    pub street: String,
    pub city: String,
    pub state: String,
    pub zip_code: String,
    pub country: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: UserId,
    pub email: String,
    #[serde(skip_serializing, default)]
    pub password_hash: String,
    pub is_verified: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<Address>,
    pub activity_log: Vec<ActivityEntry>,
    pub preferences: Preferences,
    pub last_login_date: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn new(email: String, password_hash: String) -> Self {
        let now = Utc::now();
        Self {
            id: UserId::generate(),
            email: email.to_lowercase(),
            password_hash,
            is_verified: false,
            address: None,
            activity_log: Vec::new(),
            preferences: Preferences::default(),
            last_login_date: now,
            created_at: now,
            updated_at: now,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_plain_ids() {
        assert_eq!(UserId::parse("user123").unwrap().as_str(), "user123");
        assert_eq!(UserId::parse(" a-b_c ").unwrap().as_str(), "a-b_c");
    }

    #[test]
    fn rejects_malformed_ids() {
        assert!(UserId::parse("").is_err());
        assert!(UserId::parse("user/../admin").is_err());
        assert!(UserId::parse(&"x".repeat(65)).is_err());
    }

    #[test]
    fn new_user_has_defaults() {
        let user = User::new("Someone@Example.com".into(), "hash".into());
        assert_eq!(user.email, "someone@example.com");
        assert!(!user.is_verified);
        assert!(user.activity_log.is_empty());
        assert!(user.preferences.is_empty());
        assert_eq!(user.last_login_date, user.created_at);
    }

    #[test]
    fn password_hash_is_never_serialized() {
        let user = User::new("a@b.c".into(), "secret-hash".into());
        let json = serde_json::to_value(&user).unwrap();
        assert!(json.get("passwordHash").is_none());
        assert_eq!(json["isVerified"], false);
        assert!(json.get("address").is_none());
    }
}
