use async_trait::async_trait;
use bson::{Bson, DateTime as BsonDateTime, Document, doc};
use chrono::{DateTime, Utc};
use mongodb::options::{IndexOptions, ReturnDocument};
use mongodb::{Collection, Database, IndexModel};
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::domain::activity::{ActivityDetails, ActivityEntry, DetailValue};
use crate::domain::error::DomainError;
use crate::domain::preferences::{PreferenceKey, PreferenceValue, Preferences, PreferencesPatch};
use crate::domain::user::{Address, User, UserId};

pub const USERS_COLLECTION: &str = "users";

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn find_by_id(&self, id: &UserId) -> Result<Option<User>, DomainError>;
    /// Emails are stored lower-cased, so lookups are case-insensitive.
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, DomainError>;
    /// Applies `patch` on top of the stored preferences in one write.
    /// Returns `None` without writing when no such user exists.
    async fn merge_preferences(
        &self,
        id: &UserId,
        patch: &PreferencesPatch,
        at: DateTime<Utc>,
    ) -> Result<Option<User>, DomainError>;
    /// Returns `false` without writing when no such user exists.
    async fn append_activity(
        &self,
        id: &UserId,
        entry: &ActivityEntry,
        last_login: Option<DateTime<Utc>>,
    ) -> Result<bool, DomainError>;
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityDocument {
    pub id: String,
    pub action: String,
    pub timestamp: BsonDateTime,
    #[serde(default)]
    pub details: Document,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserDocument {
    #[serde(rename = "_id")]
    pub id: String,
    pub email: String,
    pub password_hash: String,
    #[serde(default)]
    pub is_verified: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<Address>,
    #[serde(default)]
    pub activity_log: Vec<ActivityDocument>,
    #[serde(default)]
    pub preferences: Document,
    pub last_login_date: BsonDateTime,
    pub created_at: BsonDateTime,
    pub updated_at: BsonDateTime,
}

impl From<&User> for UserDocument {
    fn from(user: &User) -> Self {
        Self {
            id: user.id.as_str().to_string(),
            email: user.email.clone(),
            password_hash: user.password_hash.clone(),
            is_verified: user.is_verified,
            address: user.address.clone(),
            activity_log: user.activity_log.iter().map(ActivityDocument::from).collect(),
            preferences: preferences_to_document(&user.preferences),
            last_login_date: BsonDateTime::from_chrono(user.last_login_date),
            created_at: BsonDateTime::from_chrono(user.created_at),
            updated_at: BsonDateTime::from_chrono(user.updated_at),
        }
    }
}

impl TryFrom<UserDocument> for User {
    type Error = DomainError;

    fn try_from(document: UserDocument) -> Result<Self, Self::Error> {
        let activity_log = document
            .activity_log
            .into_iter()
            .map(ActivityEntry::try_from)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            id: UserId::parse(&document.id)?,
            email: document.email,
            password_hash: document.password_hash,
            is_verified: document.is_verified,
            address: document.address,
            activity_log,
            preferences: preferences_from_document(&document.preferences),
            last_login_date: document.last_login_date.to_chrono(),
            created_at: document.created_at.to_chrono(),
            updated_at: document.updated_at.to_chrono(),
        })
    }
}

impl From<&ActivityEntry> for ActivityDocument {
    fn from(entry: &ActivityEntry) -> Self {
        let details = entry
            .details
            .iter()
            .map(|(key, value)| (key.clone(), detail_to_bson(value)))
            .collect();

        Self {
            id: entry.id.to_string(),
            action: entry.action.clone(),
            timestamp: BsonDateTime::from_chrono(entry.timestamp),
            details,
        }
    }
}

impl TryFrom<ActivityDocument> for ActivityEntry {
    type Error = DomainError;

    fn try_from(document: ActivityDocument) -> Result<Self, Self::Error> {
        let id = Uuid::parse_str(&document.id)
            .map_err(|e| DomainError::Internal(format!("corrupt activity id {}: {e}", document.id)))?;
        let details: ActivityDetails = document
            .details
            .iter()
            .filter_map(|(key, value)| detail_from_bson(value).map(|v| (key.clone(), v)))
            .collect();

        Ok(Self {
            id,
            action: document.action,
            timestamp: document.timestamp.to_chrono(),
            details,
        })
    }
}

fn detail_to_bson(value: &DetailValue) -> Bson {
    match value {
        DetailValue::Bool(b) => Bson::Boolean(*b),
        DetailValue::Integer(i) => Bson::Int64(*i),
        DetailValue::Float(f) => Bson::Double(*f),
        DetailValue::Text(s) => Bson::String(s.clone()),
    }
}

fn detail_from_bson(value: &Bson) -> Option<DetailValue> {
    match value {
        Bson::Boolean(b) => Some(DetailValue::Bool(*b)),
        Bson::Int32(i) => Some(DetailValue::Integer(i64::from(*i))),
        Bson::Int64(i) => Some(DetailValue::Integer(*i)),
        Bson::Double(f) => Some(DetailValue::Float(*f)),
        Bson::String(s) => Some(DetailValue::Text(s.clone())),
        _ => None,
    }
}

fn preference_to_bson(value: &PreferenceValue) -> Bson {
    match value {
        PreferenceValue::Bool(b) => Bson::Boolean(*b),
        PreferenceValue::Number(n) => Bson::Int64(*n),
        PreferenceValue::Text(s) => Bson::String(s.clone()),
    }
}

fn preference_from_bson(value: &Bson) -> Option<PreferenceValue> {
    match value {
        Bson::Boolean(b) => Some(PreferenceValue::Bool(*b)),
        Bson::Int32(n) => Some(PreferenceValue::Number(i64::from(*n))),
        Bson::Int64(n) => Some(PreferenceValue::Number(*n)),
        Bson::String(s) => Some(PreferenceValue::Text(s.clone())),
        _ => None,
    }
}

fn preferences_to_document(preferences: &Preferences) -> Document {
    preferences
        .iter()
        .map(|(key, value)| (key.as_str().to_string(), preference_to_bson(value)))
        .collect()
}

fn preferences_from_document(document: &Document) -> Preferences {
    let mut entries = Vec::with_capacity(document.len());
    for (name, raw) in document {
        match (PreferenceKey::from_name(name), preference_from_bson(raw)) {
            (Some(key), Some(value)) => entries.push((key, value)),
            _ => warn!(preference = %name, "skipping unrecognised stored preference"),
        }
    }
    Preferences::from_entries(entries)
}

pub fn email_filter(email: &str) -> Document {
    doc! { "email": email.trim().to_lowercase() }
}

/// `$set` paths for a shallow merge: one dotted path per patched key.
pub fn preferences_update(patch: &PreferencesPatch, at: DateTime<Utc>) -> Document {
    let mut set = Document::new();
    for (key, value) in patch.iter() {
        set.insert(format!("preferences.{}", key.as_str()), preference_to_bson(value));
    }
    set.insert("updatedAt", BsonDateTime::from_chrono(at));
    doc! { "$set": set }
}

pub fn activity_update(
    entry: &ActivityEntry,
    last_login: Option<DateTime<Utc>>,
) -> Result<Document, DomainError> {
    let encoded = bson::to_bson(&ActivityDocument::from(entry))
        .map_err(|e| DomainError::Internal(format!("failed to encode activity: {e}")))?;
    let mut set = doc! { "updatedAt": BsonDateTime::from_chrono(entry.timestamp) };
    if let Some(at) = last_login {
        set.insert("lastLoginDate", BsonDateTime::from_chrono(at));
    }
    Ok(doc! {
        "$push": { "activityLog": encoded },
        "$set": set,
    })
}

#[derive(Clone)]
pub struct MongoUserRepository {
    users: Collection<UserDocument>,
}

impl MongoUserRepository {
    pub fn new(database: &Database) -> Self {
        Self {
            users: database.collection(USERS_COLLECTION),
        }
    }

    pub async fn ensure_indexes(&self) -> Result<(), DomainError> {
        let email = IndexModel::builder()
            .keys(doc! { "email": 1 })
            .options(
                IndexOptions::builder()
                    .name("email_1".to_string())
                    .unique(true)
                    .build(),
            )
            .build();
        let zip_code = IndexModel::builder()
            .keys(doc! { "address.zipCode": 1 })
            .options(
                IndexOptions::builder()
                    .name("address.zipCode_1".to_string())
                    .build(),
            )
            .build();

        self.users
            .create_indexes([email, zip_code])
            .await
            .map_err(|e| {
                error!("failed to create user indexes: {}", e);
                DomainError::from(e)
            })?;

        info!(collection = USERS_COLLECTION, "user indexes ensured");
        Ok(())
    }
}

#[async_trait]
impl UserRepository for MongoUserRepository {
    async fn find_by_id(&self, id: &UserId) -> Result<Option<User>, DomainError> {
        self.users
            .find_one(doc! { "_id": id.as_str() })
            .await
            .map_err(|e| {
                error!("failed to find user by id {}: {}", id, e);
                DomainError::from(e)
            })?
            .map(User::try_from)
            .transpose()
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, DomainError> {
        self.users
            .find_one(email_filter(email))
            .await
            .map_err(|e| {
                error!("failed to find user by email {}: {}", email, e);
                DomainError::from(e)
            })?
            .map(User::try_from)
            .transpose()
    }

    async fn merge_preferences(
        &self,
        id: &UserId,
        patch: &PreferencesPatch,
        at: DateTime<Utc>,
    ) -> Result<Option<User>, DomainError> {
        let updated = self
            .users
            .find_one_and_update(doc! { "_id": id.as_str() }, preferences_update(patch, at))
            .return_document(ReturnDocument::After)
            .await
            .map_err(|e| {
                error!("failed to update preferences for {}: {}", id, e);
                DomainError::from(e)
            })?;

        if updated.is_some() {
            info!(user_id = %id, "preferences updated");
        }

        updated.map(User::try_from).transpose()
    }

    async fn append_activity(
        &self,
        id: &UserId,
        entry: &ActivityEntry,
        last_login: Option<DateTime<Utc>>,
    ) -> Result<bool, DomainError> {
        let result = self
            .users
            .update_one(doc! { "_id": id.as_str() }, activity_update(entry, last_login)?)
            .await
            .map_err(|e| {
                error!("failed to append activity for {}: {}", id, e);
                DomainError::from(e)
            })?;

        if result.matched_count == 0 {
            return Ok(false);
        }

        info!(user_id = %id, action = %entry.action, "activity appended");
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn patch(value: serde_json::Value) -> PreferencesPatch {
        PreferencesPatch::from_json(value.as_object().unwrap()).unwrap()
    }

    #[test]
    fn preference_merge_sets_only_patched_paths() {
        let at = Utc::now();
        let update = preferences_update(&patch(json!({"theme": "dark", "notifications": true})), at);
        let set = update.get_document("$set").unwrap();

        assert_eq!(set.get_str("preferences.theme").unwrap(), "dark");
        assert!(set.get_bool("preferences.notifications").unwrap());
        assert!(set.get_datetime("updatedAt").is_ok());
        assert!(!set.contains_key("preferences"));
        assert_eq!(set.len(), 3);
    }

    #[test]
    fn email_lookup_matches_the_stored_lowercase_form() {
        assert_eq!(
            email_filter("  Jane.Doe@Example.COM "),
            doc! { "email": "jane.doe@example.com" }
        );
    }

    #[test]
    fn activity_push_touches_last_login_only_for_logins() {
        let entry = ActivityEntry::new("login".into(), ActivityDetails::new(), Utc::now());
        let with_login = activity_update(&entry, Some(entry.timestamp)).unwrap();
        assert!(with_login.get_document("$set").unwrap().contains_key("lastLoginDate"));
        assert!(with_login.get_document("$push").unwrap().contains_key("activityLog"));

        let without = activity_update(&entry, None).unwrap();
        assert!(!without.get_document("$set").unwrap().contains_key("lastLoginDate"));
    }

    #[test]
    fn document_round_trip_preserves_user() {
        let mut user = User::new("round@trip.io".into(), "hash".into());
        user.preferences = Preferences::from_entries([
            (PreferenceKey::Theme, PreferenceValue::Text("dark".into())),
            (PreferenceKey::ItemsPerPage, PreferenceValue::Number(20)),
        ]);
        let mut details = ActivityDetails::new();
        details.insert("ip".into(), DetailValue::Text("10.0.0.1".into()));
        user.activity_log
            .push(ActivityEntry::new("login".into(), details, user.created_at));

        let restored = User::try_from(UserDocument::from(&user)).unwrap();

        assert_eq!(restored.id, user.id);
        assert_eq!(restored.preferences, user.preferences);
        assert_eq!(restored.activity_log[0].id, user.activity_log[0].id);
        assert_eq!(restored.activity_log[0].details, user.activity_log[0].details);
        assert_eq!(
            restored.created_at.timestamp_millis(),
            user.created_at.timestamp_millis()
        );
    }

    #[test]
    fn unknown_stored_preferences_are_skipped() {
        let prefs = preferences_from_document(&doc! { "theme": "light", "legacyFlag": 1 });
        assert_eq!(prefs.len(), 1);
    }
}
