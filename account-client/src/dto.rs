use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use derive_more::Display;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Display)]
#[display("{action} at {timestamp}")]
pub struct RecentActivity {
    pub id: Uuid,
    pub action: String,
    pub timestamp: DateTime<Utc>,
}

/// Body of `GET /api/user/stats`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserStats {
    pub total_orders: u64,
    pub recent_activity: Vec<RecentActivity>,
    pub account_balance: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Display)]
#[display("[{id}] {action} at {timestamp}")]
pub struct ActivityEntry {
    pub id: Uuid,
    pub action: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub details: BTreeMap<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Display)]
#[serde(rename_all = "camelCase")]
#[display("User {{ id: {id}, email: {email} }}")]
pub struct User {
    pub id: String,
    pub email: String,
    #[serde(default)]
    pub is_verified: bool,
    #[serde(default)]
    pub preferences: BTreeMap<String, Value>,
    pub last_login_date: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct UserResponse {
    pub user: User,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ActivityResponse {
    pub activity: Vec<ActivityEntry>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ActivityEntryResponse {
    pub entry: ActivityEntry,
}

/// Failure envelope the server answers every error with.
#[derive(Debug, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}
