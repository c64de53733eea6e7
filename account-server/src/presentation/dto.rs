use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::domain::activity::ActivityEntry;
use crate::domain::user::User;

#[derive(Debug, Deserialize)]
pub struct UpdatePreferencesQuery {
    #[serde(rename = "userId", default)]
    pub user_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RecordActivityRequest {
    pub action: String,
    #[serde(default)]
    pub details: Map<String, Value>,
}

#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub success: bool,
    pub user: User,
}

#[derive(Debug, Serialize)]
pub struct ActivityResponse {
    pub success: bool,
    pub activity: Vec<ActivityEntry>,
}

#[derive(Debug, Serialize)]
pub struct ActivityEntryResponse {
    pub success: bool,
    pub entry: ActivityEntry,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub timestamp: DateTime<Utc>,
}
