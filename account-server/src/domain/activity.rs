use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::domain::error::DomainError;

pub const LOGIN_ACTION: &str = "login";

const MAX_ACTION_LEN: usize = 64;
const MAX_DETAIL_KEYS: usize = 16;
const MAX_DETAIL_KEY_LEN: usize = 64;
const MAX_DETAIL_TEXT_LEN: usize = 512;
const MAX_PAGE_SIZE: usize = 100;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DetailValue {
    Bool(bool),
    Integer(i64),
    Float(f64),
    Text(String),
}

pub type ActivityDetails = BTreeMap<String, DetailValue>;

/// One immutable line of a user's activity log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityEntry {
    pub id: Uuid,
    pub action: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub details: ActivityDetails,
}

impl ActivityEntry {
    pub fn new(action: String, details: ActivityDetails, timestamp: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            action,
            timestamp,
            details,
        }
    }

    pub fn is_login(&self) -> bool {
        self.action == LOGIN_ACTION
    }
}

pub fn validate_action(action: &str) -> Result<String, DomainError> {
    let action = action.trim();
    if action.is_empty() || action.len() > MAX_ACTION_LEN {
        return Err(DomainError::Validation(format!(
            "action must be 1..={MAX_ACTION_LEN} characters"
        )));
    }
    Ok(action.to_string())
}

/// Narrows an arbitrary JSON object to scalar details.
pub fn parse_details(map: &Map<String, Value>) -> Result<ActivityDetails, DomainError> {
    if map.len() > MAX_DETAIL_KEYS {
        return Err(DomainError::Validation(format!(
            "at most {MAX_DETAIL_KEYS} detail entries are allowed"
        )));
    }

    let mut details = ActivityDetails::new();
    for (key, raw) in map {
        if key.is_empty() || key.len() > MAX_DETAIL_KEY_LEN {
            return Err(DomainError::Validation(format!(
                "detail keys must be 1..={MAX_DETAIL_KEY_LEN} characters"
            )));
        }
        let value = match raw {
            Value::Bool(b) => DetailValue::Bool(*b),
            Value::Number(n) => match (n.as_i64(), n.as_f64()) {
                (Some(i), _) => DetailValue::Integer(i),
                (None, Some(f)) => DetailValue::Float(f),
                _ => return Err(DomainError::Validation(format!("{key} is out of range"))),
            },
            Value::String(s) if s.len() <= MAX_DETAIL_TEXT_LEN => DetailValue::Text(s.clone()),
            Value::String(_) => {
                return Err(DomainError::Validation(format!(
                    "{key} exceeds {MAX_DETAIL_TEXT_LEN} characters"
                )));
            }
            _ => {
                return Err(DomainError::Validation(format!(
                    "{key} must be a scalar value"
                )));
            }
        };
        details.insert(key.clone(), value);
    }
    Ok(details)
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActivityOrder {
    /// The order entries were appended in.
    #[default]
    Oldest,
    Newest,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub struct ActivityQuery {
    #[serde(default)]
    pub order: ActivityOrder,
    #[serde(default)]
    pub offset: Option<usize>,
    #[serde(default)]
    pub limit: Option<usize>,
}

impl ActivityQuery {
    pub fn apply(&self, mut log: Vec<ActivityEntry>) -> Vec<ActivityEntry> {
        if self.order == ActivityOrder::Newest {
            log.reverse();
        }
        let offset = self.offset.unwrap_or(0);
        let iter = log.into_iter().skip(offset);
        match self.limit {
            Some(limit) => iter.take(limit.clamp(1, MAX_PAGE_SIZE)).collect(),
            None => iter.collect(),
        }
    }
}
