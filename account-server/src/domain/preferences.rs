//! User-chosen settings.
//!
//! Preferences are a closed set of keys, each with a fixed value kind. A patch
//! is validated as a whole before anything reaches the store, and merging is
//! shallow: keys in the patch overwrite, every other key is kept.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::domain::error::DomainError;

const THEMES: [&str; 3] = ["light", "dark", "system"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PreferenceKey {
    Theme,
    Notifications,
    EmailDigest,
    Language,
    Timezone,
    Currency,
    ItemsPerPage,
}

impl PreferenceKey {
    pub const ALL: [PreferenceKey; 7] = [
        PreferenceKey::Theme,
        PreferenceKey::Notifications,
        PreferenceKey::EmailDigest,
        PreferenceKey::Language,
        PreferenceKey::Timezone,
        PreferenceKey::Currency,
        PreferenceKey::ItemsPerPage,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            PreferenceKey::Theme => "theme",
            PreferenceKey::Notifications => "notifications",
            PreferenceKey::EmailDigest => "emailDigest",
            PreferenceKey::Language => "language",
            PreferenceKey::Timezone => "timezone",
            PreferenceKey::Currency => "currency",
            PreferenceKey::ItemsPerPage => "itemsPerPage",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|key| key.as_str() == name)
    }

    fn validate(self, value: &PreferenceValue) -> Result<(), String> {
        match (self, value) {
            (PreferenceKey::Theme, PreferenceValue::Text(theme)) => {
                if THEMES.contains(&theme.as_str()) {
                    Ok(())
                } else {
                    Err(format!("theme must be one of {}", THEMES.join(", ")))
                }
            }
            (PreferenceKey::Notifications | PreferenceKey::EmailDigest, PreferenceValue::Bool(_)) => {
                Ok(())
            }
            (PreferenceKey::Language, PreferenceValue::Text(tag)) => {
                let valid_len = (2..=16).contains(&tag.len());
                let valid_chars = tag.chars().all(|c| c.is_ascii_alphanumeric() || c == '-');
                if valid_len && valid_chars {
                    Ok(())
                } else {
                    Err("language must be a language tag such as en-US".to_string())
                }
            }
            (PreferenceKey::Timezone, PreferenceValue::Text(zone)) => {
                if (1..=64).contains(&zone.len()) {
                    Ok(())
                } else {
                    Err("timezone must be 1..=64 characters".to_string())
                }
            }
            (PreferenceKey::Currency, PreferenceValue::Text(code)) => {
                if code.len() == 3 && code.chars().all(|c| c.is_ascii_uppercase()) {
                    Ok(())
                } else {
                    Err("currency must be a three-letter ISO code".to_string())
                }
            }
            (PreferenceKey::ItemsPerPage, PreferenceValue::Number(n)) => {
                if (1..=100).contains(n) {
                    Ok(())
                } else {
                    Err("itemsPerPage must be between 1 and 100".to_string())
                }
            }
            (key, _) => Err(format!("{} has the wrong value type", key.as_str())),
        }
    }
}

impl fmt::Display for PreferenceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PreferenceValue {
    Bool(bool),
    Number(i64),
    Text(String),
}

impl PreferenceValue {
    fn from_json(value: &Value) -> Option<Self> {
        match value {
            Value::Bool(b) => Some(PreferenceValue::Bool(*b)),
            Value::Number(n) => n.as_i64().map(PreferenceValue::Number),
            Value::String(s) => Some(PreferenceValue::Text(s.clone())),
            _ => None,
        }
    }
}

/// The stored preferences of a user.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Preferences(BTreeMap<PreferenceKey, PreferenceValue>);

impl Preferences {
    pub fn from_entries(entries: impl IntoIterator<Item = (PreferenceKey, PreferenceValue)>) -> Self {
        Self(entries.into_iter().collect())
    }

    pub fn get(&self, key: PreferenceKey) -> Option<&PreferenceValue> {
        self.0.get(&key)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&PreferenceKey, &PreferenceValue)> {
        self.0.iter()
    }

    /// Shallow merge: keys from `patch` overwrite, untouched keys survive.
    pub fn merge(&mut self, patch: &PreferencesPatch) {
        for (key, value) in patch.iter() {
            self.0.insert(*key, value.clone());
        }
    }
}

/// A validated set of preference changes.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PreferencesPatch(BTreeMap<PreferenceKey, PreferenceValue>);

impl PreferencesPatch {
    pub fn from_json(map: &Map<String, Value>) -> Result<Self, DomainError> {
        let mut entries = BTreeMap::new();
        for (name, raw) in map {
            let key = PreferenceKey::from_name(name)
                .ok_or_else(|| DomainError::Validation(format!("unknown preference: {name}")))?;
            let value = PreferenceValue::from_json(raw).ok_or_else(|| {
                DomainError::Validation(format!("{name} must be a boolean, integer or string"))
            })?;
            key.validate(&value).map_err(DomainError::Validation)?;
            entries.insert(key, value);
        }
        Ok(Self(entries))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&PreferenceKey, &PreferenceValue)> {
        self.0.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}
