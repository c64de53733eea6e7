#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Arc;

use account_server::application::user_service::UserService;
use account_server::data::order_source::OrderSource;
use account_server::data::user_repository::UserRepository;
use account_server::domain::activity::ActivityEntry;
use account_server::domain::error::DomainError;
use account_server::domain::preferences::PreferencesPatch;
use account_server::domain::stats::OrderSummary;
use account_server::domain::user::{User, UserId};
use account_server::infrastructure::security::JwtKeys;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use tokio::sync::RwLock;

pub const SECRET: &str = "integration-test-secret";

/// Document store stand-in with the same per-record update semantics.
#[derive(Default)]
pub struct InMemoryUserRepository {
    users: RwLock<HashMap<UserId, User>>,
}

impl InMemoryUserRepository {
    pub async fn insert(&self, user: User) {
        self.users.write().await.insert(user.id.clone(), user);
    }

    pub async fn get(&self, id: &UserId) -> Option<User> {
        self.users.read().await.get(id).cloned()
    }

    pub async fn len(&self) -> usize {
        self.users.read().await.len()
    }
}

#[async_trait]
impl UserRepository for InMemoryUserRepository {
    async fn find_by_id(&self, id: &UserId) -> Result<Option<User>, DomainError> {
        Ok(self.get(id).await)
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, DomainError> {
        let email = email.trim().to_lowercase();
        Ok(self
            .users
            .read()
            .await
            .values()
            .find(|user| user.email == email)
            .cloned())
    }

    async fn merge_preferences(
        &self,
        id: &UserId,
        patch: &PreferencesPatch,
        at: DateTime<Utc>,
    ) -> Result<Option<User>, DomainError> {
        let mut users = self.users.write().await;
        Ok(users.get_mut(id).map(|user| {
            user.preferences.merge(patch);
            user.updated_at = at;
            user.clone()
        }))
    }

    async fn append_activity(
        &self,
        id: &UserId,
        entry: &ActivityEntry,
        last_login: Option<DateTime<Utc>>,
    ) -> Result<bool, DomainError> {
        let mut users = self.users.write().await;
        let Some(user) = users.get_mut(id) else {
            return Ok(false);
        };
        user.activity_log.push(entry.clone());
        if let Some(at) = last_login {
            user.last_login_date = at;
        }
        user.updated_at = entry.timestamp;
        Ok(true)
    }
}

/// Fails every call the way an unreachable store would.
pub struct UnreachableStore;

#[async_trait]
impl UserRepository for UnreachableStore {
    async fn find_by_id(&self, _: &UserId) -> Result<Option<User>, DomainError> {
        Err(DomainError::StoreUnavailable("Database error: no reachable servers".into()))
    }

    async fn find_by_email(&self, _: &str) -> Result<Option<User>, DomainError> {
        Err(DomainError::StoreUnavailable("Database error: no reachable servers".into()))
    }

    async fn merge_preferences(
        &self,
        _: &UserId,
        _: &PreferencesPatch,
        _: DateTime<Utc>,
    ) -> Result<Option<User>, DomainError> {
        Err(DomainError::StoreUnavailable("Update failed".into()))
    }

    async fn append_activity(
        &self,
        _: &UserId,
        _: &ActivityEntry,
        _: Option<DateTime<Utc>>,
    ) -> Result<bool, DomainError> {
        Err(DomainError::StoreUnavailable("Fetch failed".into()))
    }
}

pub struct FixedOrders(pub OrderSummary);

#[async_trait]
impl OrderSource for FixedOrders {
    async fn summary_for(&self, _: &UserId) -> Result<OrderSummary, DomainError> {
        Ok(self.0)
    }
}

pub fn ten_orders() -> FixedOrders {
    FixedOrders(OrderSummary {
        total_orders: 10,
        account_balance: Decimal::new(10050, 2),
    })
}

pub fn user_id(raw: &str) -> UserId {
    UserId::parse(raw).expect("valid test id")
}

pub fn user(raw_id: &str) -> User {
    let mut user = User::new(format!("{raw_id}@example.com"), "$argon2id$stub".into());
    user.id = user_id(raw_id);
    user
}

pub fn service(users: Arc<dyn UserRepository>, orders: Arc<dyn OrderSource>) -> UserService {
    UserService::new(users, orders)
}

pub fn keys() -> JwtKeys {
    JwtKeys::new(SECRET.into())
}

pub fn bearer(raw_id: &str) -> (&'static str, String) {
    let token = keys().generate_token(&user_id(raw_id)).expect("token");
    ("Authorization", format!("Bearer {token}"))
}
