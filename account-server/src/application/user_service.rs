use std::sync::Arc;

use chrono::Utc;
use tracing::instrument;

use crate::data::order_source::OrderSource;
use crate::data::user_repository::UserRepository;
use crate::domain::activity::{
    ActivityDetails, ActivityEntry, ActivityQuery, validate_action,
};
use crate::domain::error::DomainError;
use crate::domain::preferences::PreferencesPatch;
use crate::domain::stats::UserStats;
use crate::domain::user::{User, UserId};

#[derive(Clone)]
pub struct UserService {
    users: Arc<dyn UserRepository>,
    orders: Arc<dyn OrderSource>,
}

impl UserService {
    pub fn new(users: Arc<dyn UserRepository>, orders: Arc<dyn OrderSource>) -> Self {
        Self { users, orders }
    }

    async fn get_user(&self, id: &UserId) -> Result<User, DomainError> {
        self.users
            .find_by_id(id)
            .await?
            .ok_or_else(|| DomainError::UserNotFound(id.clone()))
    }

    #[instrument(skip(self))]
    pub async fn get_user_stats(&self, user_id: &UserId) -> Result<UserStats, DomainError> {
        let user = self.get_user(user_id).await?;
        let orders = self.orders.summary_for(user_id).await?;
        Ok(UserStats::derive(&user.activity_log, orders))
    }

    #[instrument(skip(self, patch))]
    pub async fn update_preferences(
        &self,
        user_id: &UserId,
        patch: PreferencesPatch,
    ) -> Result<User, DomainError> {
        self.users
            .merge_preferences(user_id, &patch, Utc::now())
            .await?
            .ok_or_else(|| DomainError::UserNotFound(user_id.clone()))
    }

    #[instrument(skip(self))]
    pub async fn get_user_activity(
        &self,
        user_id: &UserId,
        query: ActivityQuery,
    ) -> Result<Vec<ActivityEntry>, DomainError> {
        let user = self.get_user(user_id).await?;
        Ok(query.apply(user.activity_log))
    }

    #[instrument(skip(self, details))]
    pub async fn record_activity(
        &self,
        user_id: &UserId,
        action: &str,
        details: ActivityDetails,
    ) -> Result<ActivityEntry, DomainError> {
        let entry = ActivityEntry::new(validate_action(action)?, details, Utc::now());
        let last_login = entry.is_login().then_some(entry.timestamp);

        if !self.users.append_activity(user_id, &entry, last_login).await? {
            return Err(DomainError::UserNotFound(user_id.clone()));
        }
        Ok(entry)
    }
}
