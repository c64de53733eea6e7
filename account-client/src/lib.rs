use serde_json::{Map, Value};

pub mod dashboard;
pub mod dto;
mod error;
#[cfg(feature = "http")]
mod http_client;
mod query;

pub use dashboard::{DashboardState, format_activity_date, format_balance};
pub use dto::{ActivityEntry, RecentActivity, User, UserStats};
pub use error::AccountClientError;
#[cfg(feature = "http")]
pub use http_client::AccountClientHttp;
pub use query::{ActivityOrder, ActivityParams};

#[async_trait::async_trait]
pub trait AccountClientTrait: Send + Sync {
    async fn get_stats(&self) -> Result<UserStats, AccountClientError>;
    async fn update_preferences(
        &self,
        user_id: &str,
        preferences: Map<String, Value>,
    ) -> Result<User, AccountClientError>;
    async fn get_activity(
        &self,
        user_id: &str,
        params: ActivityParams,
    ) -> Result<Vec<ActivityEntry>, AccountClientError>;
    async fn record_activity(
        &self,
        user_id: &str,
        action: &str,
        details: Map<String, Value>,
    ) -> Result<ActivityEntry, AccountClientError>;
}
