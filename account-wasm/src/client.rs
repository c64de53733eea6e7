use account_client::UserStats;
use gloo_net::http::Request;
use gloo_storage::{LocalStorage, Storage};
use serde::de::DeserializeOwned;

use crate::error::DashboardError;

const TOKEN_KEY: &str = "account_token";

#[derive(Clone)]
pub struct StatsClient {
    base_url: String,
}

impl StatsClient {
    pub fn new(endpoint: &str) -> Self {
        Self {
            base_url: endpoint.trim_end_matches('/').to_string(),
        }
    }

    /// Bearer token the sign-in flow left in local storage.
    fn auth_header() -> Option<String> {
        LocalStorage::get::<String>(TOKEN_KEY)
            .ok()
            .filter(|t| !t.is_empty())
            .map(|t| format!("Bearer {t}"))
    }

    async fn send<T: DeserializeOwned>(request: Request) -> Result<T, DashboardError> {
        let response = request.send().await?;

        if response.ok() {
            response.json().await.map_err(DashboardError::from)
        } else {
            let status = response.status();
            let message = response.text().await.unwrap_or_default();
            Err(DashboardError::Http { status, message })
        }
    }

    pub async fn fetch_stats(&self) -> Result<UserStats, DashboardError> {
        let token = Self::auth_header().ok_or(DashboardError::Unauthorized)?;
        let request = Request::get(&format!("{}/api/user/stats", self.base_url))
            .header("Authorization", &token)
            .header("Accept", "application/json")
            .build()?;
        Self::send(request).await
    }
}
