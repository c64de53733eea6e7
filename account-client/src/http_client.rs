use std::sync::Arc;

use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, HeaderValue};
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value, json};

use crate::AccountClientTrait;
use crate::dto::{
    ActivityEntry, ActivityEntryResponse, ActivityResponse, User, UserResponse, UserStats,
};
use crate::error::AccountClientError;
use crate::query::ActivityParams;

#[derive(Clone)]
pub struct AccountClientHttp {
    client: Arc<Client>,
    base_url: String,
    token: Option<String>,
}

impl AccountClientHttp {
    pub fn connect(endpoint: &str) -> Result<Self, AccountClientError> {
        let base_url = endpoint.trim_end_matches('/').to_string();
        Ok(Self {
            client: Arc::new(Client::builder().build()?),
            base_url,
            token: None,
        })
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into()).filter(|t: &String| !t.is_empty());
        self
    }

    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn authorized(&self, req: RequestBuilder) -> Result<RequestBuilder, AccountClientError> {
        let token = self.token.as_deref().ok_or(AccountClientError::Unauthorized)?;
        let header = HeaderValue::from_str(&format!("Bearer {token}"))
            .map_err(|_| AccountClientError::Unauthorized)?;
        Ok(req.header(AUTHORIZATION, header))
    }

    async fn send<T: DeserializeOwned>(req: RequestBuilder) -> Result<T, AccountClientError> {
        let resp = req.send().await?;
        if resp.status().is_success() {
            Ok(resp.json().await?)
        } else {
            Err(AccountClientError::from_http_response(resp).await)
        }
    }
}

#[async_trait]
impl AccountClientTrait for AccountClientHttp {
    async fn get_stats(&self) -> Result<UserStats, AccountClientError> {
        let req = self.authorized(self.client.get(self.url("/api/user/stats")))?;
        Self::send(req).await
    }

    async fn update_preferences(
        &self,
        user_id: &str,
        preferences: Map<String, Value>,
    ) -> Result<User, AccountClientError> {
        let req = self
            .authorized(self.client.post(self.url("/api/user/update-preferences")))?
            .query(&[("userId", user_id)])
            .json(&preferences);
        let resp: UserResponse = Self::send(req).await?;
        Ok(resp.user)
    }

    async fn get_activity(
        &self,
        user_id: &str,
        params: ActivityParams,
    ) -> Result<Vec<ActivityEntry>, AccountClientError> {
        let req = self
            .authorized(self.client.get(self.url(&format!("/api/user/activity/{user_id}"))))?
            .query(&params.to_pairs());
        let resp: ActivityResponse = Self::send(req).await?;
        Ok(resp.activity)
    }

    async fn record_activity(
        &self,
        user_id: &str,
        action: &str,
        details: Map<String, Value>,
    ) -> Result<ActivityEntry, AccountClientError> {
        let req = self
            .authorized(self.client.post(self.url(&format!("/api/user/activity/{user_id}"))))?
            .json(&json!({
                "action": action,
                "details": details,
            }));
        let resp: ActivityEntryResponse = Self::send(req).await?;
        Ok(resp.entry)
    }
}
