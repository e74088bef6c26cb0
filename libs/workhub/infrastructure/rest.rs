//! REST message store
//!
//! History fetch and message submission against the dashboard API, both
//! authorized with the session's bearer credential.

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use std::time::Duration;
use tracing::{debug, warn};

use crate::application::traits::{MessageStore, Result, StoreError};
use crate::domain::{HistoryRecord, HistoryScope, SendRequest};

pub struct RestMessageStore {
    base_url: String,
    client: Client,
    token: Option<String>,
}

impl RestMessageStore {
    pub fn new(
        base_url: impl Into<String>,
        token: Option<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(Duration::from_secs(10))
            .pool_idle_timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client,
            token,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    fn history_url(&self, scope: HistoryScope) -> String {
        match scope {
            HistoryScope::Own => format!("{}/messages", self.base_url),
            HistoryScope::Counterparty(id) => format!("{}/messages/{}", self.base_url, id),
        }
    }

    async fn check_status(response: Response) -> Result<Response> {
        let status = response.status();
        if status == StatusCode::UNAUTHORIZED {
            warn!("[History] Credential rejected by the API");
            return Err(StoreError::Unauthorized);
        }
        if status == StatusCode::TOO_MANY_REQUESTS {
            warn!("[History] Rate limit exceeded on the API");
            return Err(StoreError::RateLimited);
        }
        if !status.is_success() {
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(StoreError::ApiError {
                status: status.as_u16(),
                message,
            });
        }
        Ok(response)
    }
}

#[async_trait]
impl MessageStore for RestMessageStore {
    async fn fetch_history(&self, scope: HistoryScope) -> Result<Vec<HistoryRecord>> {
        let url = self.history_url(scope);
        debug!("[History] GET {}", url);

        let response = self.authorize(self.client.get(&url)).send().await?;
        let response = Self::check_status(response).await?;

        let records: Vec<HistoryRecord> = response
            .json()
            .await
            .map_err(|e| StoreError::DeserializeFailed(e.to_string()))?;

        debug!("[History] Fetched {} records", records.len());
        Ok(records)
    }

    async fn send_message(&self, request: &SendRequest) -> Result<()> {
        let url = format!("{}/messages", self.base_url);
        debug!("[Sync] POST {} ({})", url, request.client_ref);

        let response = self
            .authorize(self.client.post(&url).json(request))
            .send()
            .await?;
        Self::check_status(response).await?;
        Ok(())
    }
}
