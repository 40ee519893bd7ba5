extern crate google_gmail1 as gmail1;

use std::{sync::Arc, time::Duration};

use anyhow::{anyhow, Context};
use chrono::Utc;
use futures::future::join_all;
use google_gmail1::api::{Draft, ListMessagesResponse, Message, Profile};
use leaky_bucket::RateLimiter;
use serde_json::json;

use crate::{server_config::cfg, HttpClient};

/// Gmail API error response structure
#[derive(Debug, Clone, serde::Deserialize)]
pub struct GmailApiError {
    pub error: GmailApiErrorDetail,
}

#[derive(Debug, Clone, serde::Deserialize)]
pub struct GmailApiErrorDetail {
    pub code: u16,
    pub message: String,
    #[serde(default)]
    pub status: Option<String>,
}

// Gmail grants 250 quota units per user per second; each operation costs a
// fixed number of units.
const GMAIL_QUOTA_PER_SECOND: usize = 250;
const QUOTA_MESSAGES_LIST: usize = 5;
const QUOTA_MESSAGES_GET: usize = 5;
const QUOTA_DRAFTS_CREATE: usize = 10;
const QUOTA_GET_PROFILE: usize = 1;

macro_rules! gmail_url {
    ($($params:expr),*) => {
        {
            const GMAIL_ENDPOINT: &str = "https://www.googleapis.com/gmail/v1/users/me";
            let list_params = vec![$($params),*];
            let path = list_params.join("/");
            format!("{}/{}", GMAIL_ENDPOINT, path)
        }
    };
}

/// Every Gmail response deserializes through here: the `{"error": {...}}`
/// payload would otherwise satisfy the permissive API types (e.g. parse as an
/// empty message list) and a 401 would look like an empty inbox.
fn parse_api_response<T: serde::de::DeserializeOwned>(
    data: serde_json::Value,
    operation: &str,
) -> anyhow::Result<T> {
    if data.get("error").is_some() {
        let err: GmailApiError = serde_json::from_value(data)
            .with_context(|| format!("Could not parse Gmail error response for {operation}"))?;
        return Err(anyhow!(
            "Gmail API error in {}: {} {}",
            operation,
            err.error.code,
            err.error.message
        ));
    }

    serde_json::from_value(data).with_context(|| format!("Failed to parse {operation} response"))
}

#[derive(Default)]
/// Filter and paging options for the unread message list
pub struct MessageListOptions {
    /// Messages more recent than this duration will be returned
    pub more_recent_than: Option<chrono::Duration>,
    pub page_token: Option<String>,
    pub max_results: Option<u32>,
}

#[derive(Debug, Clone)]
pub struct EmailClient {
    http_client: HttpClient,
    access_token: String,
    rate_limiter: Arc<RateLimiter>,
    pub email_address: String,
}

impl EmailClient {
    pub fn new(http_client: HttpClient, access_token: String, email_address: String) -> Self {
        let rate_limiter = Arc::new(
            RateLimiter::builder()
                .initial(GMAIL_QUOTA_PER_SECOND)
                .interval(Duration::from_secs(1))
                .refill(GMAIL_QUOTA_PER_SECOND)
                .build(),
        );

        EmailClient {
            http_client,
            access_token,
            rate_limiter,
            email_address,
        }
    }

    /// `users.messages.list` restricted to unread mail inside the lookback
    /// window (`is:unread after:<ts>`).
    pub async fn get_unread_message_list(
        &self,
        options: MessageListOptions,
    ) -> anyhow::Result<ListMessagesResponse> {
        self.rate_limiter.acquire(QUOTA_MESSAGES_LIST).await;

        let mut filters = vec!["is:unread".to_string()];
        if let Some(duration) = options.more_recent_than {
            filters.push(format!("after:{}", (Utc::now() - duration).timestamp()));
        }

        let max_results = options.max_results.unwrap_or(cfg.fetch.max_results);
        let mut query = vec![
            ("q".to_string(), filters.join(" ")),
            ("maxResults".to_string(), max_results.to_string()),
        ];
        if let Some(token) = options.page_token {
            query.push(("pageToken".to_string(), token));
        }

        let resp = self
            .http_client
            .get(gmail_url!("messages"))
            .query(&query)
            .bearer_auth(&self.access_token)
            .send()
            .await?;

        let data = resp.json::<serde_json::Value>().await?;

        parse_api_response(data, "messages.list")
    }

    /// `users.messages.get` with `format=full`: headers, snippet and
    /// internalDate.
    pub async fn get_message_by_id(&self, message_id: &str) -> anyhow::Result<Message> {
        self.rate_limiter.acquire(QUOTA_MESSAGES_GET).await;
        let resp = self
            .http_client
            .get(gmail_url!("messages", message_id))
            .bearer_auth(&self.access_token)
            .query(&[("format", "FULL")])
            .send()
            .await?;

        let data = resp.json::<serde_json::Value>().await?;

        parse_api_response(data, "messages.get")
    }

    /// Fetch several messages concurrently. Individual failures are logged
    /// and skipped; the batch never fails as a whole.
    pub async fn get_messages_by_ids(&self, message_ids: &[String]) -> Vec<Message> {
        let fetches = message_ids.iter().map(|id| async move {
            match self.get_message_by_id(id).await {
                Ok(msg) => Some(msg),
                Err(e) => {
                    tracing::warn!("Skipping message {id}: {e:?}");
                    None
                }
            }
        });

        join_all(fetches).await.into_iter().flatten().collect()
    }

    /// `users.drafts.create` with a base64url-encoded RFC 2822 message.
    pub async fn create_draft(&self, raw_message: &str) -> anyhow::Result<Draft> {
        self.rate_limiter.acquire(QUOTA_DRAFTS_CREATE).await;

        let resp = self
            .http_client
            .post(gmail_url!("drafts"))
            .bearer_auth(&self.access_token)
            .json(&json!({
                "message": { "raw": raw_message }
            }))
            .send()
            .await?;

        let data = resp.json::<serde_json::Value>().await?;

        parse_api_response(data, "drafts.create")
    }

    pub async fn get_profile(&self) -> anyhow::Result<Profile> {
        self.rate_limiter.acquire(QUOTA_GET_PROFILE).await;
        let resp = self
            .http_client
            .get(gmail_url!("profile"))
            .bearer_auth(&self.access_token)
            .send()
            .await?;

        let data = resp.json::<serde_json::Value>().await?;

        parse_api_response(data, "users.getProfile")
    }
}
