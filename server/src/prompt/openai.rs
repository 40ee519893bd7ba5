use std::str::FromStr;

use anyhow::{anyhow, Context};
use indoc::formatdoc;
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::json;
use strum::IntoEnumIterator;

use crate::{
    email::message::{Category, EmailRecord, Priority},
    error::{AppError, AppResult},
    server_config::cfg,
    HttpClient,
};

fn classification_system_prompt() -> String {
    let priorities = Priority::iter()
        .map(|p| p.to_string())
        .collect::<Vec<_>>()
        .join(", ");
    let categories = Category::iter()
        .map(|c| c.to_string())
        .collect::<Vec<_>>()
        .join(", ");

    formatdoc! {r#"
        You are a helpful assistant that triages emails.
        Choose exactly one priority from [{priorities}] and one category from [{categories}].
        You will only respond with a JSON object with the keys priority and category. Do not provide explanations or multiple answers."#}
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Classification {
    pub priority: Priority,
    pub category: Category,
}

/// One chat-completion round trip classifying a single email. Callers fall
/// back to the rule-based classifier on any error.
pub async fn send_classification_prompt(
    http_client: &HttpClient,
    email: &EmailRecord,
) -> AppResult<Classification> {
    let content = format!(
        "Classify the following email based on the sender between the <from> tags, the subject between the <subject> tags and the body between the <body> tags.\n<from>{}</from> <subject>{}</subject> <body>{}</body>",
        email.sender, email.subject, email.body
    );
    let answer = send_chat_prompt(
        http_client,
        classification_system_prompt(),
        content,
        cfg.model.temperature,
        cfg.model.max_tokens,
        true,
    )
    .await?;

    parse_classification(&answer)
}

fn parse_classification(content: &str) -> AppResult<Classification> {
    #[derive(Deserialize)]
    struct AnswerJson {
        priority: String,
        category: String,
    }

    let (priority, category) = match serde_json::from_str::<AnswerJson>(content) {
        Ok(AnswerJson { priority, category }) => (priority, category),
        Err(_) => {
            // Some models wrap the JSON in prose or fences; salvage with regex
            static RE_PRIORITY: Lazy<Regex> =
                Lazy::new(|| Regex::new(r#""priority":\s*"([a-z_]+)""#).unwrap());
            static RE_CATEGORY: Lazy<Regex> =
                Lazy::new(|| Regex::new(r#""category":\s*"([a-z_]+)""#).unwrap());

            let priority = RE_PRIORITY
                .captures(content)
                .and_then(|caps| caps.get(1))
                .map(|m| m.as_str().to_string())
                .ok_or_else(|| anyhow!("Could not parse priority from response: {content}"))?;
            let category = RE_CATEGORY
                .captures(content)
                .and_then(|caps| caps.get(1))
                .map(|m| m.as_str().to_string())
                .ok_or_else(|| anyhow!("Could not parse category from response: {content}"))?;

            (priority, category)
        }
    };

    let priority = Priority::from_str(&priority)
        .map_err(|_| anyhow!("Model returned unknown priority: {priority}"))?;
    let category = Category::from_str(&category)
        .map_err(|_| anyhow!("Model returned unknown category: {category}"))?;

    Ok(Classification { priority, category })
}

/// Ask the model for a short reply body. Used for auto-reply drafts; callers
/// fall back to the canned template on any error.
pub async fn generate_reply_body(
    http_client: &HttpClient,
    email: &EmailRecord,
    timeframe: &str,
) -> AppResult<String> {
    let system = formatdoc! {r#"
        You write brief, polite email reply drafts on behalf of the recipient.
        Acknowledge the sender's message and state that a full response will follow {timeframe}.
        Respond with the reply body only, plain text, no subject line and no signature."#};
    let content = format!(
        "Draft a reply to this email.\n<from>{}</from> <subject>{}</subject> <body>{}</body>",
        email.sender, email.subject, email.body
    );

    let answer = send_chat_prompt(http_client, system, content, 0.7, 400, false).await?;
    let answer = answer.trim();
    if answer.is_empty() {
        return Err(anyhow!("Model returned an empty reply body").into());
    }

    Ok(answer.to_string())
}

async fn send_chat_prompt(
    http_client: &HttpClient,
    system_prompt: String,
    user_content: String,
    temperature: f64,
    max_tokens: u32,
    json_response: bool,
) -> AppResult<String> {
    let api_key = cfg
        .api_key
        .as_ref()
        .ok_or_else(|| AppError::BadRequest("OPENAI_API_KEY is not configured".to_string()))?;

    let mut body = json!({
        "model": &cfg.model.id,
        "temperature": temperature,
        "max_tokens": max_tokens,
        "messages": [
            { "role": "system", "content": system_prompt },
            { "role": "user", "content": user_content }
        ]
    });
    if json_response {
        body["response_format"] = json!({ "type": "json_object" });
    }

    let resp = http_client
        .post(&cfg.model.endpoint)
        .bearer_auth(api_key)
        .json(&body)
        .send()
        .await?
        .json::<serde_json::Value>()
        .await
        .map_err(|e| {
            if let Some(status) = e.status() {
                match status {
                    StatusCode::BAD_REQUEST => AppError::BadRequest(e.to_string()),
                    StatusCode::REQUEST_TIMEOUT => AppError::RequestTimeout,
                    StatusCode::TOO_MANY_REQUESTS => AppError::TooManyRequests,
                    _ => AppError::Internal(e.into()),
                }
            } else {
                AppError::Internal(e.into())
            }
        })?;

    let parsed = serde_json::from_value::<ChatApiResponseOrError>(resp.clone())
        .context(format!("Could not parse chat response: {}", resp))?;

    let parsed = match parsed {
        ChatApiResponseOrError::Error(error) => {
            return Err(anyhow!("Chat API error: {:?}", error).into());
        }
        ChatApiResponseOrError::Response(parsed) => parsed,
    };

    let choice = parsed.choices.first().context("No choices in response")?;

    Ok(choice.message.content.clone())
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PromptUsage {
    pub prompt_tokens: i64,
    pub completion_tokens: i64,
    pub total_tokens: i64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ChatChoice {
    pub index: i32,
    pub message: ChatMessage,
    pub finish_reason: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ChatApiResponse {
    pub choices: Vec<ChatChoice>,
    pub usage: Option<PromptUsage>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ChatApiError {
    pub error: ChatApiErrorDetail,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ChatApiErrorDetail {
    pub message: String,
    #[serde(default)]
    pub code: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ChatApiResponseOrError {
    Response(ChatApiResponse),
    Error(ChatApiError),
}
