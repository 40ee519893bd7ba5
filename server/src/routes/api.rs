use axum::{
    extract::{Path, State},
    Json,
};
use chrono::Local;
use serde::Serialize;
use serde_json::{json, Value};

use crate::{
    email::{
        drafts::{self, DraftOutcome},
        message::{Category, EmailRecord, Priority},
    },
    error::{AppError, AppJsonResult},
    server_config::cfg,
    triage::{self, DataSource, InboxSnapshot},
    ServerState,
};

/// GET /api/emails
pub async fn get_emails(State(state): State<ServerState>) -> AppJsonResult<InboxSnapshot> {
    Ok(Json(state.snapshots.read().await))
}

/// POST /api/refresh
///
/// Kicks off a background refresh and returns immediately; the dashboard
/// polls /api/emails to pick up the result.
pub async fn refresh(State(state): State<ServerState>) -> AppJsonResult<Value> {
    if state.snapshots.is_processing() {
        return Ok(Json(json!({ "status": "already_processing" })));
    }

    tokio::spawn(triage::run_refresh(state.clone()));
    Ok(Json(json!({ "status": "processing_started" })))
}

/// POST /api/create-drafts
pub async fn create_drafts(State(state): State<ServerState>) -> AppJsonResult<DraftOutcome> {
    let snapshot = state.snapshots.read().await;
    let outcome = drafts::create_reply_drafts(&state, &snapshot).await?;
    Ok(Json(outcome))
}

/// GET /api/email/:id
pub async fn get_email_by_id(
    State(state): State<ServerState>,
    Path(id): Path<String>,
) -> AppJsonResult<EmailRecord> {
    let snapshot = state.snapshots.read().await;
    snapshot
        .all_emails
        .iter()
        .find(|email| email.id == id)
        .cloned()
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("No email with id {id}")))
}

#[derive(Debug, Serialize)]
pub struct DebugEmail {
    pub id: String,
    pub subject: String,
    pub sender: String,
    pub priority: Priority,
    pub category: Category,
}

#[derive(Debug, Serialize)]
pub struct DebugInfo {
    pub server_time: String,
    pub user_email: String,
    pub data_source: DataSource,
    pub gmail_connected: bool,
    pub ai_enabled: bool,
    pub demo_mode: bool,
    pub is_processing: bool,
    pub total_emails: usize,
    pub last_updated: Option<String>,
    pub capabilities: Vec<&'static str>,
    pub sample_emails: Vec<DebugEmail>,
}

/// GET /api/debug
pub async fn debug_info(State(state): State<ServerState>) -> AppJsonResult<DebugInfo> {
    let snapshot = state.snapshots.read().await;

    let mut capabilities = vec![
        "unread_fetch",
        "keyword_classification",
        "reply_drafts",
        "demo_fallback",
    ];
    if cfg.ai_enabled() {
        capabilities.insert(2, "llm_classification");
    }

    let sample_emails = snapshot
        .all_emails
        .iter()
        .take(5)
        .map(|email| DebugEmail {
            id: email.id.clone(),
            subject: truncate(&email.subject, 50),
            sender: truncate(&email.sender, 30),
            priority: email.priority,
            category: email.category,
        })
        .collect();

    Ok(Json(DebugInfo {
        server_time: Local::now().to_rfc3339(),
        user_email: cfg.user_email.clone(),
        data_source: snapshot.data_source,
        gmail_connected: snapshot.data_source == DataSource::Gmail,
        ai_enabled: cfg.ai_enabled(),
        demo_mode: snapshot.demo_mode,
        is_processing: snapshot.is_processing,
        total_emails: snapshot.stats.total_unread,
        last_updated: snapshot.last_updated.clone(),
        capabilities,
        sample_emails,
    }))
}

fn truncate(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        s.to_string()
    } else {
        let cut: String = s.chars().take(max_chars).collect();
        format!("{cut}...")
    }
}
