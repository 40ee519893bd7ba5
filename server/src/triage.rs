use std::collections::HashMap;

use chrono::Local;
use serde::{Deserialize, Serialize};
use strum::Display;

use crate::{
    email::{
        auth::GmailAuthorizer,
        client::EmailClient,
        demo, fetcher,
        message::{EmailRecord, Priority},
    },
    server_config::cfg,
    ServerState,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum DataSource {
    Gmail,
    Demo,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriorityCounts {
    pub critical: usize,
    pub high: usize,
    pub medium: usize,
    pub low: usize,
}

impl PriorityCounts {
    fn bump(&mut self, priority: Priority) {
        match priority {
            Priority::Critical => self.critical += 1,
            Priority::High => self.high += 1,
            Priority::Medium => self.medium += 1,
            Priority::Low => self.low += 1,
        }
    }

    pub fn high_priority(&self) -> usize {
        self.critical + self.high
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InboxStats {
    pub total_unread: usize,
    pub direct_count: usize,
    pub cc_count: usize,
    pub priority_counts: PriorityCounts,
    pub direct_priority_counts: PriorityCounts,
    pub cc_priority_counts: PriorityCounts,
    pub type_counts: HashMap<String, usize>,
    pub high_priority_count: usize,
    pub direct_high_priority_count: usize,
    pub cc_high_priority_count: usize,
    pub uncategorized_count: usize,
}

/// The triaged inbox as served to the dashboard. Rebuilt wholesale on every
/// refresh; individual records are never mutated afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InboxSnapshot {
    pub all_emails: Vec<EmailRecord>,
    pub direct_emails: Vec<EmailRecord>,
    pub cc_emails: Vec<EmailRecord>,
    pub stats: InboxStats,
    pub last_updated: Option<String>,
    pub data_source: DataSource,
    pub demo_mode: bool,
    pub is_processing: bool,
    pub error_message: Option<String>,
}

impl InboxSnapshot {
    pub fn empty() -> Self {
        InboxSnapshot {
            all_emails: Vec::new(),
            direct_emails: Vec::new(),
            cc_emails: Vec::new(),
            stats: InboxStats::default(),
            last_updated: None,
            data_source: DataSource::Demo,
            demo_mode: true,
            is_processing: false,
            error_message: None,
        }
    }
}

/// Comma-tolerant, case-insensitive membership test for To/Cc headers.
fn address_in_field(user_email: &str, field: &str) -> bool {
    if user_email.is_empty() || field.is_empty() {
        return false;
    }
    let user_email = user_email.to_lowercase();
    field
        .to_lowercase()
        .split(',')
        .any(|addr| addr.trim().contains(&user_email))
}

/// Split classified records into direct/CC groups and compute display stats.
/// Direct iff the user's address is in To; CC iff only in Cc. Records
/// matching neither are grouped with direct and counted as uncategorized
/// so nothing silently disappears from the dashboard.
pub fn build_snapshot(
    all_emails: Vec<EmailRecord>,
    user_email: &str,
    data_source: DataSource,
    error_message: Option<String>,
) -> InboxSnapshot {
    let mut direct_emails = Vec::new();
    let mut cc_emails = Vec::new();
    let mut uncategorized_count = 0;

    for email in &all_emails {
        if address_in_field(user_email, &email.to) {
            direct_emails.push(email.clone());
        } else if address_in_field(user_email, &email.cc) {
            cc_emails.push(email.clone());
        } else {
            uncategorized_count += 1;
            direct_emails.push(email.clone());
        }
    }

    let mut stats = InboxStats {
        total_unread: all_emails.len(),
        direct_count: direct_emails.len(),
        cc_count: cc_emails.len(),
        uncategorized_count,
        ..Default::default()
    };

    for email in &all_emails {
        stats.priority_counts.bump(email.priority);
        *stats
            .type_counts
            .entry(email.category.to_string())
            .or_insert(0) += 1;
    }
    for email in &direct_emails {
        stats.direct_priority_counts.bump(email.priority);
    }
    for email in &cc_emails {
        stats.cc_priority_counts.bump(email.priority);
    }

    stats.high_priority_count = stats.priority_counts.high_priority();
    stats.direct_high_priority_count = stats.direct_priority_counts.high_priority();
    stats.cc_high_priority_count = stats.cc_priority_counts.high_priority();

    InboxSnapshot {
        all_emails,
        direct_emails,
        cc_emails,
        stats,
        last_updated: Some(Local::now().to_rfc3339()),
        data_source,
        demo_mode: data_source == DataSource::Demo,
        is_processing: false,
        error_message,
    }
}

/// Full refresh cycle: live fetch when Gmail is reachable, demo data
/// otherwise. Only one refresh runs at a time; concurrent calls return
/// immediately.
pub async fn run_refresh(state: ServerState) {
    if !state.snapshots.begin_refresh() {
        tracing::info!("Refresh already in progress, skipping");
        return;
    }

    let snapshot = compute_snapshot(&state).await;
    tracing::info!(
        "Inbox refreshed: {} emails ({} direct, {} cc) from {}",
        snapshot.stats.total_unread,
        snapshot.stats.direct_count,
        snapshot.stats.cc_count,
        snapshot.data_source,
    );
    state.snapshots.replace(snapshot).await;
    state.snapshots.end_refresh();
}

async fn compute_snapshot(state: &ServerState) -> InboxSnapshot {
    match live_records(state).await {
        Ok(mut records) => {
            fetcher::classify_records(&state.http_client, &mut records).await;
            build_snapshot(records, &cfg.user_email, DataSource::Gmail, None)
        }
        Err(e) => {
            tracing::warn!("Gmail unavailable, serving demo data: {e:?}");
            let records = demo::sample_emails(&cfg.user_email, Local::now());
            build_snapshot(
                records,
                &cfg.user_email,
                DataSource::Demo,
                Some(e.to_string()),
            )
        }
    }
}

async fn live_records(state: &ServerState) -> anyhow::Result<Vec<EmailRecord>> {
    let mut authorizer = GmailAuthorizer::from_files(state.http_client.clone())?;
    let access_token = authorizer.access_token().await?;
    let client = EmailClient::new(
        state.http_client.clone(),
        access_token,
        cfg.user_email.clone(),
    );
    fetcher::fetch_unread(&client).await
}

/// Build an authenticated client for write operations (draft creation).
pub async fn live_client(state: &ServerState) -> anyhow::Result<EmailClient> {
    let mut authorizer = GmailAuthorizer::from_files(state.http_client.clone())?;
    let access_token = authorizer.access_token().await?;
    Ok(EmailClient::new(
        state.http_client.clone(),
        access_token,
        cfg.user_email.clone(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::email::message::Category;

    const USER: &str = "22dcs047@charusat.edu.in";

    fn record(id: &str, to: &str, cc: &str, priority: Priority) -> EmailRecord {
        EmailRecord {
            id: id.to_string(),
            sender: "someone@example.com".to_string(),
            subject: "subject".to_string(),
            body: "body".to_string(),
            snippet: "body".to_string(),
            date: "2025-08-08".to_string(),
            time: "08:30".to_string(),
            to: to.to_string(),
            cc: cc.to_string(),
            priority,
            category: Category::General,
            ai_classified: false,
        }
    }

    #[test]
    fn test_direct_iff_user_in_to_field() {
        let emails = vec![
            record("1", USER, "", Priority::Medium),
            record("2", "class@charusat.edu.in", USER, Priority::High),
        ];
        let snap = build_snapshot(emails, USER, DataSource::Demo, None);

        assert_eq!(snap.direct_emails.len(), 1);
        assert_eq!(snap.direct_emails[0].id, "1");
        assert_eq!(snap.cc_emails.len(), 1);
        assert_eq!(snap.cc_emails[0].id, "2");
        assert_eq!(snap.stats.uncategorized_count, 0);
    }

    #[test]
    fn test_to_field_membership_is_comma_tolerant() {
        let to = format!("first@example.com, {}", USER.to_uppercase());
        let emails = vec![record("1", &to, "", Priority::Medium)];
        let snap = build_snapshot(emails, USER, DataSource::Demo, None);
        assert_eq!(snap.direct_emails.len(), 1);
        assert!(snap.cc_emails.is_empty());
    }

    #[test]
    fn test_unmatched_records_fall_back_to_direct() {
        let emails = vec![record("1", "other@example.com", "third@example.com", Priority::Low)];
        let snap = build_snapshot(emails, USER, DataSource::Demo, None);

        assert_eq!(snap.direct_emails.len(), 1);
        assert!(snap.cc_emails.is_empty());
        assert_eq!(snap.stats.uncategorized_count, 1);
    }

    #[test]
    fn test_stats_counts() {
        let emails = vec![
            record("1", USER, "", Priority::Critical),
            record("2", USER, "", Priority::High),
            record("3", USER, "", Priority::Medium),
            record("4", "class@charusat.edu.in", USER, Priority::High),
        ];
        let snap = build_snapshot(emails, USER, DataSource::Gmail, None);

        assert_eq!(snap.stats.total_unread, 4);
        assert_eq!(snap.stats.direct_count, 3);
        assert_eq!(snap.stats.cc_count, 1);
        assert_eq!(snap.stats.priority_counts.critical, 1);
        assert_eq!(snap.stats.priority_counts.high, 2);
        assert_eq!(snap.stats.high_priority_count, 3);
        assert_eq!(snap.stats.direct_high_priority_count, 2);
        assert_eq!(snap.stats.cc_high_priority_count, 1);
        assert_eq!(snap.stats.type_counts.get("general"), Some(&4));
        assert!(!snap.demo_mode);
        assert!(snap.last_updated.is_some());
    }

    #[test]
    fn test_empty_snapshot_is_demo_mode() {
        let snap = InboxSnapshot::empty();
        assert!(snap.demo_mode);
        assert!(snap.all_emails.is_empty());
        assert!(snap.last_updated.is_none());
    }
}
