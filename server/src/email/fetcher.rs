use chrono::Duration;

use crate::{
    email::{
        client::{EmailClient, MessageListOptions},
        message::EmailRecord,
        rules,
    },
    prompt,
    server_config::cfg,
    HttpClient,
};

/// Pull unread messages inside the lookback window, flatten them into
/// records and drop automated traffic. Messages that fail to fetch or parse
/// are skipped, never fatal.
pub async fn fetch_unread(client: &EmailClient) -> anyhow::Result<Vec<EmailRecord>> {
    let list = client
        .get_unread_message_list(MessageListOptions {
            more_recent_than: Some(Duration::hours(cfg.fetch.lookback_hours)),
            ..Default::default()
        })
        .await?;

    let ids: Vec<String> = list
        .messages
        .unwrap_or_default()
        .into_iter()
        .filter_map(|m| m.id)
        .collect();

    tracing::info!("Fetching {} unread messages", ids.len());
    let messages = client.get_messages_by_ids(&ids).await;

    let records = messages
        .iter()
        .filter_map(|msg| match EmailRecord::from_gmail_message(msg) {
            Ok(record) => Some(record),
            Err(e) => {
                tracing::warn!("Skipping unparseable message: {e:?}");
                None
            }
        })
        .filter(|record| {
            let automated = rules::is_automated(&cfg.user_email, &record.sender, &record.subject);
            if automated {
                tracing::debug!("Filtered automated email: {}", record.subject);
            }
            !automated
        })
        .collect();

    Ok(records)
}

/// Classify records in place: the LLM path when a key is configured, the
/// keyword rules otherwise or whenever the LLM call fails. A failed prompt
/// never loses the record, it just stays rule-classified.
pub async fn classify_records(http_client: &HttpClient, records: &mut [EmailRecord]) {
    classify_records_with(http_client, records, cfg.ai_enabled()).await
}

async fn classify_records_with(http_client: &HttpClient, records: &mut [EmailRecord], ai_enabled: bool) {
    for record in records.iter_mut() {
        if ai_enabled {
            match prompt::send_classification_prompt(http_client, record).await {
                Ok(classification) => {
                    record.priority = classification.priority;
                    record.category = classification.category;
                    record.ai_classified = true;
                    continue;
                }
                Err(e) => {
                    tracing::warn!(
                        "LLM classification failed for {}, using rules: {e:?}",
                        record.id
                    );
                }
            }
        }

        record.priority = rules::classify_priority(&record.subject, &record.body);
        record.category = rules::classify_category(&record.subject, &record.sender);
        record.ai_classified = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::email::message::{Category, Priority};

    fn record(subject: &str, sender: &str, body: &str) -> EmailRecord {
        EmailRecord {
            id: "t1".to_string(),
            sender: sender.to_string(),
            subject: subject.to_string(),
            body: body.to_string(),
            snippet: body.to_string(),
            date: "2025-08-08".to_string(),
            time: "08:30".to_string(),
            to: "user@example.com".to_string(),
            cc: String::new(),
            priority: Priority::Medium,
            category: Category::General,
            ai_classified: false,
        }
    }

    #[tokio::test]
    async fn test_classify_records_rule_path() {
        let http_client = HttpClient::new();
        let mut records = vec![
            record("Urgent: interview slots for the open position", "jobs@acme.com", ""),
            record("Weekly newsletter", "digest@news.example.com", "unsubscribe"),
        ];

        classify_records_with(&http_client, &mut records, false).await;

        assert_eq!(records[0].priority, Priority::High);
        assert_eq!(records[0].category, Category::JobRelated);
        assert!(!records[0].ai_classified);
        assert_eq!(records[1].priority, Priority::Low);
        assert_eq!(records[1].category, Category::Newsletter);
    }
}
