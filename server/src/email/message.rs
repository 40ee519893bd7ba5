use anyhow::Context;
use chrono::{Local, TimeZone};
use google_gmail1::api::Message;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, EnumIter,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Priority {
    Critical,
    High,
    Medium,
    Low,
}

impl Priority {
    pub fn is_high_priority(&self) -> bool {
        matches!(self, Priority::Critical | Priority::High)
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, EnumIter,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Category {
    Academic,
    Security,
    JobRelated,
    MeetingRequest,
    Newsletter,
    General,
    Promotional,
    Personal,
    Work,
}

/// One triaged inbox entry. Built from a live Gmail message or by the demo
/// generator, read-only afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailRecord {
    pub id: String,
    pub sender: String,
    pub subject: String,
    pub body: String,
    pub snippet: String,
    pub date: String,
    pub time: String,
    pub to: String,
    pub cc: String,
    pub priority: Priority,
    pub category: Category,
    pub ai_classified: bool,
}

impl EmailRecord {
    /// Flatten a Gmail `format=full` message into a record. Headers are
    /// matched case-insensitively; `internalDate` (ms since epoch) becomes
    /// local date/time strings. Classification happens later in the
    /// pipeline, so records start out medium/general.
    pub fn from_gmail_message(msg: &Message) -> anyhow::Result<EmailRecord> {
        let id = msg.id.clone().context("Message has no id")?;

        let header = |name: &str| -> String {
            msg.payload
                .as_ref()
                .and_then(|p| p.headers.as_ref())
                .and_then(|headers| {
                    headers
                        .iter()
                        .find(|h| h.name.as_deref().is_some_and(|n| n.eq_ignore_ascii_case(name)))
                })
                .and_then(|h| h.value.clone())
                .unwrap_or_default()
        };

        let snippet = msg.snippet.clone().unwrap_or_default();
        let internal_date = msg.internal_date.unwrap_or_default();
        let (date, time) = format_internal_date(internal_date);

        Ok(EmailRecord {
            id,
            sender: header("From"),
            subject: header("Subject"),
            body: snippet.clone(),
            snippet,
            date,
            time,
            to: header("To"),
            cc: header("Cc"),
            priority: Priority::Medium,
            category: Category::General,
            ai_classified: false,
        })
    }
}

fn format_internal_date(millis: i64) -> (String, String) {
    match Local.timestamp_millis_opt(millis) {
        chrono::LocalResult::Single(dt) => (
            dt.format("%Y-%m-%d").to_string(),
            dt.format("%H:%M").to_string(),
        ),
        _ => (String::new(), String::new()),
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use google_gmail1::api::{MessagePart, MessagePartHeader};

    use super::*;

    fn gmail_message(headers: &[(&str, &str)]) -> Message {
        Message {
            id: Some("abc123".to_string()),
            snippet: Some("A short preview of the email".to_string()),
            internal_date: Some(1_754_642_400_000),
            payload: Some(MessagePart {
                headers: Some(
                    headers
                        .iter()
                        .map(|(name, value)| MessagePartHeader {
                            name: Some(name.to_string()),
                            value: Some(value.to_string()),
                        })
                        .collect(),
                ),
                ..Default::default()
            }),
            ..Default::default()
        }
    }

    #[test]
    fn test_from_gmail_message_extracts_headers() {
        let msg = gmail_message(&[
            ("From", "Professor Smith <prof.smith@charusat.edu.in>"),
            ("Subject", "Assignment Deadline Extended"),
            ("To", "class2024@charusat.edu.in"),
            ("Cc", "22dcs047@charusat.edu.in"),
        ]);

        let record = EmailRecord::from_gmail_message(&msg).unwrap();
        assert_eq!(record.id, "abc123");
        assert_eq!(record.sender, "Professor Smith <prof.smith@charusat.edu.in>");
        assert_eq!(record.subject, "Assignment Deadline Extended");
        assert_eq!(record.to, "class2024@charusat.edu.in");
        assert_eq!(record.cc, "22dcs047@charusat.edu.in");
        assert_eq!(record.body, record.snippet);
        assert!(!record.ai_classified);
    }

    #[test]
    fn test_header_lookup_is_case_insensitive() {
        let msg = gmail_message(&[("FROM", "someone@example.com"), ("subject", "hello")]);
        let record = EmailRecord::from_gmail_message(&msg).unwrap();
        assert_eq!(record.sender, "someone@example.com");
        assert_eq!(record.subject, "hello");
    }

    #[test]
    fn test_message_without_id_is_rejected() {
        let mut msg = gmail_message(&[]);
        msg.id = None;
        assert!(EmailRecord::from_gmail_message(&msg).is_err());
    }

    #[test]
    fn test_enum_string_forms() {
        assert_eq!(Priority::Critical.to_string(), "critical");
        assert_eq!(Category::JobRelated.to_string(), "job_related");
        assert_eq!(Category::from_str("meeting_request").unwrap(), Category::MeetingRequest);
        assert!(Category::from_str("nonsense").is_err());
    }
}
