use anyhow::Context;
use base64::{engine::general_purpose::URL_SAFE, Engine as _};
use indoc::indoc;
use lettre::message::{Mailbox, MultiPart};
use minijinja::render;
use serde::Serialize;

use crate::{
    email::{client::EmailClient, message::EmailRecord},
    error::AppResult,
    prompt,
    server_config::cfg,
    triage::{self, InboxSnapshot},
    ServerState,
};

const REPLY_EMAIL_TEMPLATE: &str = indoc! {r#"
    <html>
      <body style="font-family: sans-serif; color: #222;">
        <p>Hi {{ sender_name }},</p>
        <p>
          Thank you for your email regarding <b>"{{ subject }}"</b>.
          I've received your message and will get back to you {{ timeframe }}.
        </p>
        <p>{{ signature }}</p>
      </body>
    </html>
"#};

#[derive(Debug, Serialize)]
pub struct DraftOutcome {
    pub status: String,
    pub drafts_created: usize,
    pub failed: usize,
    pub high_priority_emails: usize,
    pub message: String,
}

/// Expected-response timeframe for a category, falling back to the default.
fn reply_timeframe(category_label: &str) -> &'static str {
    cfg.reply
        .timeframes
        .iter()
        .find(|(category, _)| category == category_label)
        .map(|(_, timeframe)| timeframe.as_str())
        .unwrap_or(cfg.reply.default_timeframe.as_str())
}

fn reply_subject(original: &str) -> String {
    if original.to_lowercase().starts_with("re:") {
        original.to_string()
    } else {
        format!("Re: {original}")
    }
}

/// Display name from a From header, "there" when it is a bare address.
fn sender_display_name(sender: &str) -> String {
    let name = match sender.split_once('<') {
        Some((name, _)) => name.trim().trim_matches('"').trim(),
        None => "",
    };
    if name.is_empty() {
        "there".to_string()
    } else {
        name.to_string()
    }
}

fn canned_reply_body(email: &EmailRecord, timeframe: &str) -> String {
    format!(
        "Hi {},\n\nThank you for your email regarding \"{}\". I've received your message and will get back to you {}.\n\n{}",
        sender_display_name(&email.sender),
        email.subject,
        timeframe,
        cfg.reply.signature,
    )
}

/// Build the base64url-encoded RFC 2822 reply that `drafts.create` expects.
pub fn build_reply_mime(
    user_email: &str,
    email: &EmailRecord,
    timeframe: &str,
    plain_body: &str,
) -> anyhow::Result<String> {
    let sender_name = sender_display_name(&email.sender);
    let html = render!(
        REPLY_EMAIL_TEMPLATE,
        sender_name,
        subject => &email.subject,
        timeframe,
        signature => &cfg.reply.signature,
    );

    let to: Mailbox = email
        .sender
        .parse()
        .with_context(|| format!("Could not parse reply-to address: {}", email.sender))?;
    let message = lettre::Message::builder()
        .to(to)
        .from(
            format!("<{user_email}>")
                .parse()
                .context("Could not parse own address in reply builder")?,
        )
        .subject(reply_subject(&email.subject))
        .multipart(MultiPart::alternative_plain_html(
            plain_body.to_string(),
            html,
        ))?;

    Ok(URL_SAFE.encode(message.formatted()))
}

/// Create reply drafts for every high-priority direct email in the snapshot.
/// In demo mode no Gmail call is made; the outcome just reports how many
/// drafts a live run would create. Per-email failures are counted, never
/// fatal.
pub async fn create_reply_drafts(
    state: &ServerState,
    snapshot: &InboxSnapshot,
) -> AppResult<DraftOutcome> {
    let candidates: Vec<&EmailRecord> = snapshot
        .direct_emails
        .iter()
        .filter(|email| email.priority.is_high_priority())
        .collect();

    if snapshot.demo_mode {
        return Ok(DraftOutcome {
            status: "demo".to_string(),
            drafts_created: 0,
            failed: 0,
            high_priority_emails: candidates.len(),
            message: format!(
                "Demo mode: {} high priority emails would receive reply drafts",
                candidates.len()
            ),
        });
    }

    let client = triage::live_client(state).await?;
    let mut created = 0;
    let mut failed = 0;

    for email in &candidates {
        match create_one_draft(state, &client, email).await {
            Ok(_) => created += 1,
            Err(e) => {
                failed += 1;
                tracing::warn!("Could not create draft for {}: {e:?}", email.id);
            }
        }
    }

    tracing::info!("Created {created} reply drafts ({failed} failed)");
    Ok(DraftOutcome {
        status: "success".to_string(),
        drafts_created: created,
        failed,
        high_priority_emails: candidates.len(),
        message: format!("Created {created} reply drafts for high priority emails"),
    })
}

async fn create_one_draft(
    state: &ServerState,
    client: &EmailClient,
    email: &EmailRecord,
) -> anyhow::Result<()> {
    let timeframe = reply_timeframe(&email.category.to_string());

    let plain_body = if cfg.ai_enabled() {
        match prompt::generate_reply_body(&state.http_client, email, timeframe).await {
            Ok(body) => body,
            Err(e) => {
                tracing::warn!("Reply generation failed for {}, using template: {e:?}", email.id);
                canned_reply_body(email, timeframe)
            }
        }
    } else {
        canned_reply_body(email, timeframe)
    };

    let raw = build_reply_mime(&client.email_address, email, timeframe, &plain_body)?;
    client.create_draft(&raw).await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::email::message::{Category, Priority};

    fn record(sender: &str, subject: &str) -> EmailRecord {
        EmailRecord {
            id: "d1".to_string(),
            sender: sender.to_string(),
            subject: subject.to_string(),
            body: "body".to_string(),
            snippet: "body".to_string(),
            date: "2025-08-08".to_string(),
            time: "08:30".to_string(),
            to: "22dcs047@charusat.edu.in".to_string(),
            cc: String::new(),
            priority: Priority::High,
            category: Category::Security,
            ai_classified: false,
        }
    }

    #[test]
    fn test_reply_subject_prefixes_once() {
        assert_eq!(reply_subject("Deadline today"), "Re: Deadline today");
        assert_eq!(reply_subject("Re: Deadline today"), "Re: Deadline today");
        assert_eq!(reply_subject("RE: Deadline today"), "RE: Deadline today");
    }

    #[test]
    fn test_timeframe_lookup_with_default() {
        assert_eq!(reply_timeframe("security"), "immediately");
        assert_eq!(reply_timeframe("meeting_request"), "within 4 hours");
        assert_eq!(reply_timeframe("general"), "within 24-48 hours");
    }

    #[test]
    fn test_sender_display_name() {
        assert_eq!(
            sender_display_name("Professor Smith <prof.smith@charusat.edu.in>"),
            "Professor Smith"
        );
        assert_eq!(
            sender_display_name("\"Chess.com\" <hello@chess.com>"),
            "Chess.com"
        );
        assert_eq!(sender_display_name("hello@chess.com"), "there");
    }

    #[test]
    fn test_build_reply_mime_is_base64url_rfc2822() {
        let email = record("IT Security <security@accounts.example.com>", "Account alert");
        let raw = build_reply_mime(
            "22dcs047@charusat.edu.in",
            &email,
            "immediately",
            &canned_reply_body(&email, "immediately"),
        )
        .unwrap();

        assert!(!raw.contains('+'));
        assert!(!raw.contains('/'));

        let decoded = String::from_utf8(URL_SAFE.decode(&raw).unwrap()).unwrap();
        assert!(decoded.contains("Subject: Re: Account alert"));
        assert!(decoded.contains("To: \"IT Security\" <security@accounts.example.com>")
            || decoded.contains("To: IT Security <security@accounts.example.com>"));
        assert!(decoded.contains("immediately"));
        assert!(decoded.contains("multipart/alternative"));
    }
}
