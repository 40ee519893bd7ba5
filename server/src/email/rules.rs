use std::str::FromStr;

use crate::{
    email::message::{Category, Priority},
    server_config::{cfg, CategoryRule, ClassifierConfig},
};

/// Keyword-tier priority classification. Tiers are checked in a fixed order
/// (critical -> high -> medium -> low) against the lowercased subject and
/// body, first matching tier wins. No severity scoring.
pub fn classify_priority(subject: &str, body: &str) -> Priority {
    classify_priority_with(&cfg.classifier, subject, body)
}

fn classify_priority_with(classifier: &ClassifierConfig, subject: &str, body: &str) -> Priority {
    let haystack = format!("{} {}", subject.to_lowercase(), body.to_lowercase());
    let matches_tier = |keywords: &[String]| keywords.iter().any(|k| haystack.contains(k.as_str()));

    if matches_tier(&classifier.critical) {
        Priority::Critical
    } else if matches_tier(&classifier.high) {
        Priority::High
    } else if matches_tier(&classifier.medium) {
        Priority::Medium
    } else if matches_tier(&classifier.low) {
        Priority::Low
    } else {
        Priority::Medium
    }
}

/// Ordered category predicates over subject and sender, first match wins,
/// `general` fallback. Rules with an unrecognized category label are skipped.
pub fn classify_category(subject: &str, sender: &str) -> Category {
    classify_category_with(&cfg.categories, subject, sender)
}

fn classify_category_with(rules: &[CategoryRule], subject: &str, sender: &str) -> Category {
    let subject = subject.to_lowercase();
    let sender = sender.to_lowercase();

    for rule in rules {
        let Ok(category) = Category::from_str(&rule.category) else {
            tracing::warn!("Skipping rule with unknown category: {}", rule.category);
            continue;
        };

        let subject_hit = rule
            .subject_keywords
            .iter()
            .any(|k| subject.contains(&k.to_lowercase()));
        let sender_hit = rule
            .sender_keywords
            .iter()
            .any(|k| sender.contains(&k.to_lowercase()));

        if subject_hit || sender_hit {
            return category;
        }
    }

    Category::General
}

/// Automated traffic is dropped before triage: the user's own outgoing mail,
/// acknowledgement replies, and machine-generated notices.
pub fn is_automated(user_email: &str, sender: &str, subject: &str) -> bool {
    let sender = sender.to_lowercase();
    let subject = subject.to_lowercase();
    let user_email = user_email.to_lowercase();

    if !user_email.is_empty() && sender.contains(&user_email) {
        return true;
    }

    if subject.contains("acknowledged") && subject.contains("re:") {
        return true;
    }

    cfg.classifier
        .automated_phrases
        .iter()
        .any(|phrase| subject.contains(phrase.as_str()))
}

#[cfg(test)]
mod tests {
    use super::*;

    const USER: &str = "22dcs047@charusat.edu.in";

    #[test]
    fn test_urgent_keywords_are_high_priority() {
        for subject in ["URGENT: server down", "please reply asap", "deadline today"] {
            assert_eq!(classify_priority(subject, ""), Priority::High, "{subject}");
        }
    }

    #[test]
    fn test_critical_keywords_win_regardless_of_other_matches() {
        // both "urgent" (high) and "emergency" (critical) appear
        assert_eq!(
            classify_priority("Urgent: emergency maintenance tonight", ""),
            Priority::Critical
        );
        for subject in ["Emergency drill", "Critical patch", "Suspicious login"] {
            assert_eq!(classify_priority(subject, ""), Priority::Critical, "{subject}");
        }
    }

    #[test]
    fn test_priority_defaults_to_medium() {
        assert_eq!(classify_priority("Lunch plans", "want to grab food?"), Priority::Medium);
    }

    #[test]
    fn test_body_keywords_count_too() {
        assert_eq!(
            classify_priority("Status", "this expires today, act now"),
            Priority::High
        );
    }

    #[test]
    fn test_low_priority_bulk_mail() {
        assert_eq!(
            classify_priority("Your weekly newsletter", "unsubscribe below"),
            Priority::Low
        );
    }

    #[test]
    fn test_category_order_meeting_before_work() {
        // "meeting" and "project" both match; meeting_request is checked first
        assert_eq!(
            classify_category("Project meeting tomorrow", "pm@company.com"),
            Category::MeetingRequest
        );
    }

    #[test]
    fn test_category_from_sender() {
        assert_eq!(
            classify_category("Openings you may like", "jobs@alerts.jobot.com"),
            Category::JobRelated
        );
        assert_eq!(
            classify_category("Hello", "prof.smith@charusat.edu.in"),
            Category::Academic
        );
    }

    #[test]
    fn test_category_falls_back_to_general() {
        assert_eq!(
            classify_category("It's a Chess Bot BBQ", "hello@chess.com"),
            Category::General
        );
    }

    #[test]
    fn test_own_address_is_filtered() {
        assert!(is_automated(USER, USER, "anything"));
        assert!(is_automated(USER, &format!("Me <{USER}>"), "fwd: notes"));
    }

    #[test]
    fn test_acknowledged_reply_is_filtered() {
        assert!(is_automated(USER, "other@example.com", "Re: Acknowledged - your request"));
        // needs both markers
        assert!(!is_automated(USER, "other@example.com", "Acknowledged receipt"));
        assert!(!is_automated(USER, "other@example.com", "Re: your request"));
    }

    #[test]
    fn test_automated_phrases_are_filtered() {
        for subject in [
            "Automatic reply: vacation",
            "Out of office until Monday",
            "Delivery Status Notification (Failure)",
        ] {
            assert!(is_automated(USER, "other@example.com", subject), "{subject}");
        }
    }

    #[test]
    fn test_regular_mail_passes_the_filter() {
        assert!(!is_automated(USER, "friend@example.com", "Dinner on Friday?"));
    }

    #[test]
    fn test_empty_user_email_never_matches_sender() {
        assert!(!is_automated("", "friend@example.com", "Dinner on Friday?"));
    }
}
