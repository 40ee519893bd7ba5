use chrono::{DateTime, Duration, Local};

use crate::email::message::{Category, EmailRecord, Priority};

/// Fixed sample inbox used whenever Gmail connectivity is unavailable.
/// Offsets are relative to the passed `now`, so two calls within the same
/// second produce identical date/time fields.
pub fn sample_emails(user_email: &str, now: DateTime<Local>) -> Vec<EmailRecord> {
    let stamp = |offset: Duration| {
        let dt = now - offset;
        (
            dt.format("%Y-%m-%d").to_string(),
            dt.format("%H:%M").to_string(),
        )
    };

    let record = |id: &str,
                  sender: &str,
                  subject: &str,
                  snippet: &str,
                  offset: Duration,
                  to: &str,
                  cc: &str,
                  priority: Priority,
                  category: Category| {
        let (date, time) = stamp(offset);
        EmailRecord {
            id: id.to_string(),
            sender: sender.to_string(),
            subject: subject.to_string(),
            body: snippet.to_string(),
            snippet: snippet.to_string(),
            date,
            time,
            to: to.to_string(),
            cc: cc.to_string(),
            priority,
            category,
            ai_classified: false,
        }
    };

    vec![
        record(
            "demo-1",
            "IT Security <security@accounts.example.com>",
            "Suspicious sign-in attempt blocked",
            "We blocked a sign-in attempt from an unrecognized device. Review this activity immediately.",
            Duration::minutes(30),
            user_email,
            "",
            Priority::Critical,
            Category::Security,
        ),
        record(
            "demo-2",
            "Kaggle <no-reply@kaggle.com>",
            "Competition Launch: Open Model Red-Teaming Challenge",
            "Join the red-teaming challenge and discover new vulnerabilities in a newly released model.",
            Duration::minutes(15),
            user_email,
            "",
            Priority::High,
            Category::Academic,
        ),
        record(
            "demo-3",
            "\"Chess.com\" <hello@chess.com>",
            "It's a Chess Bot BBQ - Grab a Fork & Skewer!",
            "Hungry for a new chess challenge? Join our latest tournament and test your skills against our bots.",
            Duration::hours(2),
            user_email,
            "",
            Priority::Medium,
            Category::General,
        ),
        record(
            "demo-4",
            "Medium Daily Digest <noreply@medium.com>",
            "10 Python Libraries So Reliable, I Stopped Debugging My Scripts",
            "Today's highlights picked for you from across Medium.",
            Duration::hours(3),
            user_email,
            "",
            Priority::Low,
            Category::Newsletter,
        ),
        record(
            "demo-5",
            "Professor Smith <prof.smith@charusat.edu.in>",
            "Important: Assignment Deadline Extended",
            "The deadline for the final project has been extended to next Friday due to technical issues.",
            Duration::hours(1),
            "class2024@charusat.edu.in",
            &format!("{user_email}, other.student@charusat.edu.in"),
            Priority::High,
            Category::Academic,
        ),
        record(
            "demo-6",
            "Acme Recruiting <jobs@acme.example.com>",
            "Interview availability for the backend position",
            "Thanks for applying. Could you share your availability for a 45 minute interview this week?",
            Duration::hours(5),
            user_email,
            "",
            Priority::High,
            Category::JobRelated,
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    const USER: &str = "22dcs047@charusat.edu.in";

    #[test]
    fn test_offsets_are_stable_for_the_same_instant() {
        let now = Local::now();
        let a = sample_emails(USER, now);
        let b = sample_emails(USER, now);

        for (x, y) in a.iter().zip(b.iter()) {
            assert_eq!(x.date, y.date);
            assert_eq!(x.time, y.time);
        }

        // first two records sit 30 and 15 minutes before now
        let expect = |offset: i64| (now - Duration::minutes(offset)).format("%H:%M").to_string();
        assert_eq!(a[0].time, expect(30));
        assert_eq!(a[1].time, expect(15));
    }

    #[test]
    fn test_sample_set_includes_a_cc_only_record() {
        let emails = sample_emails(USER, Local::now());
        let cc_only = emails
            .iter()
            .find(|e| !e.to.contains(USER) && e.cc.contains(USER));
        assert!(cc_only.is_some());
    }

    #[test]
    fn test_sample_set_spans_priorities() {
        let emails = sample_emails(USER, Local::now());
        for priority in [
            Priority::Critical,
            Priority::High,
            Priority::Medium,
            Priority::Low,
        ] {
            assert!(
                emails.iter().any(|e| e.priority == priority),
                "missing {priority}"
            );
        }
    }
}
