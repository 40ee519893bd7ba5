use config::Config;
use lazy_static::lazy_static;
use serde::Deserialize;
use std::{env, path::Path};

/// Ordered keyword tiers for the rule-based priority classifier.
/// Tiers are checked critical -> high -> medium -> low, first match wins.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ClassifierConfig {
    pub critical: Vec<String>,
    pub high: Vec<String>,
    pub medium: Vec<String>,
    pub low: Vec<String>,
    pub automated_phrases: Vec<String>,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        fn owned(words: &[&str]) -> Vec<String> {
            words.iter().map(|w| w.to_string()).collect()
        }

        ClassifierConfig {
            critical: owned(&[
                "emergency",
                "critical",
                "suspicious",
                "security alert",
                "account compromised",
                "immediate action",
            ]),
            high: owned(&[
                "urgent",
                "asap",
                "deadline today",
                "important",
                "action required",
                "expires today",
                "final notice",
            ]),
            medium: owned(&[
                "meeting",
                "review",
                "feedback",
                "reminder",
                "follow up",
                "scheduled",
            ]),
            low: owned(&[
                "newsletter",
                "unsubscribe",
                "promotion",
                "sale",
                "digest",
                "no-reply",
            ]),
            automated_phrases: owned(&[
                "do not reply",
                "auto-reply",
                "automatic reply",
                "out of office",
                "delivery status notification",
                "mail delivery failed",
                "read receipt",
            ]),
        }
    }
}

/// One entry of the ordered category rule list. `category` must parse into
/// a known category label; unknown labels fall through to `general`.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct CategoryRule {
    pub category: String,
    #[serde(default)]
    pub subject_keywords: Vec<String>,
    #[serde(default)]
    pub sender_keywords: Vec<String>,
}

fn default_category_rules() -> Vec<CategoryRule> {
    fn rule(category: &str, subject: &[&str], sender: &[&str]) -> CategoryRule {
        CategoryRule {
            category: category.to_string(),
            subject_keywords: subject.iter().map(|s| s.to_string()).collect(),
            sender_keywords: sender.iter().map(|s| s.to_string()).collect(),
        }
    }

    vec![
        rule(
            "meeting_request",
            &["meeting", "schedule", "calendar", "invite", "appointment"],
            &["calendar"],
        ),
        rule(
            "job_related",
            &["job", "position", "interview", "opening", "hiring", "career"],
            &["jobs@", "careers@", "recruiting"],
        ),
        rule(
            "academic",
            &[
                "assignment",
                "exam",
                "lecture",
                "course",
                "semester",
                "professor",
            ],
            &[".edu", "university", "college"],
        ),
        rule(
            "security",
            &[
                "password",
                "sign-in",
                "login attempt",
                "verification code",
                "2fa",
            ],
            &["security@", "no-reply@accounts"],
        ),
        rule(
            "newsletter",
            &["newsletter", "digest", "weekly update", "roundup"],
            &["newsletter@", "digest@", "medium.com", "substack.com"],
        ),
        rule(
            "promotional",
            &["sale", "discount", "offer", "deal", "% off", "coupon"],
            &["marketing@", "promo@", "offers@"],
        ),
        rule("personal", &[], &["gmail.com", "yahoo.com", "outlook.com"]),
        rule(
            "work",
            &["project", "sprint", "standup", "report", "client"],
            &[],
        ),
    ]
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    pub id: String,
    pub endpoint: String,
    pub temperature: f64,
    pub max_tokens: u32,
}

impl Default for ModelConfig {
    fn default() -> Self {
        ModelConfig {
            id: "gpt-4o-mini".to_string(),
            endpoint: "https://api.openai.com/v1/chat/completions".to_string(),
            temperature: 0.2,
            max_tokens: 300,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    pub max_results: u32,
    pub lookback_hours: i64,
    pub refresh_interval_secs: u64,
}

impl Default for FetchConfig {
    fn default() -> Self {
        FetchConfig {
            max_results: 25,
            lookback_hours: 24,
            refresh_interval_secs: 300,
        }
    }
}

/// Response-timeframe strings interpolated into auto-reply drafts,
/// looked up by category label.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ReplyConfig {
    pub timeframes: Vec<(String, String)>,
    pub default_timeframe: String,
    pub signature: String,
}

impl Default for ReplyConfig {
    fn default() -> Self {
        fn pair(category: &str, timeframe: &str) -> (String, String) {
            (category.to_string(), timeframe.to_string())
        }

        ReplyConfig {
            timeframes: vec![
                pair("security", "immediately"),
                pair("meeting_request", "within 4 hours"),
                pair("job_related", "within 1 business day"),
                pair("academic", "within 1 business day"),
                pair("work", "within 24 hours"),
            ],
            default_timeframe: "within 24-48 hours".to_string(),
            signature: "Best regards".to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct ConfigFile {
    user_email: Option<String>,
    classifier: ClassifierConfig,
    categories: Vec<CategoryRule>,
    model: ModelConfig,
    fetch: FetchConfig,
    reply: ReplyConfig,
    token_path: String,
    credentials_path: String,
}

impl Default for ConfigFile {
    fn default() -> Self {
        ConfigFile {
            user_email: None,
            classifier: ClassifierConfig::default(),
            categories: default_category_rules(),
            model: ModelConfig::default(),
            fetch: FetchConfig::default(),
            reply: ReplyConfig::default(),
            token_path: "token.json".to_string(),
            credentials_path: "credentials.json".to_string(),
        }
    }
}

#[derive(Debug)]
pub struct ServerConfig {
    pub user_email: String,
    pub classifier: ClassifierConfig,
    pub categories: Vec<CategoryRule>,
    pub model: ModelConfig,
    pub fetch: FetchConfig,
    pub reply: ReplyConfig,
    pub token_path: String,
    pub credentials_path: String,
    pub api_key: Option<String>,
}

impl ServerConfig {
    pub fn ai_enabled(&self) -> bool {
        self.api_key.is_some()
    }
}

impl std::fmt::Display for ServerConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Server Config:\nUser: {}\n\nModel: {:?}\n\nFetch: {:?}\n\nCategories:\n{}\n\nAI enabled: {}",
            self.user_email,
            self.model,
            self.fetch,
            self.categories
                .iter()
                .map(|c| format!(
                    "{} <- subject {:?} sender {:?}",
                    c.category, c.subject_keywords, c.sender_keywords
                ))
                .collect::<Vec<_>>()
                .join("\n"),
            self.ai_enabled(),
        )
    }
}

fn config_file_path() -> String {
    let root = env::var("APP_DIR").unwrap_or_else(|_| {
        let dir = env!("CARGO_MANIFEST_DIR");
        let dir = Path::new(&dir)
            .parent()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| dir.to_string());
        format!("{}/config", dir)
    });
    format!("{root}/config.toml")
}

fn load_config() -> ServerConfig {
    let path = config_file_path();
    let cfg_file: ConfigFile = Config::builder()
        .add_source(config::File::with_name(&path).required(false))
        .build()
        .and_then(|c| c.try_deserialize())
        .unwrap_or_else(|e| {
            tracing::warn!("Could not load {path}, using built-in defaults: {e}");
            ConfigFile::default()
        });

    let ConfigFile {
        user_email,
        classifier,
        categories,
        model,
        fetch,
        reply,
        token_path,
        credentials_path,
    } = cfg_file;

    let user_email = env::var("GMAIL_USER_EMAIL")
        .ok()
        .or(user_email)
        .unwrap_or_default();

    ServerConfig {
        user_email,
        classifier,
        categories,
        model,
        fetch,
        reply,
        token_path,
        credentials_path,
        api_key: env::var("OPENAI_API_KEY").ok().filter(|k| !k.is_empty()),
    }
}

lazy_static! {
    pub static ref cfg: ServerConfig = load_config();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_classifier_tiers_are_populated() {
        let classifier = ClassifierConfig::default();
        assert!(classifier.critical.contains(&"emergency".to_string()));
        assert!(classifier.high.contains(&"urgent".to_string()));
        assert!(classifier.medium.contains(&"meeting".to_string()));
        assert!(classifier.low.contains(&"newsletter".to_string()));
    }

    #[test]
    fn test_default_category_order_starts_with_meeting() {
        let categories = default_category_rules();
        assert_eq!(categories[0].category, "meeting_request");
        assert_eq!(categories[1].category, "job_related");
    }

    #[test]
    fn test_config_file_overrides_deserialize() {
        let toml = r#"
            user_email = "me@example.com"

            [model]
            id = "gpt-3.5-turbo"
        "#;
        let cfg_file: ConfigFile = Config::builder()
            .add_source(config::File::from_str(toml, config::FileFormat::Toml))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();

        assert_eq!(cfg_file.user_email.as_deref(), Some("me@example.com"));
        assert_eq!(cfg_file.model.id, "gpt-3.5-turbo");
        // untouched sections keep defaults
        assert_eq!(cfg_file.fetch.lookback_hours, 24);
        assert!(!cfg_file.classifier.critical.is_empty());
    }
}
