use std::path::{Path, PathBuf};

use anyhow::Context;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::{server_config::cfg, HttpClient};

const EXPIRY_MARGIN_SECS: i64 = 30;

/// Stored OAuth state, compatible with the `token.json` layout the Google
/// client libraries write: last access token plus the long-lived refresh
/// token and client credentials.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredToken {
    #[serde(default)]
    pub token: Option<String>,
    pub refresh_token: String,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
    #[serde(default)]
    pub client_id: String,
    #[serde(default)]
    pub client_secret: String,
    #[serde(default)]
    pub scopes: Vec<String>,
    #[serde(default)]
    pub expiry: Option<DateTime<Utc>>,
}

fn default_token_uri() -> String {
    "https://oauth2.googleapis.com/token".to_string()
}

/// `credentials.json` as downloaded from the Google console.
#[derive(Debug, Deserialize)]
struct InstalledCredentials {
    installed: ClientCredentials,
}

#[derive(Debug, Deserialize)]
struct ClientCredentials {
    client_id: String,
    client_secret: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct GmailApiRefreshTokenResponse {
    pub access_token: String,
    pub token_type: String,
    pub expires_in: u64,
    #[serde(default)]
    pub scope: String,
}

pub fn check_expired(expiry: Option<DateTime<Utc>>) -> bool {
    let Some(expiry) = expiry else {
        return true;
    };
    let now_with_margin = Utc::now() + Duration::seconds(EXPIRY_MARGIN_SECS);
    now_with_margin > expiry
}

/// Loads token state from disk and hands out a usable access token,
/// refreshing through the token endpoint when the cached one is stale.
pub struct GmailAuthorizer {
    http_client: HttpClient,
    token_path: PathBuf,
    token: StoredToken,
}

impl GmailAuthorizer {
    pub fn from_files(http_client: HttpClient) -> anyhow::Result<Self> {
        Self::from_paths(http_client, &cfg.token_path, &cfg.credentials_path)
    }

    pub fn from_paths(
        http_client: HttpClient,
        token_path: impl AsRef<Path>,
        credentials_path: impl AsRef<Path>,
    ) -> anyhow::Result<Self> {
        let token_path = token_path.as_ref().to_path_buf();
        let raw = std::fs::read_to_string(&token_path)
            .with_context(|| format!("Could not read token file {}", token_path.display()))?;
        let mut token: StoredToken =
            serde_json::from_str(&raw).context("Could not parse token file")?;

        // Older token files omit client credentials; pick them up from
        // credentials.json when present.
        if token.client_id.is_empty() || token.client_secret.is_empty() {
            let raw = std::fs::read_to_string(credentials_path.as_ref())
                .context("Token file lacks client credentials and credentials.json is missing")?;
            let creds: InstalledCredentials =
                serde_json::from_str(&raw).context("Could not parse credentials.json")?;
            token.client_id = creds.installed.client_id;
            token.client_secret = creds.installed.client_secret;
        }

        Ok(GmailAuthorizer {
            http_client,
            token_path,
            token,
        })
    }

    pub async fn access_token(&mut self) -> anyhow::Result<String> {
        if let Some(token) = &self.token.token {
            if !check_expired(self.token.expiry) {
                return Ok(token.clone());
            }
        }
        self.refresh().await
    }

    async fn refresh(&mut self) -> anyhow::Result<String> {
        tracing::info!("Refreshing Gmail access token");
        let resp = self
            .http_client
            .post(&self.token.token_uri)
            .form(&[
                ("client_id", self.token.client_id.as_str()),
                ("client_secret", self.token.client_secret.as_str()),
                ("refresh_token", self.token.refresh_token.as_str()),
                ("grant_type", "refresh_token"),
            ])
            .send()
            .await?;

        if !resp.status().is_success() {
            let body = resp.text().await.unwrap_or_default();
            anyhow::bail!("Token refresh failed: {body}");
        }

        let refreshed = resp
            .json::<GmailApiRefreshTokenResponse>()
            .await
            .context("Could not parse token refresh response")?;

        self.token.token = Some(refreshed.access_token.clone());
        self.token.expiry = Some(Utc::now() + Duration::seconds(refreshed.expires_in as i64));
        self.persist();

        Ok(refreshed.access_token)
    }

    fn persist(&self) {
        match serde_json::to_string_pretty(&self.token) {
            Ok(json) => {
                if let Err(e) = std::fs::write(&self.token_path, json) {
                    tracing::warn!("Could not persist refreshed token: {e}");
                }
            }
            Err(e) => tracing::warn!("Could not serialize token state: {e}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_expired_respects_margin() {
        assert!(check_expired(None));
        assert!(check_expired(Some(Utc::now() - Duration::minutes(5))));
        // inside the 30s margin counts as expired
        assert!(check_expired(Some(Utc::now() + Duration::seconds(10))));
        assert!(!check_expired(Some(Utc::now() + Duration::minutes(10))));
    }

    #[test]
    fn test_stored_token_parses_google_layout() {
        let json = r#"{
            "token": "ya29.a0...",
            "refresh_token": "1//0e...",
            "token_uri": "https://oauth2.googleapis.com/token",
            "client_id": "abc.apps.googleusercontent.com",
            "client_secret": "shhh",
            "scopes": ["https://www.googleapis.com/auth/gmail.readonly"],
            "expiry": "2025-08-08T12:00:00Z"
        }"#;
        let token: StoredToken = serde_json::from_str(json).unwrap();
        assert_eq!(token.token.as_deref(), Some("ya29.a0..."));
        assert_eq!(token.client_id, "abc.apps.googleusercontent.com");
        assert!(token.expiry.is_some());
    }

    #[test]
    fn test_credentials_fill_in_missing_client_fields() {
        let dir = tempfile::tempdir().unwrap();
        let token_path = dir.path().join("token.json");
        let creds_path = dir.path().join("credentials.json");
        std::fs::write(&token_path, r#"{"refresh_token": "1//0e..."}"#).unwrap();
        std::fs::write(
            &creds_path,
            r#"{"installed": {"client_id": "id", "client_secret": "secret"}}"#,
        )
        .unwrap();

        let authorizer =
            GmailAuthorizer::from_paths(HttpClient::new(), &token_path, &creds_path).unwrap();
        assert_eq!(authorizer.token.client_id, "id");
        assert_eq!(authorizer.token.client_secret, "secret");
        assert!(authorizer.token.token.is_none());
    }

    #[test]
    fn test_missing_token_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = GmailAuthorizer::from_paths(
            HttpClient::new(),
            dir.path().join("nope.json"),
            dir.path().join("nope2.json"),
        );
        assert!(result.is_err());
    }
}
