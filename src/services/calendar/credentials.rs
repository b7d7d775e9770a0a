//! Access-token sources for the calendar client.

use std::path::PathBuf;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use super::CalendarError;

#[async_trait]
pub trait CredentialProvider: Send + Sync {
    /// A bearer token valid for at least the next request.
    async fn access_token(&self) -> Result<String, CalendarError>;
}

/// A fixed token, e.g. one minted out of band for a test account.
pub struct StaticTokenProvider {
    token: String,
}

impl StaticTokenProvider {
    pub fn new(token: String) -> Self {
        Self { token }
    }
}

#[async_trait]
impl CredentialProvider for StaticTokenProvider {
    async fn access_token(&self) -> Result<String, CalendarError> {
        Ok(self.token.clone())
    }
}

/// Authorized-user token file as written by Google's client libraries.
/// Both `token` and `access_token` are accepted on read.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredToken {
    #[serde(alias = "access_token")]
    pub token: String,
    pub refresh_token: Option<String>,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
    pub client_id: String,
    #[serde(default)]
    pub client_secret: Option<String>,
    /// RFC 3339 expiry.
    #[serde(default)]
    pub expiry: Option<String>,
}

fn default_token_uri() -> String {
    "https://oauth2.googleapis.com/token".to_string()
}

/// Expired, unparseable or missing expiry all count as expired; so does
/// anything within a minute of expiring.
pub fn is_token_expired(token: &StoredToken, now: chrono::DateTime<chrono::Utc>) -> bool {
    let Some(expiry) = token.expiry.as_deref() else {
        return true;
    };
    match chrono::DateTime::parse_from_rfc3339(expiry) {
        Ok(expiry) => expiry <= now + chrono::Duration::seconds(60),
        Err(_) => true,
    }
}

/// Reads a token file, refreshing and rewriting it when it has expired.
///
/// The cached token lives behind a `tokio::sync::Mutex`, so concurrent
/// bookings trigger at most one refresh.
pub struct FileTokenProvider {
    path: PathBuf,
    client: reqwest::Client,
    cached: Mutex<Option<StoredToken>>,
}

impl FileTokenProvider {
    pub fn new(path: PathBuf, client: reqwest::Client) -> Self {
        Self {
            path,
            client,
            cached: Mutex::new(None),
        }
    }

    async fn load(&self) -> Result<StoredToken, CalendarError> {
        let content = tokio::fs::read_to_string(&self.path).await.map_err(|e| {
            CalendarError::Auth(format!("cannot read token file {}: {e}", self.path.display()))
        })?;
        Ok(serde_json::from_str(&content)?)
    }

    async fn save(&self, token: &StoredToken) -> Result<(), CalendarError> {
        let content = serde_json::to_string_pretty(token)?;
        tokio::fs::write(&self.path, content).await?;
        Ok(())
    }

    async fn refresh(&self, token: &StoredToken) -> Result<StoredToken, CalendarError> {
        let refresh_token = token
            .refresh_token
            .as_deref()
            .ok_or_else(|| {
                CalendarError::Auth("token expired and no refresh token is stored".into())
            })?;

        let mut form = vec![
            ("client_id", token.client_id.as_str()),
            ("refresh_token", refresh_token),
            ("grant_type", "refresh_token"),
        ];
        if let Some(secret) = token.client_secret.as_deref() {
            form.push(("client_secret", secret));
        }

        let resp = self
            .client
            .post(&token.token_uri)
            .form(&form)
            .send()
            .await
            .map_err(|e| CalendarError::Transport(e.to_string()))?;

        let status = resp.status();
        let body = resp.text().await.unwrap_or_default();
        if !status.is_success() {
            return Err(CalendarError::Auth(format!("token refresh failed ({status}): {body}")));
        }

        let body: serde_json::Value = serde_json::from_str(&body)?;
        let access_token = body["access_token"]
            .as_str()
            .ok_or_else(|| CalendarError::Auth("no access_token in refresh response".into()))?;
        let expires_in = body["expires_in"].as_i64().unwrap_or(3600);
        let expiry = chrono::Utc::now() + chrono::Duration::seconds(expires_in);

        let mut refreshed = token.clone();
        refreshed.token = access_token.to_string();
        refreshed.expiry = Some(expiry.to_rfc3339());
        Ok(refreshed)
    }
}

#[async_trait]
impl CredentialProvider for FileTokenProvider {
    async fn access_token(&self) -> Result<String, CalendarError> {
        let mut cached = self.cached.lock().await;

        let current = match cached.take() {
            Some(token) => token,
            None => self.load().await?,
        };

        if !is_token_expired(&current, chrono::Utc::now()) {
            let access = current.token.clone();
            *cached = Some(current);
            return Ok(access);
        }

        tracing::info!(path = %self.path.display(), "refreshing expired calendar token");
        let refreshed = match self.refresh(&current).await {
            Ok(token) => token,
            Err(e) => {
                *cached = Some(current);
                return Err(e);
            }
        };
        if let Err(e) = self.save(&refreshed).await {
            tracing::warn!(error = %e, "failed to persist refreshed token");
        }

        let access = refreshed.token.clone();
        *cached = Some(refreshed);
        Ok(access)
    }
}
