use std::env;
use std::time::Duration;

use chrono_tz::Tz;

use crate::services::calendar::google::DEFAULT_API_BASE;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub port: u16,
    pub database_url: String,
    /// Bearer token for `/api/*`. Empty disables the check.
    pub api_token: String,
    pub llm_provider: String,
    pub openai_api_key: String,
    pub openai_model: String,
    pub openai_base_url: String,
    pub ollama_url: String,
    pub ollama_model: String,
    pub google_token_path: String,
    pub google_access_token: Option<String>,
    pub google_calendar_api: String,
    pub calendar_id: String,
    pub calendar_timezone: String,
    pub http_timeout_secs: u64,
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self {
            port: env::var("PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(3000),
            database_url: env::var("DATABASE_URL").unwrap_or_else(|_| "calbook.db".to_string()),
            api_token: env::var("API_TOKEN").unwrap_or_default(),
            llm_provider: env::var("LLM_PROVIDER").unwrap_or_else(|_| "openai".to_string()),
            openai_api_key: env::var("OPENAI_API_KEY").unwrap_or_default(),
            openai_model: env::var("OPENAI_MODEL").unwrap_or_else(|_| "gpt-4o".to_string()),
            openai_base_url: env::var("OPENAI_BASE_URL")
                .unwrap_or_else(|_| "https://api.openai.com/v1".to_string()),
            ollama_url: env::var("OLLAMA_URL")
                .unwrap_or_else(|_| "http://localhost:11434".to_string()),
            ollama_model: env::var("OLLAMA_MODEL").unwrap_or_else(|_| "llama3.2".to_string()),
            google_token_path: env::var("GOOGLE_TOKEN_PATH")
                .unwrap_or_else(|_| "token.json".to_string()),
            google_access_token: env::var("GOOGLE_ACCESS_TOKEN")
                .ok()
                .filter(|t| !t.is_empty()),
            google_calendar_api: env::var("GOOGLE_CALENDAR_API")
                .unwrap_or_else(|_| DEFAULT_API_BASE.to_string()),
            calendar_id: env::var("GOOGLE_CALENDAR_ID").unwrap_or_else(|_| "primary".to_string()),
            calendar_timezone: env::var("CALENDAR_TIMEZONE").unwrap_or_else(|_| "UTC".to_string()),
            http_timeout_secs: env::var("HTTP_TIMEOUT_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(30),
        }
    }

    pub fn timezone(&self) -> Result<Tz, crate::errors::AppError> {
        self.calendar_timezone.parse::<Tz>().map_err(|e| {
            crate::errors::AppError::Config(format!(
                "CALENDAR_TIMEZONE {:?} is not an IANA timezone: {e}",
                self.calendar_timezone
            ))
        })
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }
}
