use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use tracing_subscriber::EnvFilter;

use calbook::config::AppConfig;
use calbook::db;
use calbook::handlers;
use calbook::services::ai::extraction::LlmTextUnderstanding;
use calbook::services::ai::ollama::OllamaProvider;
use calbook::services::ai::openai::OpenAiProvider;
use calbook::services::ai::LlmProvider;
use calbook::services::booking::{BookingEngine, CalendarSettings};
use calbook::services::calendar::credentials::{
    CredentialProvider, FileTokenProvider, StaticTokenProvider,
};
use calbook::services::calendar::google::GoogleCalendarClient;
use calbook::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let config = AppConfig::from_env();
    let timezone = config.timezone()?;

    let conn = db::init_db(&config.database_url)?;

    let llm: Arc<dyn LlmProvider> = match config.llm_provider.as_str() {
        "ollama" => {
            tracing::info!(
                "using Ollama LLM provider (url: {}, model: {})",
                config.ollama_url,
                config.ollama_model
            );
            Arc::new(OllamaProvider::new(
                config.ollama_url.clone(),
                config.ollama_model.clone(),
                config.http_timeout(),
            )?)
        }
        _ => {
            anyhow::ensure!(
                !config.openai_api_key.is_empty(),
                "OPENAI_API_KEY must be set when LLM_PROVIDER=openai"
            );
            tracing::info!("using OpenAI LLM provider (model: {})", config.openai_model);
            Arc::new(OpenAiProvider::new(
                config.openai_api_key.clone(),
                config.openai_model.clone(),
                config.openai_base_url.clone(),
                config.http_timeout(),
            )?)
        }
    };

    let http = reqwest::Client::builder()
        .timeout(config.http_timeout())
        .build()?;

    let credentials: Arc<dyn CredentialProvider> = match &config.google_access_token {
        Some(token) => {
            tracing::info!("using static Google access token");
            Arc::new(StaticTokenProvider::new(token.clone()))
        }
        None => {
            tracing::info!("using Google token file {}", config.google_token_path);
            Arc::new(FileTokenProvider::new(
                PathBuf::from(&config.google_token_path),
                http.clone(),
            ))
        }
    };

    let calendar = Arc::new(GoogleCalendarClient::new(
        config.google_calendar_api.clone(),
        timezone,
        credentials,
        http,
    ));

    let engine = BookingEngine::new(
        Arc::new(LlmTextUnderstanding::new(llm)),
        calendar.clone(),
        calendar,
        CalendarSettings {
            calendar_id: config.calendar_id.clone(),
            timezone: config.calendar_timezone.clone(),
        },
    );

    let state = Arc::new(AppState {
        db: Arc::new(Mutex::new(conn)),
        config: config.clone(),
        engine,
        timezone,
    });

    let app = handlers::router(state);

    let addr = format!("0.0.0.0:{}", config.port);
    tracing::info!(
        "starting server on {addr} (calendar: {}, timezone: {})",
        config.calendar_id,
        config.calendar_timezone
    );

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
