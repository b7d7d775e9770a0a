pub mod credentials;
pub mod google;
pub mod ics;

use async_trait::async_trait;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// An existing event as reported by the calendar, times as the provider sent them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalendarEvent {
    pub id: String,
    pub summary: String,
    pub start: String,
    pub end: String,
}

/// Event to create. `start`/`end` are wall-clock times in `timezone`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewEvent {
    pub title: String,
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
    pub timezone: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatedEvent {
    pub id: String,
    /// Link (or id) the user can follow to the created event.
    pub reference: String,
}

#[derive(Debug, thiserror::Error)]
pub enum CalendarError {
    #[error("HTTP: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{0}")]
    Transport(String),

    #[error("calendar authentication failed: {0}")]
    Auth(String),

    #[error("calendar API error {status}: {message}")]
    Api { status: u16, message: String },

    #[error("invalid calendar URL: {0}")]
    InvalidUrl(String),

    #[error("{time} does not exist in timezone {timezone}")]
    InvalidLocalTime { time: String, timezone: String },

    #[error("JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO: {0}")]
    Io(#[from] std::io::Error),
}

/// Lists events intersecting `[start, end)`, start-time ascending, recurring
/// events expanded into single instances.
#[async_trait]
pub trait CalendarReader: Send + Sync {
    async fn list_events(
        &self,
        calendar_id: &str,
        start: NaiveDateTime,
        end: NaiveDateTime,
    ) -> Result<Vec<CalendarEvent>, CalendarError>;
}

#[async_trait]
pub trait CalendarWriter: Send + Sync {
    async fn create_event(
        &self,
        calendar_id: &str,
        event: &NewEvent,
    ) -> Result<CreatedEvent, CalendarError>;
}
