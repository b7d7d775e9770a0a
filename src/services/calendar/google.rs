//! Google Calendar API v3 client: `events.list` for conflict checks and
//! `events.insert` for bookings.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{NaiveDateTime, TimeZone};
use chrono_tz::Tz;
use serde::Deserialize;
use serde_json::json;

use super::credentials::CredentialProvider;
use super::{CalendarError, CalendarEvent, CalendarReader, CalendarWriter, CreatedEvent, NewEvent};
use crate::models::format_timestamp;

pub const DEFAULT_API_BASE: &str = "https://www.googleapis.com/calendar/v3";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EventsPage {
    #[serde(default)]
    items: Vec<GoogleEventRaw>,
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GoogleEventRaw {
    #[serde(default)]
    id: String,
    #[serde(default)]
    summary: Option<String>,
    start: Option<EventDateTime>,
    end: Option<EventDateTime>,
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    html_link: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EventDateTime {
    date_time: Option<String>,
    date: Option<String>,
}

impl EventDateTime {
    fn as_string(&self) -> String {
        self.date_time
            .as_deref()
            .or(self.date.as_deref())
            .unwrap_or("")
            .to_string()
    }
}

pub struct GoogleCalendarClient {
    base_url: String,
    timezone: Tz,
    credentials: Arc<dyn CredentialProvider>,
    client: reqwest::Client,
}

impl GoogleCalendarClient {
    pub fn new(
        base_url: String,
        timezone: Tz,
        credentials: Arc<dyn CredentialProvider>,
        client: reqwest::Client,
    ) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            timezone,
            credentials,
            client,
        }
    }

    fn events_url(&self, calendar_id: &str) -> Result<reqwest::Url, CalendarError> {
        let mut url = reqwest::Url::parse(&self.base_url)
            .map_err(|e| CalendarError::InvalidUrl(format!("{}: {e}", self.base_url)))?;
        url.path_segments_mut()
            .map_err(|_| CalendarError::InvalidUrl(self.base_url.clone()))?
            .extend(["calendars", calendar_id, "events"]);
        Ok(url)
    }

    /// RFC 3339 instant for a wall-clock time in the calendar's zone. On a DST
    /// fold the earlier instant wins; a time inside a DST gap is an error.
    fn to_rfc3339(&self, dt: NaiveDateTime) -> Result<String, CalendarError> {
        self.timezone
            .from_local_datetime(&dt)
            .earliest()
            .map(|t| t.to_rfc3339())
            .ok_or_else(|| CalendarError::InvalidLocalTime {
                time: format_timestamp(&dt),
                timezone: self.timezone.name().to_string(),
            })
    }

    async fn error_from_response(resp: reqwest::Response) -> CalendarError {
        let status = resp.status();
        let body = resp.text().await.unwrap_or_default();
        if status == reqwest::StatusCode::UNAUTHORIZED {
            CalendarError::Auth(body)
        } else {
            CalendarError::Api {
                status: status.as_u16(),
                message: body,
            }
        }
    }
}

fn transport(e: reqwest::Error) -> CalendarError {
    CalendarError::Transport(e.to_string())
}

#[async_trait]
impl CalendarReader for GoogleCalendarClient {
    async fn list_events(
        &self,
        calendar_id: &str,
        start: NaiveDateTime,
        end: NaiveDateTime,
    ) -> Result<Vec<CalendarEvent>, CalendarError> {
        let url = self.events_url(calendar_id)?;
        let time_min = self.to_rfc3339(start)?;
        let time_max = self.to_rfc3339(end)?;
        let token = self.credentials.access_token().await?;

        let mut events = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut request = self
                .client
                .get(url.clone())
                .bearer_auth(&token)
                .query(&[
                    ("timeMin", time_min.as_str()),
                    ("timeMax", time_max.as_str()),
                    ("singleEvents", "true"),
                    ("orderBy", "startTime"),
                    ("maxResults", "250"),
                ]);
            if let Some(ref page) = page_token {
                request = request.query(&[("pageToken", page.as_str())]);
            }

            let resp = request.send().await.map_err(transport)?;
            if !resp.status().is_success() {
                return Err(Self::error_from_response(resp).await);
            }

            let page: EventsPage = resp.json().await?;
            events.extend(collect_events(page.items));

            match page.next_page_token {
                Some(next) => page_token = Some(next),
                None => break,
            }
        }

        tracing::debug!(
            calendar_id,
            count = events.len(),
            %time_min,
            %time_max,
            "listed calendar events"
        );
        Ok(events)
    }
}

#[async_trait]
impl CalendarWriter for GoogleCalendarClient {
    async fn create_event(
        &self,
        calendar_id: &str,
        event: &NewEvent,
    ) -> Result<CreatedEvent, CalendarError> {
        let url = self.events_url(calendar_id)?;
        let token = self.credentials.access_token().await?;
        let body = insert_body(event);

        let resp = self
            .client
            .post(url)
            .bearer_auth(&token)
            .json(&body)
            .send()
            .await
            .map_err(transport)?;
        if !resp.status().is_success() {
            return Err(Self::error_from_response(resp).await);
        }

        let created: GoogleEventRaw = resp.json().await?;
        let reference = created
            .html_link
            .clone()
            .filter(|l| !l.is_empty())
            .unwrap_or_else(|| created.id.clone());

        tracing::info!(calendar_id, event_id = %created.id, "created calendar event");
        Ok(CreatedEvent {
            id: created.id,
            reference,
        })
    }
}

/// Cancelled instances still come back from `events.list`; they do not block a slot.
fn collect_events(items: Vec<GoogleEventRaw>) -> Vec<CalendarEvent> {
    items
        .into_iter()
        .filter(|item| item.status.as_deref() != Some("cancelled"))
        .map(|item| CalendarEvent {
            summary: item.summary.unwrap_or_default(),
            start: item.start.as_ref().map(EventDateTime::as_string).unwrap_or_default(),
            end: item.end.as_ref().map(EventDateTime::as_string).unwrap_or_default(),
            id: item.id,
        })
        .collect()
}

fn insert_body(event: &NewEvent) -> serde_json::Value {
    json!({
        "summary": event.title,
        "start": { "dateTime": format_timestamp(&event.start), "timeZone": event.timezone },
        "end": { "dateTime": format_timestamp(&event.end), "timeZone": event.timezone },
    })
}
