use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use chrono::NaiveDateTime;
use tower::ServiceExt;

use calbook::config::AppConfig;
use calbook::db;
use calbook::handlers;
use calbook::services::ai::extraction::LlmTextUnderstanding;
use calbook::services::ai::{LlmProvider, Message};
use calbook::services::booking::{BookingEngine, CalendarSettings};
use calbook::services::calendar::{
    CalendarError, CalendarEvent, CalendarReader, CalendarWriter, CreatedEvent, NewEvent,
};
use calbook::state::AppState;

// ── Mock Providers ──

/// Answers with an event one day out so it is always in the future.
struct MockLlm;

#[async_trait]
impl LlmProvider for MockLlm {
    async fn chat(&self, _system_prompt: &str, messages: &[Message]) -> anyhow::Result<String> {
        let last = messages.last().map(|m| m.content.as_str()).unwrap_or("");

        if last.contains("gibberish") {
            return Ok("I'm not sure what you mean, could you rephrase?".to_string());
        }

        let start = (chrono::Utc::now() + chrono::Duration::days(1))
            .naive_utc()
            .date()
            .and_hms_opt(15, 0, 0)
            .unwrap();
        let end = start + chrono::Duration::hours(1);
        let title = if last.contains("dentist") { "Dentist" } else { "Meeting" };

        Ok(format!(
            r#"{{"title":"{title}","start_time":"{}","end_time":"{}"}}"#,
            start.format("%Y-%m-%dT%H:%M:%S"),
            end.format("%Y-%m-%dT%H:%M:%S"),
        ))
    }
}

struct MockCalendar {
    existing: usize,
    fail_create: Option<String>,
    created: Arc<Mutex<Vec<NewEvent>>>,
}

#[async_trait]
impl CalendarReader for MockCalendar {
    async fn list_events(
        &self,
        _calendar_id: &str,
        _start: NaiveDateTime,
        _end: NaiveDateTime,
    ) -> Result<Vec<CalendarEvent>, CalendarError> {
        Ok((0..self.existing)
            .map(|i| CalendarEvent {
                id: format!("busy-{i}"),
                summary: "Busy".to_string(),
                start: String::new(),
                end: String::new(),
            })
            .collect())
    }
}

#[async_trait]
impl CalendarWriter for MockCalendar {
    async fn create_event(
        &self,
        _calendar_id: &str,
        event: &NewEvent,
    ) -> Result<CreatedEvent, CalendarError> {
        if let Some(e) = &self.fail_create {
            return Err(CalendarError::Transport(e.clone()));
        }
        self.created.lock().unwrap().push(event.clone());
        Ok(CreatedEvent {
            id: "evt-1".to_string(),
            reference: "https://calendar.example/evt-1".to_string(),
        })
    }
}

// ── Helpers ──

fn test_config(api_token: &str) -> AppConfig {
    AppConfig {
        port: 3000,
        database_url: ":memory:".to_string(),
        api_token: api_token.to_string(),
        llm_provider: "openai".to_string(),
        openai_api_key: String::new(),
        openai_model: "gpt-4o".to_string(),
        openai_base_url: "http://localhost".to_string(),
        ollama_url: "http://localhost:11434".to_string(),
        ollama_model: "llama3.2".to_string(),
        google_token_path: "token.json".to_string(),
        google_access_token: None,
        google_calendar_api: "http://localhost".to_string(),
        calendar_id: "primary".to_string(),
        calendar_timezone: "UTC".to_string(),
        http_timeout_secs: 5,
    }
}

struct TestApp {
    state: Arc<AppState>,
    created: Arc<Mutex<Vec<NewEvent>>>,
}

impl TestApp {
    fn router(&self) -> Router {
        handlers::router(self.state.clone())
    }
}

fn test_app_with(existing: usize, fail_create: Option<&str>, api_token: &str) -> TestApp {
    let created = Arc::new(Mutex::new(Vec::new()));
    let calendar = Arc::new(MockCalendar {
        existing,
        fail_create: fail_create.map(|s| s.to_string()),
        created: Arc::clone(&created),
    });
    let engine = BookingEngine::new(
        Arc::new(LlmTextUnderstanding::new(Arc::new(MockLlm))),
        calendar.clone(),
        calendar,
        CalendarSettings {
            calendar_id: "primary".to_string(),
            timezone: "UTC".to_string(),
        },
    );
    let state = Arc::new(AppState {
        db: Arc::new(Mutex::new(db::init_db(":memory:").unwrap())),
        config: test_config(api_token),
        engine,
        timezone: chrono_tz::UTC,
    });
    TestApp { state, created }
}

fn test_app() -> TestApp {
    test_app_with(0, None, "")
}

fn post_json(uri: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("Content-Type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

async fn send(app: &TestApp, req: Request<Body>) -> (StatusCode, serde_json::Value) {
    let res = app.router().oneshot(req).await.unwrap();
    let status = res.status();
    let body = axum::body::to_bytes(res.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = serde_json::from_slice(&body).unwrap_or(serde_json::Value::Null);
    (status, json)
}

async fn start(app: &TestApp, input: &str) -> serde_json::Value {
    let (status, json) = send(
        app,
        post_json("/api/bookings", serde_json::json!({ "user_input": input })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    json
}

/// Echo the first-phase response back, the way a front end would.
fn confirm_request(first: &serde_json::Value, confirmation: &str) -> Request<Body> {
    let mut state = first.clone();
    state.as_object_mut().unwrap().remove("availability_message");
    post_json(
        "/api/bookings/confirm",
        serde_json::json!({ "state": state, "confirmation": confirmation }),
    )
}

// ── Tests ──

#[tokio::test]
async fn test_health() {
    let app = test_app();
    let res = app.router().oneshot(get("/health")).await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_start_booking_awaits_confirmation() {
    let app = test_app();
    let json = start(&app, "Meeting tomorrow at 3pm for 1 hour").await;

    assert_eq!(json["status"], "pending_confirmation");
    assert_eq!(json["availability"]["state"], "available");
    assert_eq!(json["availability_message"], "✅ Slot available.");
    assert_eq!(json["confirmation"], "none");
    assert_eq!(json["event_candidate"]["title"], "Meeting");
    assert!(json["event_candidate"]["start"]
        .as_str()
        .unwrap()
        .ends_with("T15:00:00"));
    assert!(json["final_message"].is_null());
    assert!(app.created.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_start_booking_rejects_empty_input() {
    let app = test_app();
    let (status, json) = send(
        &app,
        post_json("/api/bookings", serde_json::json!({ "user_input": "   " })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(json["error"].as_str().unwrap().contains("event details"));
}

#[tokio::test]
async fn test_conflict_is_reported_without_finalizing() {
    let app = test_app_with(1, None, "");
    let json = start(&app, "Meeting tomorrow at 3pm").await;

    assert_eq!(json["status"], "pending_confirmation");
    assert_eq!(json["availability"]["state"], "conflicting");
    assert_eq!(json["availability"]["count"], 1);
    assert!(json["availability_message"]
        .as_str()
        .unwrap()
        .contains("1 conflicting event(s)"));
    assert!(json["final_message"].is_null());
}

#[tokio::test]
async fn test_unparseable_model_reply_ends_in_error() {
    let app = test_app();
    let json = start(&app, "gibberish").await;

    assert_eq!(json["status"], "error");
    assert!(json["event_candidate"].is_null());
    assert!(json["error_message"]
        .as_str()
        .unwrap()
        .starts_with("could not extract event details"));
    assert!(json["final_message"]
        .as_str()
        .unwrap()
        .starts_with("⚠️ Error occurred"));
}

#[tokio::test]
async fn test_confirm_books_and_records_history() {
    let app = test_app();
    let first = start(&app, "Book a dentist appointment tomorrow at 3pm").await;

    let (status, done) = send(&app, confirm_request(&first, "confirm")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(done["status"], "completed");
    assert_eq!(done["confirmation"], "confirm");
    assert_eq!(done["event_reference"], "https://calendar.example/evt-1");
    assert!(done["final_message"]
        .as_str()
        .unwrap()
        .contains("https://calendar.example/evt-1"));

    {
        let created = app.created.lock().unwrap();
        assert_eq!(created.len(), 1);
        assert_eq!(created[0].title, "Dentist");
        assert_eq!(created[0].timezone, "UTC");
    }

    let (status, history) = send(&app, get("/api/bookings/history")).await;
    assert_eq!(status, StatusCode::OK);
    let history = history.as_array().unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0]["title"], "Dentist");
    assert_eq!(history[0]["event_reference"], "https://calendar.example/evt-1");
    assert!(history[0]["summary"]
        .as_str()
        .unwrap()
        .starts_with("Event booked: Dentist at "));

    let id = history[0]["id"].as_str().unwrap().to_string();
    let res = app
        .router()
        .oneshot(get(&format!("/api/bookings/history/{id}/ics")))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(
        res.headers().get("content-type").unwrap(),
        "text/calendar; charset=utf-8"
    );
    let body = axum::body::to_bytes(res.into_body(), usize::MAX)
        .await
        .unwrap();
    let ics = String::from_utf8(body.to_vec()).unwrap();
    assert!(ics.contains("SUMMARY:Dentist"));
    assert!(ics.contains(&format!("UID:{id}@calbook")));
}

#[tokio::test]
async fn test_confirm_on_completed_state_is_a_noop() {
    let app = test_app();
    let first = start(&app, "Meeting tomorrow at 3pm").await;

    let (_, done) = send(&app, confirm_request(&first, "confirm")).await;
    assert_eq!(done["status"], "completed");

    let (status, again) = send(&app, confirm_request(&done, "confirm")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(again["status"], "completed");
    assert_eq!(again["final_message"], done["final_message"]);

    assert_eq!(app.created.lock().unwrap().len(), 1);
    let (_, history) = send(&app, get("/api/bookings/history")).await;
    assert_eq!(history.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_resubmitted_pending_confirm_does_not_book_twice() {
    let app = test_app();
    let first = start(&app, "Meeting tomorrow at 3pm").await;

    let (_, done) = send(&app, confirm_request(&first, "confirm")).await;
    assert_eq!(done["status"], "completed");

    // Double submit: the same pending state goes out a second time.
    let (status, again) = send(&app, confirm_request(&first, "confirm")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(again["status"], "completed");
    assert_eq!(again["event_reference"], done["event_reference"]);
    assert_eq!(again["final_message"], done["final_message"]);

    assert_eq!(app.created.lock().unwrap().len(), 1);
    let (_, history) = send(&app, get("/api/bookings/history")).await;
    assert_eq!(history.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_confirm_of_past_candidate_is_refused() {
    let app = test_app();
    let (status, done) = send(
        &app,
        post_json(
            "/api/bookings/confirm",
            serde_json::json!({
                "state": {
                    "user_input": "Meeting",
                    "status": "pending_confirmation",
                    "event_candidate": {
                        "title": "Meeting",
                        "start": "2000-01-01T10:00:00",
                        "end": "2000-01-01T11:00:00",
                    },
                },
                "confirmation": "confirm",
            }),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(done["status"], "error");
    assert!(done["error_message"]
        .as_str()
        .unwrap()
        .starts_with("invalid event time"));
    assert!(done["event_reference"].is_null());
    assert!(app.created.lock().unwrap().is_empty());

    let (_, history) = send(&app, get("/api/bookings/history")).await;
    assert!(history.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_cancel_ignores_outcome_fields_sent_by_client() {
    let app = test_app();
    let mut first = start(&app, "Meeting tomorrow at 3pm").await;
    first["event_reference"] = serde_json::json!("https://elsewhere.example/ref");
    first["final_message"] = serde_json::json!("Booked!");

    let (status, done) = send(&app, confirm_request(&first, "cancel")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(done["status"], "cancelled");
    assert!(done["event_reference"].is_null());
    assert_eq!(done["final_message"], "❌ Booking cancelled by user.");
    assert!(app.created.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_cancel_makes_no_calendar_write() {
    let app = test_app_with(2, None, "");
    let first = start(&app, "Meeting tomorrow at 3pm").await;

    let (status, done) = send(&app, confirm_request(&first, "cancel")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(done["status"], "cancelled");
    assert_eq!(done["final_message"], "❌ Booking cancelled by user.");
    assert!(done["event_reference"].is_null());
    assert!(app.created.lock().unwrap().is_empty());

    let (_, history) = send(&app, get("/api/bookings/history")).await;
    assert!(history.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_calendar_write_failure_is_reported_verbatim() {
    let app = test_app_with(0, Some("connection reset by peer"), "");
    let first = start(&app, "Meeting tomorrow at 3pm").await;

    let (status, done) = send(&app, confirm_request(&first, "confirm")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(done["status"], "error");
    assert_eq!(done["error_message"], "connection reset by peer");
    assert!(done["event_reference"].is_null());

    let (_, history) = send(&app, get("/api/bookings/history")).await;
    assert!(history.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_confirm_on_fresh_state_is_conflict() {
    let app = test_app();
    let (status, json) = send(
        &app,
        post_json(
            "/api/bookings/confirm",
            serde_json::json!({
                "state": { "user_input": "Meeting tomorrow", "status": "pending" },
                "confirmation": "confirm",
            }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(json["error"].as_str().unwrap().contains("not awaiting confirmation"));
    assert!(app.created.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_confirm_rejects_inverted_candidate() {
    let app = test_app();
    let req = post_json(
        "/api/bookings/confirm",
        serde_json::json!({
            "state": {
                "user_input": "Meeting",
                "status": "pending_confirmation",
                "event_candidate": {
                    "title": "Meeting",
                    "start": "2030-01-01T16:00:00",
                    "end": "2030-01-01T15:00:00",
                },
            },
            "confirmation": "confirm",
        }),
    );
    let res = app.router().oneshot(req).await.unwrap();
    assert!(res.status().is_client_error());
    assert!(app.created.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_api_token_required_when_configured() {
    let app = test_app_with(0, None, "secret");

    let (status, _) = send(
        &app,
        post_json("/api/bookings", serde_json::json!({ "user_input": "Meeting" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = send(&app, get("/api/bookings/history")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let req = Request::builder()
        .method("POST")
        .uri("/api/bookings")
        .header("Content-Type", "application/json")
        .header("Authorization", "Bearer secret")
        .body(Body::from(r#"{"user_input":"Meeting tomorrow at 3pm"}"#))
        .unwrap();
    let (status, json) = send(&app, req).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "pending_confirmation");
}

#[tokio::test]
async fn test_ics_for_unknown_booking_is_not_found() {
    let app = test_app();
    let (status, json) = send(&app, get("/api/bookings/history/nope/ics")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(json["error"].as_str().unwrap().contains("nope"));
}
