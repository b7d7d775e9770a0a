use std::sync::Arc;

use axum::extract::State;
use axum::http::HeaderMap;
use axum::Json;
use serde::{Deserialize, Serialize};

use super::check_auth;
use crate::db::queries;
use crate::errors::AppError;
use crate::models::{BookingRecord, BookingState, BookingStatus, Decision};
use crate::state::AppState;

#[derive(Deserialize)]
pub struct StartBookingRequest {
    pub user_input: String,
}

#[derive(Deserialize)]
pub struct ConfirmBookingRequest {
    /// The state returned by `POST /api/bookings`, echoed back unchanged.
    pub state: BookingState,
    pub confirmation: Decision,
}

#[derive(Serialize)]
pub struct BookingResponse {
    #[serde(flatten)]
    pub state: BookingState,
    pub availability_message: String,
}

impl From<BookingState> for BookingResponse {
    fn from(state: BookingState) -> Self {
        Self {
            availability_message: state.availability.describe(),
            state,
        }
    }
}

// POST /api/bookings
pub async fn start_booking(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(payload): Json<StartBookingRequest>,
) -> Result<Json<BookingResponse>, AppError> {
    check_auth(&headers, &state.config.api_token)?;

    let user_input = payload.user_input.trim();
    if user_input.is_empty() {
        return Err(AppError::BadRequest("Please enter event details".to_string()));
    }

    tracing::info!(input = %user_input, "booking request");
    let result = state.engine.start(user_input, state.now()).await?;
    tracing::info!(
        status = %result.status,
        availability = ?result.availability,
        "booking checked"
    );

    Ok(Json(result.into()))
}

// POST /api/bookings/confirm
pub async fn confirm_booking(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(payload): Json<ConfirmBookingRequest>,
) -> Result<Json<BookingResponse>, AppError> {
    check_auth(&headers, &state.config.api_token)?;

    if let Some(reference) = previously_booked(&state, &payload)? {
        tracing::info!(reference = %reference, "confirm already applied, not booking again");
        let result = state.engine.complete_from_record(&payload.state, reference)?;
        return Ok(Json(result.into()));
    }

    let was_completed = payload.state.status == BookingStatus::Completed;
    let result = state
        .engine
        .resume(&payload.state, payload.confirmation, state.now())
        .await?;
    tracing::info!(status = %result.status, "booking resumed");

    if !was_completed && result.status == BookingStatus::Completed {
        record_history(&state, &result);
    }

    Ok(Json(result.into()))
}

/// A resubmitted confirm carries the same pending state as the one that
/// already booked; its slot is then found in history.
fn previously_booked(
    state: &AppState,
    payload: &ConfirmBookingRequest,
) -> Result<Option<String>, AppError> {
    let candidate = match (
        payload.confirmation,
        payload.state.status,
        payload.state.event_candidate.as_ref(),
    ) {
        (Decision::Confirm, BookingStatus::PendingConfirmation, Some(candidate)) => candidate,
        _ => return Ok(None),
    };

    let db = state.db()?;
    let record = queries::find_booking_for_slot(
        &db,
        candidate.title(),
        &candidate.start(),
        &candidate.end(),
        &state.config.calendar_timezone,
    )?;
    Ok(record.map(|r| r.event_reference))
}

/// History is a convenience view; failing to write it must not hide a booking
/// that already exists in the calendar.
fn record_history(state: &AppState, booking: &BookingState) {
    let (Some(candidate), Some(reference)) =
        (booking.event_candidate.as_ref(), booking.event_reference.as_ref())
    else {
        tracing::warn!("completed booking without candidate or reference, not recorded");
        return;
    };

    let record = BookingRecord {
        id: uuid::Uuid::new_v4().to_string(),
        title: candidate.title().to_string(),
        start_time: candidate.start(),
        end_time: candidate.end(),
        timezone: state.config.calendar_timezone.clone(),
        event_reference: reference.clone(),
        created_at: chrono::Utc::now().naive_utc(),
    };

    let saved = state
        .db()
        .map_err(anyhow::Error::from)
        .and_then(|db| queries::insert_booking_record(&db, &record));
    match saved {
        Ok(()) => {
            tracing::info!(id = %record.id, title = %record.title, "recorded booking history")
        }
        Err(e) => tracing::error!(error = %e, "failed to record booking history"),
    }
}
