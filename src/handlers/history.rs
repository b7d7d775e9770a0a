use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::{header, HeaderMap};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};

use super::check_auth;
use crate::db::queries;
use crate::errors::AppError;
use crate::models::format_timestamp;
use crate::services::calendar::ics::generate_ics;
use crate::state::AppState;

#[derive(Deserialize)]
pub struct HistoryQuery {
    pub limit: Option<u32>,
}

#[derive(Serialize)]
pub struct HistoryEntry {
    id: String,
    title: String,
    start_time: String,
    end_time: String,
    timezone: String,
    event_reference: String,
    created_at: String,
    /// One-line summary as shown in the booking history list.
    summary: String,
}

// GET /api/bookings/history
pub async fn list_history(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<Vec<HistoryEntry>>, AppError> {
    check_auth(&headers, &state.config.api_token)?;

    let limit = query.limit.unwrap_or(50).min(500);
    let records = {
        let db = state.db()?;
        queries::list_booking_records(&db, limit)?
    };

    let entries = records
        .into_iter()
        .map(|r| {
            let start_time = format_timestamp(&r.start_time);
            HistoryEntry {
                summary: format!("Event booked: {} at {}", r.title, start_time),
                id: r.id,
                title: r.title,
                start_time,
                end_time: format_timestamp(&r.end_time),
                timezone: r.timezone,
                event_reference: r.event_reference,
                created_at: r.created_at.format("%Y-%m-%d %H:%M:%S").to_string(),
            }
        })
        .collect();

    Ok(Json(entries))
}

// GET /api/bookings/history/:id/ics
pub async fn download_ics(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Response, AppError> {
    check_auth(&headers, &state.config.api_token)?;

    let record = {
        let db = state.db()?;
        queries::get_booking_record(&db, &id)?
    }
    .ok_or_else(|| AppError::NotFound(format!("booking {id}")))?;

    let ics = generate_ics(&record);
    let filename = format!("booking-{id}.ics");

    Ok((
        [
            (header::CONTENT_TYPE, "text/calendar; charset=utf-8".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{filename}\""),
            ),
        ],
        ics,
    )
        .into_response())
}
