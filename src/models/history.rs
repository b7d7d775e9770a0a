use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// A completed booking kept for the history view.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookingRecord {
    pub id: String,
    pub title: String,
    pub start_time: NaiveDateTime,
    pub end_time: NaiveDateTime,
    pub timezone: String,
    pub event_reference: String,
    pub created_at: NaiveDateTime,
}
