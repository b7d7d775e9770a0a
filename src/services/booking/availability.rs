use std::sync::Arc;

use crate::models::{Availability, EventCandidate};
use crate::services::calendar::CalendarReader;

/// Classifies a candidate's slot against the calendar. Advisory only: a failed
/// lookup is reported as [`Availability::CheckFailed`], never as an error.
pub struct AvailabilityChecker {
    reader: Arc<dyn CalendarReader>,
    calendar_id: String,
}

impl AvailabilityChecker {
    pub fn new(reader: Arc<dyn CalendarReader>, calendar_id: String) -> Self {
        Self { reader, calendar_id }
    }

    pub async fn check(&self, candidate: &EventCandidate) -> Availability {
        match self
            .reader
            .list_events(&self.calendar_id, candidate.start(), candidate.end())
            .await
        {
            Ok(events) if events.is_empty() => {
                tracing::info!(start = %candidate.start_str(), "slot available");
                Availability::Available
            }
            Ok(events) => {
                tracing::info!(
                    start = %candidate.start_str(),
                    conflicts = events.len(),
                    "slot has conflicting events"
                );
                Availability::Conflicting { count: events.len() }
            }
            Err(e) => {
                tracing::warn!(error = %e, "availability check failed, continuing without it");
                Availability::CheckFailed {
                    reason: e.to_string(),
                }
            }
        }
    }
}
