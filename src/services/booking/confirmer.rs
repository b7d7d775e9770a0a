use std::sync::Arc;

use crate::models::{Decision, EventCandidate};
use crate::services::calendar::{CalendarWriter, NewEvent};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfirmOutcome {
    Completed { reference: String },
    Cancelled,
    Failed { error: String },
}

/// Writes a confirmed candidate to the calendar.
///
/// Not idempotent: every `Confirm` issues a create call. Callers must not
/// confirm a booking that already completed.
pub struct BookingConfirmer {
    writer: Arc<dyn CalendarWriter>,
    calendar_id: String,
    timezone: String,
}

impl BookingConfirmer {
    pub fn new(writer: Arc<dyn CalendarWriter>, calendar_id: String, timezone: String) -> Self {
        Self {
            writer,
            calendar_id,
            timezone,
        }
    }

    pub async fn confirm(&self, candidate: &EventCandidate, decision: Decision) -> ConfirmOutcome {
        if decision == Decision::Cancel {
            tracing::info!(title = candidate.title(), "booking cancelled by user");
            return ConfirmOutcome::Cancelled;
        }

        let event = NewEvent {
            title: candidate.title().to_string(),
            start: candidate.start(),
            end: candidate.end(),
            timezone: self.timezone.clone(),
        };

        match self.writer.create_event(&self.calendar_id, &event).await {
            Ok(created) => {
                tracing::info!(
                    title = candidate.title(),
                    reference = %created.reference,
                    "event booked"
                );
                ConfirmOutcome::Completed {
                    reference: created.reference,
                }
            }
            Err(e) => {
                tracing::error!(error = %e, title = candidate.title(), "failed to create event");
                ConfirmOutcome::Failed {
                    error: e.to_string(),
                }
            }
        }
    }
}
