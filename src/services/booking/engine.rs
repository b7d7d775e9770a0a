use std::sync::Arc;

use chrono::NaiveDateTime;

use super::availability::AvailabilityChecker;
use super::confirmer::{BookingConfirmer, ConfirmOutcome};
use super::extractor::{ensure_future_start, EventFieldExtractor};
use super::finalizer::finalize;
use crate::errors::WorkflowError;
use crate::models::{BookingState, BookingStatus, Confirmation, Decision};
use crate::services::ai::extraction::TextUnderstanding;
use crate::services::calendar::{CalendarReader, CalendarWriter};

/// Where bookings go and which zone their wall-clock times are in.
#[derive(Debug, Clone)]
pub struct CalendarSettings {
    pub calendar_id: String,
    pub timezone: String,
}

/// Drives a booking from text to a terminal status.
///
/// A run suspends once, after the availability check, and is picked up again
/// through [`BookingEngine::resume`] with the caller's decision:
///
/// ```text
/// Pending --extract--> (candidate) --check--> PendingConfirmation --confirm/cancel--> terminal
///    \--extraction failed------------------------------------------------------> Error
/// ```
///
/// Collaborators are injected once; the engine itself holds no per-run state.
pub struct BookingEngine {
    extractor: EventFieldExtractor,
    checker: AvailabilityChecker,
    confirmer: BookingConfirmer,
}

impl BookingEngine {
    pub fn new(
        understanding: Arc<dyn TextUnderstanding>,
        reader: Arc<dyn CalendarReader>,
        writer: Arc<dyn CalendarWriter>,
        settings: CalendarSettings,
    ) -> Self {
        Self {
            extractor: EventFieldExtractor::new(understanding),
            checker: AvailabilityChecker::new(reader, settings.calendar_id.clone()),
            confirmer: BookingConfirmer::new(writer, settings.calendar_id, settings.timezone),
        }
    }

    /// First phase: extract and check, then stop at `PendingConfirmation`.
    /// A failed extraction ends the run in `Error` instead.
    pub async fn start(
        &self,
        user_input: &str,
        now: NaiveDateTime,
    ) -> Result<BookingState, WorkflowError> {
        self.begin(&BookingState::new(user_input), now).await
    }

    /// Second phase: apply the decision to a state returned by [`start`].
    ///
    /// Terminal states come back unchanged. Extraction and the availability
    /// check are not repeated, but a Confirm re-checks that the candidate
    /// still starts after `now`. Outcome fields carried in by the caller are
    /// discarded before the decision is applied.
    ///
    /// [`start`]: BookingEngine::start
    pub async fn resume(
        &self,
        state: &BookingState,
        decision: Decision,
        now: NaiveDateTime,
    ) -> Result<BookingState, WorkflowError> {
        if state.is_terminal() {
            tracing::debug!(status = %state.status, "resume on terminal booking, nothing to do");
            return Ok(state.clone());
        }
        if state.status != BookingStatus::PendingConfirmation {
            return Err(WorkflowError::NotAwaitingConfirmation(state.status));
        }
        let candidate = state
            .event_candidate
            .as_ref()
            .ok_or(WorkflowError::MissingCandidate)?;

        let decided = BookingState {
            confirmation: decision.into(),
            event_reference: None,
            final_message: None,
            error_message: None,
            ..state.clone()
        };

        if decision == Decision::Confirm {
            if let Err(e) = ensure_future_start(candidate.start(), now) {
                tracing::warn!(
                    error = %e,
                    title = candidate.title(),
                    "refusing to book stale candidate"
                );
                return finalize(&decided.failed(e.to_string()));
            }
        }

        let confirmed = match self.confirmer.confirm(candidate, decision).await {
            ConfirmOutcome::Completed { reference } => BookingState {
                status: BookingStatus::Completed,
                event_reference: Some(reference),
                error_message: None,
                ..decided
            },
            ConfirmOutcome::Cancelled => BookingState {
                status: BookingStatus::Cancelled,
                ..decided
            },
            ConfirmOutcome::Failed { error } => decided.failed(error),
        };

        finalize(&confirmed)
    }

    /// Completes a pending state with a reference from an earlier, identical
    /// confirm instead of writing to the calendar again.
    pub fn complete_from_record(
        &self,
        state: &BookingState,
        reference: String,
    ) -> Result<BookingState, WorkflowError> {
        if state.status != BookingStatus::PendingConfirmation {
            return Err(WorkflowError::NotAwaitingConfirmation(state.status));
        }
        if state.event_candidate.is_none() {
            return Err(WorkflowError::MissingCandidate);
        }
        finalize(&BookingState {
            confirmation: Confirmation::Confirm,
            status: BookingStatus::Completed,
            event_reference: Some(reference),
            final_message: None,
            error_message: None,
            ..state.clone()
        })
    }

    /// Single entry point that picks the next step from the state itself.
    ///
    /// `Pending` runs the first phase and, if the state already carries a
    /// decision, continues straight into the second. `PendingConfirmation`
    /// resumes when a decision is present and is returned as-is otherwise.
    /// Terminal states are returned as-is.
    pub async fn run(
        &self,
        state: &BookingState,
        now: NaiveDateTime,
    ) -> Result<BookingState, WorkflowError> {
        match state.status {
            BookingStatus::Completed | BookingStatus::Cancelled | BookingStatus::Error => {
                Ok(state.clone())
            }
            BookingStatus::Pending => {
                let checked = self.begin(state, now).await?;
                match (checked.status, checked.confirmation.decision()) {
                    (BookingStatus::PendingConfirmation, Some(decision)) => {
                        self.resume(&checked, decision, now).await
                    }
                    _ => Ok(checked),
                }
            }
            BookingStatus::PendingConfirmation => match state.confirmation.decision() {
                Some(decision) => self.resume(state, decision, now).await,
                None => Ok(state.clone()),
            },
        }
    }

    async fn begin(
        &self,
        state: &BookingState,
        now: NaiveDateTime,
    ) -> Result<BookingState, WorkflowError> {
        let candidate = match self.extractor.extract(&state.user_input, now).await {
            Ok(candidate) => candidate,
            Err(e) => {
                tracing::warn!(error = %e, "extraction failed, ending run");
                return finalize(&state.failed(e.to_string()));
            }
        };

        let availability = self.checker.check(&candidate).await;

        Ok(BookingState {
            event_candidate: Some(candidate),
            availability,
            status: BookingStatus::PendingConfirmation,
            ..state.clone()
        })
    }
}
