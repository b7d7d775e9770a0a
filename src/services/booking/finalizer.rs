use crate::errors::WorkflowError;
use crate::models::{BookingState, BookingStatus};

/// Attach the user-facing message for a terminal state.
///
/// A message already present is kept, so finalizing twice is a no-op.
/// Finalizing a non-terminal state is an engine bug and is reported as such.
pub fn finalize(state: &BookingState) -> Result<BookingState, WorkflowError> {
    if !state.is_terminal() {
        return Err(WorkflowError::NotTerminal(state.status));
    }

    if state.final_message.as_deref().is_some_and(|m| !m.is_empty()) {
        return Ok(state.clone());
    }

    let message = match state.status {
        BookingStatus::Completed => match state.event_reference.as_deref() {
            Some(reference) => format!(
                "✅ Event successfully booked and added to your calendar!\nView event: {reference}"
            ),
            None => "✅ Event successfully booked and added to your calendar!".to_string(),
        },
        BookingStatus::Cancelled => "❌ Booking cancelled by user.".to_string(),
        BookingStatus::Error => format!(
            "⚠️ Error occurred: {}",
            state.error_message.as_deref().unwrap_or("Unknown error")
        ),
        BookingStatus::Pending | BookingStatus::PendingConfirmation => {
            return Err(WorkflowError::NotTerminal(state.status));
        }
    };

    Ok(BookingState {
        final_message: Some(message),
        ..state.clone()
    })
}
