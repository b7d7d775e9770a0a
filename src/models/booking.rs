use serde::{Deserialize, Serialize};

use super::EventCandidate;

/// The record threaded through every workflow stage.
///
/// Stages never mutate a state they were handed; each one returns a new value
/// derived from its input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BookingState {
    pub user_input: String,
    #[serde(default)]
    pub event_candidate: Option<EventCandidate>,
    #[serde(default)]
    pub availability: Availability,
    #[serde(default)]
    pub confirmation: Confirmation,
    #[serde(default)]
    pub status: BookingStatus,
    #[serde(default)]
    pub final_message: Option<String>,
    #[serde(default)]
    pub event_reference: Option<String>,
    #[serde(default)]
    pub error_message: Option<String>,
}

impl BookingState {
    pub fn new(user_input: impl Into<String>) -> Self {
        Self {
            user_input: user_input.into(),
            event_candidate: None,
            availability: Availability::Unknown,
            confirmation: Confirmation::None,
            status: BookingStatus::Pending,
            final_message: None,
            event_reference: None,
            error_message: None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Move to `Error`, keeping everything gathered so far.
    pub fn failed(&self, error: impl Into<String>) -> Self {
        Self {
            status: BookingStatus::Error,
            error_message: Some(error.into()),
            event_reference: None,
            ..self.clone()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum Availability {
    #[default]
    Unknown,
    Available,
    Conflicting {
        count: usize,
    },
    CheckFailed {
        reason: String,
    },
}

impl Availability {
    /// Text shown to the user next to the candidate.
    pub fn describe(&self) -> String {
        match self {
            Availability::Unknown => "Availability not checked yet.".to_string(),
            Availability::Available => "✅ Slot available.".to_string(),
            Availability::Conflicting { count } => format!(
                "⚠️ Slot unavailable! You have {count} conflicting event(s)."
            ),
            Availability::CheckFailed { reason } => {
                format!("Error checking availability: {reason}")
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Confirmation {
    #[default]
    None,
    Confirm,
    Cancel,
}

/// Caller's answer at the suspension point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Decision {
    Confirm,
    Cancel,
}

impl From<Decision> for Confirmation {
    fn from(d: Decision) -> Self {
        match d {
            Decision::Confirm => Confirmation::Confirm,
            Decision::Cancel => Confirmation::Cancel,
        }
    }
}

impl Confirmation {
    pub fn decision(&self) -> Option<Decision> {
        match self {
            Confirmation::None => None,
            Confirmation::Confirm => Some(Decision::Confirm),
            Confirmation::Cancel => Some(Decision::Cancel),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BookingStatus {
    #[default]
    Pending,
    PendingConfirmation,
    Completed,
    Cancelled,
    Error,
}

impl BookingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BookingStatus::Pending => "pending",
            BookingStatus::PendingConfirmation => "pending_confirmation",
            BookingStatus::Completed => "completed",
            BookingStatus::Cancelled => "cancelled",
            BookingStatus::Error => "error",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            BookingStatus::Completed | BookingStatus::Cancelled | BookingStatus::Error
        )
    }
}

impl std::fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
