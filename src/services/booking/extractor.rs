use std::sync::Arc;

use chrono::NaiveDateTime;

use crate::errors::ExtractError;
use crate::models::{format_timestamp, parse_timestamp, CandidateError, EventCandidate};
use crate::services::ai::extraction::{RawEventFields, TextUnderstanding};

/// Turns free text into a validated [`EventCandidate`]. Understanding the text
/// is delegated; this type only validates and normalizes the guess.
pub struct EventFieldExtractor {
    understanding: Arc<dyn TextUnderstanding>,
}

impl EventFieldExtractor {
    pub fn new(understanding: Arc<dyn TextUnderstanding>) -> Self {
        Self { understanding }
    }

    pub async fn extract(
        &self,
        user_input: &str,
        now: NaiveDateTime,
    ) -> Result<EventCandidate, ExtractError> {
        let text = user_input.trim();
        if text.is_empty() {
            return Err(ExtractError::Extraction("user input must not be empty".to_string()));
        }

        let fields = self
            .understanding
            .understand(text, now)
            .await
            .map_err(|e| ExtractError::Extraction(format!("{e:#}")))?;

        let candidate = validate_fields(fields, now)?;
        tracing::info!(
            title = candidate.title(),
            start = %candidate.start_str(),
            end = %candidate.end_str(),
            "extracted event candidate"
        );
        Ok(candidate)
    }
}

/// `start` must be strictly after `now` and strictly before `end`.
pub fn validate_fields(
    fields: RawEventFields,
    now: NaiveDateTime,
) -> Result<EventCandidate, ExtractError> {
    let start = parse_field("start_time", &fields.start_time)?;
    let end = parse_field("end_time", &fields.end_time)?;

    ensure_future_start(start, now)?;

    EventCandidate::new(fields.title, start, end).map_err(|e| match e {
        CandidateError::NonPositiveDuration { .. } => ExtractError::InvalidTime(e.to_string()),
        CandidateError::EmptyTitle | CandidateError::BadTimestamp { .. } => {
            ExtractError::Extraction(e.to_string())
        }
    })
}

/// Shared by extraction and by the confirm step, which re-checks a candidate
/// that may have gone stale while waiting for a decision.
pub fn ensure_future_start(start: NaiveDateTime, now: NaiveDateTime) -> Result<(), ExtractError> {
    if start <= now {
        return Err(ExtractError::InvalidTime(format!(
            "start time {} must be in the future (now is {})",
            format_timestamp(&start),
            format_timestamp(&now)
        )));
    }
    Ok(())
}

fn parse_field(name: &str, value: &str) -> Result<NaiveDateTime, ExtractError> {
    parse_timestamp(value).map_err(|_| {
        ExtractError::Extraction(format!(
            "{name} {value:?} is not in YYYY-MM-DDTHH:mm:ss format"
        ))
    })
}
