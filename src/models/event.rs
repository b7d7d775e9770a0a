use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Timestamp profile used everywhere a booking time crosses a boundary.
pub const CANONICAL_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

pub fn format_timestamp(dt: &NaiveDateTime) -> String {
    dt.format(CANONICAL_FORMAT).to_string()
}

pub fn parse_timestamp(s: &str) -> Result<NaiveDateTime, chrono::ParseError> {
    NaiveDateTime::parse_from_str(s.trim(), CANONICAL_FORMAT)
}

/// A validated event guess: non-empty title and `start < end`.
///
/// Times are wall-clock values in the configured calendar timezone. The
/// future-time rule depends on the extraction instant and is enforced by the
/// extractor, not here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawCandidate", into = "RawCandidate")]
pub struct EventCandidate {
    title: String,
    start: NaiveDateTime,
    end: NaiveDateTime,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum CandidateError {
    #[error("event title must not be empty")]
    EmptyTitle,

    #[error("end time {end} must be after start time {start}")]
    NonPositiveDuration { start: String, end: String },

    #[error("invalid timestamp {value:?}, expected YYYY-MM-DDTHH:mm:ss")]
    BadTimestamp { value: String },
}

impl EventCandidate {
    pub fn new(
        title: impl Into<String>,
        start: NaiveDateTime,
        end: NaiveDateTime,
    ) -> Result<Self, CandidateError> {
        let title = title.into().trim().to_string();
        if title.is_empty() {
            return Err(CandidateError::EmptyTitle);
        }
        // Normalize to whole seconds so the canonical string is lossless.
        let start = truncate_subsec(start);
        let end = truncate_subsec(end);
        if end <= start {
            return Err(CandidateError::NonPositiveDuration {
                start: format_timestamp(&start),
                end: format_timestamp(&end),
            });
        }
        Ok(Self { title, start, end })
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn start(&self) -> NaiveDateTime {
        self.start
    }

    pub fn end(&self) -> NaiveDateTime {
        self.end
    }

    pub fn start_str(&self) -> String {
        format_timestamp(&self.start)
    }

    pub fn end_str(&self) -> String {
        format_timestamp(&self.end)
    }

    pub fn duration(&self) -> chrono::Duration {
        self.end - self.start
    }
}

fn truncate_subsec(dt: NaiveDateTime) -> NaiveDateTime {
    use chrono::Timelike;
    dt.with_nanosecond(0).unwrap_or(dt)
}

/// Wire shape of a candidate: canonical strings rather than chrono's default.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct RawCandidate {
    title: String,
    start: String,
    end: String,
}

impl TryFrom<RawCandidate> for EventCandidate {
    type Error = CandidateError;

    fn try_from(raw: RawCandidate) -> Result<Self, Self::Error> {
        let start = parse_timestamp(&raw.start)
            .map_err(|_| CandidateError::BadTimestamp { value: raw.start.clone() })?;
        let end = parse_timestamp(&raw.end)
            .map_err(|_| CandidateError::BadTimestamp { value: raw.end.clone() })?;
        EventCandidate::new(raw.title, start, end)
    }
}

impl From<EventCandidate> for RawCandidate {
    fn from(c: EventCandidate) -> Self {
        RawCandidate {
            start: format_timestamp(&c.start),
            end: format_timestamp(&c.end),
            title: c.title,
        }
    }
}
