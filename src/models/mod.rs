pub mod booking;
pub mod event;
pub mod history;

pub use booking::{Availability, BookingState, BookingStatus, Confirmation, Decision};
pub use event::{
    format_timestamp, parse_timestamp, CandidateError, EventCandidate, CANONICAL_FORMAT,
};
pub use history::BookingRecord;
