//! Booking workflow: free text to a calendar event in two calls.
//!
//! [`engine::BookingEngine`] sequences the stages; each stage lives in its own
//! module and only talks to the outside world through the collaborator traits
//! in [`crate::services::ai::extraction`] and [`crate::services::calendar`].

pub mod availability;
pub mod confirmer;
pub mod engine;
pub mod extractor;
pub mod finalizer;

pub use engine::{BookingEngine, CalendarSettings};
