//! # nudge-parse
//!
//! Turns free-text reminder messages into an action and an absolute time.
//!
//! - `splitter`: separate the action phrase from the date/time phrase
//! - `datetime`: resolve the date/time phrase against "now" in a timezone

pub mod datetime;
pub mod splitter;

pub use datetime::{DateTimeParser, Pattern, Zone};
pub use splitter::{split, Split};
