//! Utility modules.

pub mod datetime;

pub use datetime::{DateTimeParseError, Timestamp};
