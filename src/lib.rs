//! Chanspan - channel activity span
//!
//! Chanspan derives how long a chat channel has been active: the time between its
//! first and last recorded message, read from the message store with a single
//! aggregate query and rendered as `"{days} days {hours} hours {minutes} minutes"`.

pub mod channel_info;
pub mod config;
pub mod error;
pub mod span;
pub mod store;

pub use channel_info::ActivitySpanField;
pub use span::{DurationCalculator, SpanError};
