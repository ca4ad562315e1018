//! Utility functions for timestamp handling.

pub mod timestamps;

pub use timestamps::{elapsed_ms, format_timestamp, iso_timestamp, now_utc, Timestamp};
