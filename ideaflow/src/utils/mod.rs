//! Utility functions for run ids and timestamps.

pub mod timestamps;

pub use timestamps::{format_timestamp, iso_timestamp, now_utc, Timestamp};

use uuid::Uuid;

/// Generates a time-ordered id for one tracker run.
///
/// Used to correlate log lines and lifecycle events across reconnects.
#[must_use]
pub fn generate_run_id() -> Uuid {
    Uuid::now_v7()
}
