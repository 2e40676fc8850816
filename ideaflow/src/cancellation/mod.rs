//! Teardown primitives for the tracker.
//!
//! This module provides:
//! - CancellationToken for cooperative, awaitable cancellation
//! - Generation counter for discarding stale async results

mod generation;
mod token;

pub use generation::{Epoch, Generation};
pub use token::CancellationToken;
