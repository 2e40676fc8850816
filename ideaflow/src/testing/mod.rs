//! Testing utilities for pipeline trackers.
//!
//! This module provides:
//! - A scriptable stream transport and a refreshable session
//! - Frame builders and an outcome recorder
//! - Assertions over tracker snapshots

mod assertions;
mod fixtures;
mod mocks;

pub use assertions::{assert_failed_with, assert_sequential_order, assert_stages};
pub use fixtures::{agent_frame, completed_frame, error_frame, unknown_frame, Outcome, OutcomeRecorder};
pub use mocks::{RefreshingSession, Script, ScriptedTransport, StreamEnd};
