//! Stage status enum.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The observed status of a pipeline stage.
///
/// Variants are ordered by progress, so `a < b` means `b` is further along.
/// A stage only ever moves forward through this ordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum StageStatus {
    /// Stage has not started yet.
    #[default]
    Waiting,
    /// Stage is currently running on the backend.
    Running,
    /// Stage has finished.
    Done,
}

impl fmt::Display for StageStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Waiting => write!(f, "waiting"),
            Self::Running => write!(f, "running"),
            Self::Done => write!(f, "done"),
        }
    }
}

impl StageStatus {
    /// Returns true if the status is absorbing.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done)
    }

    /// Returns the status after attempting to move to `next`.
    ///
    /// Backward moves are refused and return `self` unchanged.
    #[must_use]
    pub fn advance(self, next: Self) -> Self {
        self.max(next)
    }
}
