//! Stage identities and dependency roles.

use serde::{Deserialize, Serialize};
use std::fmt;

/// How a stage relates to the others in the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageRole {
    /// Started eagerly by the backend alongside the rest of the group.
    Parallel,
    /// Eligible only after every parallel stage is done.
    Sequential,
}

/// Identity of one of the five pipeline agents (ordinal 1..=5).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct StageId(u8);

/// Stages the backend starts concurrently on connect.
pub const PARALLEL_GROUP: [StageId; 4] = [StageId(1), StageId(2), StageId(3), StageId(4)];

/// The synthesis stage that runs after the parallel group.
pub const SEQUENTIAL_STAGE: StageId = StageId(5);

impl StageId {
    /// Number of stages in the pipeline.
    pub const COUNT: usize = 5;

    /// All stages in ordinal order.
    pub const ALL: [Self; Self::COUNT] = [Self(1), Self(2), Self(3), Self(4), Self(5)];

    /// Creates a stage id from its ordinal, if in range.
    #[must_use]
    pub const fn new(ordinal: u8) -> Option<Self> {
        if ordinal >= 1 && ordinal as usize <= Self::COUNT {
            Some(Self(ordinal))
        } else {
            None
        }
    }

    /// The 1-based ordinal.
    #[must_use]
    pub const fn ordinal(self) -> u8 {
        self.0
    }

    /// Zero-based index into per-stage arrays.
    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize - 1
    }

    /// The dependency role of this stage.
    #[must_use]
    pub const fn role(self) -> StageRole {
        if self.0 == SEQUENTIAL_STAGE.0 {
            StageRole::Sequential
        } else {
            StageRole::Parallel
        }
    }

    /// Stable machine key, used in log fields and lifecycle events.
    #[must_use]
    pub const fn key(self) -> &'static str {
        match self.0 {
            1 => "market_research",
            2 => "competitor_analysis",
            3 => "customer_insight",
            4 => "business_model",
            _ => "synthesis",
        }
    }
}

impl TryFrom<u8> for StageId {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::new(value).ok_or_else(|| format!("stage ordinal out of range: {value}"))
    }
}

impl From<StageId> for u8 {
    fn from(id: StageId) -> Self {
        id.0
    }
}

impl fmt::Display for StageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_id_range() {
        assert!(StageId::new(0).is_none());
        assert!(StageId::new(6).is_none());
        assert_eq!(StageId::new(3).map(StageId::ordinal), Some(3));
    }

    #[test]
    fn test_stage_roles() {
        for id in PARALLEL_GROUP {
            assert_eq!(id.role(), StageRole::Parallel);
        }
        assert_eq!(SEQUENTIAL_STAGE.role(), StageRole::Sequential);
    }

    #[test]
    fn test_all_covers_every_stage_once() {
        let indices: Vec<usize> = StageId::ALL.iter().map(|s| s.index()).collect();
        assert_eq!(indices, vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn test_stage_id_deserialize_rejects_out_of_range() {
        let ok: StageId = serde_json::from_str("4").unwrap();
        assert_eq!(ok.ordinal(), 4);
        assert!(serde_json::from_str::<StageId>("9").is_err());
    }

    #[test]
    fn test_stage_keys_are_distinct() {
        let keys: std::collections::BTreeSet<&str> = StageId::ALL.iter().map(|s| s.key()).collect();
        assert_eq!(keys.len(), StageId::COUNT);
    }
}
