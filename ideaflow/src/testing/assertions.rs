//! Assertions over tracker snapshots.

use crate::core::{StageId, StageStatus};
use crate::tracker::TrackerSnapshot;

/// Asserts every stage status, in ordinal order.
///
/// # Panics
///
/// Panics if any stage differs.
pub fn assert_stages(snapshot: &TrackerSnapshot, expected: [StageStatus; StageId::COUNT]) {
    assert_eq!(
        snapshot.stages, expected,
        "stage statuses of job {} differ",
        snapshot.job_id
    );
}

/// Asserts the snapshot ended with `message` as its error.
///
/// # Panics
///
/// Panics if the snapshot has a different or no error.
pub fn assert_failed_with(snapshot: &TrackerSnapshot, message: &str) {
    assert_eq!(
        snapshot.error.as_deref(),
        Some(message),
        "job {} in phase {}",
        snapshot.job_id,
        snapshot.phase
    );
}

/// Asserts the scheduled stage ordering holds: stage 5 runs only after
/// stages 1 to 4 are done.
///
/// # Panics
///
/// Panics if stage 5 has started while any of stages 1 to 4 has not finished.
pub fn assert_sequential_order(snapshot: &TrackerSnapshot) {
    let sequential = snapshot.status_of(crate::core::SEQUENTIAL_STAGE);
    if sequential != StageStatus::Waiting && !snapshot.completed {
        for stage in crate::core::PARALLEL_GROUP {
            assert_eq!(
                snapshot.status_of(stage),
                StageStatus::Done,
                "stage {} is not done but stage 5 is {:?}",
                stage.ordinal(),
                sequential
            );
        }
    }
}
