//! Core domain model types for ideaflow.
//!
//! This module contains the fundamental types used throughout the tracker:
//! - Stage identities and their dependency roles
//! - Stage status enum
//! - Pipeline events decoded from the server-push stream

mod event;
mod stage;
mod status;

pub use event::{AgentCompleted, CompletionNotice, PipelineEvent};
pub use stage::{StageId, StageRole, PARALLEL_GROUP, SEQUENTIAL_STAGE};
pub use status::StageStatus;
