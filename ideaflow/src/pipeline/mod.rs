//! Pipeline progress tracking.
//!
//! This module provides:
//! - The per-stage pipeline state machine
//! - The reconnection policy
//! - The connection lifecycle state machine

mod lifecycle;
mod retry;
mod state;

pub use lifecycle::{transition, ConnectionLifecycle, ConnectionPhase, Effect, LifecycleInput};
pub use retry::{BackoffStrategy, JitterStrategy, ReconnectConfig, ReconnectPolicy, RetryDecision};
pub use state::{AgentOutput, PipelineState, StageChange, TerminalOutcome, Transition};
