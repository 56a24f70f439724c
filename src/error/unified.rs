//! Error classification shared by the engine, its sinks and the CLI.

use serde::{Deserialize, Serialize};

/// Broad error category used to decide how a failure surfaces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// Rejected before any state change (bad state or blank prompt).
    Precondition,
    /// A single step could not complete.
    Step,
    /// Delivery to a stream consumer failed or the consumer went away.
    Delivery,
    Timeout,
    Configuration,
    Io,
    Serialization,
    Network,
}

/// Suggested follow-up for a failed call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecoverySuggestion {
    /// Wait for the current run to finish or call `reset()`.
    ResetEngine,
    /// Fix the caller input and retry.
    FixInput,
    /// Inspect the step unit; failed steps are never retried by the engine.
    InspectStepUnit,
    /// Reconnect the consumer and start a new run.
    Reconnect,
    IncreaseTimeout,
    CheckConfiguration,
    RetryLater,
}
