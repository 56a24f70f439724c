//! Run lifecycle state and per-step results.

use std::fmt;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Lifecycle state of an [`ExecutionEngine`](crate::engine::ExecutionEngine).
///
/// A run starts only from `Idle`; `Finished` and `Error` are terminal for the run.
#[derive(
    Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash, Display, EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum RunState {
    #[default]
    Idle,
    Running,
    Finished,
    Error,
}

impl RunState {
    /// Whether no further steps may execute in this run.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Finished | Self::Error)
    }
}

/// The immutable result of one step.
///
/// Renders as `Step {n}: {text}`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StepRecord {
    step_number: usize,
    text: String,
}

impl StepRecord {
    pub fn new(step_number: usize, text: impl Into<String>) -> Self {
        Self {
            step_number,
            text: text.into(),
        }
    }

    pub fn step_number(&self) -> usize {
        self.step_number
    }

    pub fn text(&self) -> &str {
        &self.text
    }
}

impl fmt::Display for StepRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Step {}: {}", self.step_number, self.text)
    }
}

/// Line reported when a step fails.
pub fn failure_line(step_number: usize, message: &str) -> String {
    format!("Step {step_number} failed: {message}")
}

/// Line reported when the step budget runs out.
pub fn truncation_line(max_steps: usize) -> String {
    format!("Terminated: Reached max steps ({max_steps})")
}
