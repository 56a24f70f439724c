//! Core data types: run state, step records, history entries.

pub mod message;
pub mod run;

pub use message::{HistoryEntry, Role};
pub use run::{failure_line, truncation_line, RunState, StepRecord};
