//! steprun: a step-based autonomous task runner core.
//!
//! An [`ExecutionEngine`](engine::ExecutionEngine) drives a
//! [`StepUnit`](engine::StepUnit) through a bounded loop of steps, either to
//! completion on the caller's task ([`run`](engine::ExecutionEngine::run)) or on a
//! spawned task that streams each step as it completes
//! ([`run_stream`](engine::ExecutionEngine::run_stream)). A streamed run always
//! ends with exactly one terminal signal.
//!
//! # Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use steprun::prelude::*;
//!
//! # async fn example() -> steprun::error::Result<()> {
//! let unit = FnStepUnit::new(|input: StepInput| async move {
//!     if input.step_number == 2 {
//!         Ok(StepOutput::Finish("done".to_string()))
//!     } else {
//!         Ok(StepOutput::Continue("looking around".to_string()))
//!     }
//! });
//! let engine = ExecutionEngine::new(Arc::new(unit), EngineConfig::default());
//! let mut events = engine.run_stream("tidy the notes");
//! while let Some(event) = events.recv().await {
//!     println!("{event:?}");
//! }
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod engine;
pub mod error;
pub mod plan;
pub mod prelude;
pub mod tools;
pub mod types;

#[cfg(feature = "cli")]
pub mod cli;
