//! Execution engine: a bounded, retry-free step loop run either to completion on
//! the caller's task or streamed step by step from a spawned task.

pub mod channel;
mod core;
pub mod guard;
pub mod history;
mod stream;
pub mod unit;

#[cfg(test)]
mod tests;

pub use channel::{channel, ChannelSink, StepStream, StreamEvent, StreamSink};
pub use self::core::ExecutionEngine;
pub use guard::{CompletionGuard, GuardedSink};
pub use history::MessageHistory;
pub use stream::StreamRun;
pub use unit::{FnStepUnit, StepContext, StepInput, StepOutput, StepUnit};
