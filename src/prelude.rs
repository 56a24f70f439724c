//! Convenience re-exports for common use.

pub use crate::config::{EngineConfig, StepRunConfig, ToolSettings};
pub use crate::engine::{
    channel, ExecutionEngine, FnStepUnit, MessageHistory, StepContext, StepInput, StepOutput,
    StepStream, StepUnit, StreamEvent, StreamRun, StreamSink,
};
pub use crate::error::{EngineError, Result, StepFailure};
pub use crate::plan::{Plan, PlanStepUnit};
pub use crate::tools::{AgentTool, Tool, ToolArguments, ToolParameters, Toolbox};
pub use crate::types::{HistoryEntry, Role, RunState, StepRecord};
