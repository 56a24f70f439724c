//! The step unit contract: one unit of reasoning or action per call.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::watch;

use super::history::MessageHistory;
use crate::config::EngineConfig;
use crate::error::StepFailure;
use crate::types::RunState;

/// Performs a single step of a run.
///
/// Implementations read the history, do one unit of work, append any new entries,
/// and return a human-readable summary. To end the run early, call
/// [`StepContext::finish`]; the engine checks its state before starting the next step.
#[async_trait]
pub trait StepUnit: Send + Sync {
    async fn step(&self, ctx: &mut StepContext<'_>) -> Result<String, StepFailure>;

    /// Release resources held for the run.
    ///
    /// Runs on every exit path. In streaming mode the lifecycle watcher may call it
    /// again after the loop has, so it must be idempotent.
    async fn cleanup(&self) {}
}

/// What a step can see and change while it runs.
pub struct StepContext<'a> {
    step_number: usize,
    config: &'a EngineConfig,
    history: &'a mut MessageHistory,
    state: &'a watch::Sender<RunState>,
}

impl<'a> StepContext<'a> {
    pub(crate) fn new(
        step_number: usize,
        config: &'a EngineConfig,
        history: &'a mut MessageHistory,
        state: &'a watch::Sender<RunState>,
    ) -> Self {
        Self {
            step_number,
            config,
            history,
            state,
        }
    }

    /// 1-based number of the step being executed.
    pub fn step_number(&self) -> usize {
        self.step_number
    }

    pub fn max_steps(&self) -> usize {
        self.config.max_steps
    }

    pub fn config(&self) -> &EngineConfig {
        self.config
    }

    pub fn history(&self) -> &MessageHistory {
        self.history
    }

    pub fn history_mut(&mut self) -> &mut MessageHistory {
        self.history
    }

    /// Request that the run finish after this step.
    ///
    /// Returns `false` if the run had already left `Running` (timed out, cancelled).
    pub fn finish(&self) -> bool {
        self.state.send_if_modified(|state| {
            if *state == RunState::Running {
                *state = RunState::Finished;
                true
            } else {
                false
            }
        })
    }

    pub fn is_finished(&self) -> bool {
        *self.state.borrow() == RunState::Finished
    }
}

type StepFuture = Pin<Box<dyn Future<Output = Result<StepOutput, StepFailure>> + Send>>;

/// Input handed to an [`FnStepUnit`] closure.
#[derive(Debug, Clone)]
pub struct StepInput {
    pub step_number: usize,
    pub max_steps: usize,
    /// Text of the most recent history entry.
    pub last_text: Option<String>,
}

/// What an [`FnStepUnit`] closure returns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepOutput {
    /// Report text and keep going.
    Continue(String),
    /// Report text and finish the run.
    Finish(String),
}

type StepHandler = dyn Fn(StepInput) -> StepFuture + Send + Sync;

/// Closure-based step unit for quick wiring and tests.
///
/// The returned text is also appended to the history as an assistant entry.
pub struct FnStepUnit {
    handler: Arc<StepHandler>,
}

impl FnStepUnit {
    pub fn new<F, Fut>(handler: F) -> Self
    where
        F: Fn(StepInput) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<StepOutput, StepFailure>> + Send + 'static,
    {
        Self {
            handler: Arc::new(move |input| Box::pin(handler(input))),
        }
    }
}

#[async_trait]
impl StepUnit for FnStepUnit {
    async fn step(&self, ctx: &mut StepContext<'_>) -> Result<String, StepFailure> {
        let input = StepInput {
            step_number: ctx.step_number(),
            max_steps: ctx.max_steps(),
            last_text: ctx.history().entries().last().map(|entry| entry.text.clone()),
        };
        let text = match (self.handler)(input).await? {
            StepOutput::Continue(text) => text,
            StepOutput::Finish(text) => {
                ctx.finish();
                text
            }
        };
        ctx.history_mut().add_assistant(text.clone());
        Ok(text)
    }
}

impl std::fmt::Debug for FnStepUnit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FnStepUnit").finish_non_exhaustive()
    }
}
