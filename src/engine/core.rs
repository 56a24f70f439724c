//! The execution engine: state machine plus the blocking step loop.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

use futures::FutureExt;
use tokio::sync::{watch, Mutex};
use tracing::Instrument;
use uuid::Uuid;

use super::history::MessageHistory;
use super::unit::{StepContext, StepUnit};
use crate::config::EngineConfig;
use crate::error::{EngineError, Result, StepFailure};
use crate::types::{failure_line, truncation_line, HistoryEntry, RunState, StepRecord};

/// Drives a [`StepUnit`] through a bounded loop of steps.
///
/// One engine serves one run at a time: [`run`](Self::run) and
/// [`run_stream`](Self::run_stream) only start from [`RunState::Idle`] and reject
/// everything else before touching any state. After a run ends the engine stays in
/// `Finished` or `Error` until [`reset`](Self::reset) is called.
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use steprun::prelude::*;
///
/// # async fn example() -> steprun::error::Result<()> {
/// let unit = FnStepUnit::new(|input: StepInput| async move {
///     Ok(StepOutput::Continue(format!("worked on step {}", input.step_number)))
/// });
/// let engine = ExecutionEngine::new(Arc::new(unit), EngineConfig::builder().max_steps(3).build());
/// let report = engine.run("summarise the repo").await?;
/// println!("{report}");
/// # Ok(())
/// # }
/// ```
pub struct ExecutionEngine {
    pub(super) inner: Arc<EngineInner>,
}

pub(super) struct EngineInner {
    pub(super) config: EngineConfig,
    pub(super) unit: Arc<dyn StepUnit>,
    pub(super) state: watch::Sender<RunState>,
    pub(super) history: Mutex<MessageHistory>,
    current_step: AtomicUsize,
    generation: AtomicU64,
}

impl ExecutionEngine {
    pub fn new(unit: Arc<dyn StepUnit>, config: EngineConfig) -> Self {
        let (state, _) = watch::channel(RunState::Idle);
        Self {
            inner: Arc::new(EngineInner {
                config,
                unit,
                state,
                history: Mutex::new(MessageHistory::new()),
                current_step: AtomicUsize::new(0),
                generation: AtomicU64::new(0),
            }),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.inner.config
    }

    pub fn state(&self) -> RunState {
        self.inner.state()
    }

    /// Subscribe to state transitions.
    pub fn watch_state(&self) -> watch::Receiver<RunState> {
        self.inner.state.subscribe()
    }

    /// Number of the most recently started step (0 before the first).
    pub fn current_step(&self) -> usize {
        self.inner.current_step()
    }

    /// Snapshot of the message history.
    ///
    /// Waits for an in-flight step to return, since the step holds the history.
    pub async fn history(&self) -> Vec<HistoryEntry> {
        self.inner.history.lock().await.entries().to_vec()
    }

    /// Run to completion on the caller's task.
    ///
    /// Returns the step records joined by newlines. A failing step does not fail the
    /// call: the failure becomes the last line and the engine ends in
    /// [`RunState::Error`]. Only the preconditions are returned as errors:
    /// [`EngineError::InvalidState`] when not idle, [`EngineError::InvalidArgument`]
    /// for a blank prompt.
    ///
    /// Dropping the returned future before it resolves (a caller-side timeout, a
    /// losing `select!` branch) moves the engine to [`RunState::Error`] and runs
    /// `cleanup` on a spawned task, so the engine can be [`reset`](Self::reset).
    pub async fn run(&self, prompt: &str) -> Result<String> {
        self.inner.begin(prompt)?;
        let scope = RunScope::new(self.inner.clone());
        let abandoned = AbandonGuard::new(scope.clone());
        let span = tracing::info_span!(
            "run",
            run_id = %Uuid::new_v4(),
            engine = %self.inner.config.name,
            mode = "blocking"
        );
        async move {
            scope.inner.history.lock().await.add_user(prompt);
            let lines = scope.run_steps().await;
            scope.inner.cleanup().await;
            abandoned.disarm();
            Ok(lines.join("\n"))
        }
        .instrument(span)
        .await
    }

    /// Return a finished or failed engine to `Idle`, clearing history and counters.
    ///
    /// Rejected with [`EngineError::InvalidState`] while a run is in progress. If a
    /// timed-out step is still executing, this waits for it to return.
    pub async fn reset(&self) -> Result<()> {
        let state = self.inner.state();
        if state == RunState::Running {
            return Err(EngineError::InvalidState { state });
        }
        let mut history = self.inner.history.lock().await;
        let state = self.inner.state();
        if state == RunState::Running {
            return Err(EngineError::InvalidState { state });
        }
        history.clear();
        self.inner.current_step.store(0, Ordering::SeqCst);
        self.inner.generation.fetch_add(1, Ordering::SeqCst);
        self.inner.state.send_replace(RunState::Idle);
        tracing::debug!(engine = %self.inner.config.name, "engine reset");
        Ok(())
    }
}

impl std::fmt::Debug for ExecutionEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExecutionEngine")
            .field("config", &self.inner.config)
            .field("state", &self.inner.state())
            .field("current_step", &self.inner.current_step())
            .finish_non_exhaustive()
    }
}

impl EngineInner {
    pub(super) fn state(&self) -> RunState {
        *self.state.borrow()
    }

    pub(super) fn current_step(&self) -> usize {
        self.current_step.load(Ordering::SeqCst)
    }

    /// Check preconditions and move Idle → Running.
    pub(super) fn begin(&self, prompt: &str) -> Result<()> {
        let state = self.state();
        if state != RunState::Idle {
            return Err(EngineError::InvalidState { state });
        }
        if prompt.trim().is_empty() {
            return Err(EngineError::blank_prompt());
        }
        let started = self.state.send_if_modified(|state| {
            if *state == RunState::Idle {
                *state = RunState::Running;
                true
            } else {
                false
            }
        });
        if !started {
            return Err(EngineError::InvalidState {
                state: self.state(),
            });
        }
        Ok(())
    }

    /// Invoke the unit once, converting a panic into a step failure.
    pub(super) async fn execute_step(&self, step: usize) -> std::result::Result<String, StepFailure> {
        self.current_step.store(step, Ordering::SeqCst);
        tracing::info!(step, max_steps = self.config.max_steps, "executing step");
        let mut history = self.history.lock().await;
        let mut ctx = StepContext::new(step, &self.config, &mut history, &self.state);
        match AssertUnwindSafe(self.unit.step(&mut ctx)).catch_unwind().await {
            Ok(result) => result,
            Err(payload) => Err(StepFailure::new(format!(
                "step panicked: {}",
                panic_message(payload.as_ref())
            ))),
        }
    }

    pub(super) async fn cleanup(&self) {
        if let Err(payload) = AssertUnwindSafe(self.unit.cleanup()).catch_unwind().await {
            tracing::error!(error = %panic_message(payload.as_ref()), "cleanup panicked");
        }
    }
}

/// A handle on the engine bound to one run.
///
/// Transitions made through a scope are ignored once the engine has been reset, so a
/// late step from an abandoned run cannot touch the next one.
#[derive(Clone)]
pub(super) struct RunScope {
    pub(super) inner: Arc<EngineInner>,
    generation: u64,
}

impl RunScope {
    pub(super) fn new(inner: Arc<EngineInner>) -> Self {
        let generation = inner.generation.load(Ordering::SeqCst);
        Self { inner, generation }
    }

    fn is_current(&self) -> bool {
        self.inner.generation.load(Ordering::SeqCst) == self.generation
    }

    pub(super) fn is_running(&self) -> bool {
        self.is_current() && self.inner.state() == RunState::Running
    }

    /// Move `from` → `to`; returns whether the transition happened.
    pub(super) fn transition(&self, from: RunState, to: RunState) -> bool {
        if !self.is_current() {
            return false;
        }
        let changed = self.inner.state.send_if_modified(|state| {
            if *state == from {
                *state = to;
                true
            } else {
                false
            }
        });
        if changed {
            tracing::debug!(%from, %to, "state transition");
        }
        changed
    }

    /// The blocking loop. Returns the report lines.
    async fn run_steps(&self) -> Vec<String> {
        let max_steps = self.inner.config.max_steps;
        let mut lines = Vec::new();
        for step in 1..=max_steps {
            if !self.is_running() {
                break;
            }
            match self.inner.execute_step(step).await {
                Ok(text) => lines.push(StepRecord::new(step, text).to_string()),
                Err(failure) => {
                    tracing::error!(step, error = %failure, "step failed");
                    self.transition(RunState::Running, RunState::Error);
                    lines.push(failure_line(step, failure.message()));
                    return lines;
                }
            }
        }
        if self.inner.current_step() >= max_steps
            && self.transition(RunState::Running, RunState::Finished)
        {
            tracing::info!(max_steps, "step budget exhausted");
            lines.push(truncation_line(max_steps));
        }
        lines
    }
}

/// Armed for the lifetime of a blocking run; fires if the run future is dropped.
struct AbandonGuard {
    scope: RunScope,
    armed: bool,
}

impl AbandonGuard {
    fn new(scope: RunScope) -> Self {
        Self { scope, armed: true }
    }

    fn disarm(mut self) {
        self.armed = false;
    }
}

impl Drop for AbandonGuard {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        self.scope.transition(RunState::Running, RunState::Error);
        tracing::warn!(
            step = self.scope.inner.current_step(),
            "blocking run dropped before completion"
        );
        let inner = self.scope.inner.clone();
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move { inner.cleanup().await });
            }
            Err(_) => tracing::error!("no runtime left to clean up the abandoned run"),
        }
    }
}

pub(super) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
