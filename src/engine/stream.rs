//! Streaming execution: the step loop on a spawned task, with a lifecycle watcher
//! racing it for the single terminal signal.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::Instrument;
use uuid::Uuid;

use super::channel::{channel, StepStream, StreamSink};
use super::core::{panic_message, ExecutionEngine, RunScope};
use super::guard::GuardedSink;
use crate::error::{DeliveryError, EngineError, StepFailure};
use crate::types::{failure_line, truncation_line, RunState, StepRecord};

/// Handle for a streaming run started with
/// [`ExecutionEngine::run_stream_with`].
#[derive(Debug)]
pub struct StreamRun {
    run_id: Uuid,
    task: JoinHandle<()>,
    watcher: Option<JoinHandle<Option<EngineError>>>,
    state: watch::Receiver<RunState>,
}

impl StreamRun {
    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    /// Wait for the loop task and the lifecycle watcher, then report the engine state.
    ///
    /// Does not return while a timed-out step is still executing.
    pub async fn wait(self) -> RunState {
        self.join().await.0
    }

    /// Like [`wait`](Self::wait), but a run stopped by the stream timeout is
    /// [`EngineError::Timeout`].
    ///
    /// The consumer still saw normal completion in that case.
    pub async fn outcome(self) -> Result<RunState, EngineError> {
        match self.join().await {
            (_, Some(err)) => Err(err),
            (state, None) => Ok(state),
        }
    }

    async fn join(self) -> (RunState, Option<EngineError>) {
        if let Err(err) = self.task.await {
            tracing::error!(run_id = %self.run_id, error = %err, "stream task failed");
        }
        let mut stopped_by = None;
        if let Some(watcher) = self.watcher {
            match watcher.await {
                Ok(err) => stopped_by = err,
                Err(err) => {
                    tracing::error!(run_id = %self.run_id, error = %err, "stream watcher failed")
                }
            }
        }
        let state = *self.state.borrow();
        (state, stopped_by)
    }
}

impl ExecutionEngine {
    /// Start a streaming run over an in-process channel.
    ///
    /// Returns immediately; the steps execute on a spawned task and arrive on the
    /// returned [`StepStream`] in order, followed by exactly one terminal event.
    /// Rejections (not idle, blank prompt) arrive as a single `Error: ...` message
    /// followed by normal completion.
    ///
    /// # Panics
    ///
    /// Panics if called outside a Tokio runtime.
    pub fn run_stream(&self, prompt: &str) -> StepStream {
        let (sink, stream) = channel();
        let _detached = self.run_stream_with(prompt, Arc::new(sink));
        stream
    }

    /// Start a streaming run that delivers into `sink`.
    ///
    /// # Panics
    ///
    /// Panics if called outside a Tokio runtime.
    pub fn run_stream_with(&self, prompt: &str, sink: Arc<dyn StreamSink>) -> StreamRun {
        let run_id = Uuid::new_v4();
        let channel = GuardedSink::new(sink);
        let state = self.watch_state();
        let span = tracing::info_span!(
            "run",
            %run_id,
            engine = %self.inner.config.name,
            mode = "stream"
        );

        if let Err(err) = self.inner.begin(prompt) {
            tracing::warn!(parent: &span, error = %err, "stream run rejected");
            let task = tokio::spawn(reject(channel, err).instrument(span));
            return StreamRun {
                run_id,
                task,
                watcher: None,
                state,
            };
        }

        let scope = RunScope::new(self.inner.clone());
        let watcher = tokio::spawn(
            watch_lifecycle(scope.clone(), channel.clone(), self.inner.config.stream_timeout())
                .instrument(span.clone()),
        );
        let task = tokio::spawn(drive(scope, prompt.to_string(), channel).instrument(span));
        StreamRun {
            run_id,
            task,
            watcher: Some(watcher),
            state,
        }
    }
}

/// Soft rejection: one explanatory event, then normal completion.
async fn reject(channel: GuardedSink, err: EngineError) {
    if let Err(send_err) = channel.sink().send(format!("Error: {err}")).await {
        tracing::debug!(error = %send_err, "could not deliver rejection");
    }
    channel.complete();
}

async fn drive(scope: RunScope, prompt: String, channel: GuardedSink) {
    scope.inner.history.lock().await.add_user(prompt);
    let outcome = AssertUnwindSafe(stream_steps(&scope, &channel))
        .catch_unwind()
        .await;
    if let Err(payload) = outcome {
        let message = panic_message(payload.as_ref());
        tracing::error!(error = %message, "streaming loop faulted");
        scope.transition(RunState::Running, RunState::Error);
        if let Err(err) = channel
            .sink()
            .send(format!("Execution error: {message}"))
            .await
        {
            tracing::debug!(error = %err, "could not deliver fault event");
        }
        channel.complete_with_error(&EngineError::Step(StepFailure::new(message)));
    }
    scope.inner.cleanup().await;
}

async fn stream_steps(scope: &RunScope, channel: &GuardedSink) {
    let max_steps = scope.inner.config.max_steps;
    for step in 1..=max_steps {
        if !scope.is_running() {
            break;
        }
        if channel.sink().is_closed() {
            tracing::info!(step, "stream closed before step started");
            scope.transition(RunState::Running, RunState::Finished);
            return;
        }

        let text = match scope.inner.execute_step(step).await {
            Ok(text) => text,
            Err(failure) => {
                tracing::error!(step, error = %failure, "step failed");
                scope.transition(RunState::Running, RunState::Error);
                if let Err(err) = channel
                    .sink()
                    .send(failure_line(step, failure.message()))
                    .await
                {
                    tracing::debug!(error = %err, "could not deliver failure event");
                }
                channel.complete_with_error(&EngineError::Step(failure));
                return;
            }
        };

        match channel.sink().send(StepRecord::new(step, text).to_string()).await {
            Ok(()) => {}
            Err(DeliveryError::Transport(message)) => {
                tracing::warn!(step, error = %message, "failed to deliver step event");
                scope.transition(RunState::Running, RunState::Error);
                channel.complete_with_error(&EngineError::Transport(message));
                return;
            }
            Err(DeliveryError::Closed) => {
                tracing::warn!(step, "stream already closed, stopping");
                scope.transition(RunState::Running, RunState::Finished);
                return;
            }
        }
    }

    if scope.inner.current_step() >= max_steps
        && scope.transition(RunState::Running, RunState::Finished)
    {
        tracing::info!(max_steps, "step budget exhausted");
        if let Err(err) = channel.sink().send(truncation_line(max_steps)).await {
            tracing::debug!(error = %err, "could not deliver truncation notice");
        }
    }
    if channel.sink().is_closed() {
        tracing::info!("stream closed by consumer, no completion sent");
        return;
    }
    channel.complete();
}

/// Timeout and completion callbacks, independent of the loop task.
///
/// Returns [`EngineError::Timeout`] when the timeout stopped the run.
async fn watch_lifecycle(
    scope: RunScope,
    channel: GuardedSink,
    timeout: Duration,
) -> Option<EngineError> {
    tokio::select! {
        biased;
        _ = channel.ended() => {
            // Claim before yielding so the loop cannot signal a consumer that left.
            channel.mark_claimed();
            scope.transition(RunState::Running, RunState::Finished);
            scope.inner.cleanup().await;
            tracing::info!("stream completed");
            None
        }
        _ = tokio::time::sleep(timeout) => {
            let timed_out = scope.transition(RunState::Running, RunState::Error);
            let signalled = channel.complete();
            scope.inner.cleanup().await;
            if !(timed_out && signalled) {
                return None;
            }
            let err = EngineError::Timeout(timeout.as_millis() as u64);
            tracing::warn!(error = %err, "stream timed out");
            Some(err)
        }
    }
}
