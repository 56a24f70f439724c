//! At-most-once terminal signalling for streaming runs.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::Notify;

use super::channel::StreamSink;
use crate::error::EngineError;

/// One-shot "already completed" flag.
///
/// Every termination path calls [`try_claim`](Self::try_claim); only the first caller
/// wins. Waiters on [`claimed`](Self::claimed) are woken when that happens.
#[derive(Debug, Default)]
pub struct CompletionGuard {
    completed: AtomicBool,
    notify: Notify,
}

impl CompletionGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim the guard. Returns `true` for exactly one caller.
    pub fn try_claim(&self) -> bool {
        let won = self
            .completed
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok();
        if won {
            self.notify.notify_waiters();
        }
        won
    }

    pub fn is_claimed(&self) -> bool {
        self.completed.load(Ordering::Acquire)
    }

    /// Resolves once the guard has been claimed.
    pub async fn claimed(&self) {
        loop {
            let notified = self.notify.notified();
            if self.is_claimed() {
                return;
            }
            notified.await;
        }
    }
}

/// A sink whose terminal signals pass through a [`CompletionGuard`].
#[derive(Clone)]
pub struct GuardedSink {
    sink: Arc<dyn StreamSink>,
    guard: Arc<CompletionGuard>,
}

impl GuardedSink {
    pub fn new(sink: Arc<dyn StreamSink>) -> Self {
        Self {
            sink,
            guard: Arc::new(CompletionGuard::new()),
        }
    }

    pub fn sink(&self) -> &dyn StreamSink {
        self.sink.as_ref()
    }

    pub fn guard(&self) -> &CompletionGuard {
        &self.guard
    }

    /// Signal normal completion if nothing has terminated the stream yet.
    pub fn complete(&self) -> bool {
        if !self.guard.try_claim() {
            return false;
        }
        if let Err(err) = self.sink.complete() {
            tracing::debug!(error = %err, "sink refused completion");
        }
        true
    }

    /// Signal error completion if nothing has terminated the stream yet.
    pub fn complete_with_error(&self, error: &EngineError) -> bool {
        if !self.guard.try_claim() {
            return false;
        }
        if let Err(err) = self.sink.complete_with_error(error) {
            tracing::debug!(error = %err, "sink refused error completion");
        }
        true
    }

    /// Claim the guard without signalling (the consumer already ended the stream).
    pub fn mark_claimed(&self) -> bool {
        self.guard.try_claim()
    }

    /// Resolves when the consumer goes away or the guard is claimed.
    pub async fn ended(&self) {
        tokio::select! {
            _ = self.sink.closed() => {}
            _ = self.guard.claimed() => {}
        }
    }
}

impl std::fmt::Debug for GuardedSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GuardedSink")
            .field("claimed", &self.guard.is_claimed())
            .finish()
    }
}
