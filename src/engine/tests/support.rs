use super::*;

use std::sync::atomic::{AtomicBool, AtomicUsize};
use std::sync::Mutex;

use async_trait::async_trait;
use tokio::sync::{watch, Notify};

use crate::error::{DeliveryError, StepFailure};

/// One scripted step behaviour. Steps past the end of the script reply `ok-{n}`.
#[derive(Clone)]
pub(super) enum Script {
    Reply(&'static str),
    Finish(&'static str),
    Fail(&'static str),
    Panic(&'static str),
    /// Block until the gate is notified, then reply.
    Gate(Arc<Notify>, &'static str),
    /// Sleep on the tokio clock, then finish the run.
    SleepThenFinish(Duration, &'static str),
}

pub(super) struct ScriptedUnit {
    script: Vec<Script>,
    /// Cleanup sleeps this long before counting itself.
    cleanup_delay: Option<Duration>,
    pub(super) calls: AtomicUsize,
    pub(super) cleanups: AtomicUsize,
    pub(super) cleaned: Notify,
}

impl ScriptedUnit {
    pub(super) fn new(script: Vec<Script>) -> Arc<Self> {
        Arc::new(Self {
            script,
            cleanup_delay: None,
            calls: AtomicUsize::new(0),
            cleanups: AtomicUsize::new(0),
            cleaned: Notify::new(),
        })
    }

    pub(super) fn with_slow_cleanup(script: Vec<Script>, delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            script,
            cleanup_delay: Some(delay),
            calls: AtomicUsize::new(0),
            cleanups: AtomicUsize::new(0),
            cleaned: Notify::new(),
        })
    }

    pub(super) fn always_ok() -> Arc<Self> {
        Self::new(Vec::new())
    }

    pub(super) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub(super) fn cleanups(&self) -> usize {
        self.cleanups.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl StepUnit for ScriptedUnit {
    async fn step(&self, ctx: &mut StepContext<'_>) -> Result<String, StepFailure> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let n = ctx.step_number();
        let behaviour = self.script.get(n - 1).cloned();
        let text = match behaviour {
            None => format!("ok-{n}"),
            Some(Script::Reply(text)) => text.to_string(),
            Some(Script::Finish(text)) => {
                ctx.finish();
                text.to_string()
            }
            Some(Script::Fail(message)) => return Err(StepFailure::new(message)),
            Some(Script::Panic(message)) => panic!("{message}"),
            Some(Script::Gate(gate, text)) => {
                gate.notified().await;
                text.to_string()
            }
            Some(Script::SleepThenFinish(delay, text)) => {
                tokio::time::sleep(delay).await;
                ctx.finish();
                text.to_string()
            }
        };
        ctx.history_mut().add_assistant(text.clone());
        Ok(text)
    }

    async fn cleanup(&self) {
        if let Some(delay) = self.cleanup_delay {
            tokio::time::sleep(delay).await;
        }
        self.cleanups.fetch_add(1, Ordering::SeqCst);
        self.cleaned.notify_one();
    }
}

/// Sink double that records everything and can simulate transport and consumer
/// failures.
pub(super) struct RecordingSink {
    pub(super) events: Mutex<Vec<String>>,
    pub(super) completions: AtomicUsize,
    pub(super) errors: Mutex<Vec<String>>,
    pub(super) refused_terminals: AtomicUsize,
    pub(super) terminated: AtomicBool,
    pub(super) consumer_closed: watch::Sender<bool>,
    /// 1-based index of the event whose delivery fails with a transport error.
    pub(super) fail_transport_at: Option<usize>,
    /// The consumer closes the stream after receiving this many events.
    pub(super) close_after: Option<usize>,
    /// Yield to the scheduler after every delivered event.
    pub(super) yield_on_send: bool,
}

impl Default for RecordingSink {
    fn default() -> Self {
        let (consumer_closed, _) = watch::channel(false);
        Self {
            events: Mutex::new(Vec::new()),
            completions: AtomicUsize::new(0),
            errors: Mutex::new(Vec::new()),
            refused_terminals: AtomicUsize::new(0),
            terminated: AtomicBool::new(false),
            consumer_closed,
            fail_transport_at: None,
            close_after: None,
            yield_on_send: false,
        }
    }
}

impl RecordingSink {
    pub(super) fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub(super) fn failing_transport_at(index: usize) -> Arc<Self> {
        Arc::new(Self {
            fail_transport_at: Some(index),
            ..Self::default()
        })
    }

    pub(super) fn closing_after(events: usize) -> Arc<Self> {
        Arc::new(Self {
            close_after: Some(events),
            ..Self::default()
        })
    }

    pub(super) fn events(&self) -> Vec<String> {
        self.events.lock().expect("events lock").clone()
    }

    pub(super) fn completions(&self) -> usize {
        self.completions.load(Ordering::SeqCst)
    }

    pub(super) fn errors(&self) -> Vec<String> {
        self.errors.lock().expect("errors lock").clone()
    }

    pub(super) fn terminal_signals(&self) -> usize {
        self.completions() + self.errors().len()
    }

    pub(super) fn refused_terminals(&self) -> usize {
        self.refused_terminals.load(Ordering::SeqCst)
    }

    pub(super) fn close_consumer(&self) {
        self.consumer_closed.send_replace(true);
    }

    fn terminate(&self) -> Result<(), DeliveryError> {
        if self.terminated.swap(true, Ordering::SeqCst) {
            self.refused_terminals.fetch_add(1, Ordering::SeqCst);
            return Err(DeliveryError::Closed);
        }
        Ok(())
    }
}

#[async_trait]
impl StreamSink for RecordingSink {
    async fn send(&self, event: String) -> Result<(), DeliveryError> {
        if self.is_closed() {
            return Err(DeliveryError::Closed);
        }
        {
            let mut events = self.events.lock().expect("events lock");
            if self.fail_transport_at == Some(events.len() + 1) {
                return Err(DeliveryError::Transport("broken pipe".into()));
            }
            events.push(event);
            if self.close_after == Some(events.len()) {
                self.close_consumer();
            }
        }
        if self.yield_on_send {
            tokio::task::yield_now().await;
        }
        Ok(())
    }

    fn complete(&self) -> Result<(), DeliveryError> {
        self.terminate()?;
        self.completions.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn complete_with_error(&self, error: &EngineError) -> Result<(), DeliveryError> {
        self.terminate()?;
        self.errors
            .lock()
            .expect("errors lock")
            .push(error.to_string());
        Ok(())
    }

    async fn closed(&self) {
        let mut rx = self.consumer_closed.subscribe();
        let _ = rx.wait_for(|closed| *closed).await;
    }

    fn is_closed(&self) -> bool {
        *self.consumer_closed.borrow() || self.terminated.load(Ordering::SeqCst)
    }
}
