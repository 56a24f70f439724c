//! Stream sinks: where a streaming run delivers its events.

use std::pin::Pin;
use std::sync::{Mutex, PoisonError};
use std::task::{Context, Poll};

use async_trait::async_trait;
use futures::Stream;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::error::{DeliveryError, EngineError};

/// Destination for a streaming run's events.
///
/// A sink accepts text events until it receives a terminal signal. Implementations
/// should refuse a second terminal signal with [`DeliveryError::Closed`]; the engine
/// routes every terminal signal through a
/// [`CompletionGuard`](super::guard::CompletionGuard) so that never happens.
#[async_trait]
pub trait StreamSink: Send + Sync {
    /// Deliver one event.
    async fn send(&self, event: String) -> Result<(), DeliveryError>;

    /// Signal normal completion.
    fn complete(&self) -> Result<(), DeliveryError>;

    /// Signal error completion.
    fn complete_with_error(&self, error: &EngineError) -> Result<(), DeliveryError>;

    /// Resolves once the consumer side has gone away.
    async fn closed(&self);

    /// Whether events can no longer be delivered.
    fn is_closed(&self) -> bool;
}

/// What a [`StepStream`] consumer receives.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "text", rename_all = "snake_case")]
pub enum StreamEvent {
    /// One text event (a step record, a truncation notice, a rejection).
    Message(String),
    /// Normal completion.
    Completed,
    /// Error completion.
    Failed(String),
}

impl StreamEvent {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Message(_))
    }
}

/// Create an in-process sink/stream pair.
pub fn channel() -> (ChannelSink, StepStream) {
    let (tx, rx) = mpsc::unbounded_channel();
    (
        ChannelSink {
            tx: Mutex::new(Some(tx)),
        },
        StepStream { rx, done: false },
    )
}

/// Engine side of [`channel`].
#[derive(Debug)]
pub struct ChannelSink {
    tx: Mutex<Option<mpsc::UnboundedSender<StreamEvent>>>,
}

impl ChannelSink {
    fn sender(&self) -> Option<mpsc::UnboundedSender<StreamEvent>> {
        self.tx
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn finish(&self, event: StreamEvent) -> Result<(), DeliveryError> {
        let tx = self
            .tx
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
            .ok_or(DeliveryError::Closed)?;
        tx.send(event).map_err(|_| DeliveryError::Closed)
    }
}

#[async_trait]
impl StreamSink for ChannelSink {
    async fn send(&self, event: String) -> Result<(), DeliveryError> {
        let tx = self.sender().ok_or(DeliveryError::Closed)?;
        tx.send(StreamEvent::Message(event))
            .map_err(|_| DeliveryError::Closed)
    }

    fn complete(&self) -> Result<(), DeliveryError> {
        self.finish(StreamEvent::Completed)
    }

    fn complete_with_error(&self, error: &EngineError) -> Result<(), DeliveryError> {
        self.finish(StreamEvent::Failed(error.to_string()))
    }

    async fn closed(&self) {
        if let Some(tx) = self.sender() {
            tx.closed().await;
        }
    }

    fn is_closed(&self) -> bool {
        self.sender().map_or(true, |tx| tx.is_closed())
    }
}

/// Consumer side of [`channel`].
///
/// Yields events in step order and ends after the first terminal event. Dropping the
/// stream, or calling [`close`](Self::close), cancels the run at its next delivery.
#[derive(Debug)]
pub struct StepStream {
    rx: mpsc::UnboundedReceiver<StreamEvent>,
    done: bool,
}

impl StepStream {
    /// Stop receiving; the run notices at its next delivery attempt.
    pub fn close(&mut self) {
        self.rx.close();
        self.done = true;
    }

    /// Receive the next event, or `None` once the stream has ended.
    pub async fn recv(&mut self) -> Option<StreamEvent> {
        if self.done {
            return None;
        }
        let event = self.rx.recv().await;
        self.observe(event.as_ref());
        event
    }

    fn observe(&mut self, event: Option<&StreamEvent>) {
        match event {
            Some(event) if !event.is_terminal() => {}
            _ => self.done = true,
        }
    }
}

impl Stream for StepStream {
    type Item = StreamEvent;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        if self.done {
            return Poll::Ready(None);
        }
        let polled = self.rx.poll_recv(cx);
        if let Poll::Ready(event) = &polled {
            let event = event.as_ref();
            self.observe(event);
        }
        polled
    }
}
