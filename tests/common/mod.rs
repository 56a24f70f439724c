//! Shared test helpers.
#![allow(dead_code)]

use std::sync::Arc;

use steprun::config::EngineConfig;
use steprun::engine::{ExecutionEngine, FnStepUnit, StepInput, StepOutput, StepStream, StreamEvent};
use steprun::error::StepFailure;

/// A unit that replies `ok-{n}` and finishes on step `finish_at`, if given.
pub fn counting_unit(finish_at: Option<usize>) -> FnStepUnit {
    FnStepUnit::new(move |input: StepInput| async move {
        let text = format!("ok-{}", input.step_number);
        if Some(input.step_number) == finish_at {
            Ok(StepOutput::Finish(text))
        } else {
            Ok(StepOutput::Continue(text))
        }
    })
}

/// A unit that fails on step `fail_at` with `message`.
pub fn failing_unit(fail_at: usize, message: &'static str) -> FnStepUnit {
    FnStepUnit::new(move |input: StepInput| async move {
        if input.step_number == fail_at {
            Err(StepFailure::new(message))
        } else {
            Ok(StepOutput::Continue(format!("ok-{}", input.step_number)))
        }
    })
}

pub fn engine(unit: FnStepUnit, max_steps: usize) -> ExecutionEngine {
    ExecutionEngine::new(
        Arc::new(unit),
        EngineConfig::builder().name("test").max_steps(max_steps).build(),
    )
}

/// Drain a stream up to and including its terminal event.
pub async fn collect(mut stream: StepStream) -> Vec<StreamEvent> {
    let mut events = Vec::new();
    while let Some(event) = stream.recv().await {
        events.push(event);
    }
    events
}

pub fn message(text: &str) -> StreamEvent {
    StreamEvent::Message(text.to_string())
}
