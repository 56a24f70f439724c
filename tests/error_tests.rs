//! Tests for the error taxonomy.

use steprun::error::unified::*;
use steprun::error::*;
use steprun::types::RunState;

#[test]
fn precondition_errors_render_stable_messages() {
    let state = EngineError::InvalidState {
        state: RunState::Running,
    };
    assert_eq!(state.to_string(), "Cannot run from state: running");
    assert_eq!(
        EngineError::blank_prompt().to_string(),
        "Invalid argument: Cannot run with an empty prompt"
    );
    assert!(state.is_precondition());
    assert!(EngineError::blank_prompt().is_precondition());
}

#[test]
fn helper_mappings_are_stable() {
    let cases = vec![
        (
            EngineError::InvalidState { state: RunState::Finished },
            ErrorCategory::Precondition,
            RecoverySuggestion::ResetEngine,
        ),
        (
            EngineError::InvalidArgument("x".into()),
            ErrorCategory::Precondition,
            RecoverySuggestion::FixInput,
        ),
        (
            StepFailure::new("boom").into(),
            ErrorCategory::Step,
            RecoverySuggestion::InspectStepUnit,
        ),
        (
            EngineError::Transport("reset by peer".into()),
            ErrorCategory::Delivery,
            RecoverySuggestion::Reconnect,
        ),
        (
            EngineError::ConsumerCancelled,
            ErrorCategory::Delivery,
            RecoverySuggestion::Reconnect,
        ),
        (
            EngineError::Timeout(500),
            ErrorCategory::Timeout,
            RecoverySuggestion::IncreaseTimeout,
        ),
        (
            EngineError::Pdf("font unavailable".into()),
            ErrorCategory::Io,
            RecoverySuggestion::RetryLater,
        ),
        (
            EngineError::Configuration("bad".into()),
            ErrorCategory::Configuration,
            RecoverySuggestion::CheckConfiguration,
        ),
        (
            EngineError::Api { status: 500, message: "down".into() },
            ErrorCategory::Network,
            RecoverySuggestion::RetryLater,
        ),
    ];

    for (error, category, recovery) in cases {
        assert_eq!(error.category(), category, "{error}");
        assert_eq!(error.recovery_suggestion(), recovery, "{error}");
        assert!(!error.to_string().is_empty());
    }
}

#[test]
fn delivery_errors_map_onto_engine_errors() {
    let err: EngineError = DeliveryError::Transport("pipe".into()).into();
    assert_eq!(err.to_string(), "Transport failure: pipe");
    let err: EngineError = DeliveryError::Closed.into();
    assert!(matches!(err, EngineError::ConsumerCancelled));
}

#[test]
fn step_failure_displays_its_message() {
    let failure = StepFailure::from("model unavailable");
    assert_eq!(failure.message(), "model unavailable");
    assert_eq!(EngineError::from(failure).to_string(), "Step failed: model unavailable");
}

#[test]
fn categories_serialize_as_snake_case() {
    let json = serde_json::to_string(&ErrorCategory::Precondition).unwrap();
    assert_eq!(json, "\"precondition\"");
}
