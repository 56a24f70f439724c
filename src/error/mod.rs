//! Error types for steprun.

pub mod unified;

pub use unified::{ErrorCategory, RecoverySuggestion};

use thiserror::Error;

use crate::types::RunState;

/// A single step could not complete.
///
/// Returned by [`StepUnit::step`](crate::engine::StepUnit::step). The engine never
/// retries a failed step.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct StepFailure {
    message: String,
}

impl StepFailure {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl From<String> for StepFailure {
    fn from(message: String) -> Self {
        Self::new(message)
    }
}

impl From<&str> for StepFailure {
    fn from(message: &str) -> Self {
        Self::new(message)
    }
}

/// Why a stream sink refused an event or a terminal signal.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DeliveryError {
    /// The underlying transport is broken.
    #[error("transport failure: {0}")]
    Transport(String),

    /// The sink already completed, or the consumer closed it.
    #[error("stream already closed")]
    Closed,
}

/// Primary error type for all steprun operations.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Cannot run from state: {state}")]
    InvalidState { state: RunState },

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Step failed: {0}")]
    Step(#[from] StepFailure),

    #[error("Transport failure: {0}")]
    Transport(String),

    #[error("Stream cancelled by consumer")]
    ConsumerCancelled,

    #[error("Timeout after {0}ms")]
    Timeout(u64),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("PDF error: {0}")]
    Pdf(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },
}

impl From<DeliveryError> for EngineError {
    fn from(err: DeliveryError) -> Self {
        match err {
            DeliveryError::Transport(message) => Self::Transport(message),
            DeliveryError::Closed => Self::ConsumerCancelled,
        }
    }
}

impl EngineError {
    /// Rejection for a blank prompt.
    pub fn blank_prompt() -> Self {
        Self::InvalidArgument("Cannot run with an empty prompt".into())
    }

    /// Classify this error into a category.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::InvalidState { .. } | Self::InvalidArgument(_) => ErrorCategory::Precondition,
            Self::Step(_) => ErrorCategory::Step,
            Self::Transport(_) | Self::ConsumerCancelled => ErrorCategory::Delivery,
            Self::Timeout(_) => ErrorCategory::Timeout,
            Self::Configuration(_) => ErrorCategory::Configuration,
            Self::Io(_) | Self::Pdf(_) => ErrorCategory::Io,
            Self::Serialization(_) | Self::Toml(_) => ErrorCategory::Serialization,
            Self::Network(_) | Self::Api { .. } => ErrorCategory::Network,
        }
    }

    /// Whether the call was rejected before any state change.
    pub fn is_precondition(&self) -> bool {
        self.category() == ErrorCategory::Precondition
    }

    /// Suggest recovery actions.
    pub fn recovery_suggestion(&self) -> RecoverySuggestion {
        match self {
            Self::InvalidState { .. } => RecoverySuggestion::ResetEngine,
            Self::InvalidArgument(_) => RecoverySuggestion::FixInput,
            Self::Step(_) => RecoverySuggestion::InspectStepUnit,
            Self::Transport(_) | Self::ConsumerCancelled => RecoverySuggestion::Reconnect,
            Self::Timeout(_) => RecoverySuggestion::IncreaseTimeout,
            Self::Configuration(_) | Self::Toml(_) => RecoverySuggestion::CheckConfiguration,
            Self::Io(_)
            | Self::Pdf(_)
            | Self::Serialization(_)
            | Self::Network(_)
            | Self::Api { .. } => RecoverySuggestion::RetryLater,
        }
    }
}

/// Convenience alias.
pub type Result<T> = std::result::Result<T, EngineError>;
