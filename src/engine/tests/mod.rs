use super::*;

use std::sync::atomic::Ordering;
use std::sync::Arc;

use tokio::time::{timeout, Duration};

use crate::config::EngineConfig;
use crate::error::EngineError;
use crate::types::{Role, RunState};

mod support;

use support::{RecordingSink, Script, ScriptedUnit};

fn engine_with(unit: &Arc<ScriptedUnit>, max_steps: usize) -> ExecutionEngine {
    ExecutionEngine::new(
        unit.clone(),
        EngineConfig::builder().max_steps(max_steps).build(),
    )
}
