//! A scripted step unit driven by a TOML plan.
//!
//! ```toml
//! max_steps = 4
//!
//! [[steps]]
//! say = "Drafting the itinerary"
//!
//! [[steps]]
//! tool = "generate_pdf"
//! args = { file_name = "trip.pdf", content = "Day 1: museum" }
//! finish = true
//! ```

use std::path::Path;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::engine::{StepContext, StepUnit};
use crate::error::{Result, StepFailure};
use crate::tools::{ToolArguments, Toolbox};

/// An ordered list of planned steps.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Plan {
    /// Overrides the engine's step budget when set.
    #[serde(default)]
    pub max_steps: Option<usize>,
    #[serde(default)]
    pub steps: Vec<PlannedStep>,
}

/// One planned step: say something, call a tool, or both.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlannedStep {
    #[serde(default)]
    pub say: Option<String>,
    #[serde(default)]
    pub tool: Option<String>,
    #[serde(default)]
    pub args: Option<Value>,
    /// End the run after this step.
    #[serde(default)]
    pub finish: bool,
}

impl Plan {
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        Ok(toml::from_str(raw)?)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path.as_ref())?;
        Self::from_toml_str(&raw)
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

/// Plays a [`Plan`] back one planned step per engine step.
///
/// Step `n` runs planned step `n`, so a reset engine replays the plan from the
/// start. The run finishes on a step marked `finish` or on the last planned step.
#[derive(Debug, Clone)]
pub struct PlanStepUnit {
    plan: Plan,
    toolbox: Toolbox,
}

impl PlanStepUnit {
    pub fn new(plan: Plan, toolbox: Toolbox) -> Self {
        Self { plan, toolbox }
    }

    pub fn plan(&self) -> &Plan {
        &self.plan
    }

    pub fn toolbox(&self) -> &Toolbox {
        &self.toolbox
    }

    async fn call_tool(&self, name: &str, args: Option<&Value>) -> String {
        let args = match args {
            Some(Value::String(raw)) => match ToolArguments::parse(raw) {
                Ok(args) => args,
                Err(err) => return format!("Error running {name}: {err}"),
            },
            Some(value) => ToolArguments::new(value.clone()),
            None => ToolArguments::new(Value::Object(Default::default())),
        };
        self.toolbox.invoke(name, &args).await
    }
}

#[async_trait]
impl StepUnit for PlanStepUnit {
    async fn step(&self, ctx: &mut StepContext<'_>) -> std::result::Result<String, StepFailure> {
        let index = ctx.step_number() - 1;
        let Some(planned) = self.plan.steps.get(index) else {
            ctx.finish();
            ctx.history_mut().add_assistant("Plan complete");
            return Ok("Plan complete".to_string());
        };
        let text = match (&planned.say, &planned.tool) {
            (None, None) => {
                return Err(StepFailure::new(format!(
                    "planned step {} has neither a tool nor text",
                    index + 1
                )))
            }
            (Some(say), None) => {
                ctx.history_mut().add_assistant(say.clone());
                say.clone()
            }
            (say, Some(tool)) => {
                let intent = say.clone().unwrap_or_else(|| format!("Calling {tool}"));
                ctx.history_mut().add_assistant(intent);
                let output = self.call_tool(tool, planned.args.as_ref()).await;
                tracing::debug!(tool = %tool, "planned tool call returned");
                ctx.history_mut().add_tool(tool.clone(), output.clone());
                match say {
                    Some(say) => format!("{say} ({tool}: {output})"),
                    None => format!("{tool}: {output}"),
                }
            }
        };
        if planned.finish || index + 1 == self.plan.len() {
            ctx.finish();
        }
        Ok(text)
    }
}
