//! Command-line front end: run a TOML plan through the engine.

pub mod logging;

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Args, Parser, Subcommand};
use tokio_stream::StreamExt;

use crate::config::StepRunConfig;
use crate::engine::{ExecutionEngine, StreamEvent};
use crate::error::Result;
use crate::plan::{Plan, PlanStepUnit};
use crate::tools::Toolbox;

/// steprun CLI
#[derive(Parser, Debug)]
#[command(name = "steprun", version, about = "Run a step plan through the execution engine")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Execute a plan for one prompt
    Run(RunArgs),
}

/// Arguments for `steprun run`.
#[derive(Args, Debug)]
pub struct RunArgs {
    /// Plan file (TOML)
    #[arg(short, long)]
    pub plan: PathBuf,

    /// Config file (TOML); environment variables override it
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Step budget, overriding the plan and config
    #[arg(long)]
    pub max_steps: Option<usize>,

    /// Streaming timeout in milliseconds
    #[arg(long)]
    pub timeout_ms: Option<u64>,

    /// Print steps as they complete
    #[arg(long)]
    pub stream: bool,

    /// User prompt
    pub prompt: String,
}

/// How a CLI run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Completed,
    Failed,
}

impl RunArgs {
    /// Layer config file, environment, plan, and flags.
    pub fn load_config(&self) -> Result<(StepRunConfig, Plan)> {
        let config = match &self.config {
            Some(path) => StepRunConfig::from_file(path)?,
            None => StepRunConfig::default(),
        };
        let mut config = config.apply_env()?;
        let plan = Plan::from_file(&self.plan)?;
        if let Some(max_steps) = self.max_steps.or(plan.max_steps) {
            config.engine.max_steps = max_steps;
        }
        if let Some(timeout_ms) = self.timeout_ms {
            config.engine.stream_timeout_ms = timeout_ms;
        }
        Ok((config, plan))
    }
}

/// Handle `steprun run`, writing step text to stdout.
pub async fn handle_run(args: RunArgs) -> Result<Outcome> {
    let (config, plan) = args.load_config()?;
    let toolbox = Toolbox::builtin(&config.tools)?;
    tracing::debug!(tools = ?toolbox.names(), steps = plan.len(), "loaded plan");
    let engine = ExecutionEngine::new(Arc::new(PlanStepUnit::new(plan, toolbox)), config.engine);

    if !args.stream {
        let report = engine.run(&args.prompt).await?;
        println!("{report}");
        return Ok(Outcome::Completed);
    }

    let mut events = engine.run_stream(&args.prompt);
    let mut outcome = Outcome::Completed;
    while let Some(event) = events.next().await {
        match event {
            StreamEvent::Message(text) => println!("{text}"),
            StreamEvent::Completed => break,
            StreamEvent::Failed(reason) => {
                eprintln!("Error: {reason}");
                outcome = Outcome::Failed;
                break;
            }
        }
    }
    Ok(outcome)
}
