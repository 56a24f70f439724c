//! Configuration system (layered: defaults < TOML file < env).

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use bon::Builder;
use serde::{Deserialize, Serialize};

use crate::error::{EngineError, Result};

pub const DEFAULT_NAME: &str = "steprun";
pub const DEFAULT_MAX_STEPS: usize = 10;
pub const DEFAULT_STREAM_TIMEOUT_MS: u64 = 300_000;
pub const DEFAULT_IMAGE_BASE_URL: &str = "https://dashscope.aliyuncs.com/api/v2/apps/agent/";

/// Settings for one [`ExecutionEngine`](crate::engine::ExecutionEngine).
#[derive(Debug, Clone, PartialEq, Eq, Builder, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Display name, used in logs.
    #[builder(into, default = String::from(DEFAULT_NAME))]
    pub name: String,
    /// System prompt made available to the step unit.
    #[builder(into)]
    pub system_prompt: Option<String>,
    /// Prompt a step unit may use to ask for the next action.
    #[builder(into)]
    pub next_step_prompt: Option<String>,
    /// Step budget. Zero means the run is truncated before the first step.
    #[builder(default = DEFAULT_MAX_STEPS)]
    pub max_steps: usize,
    /// Streaming runs are stopped this long after they start.
    #[builder(default = DEFAULT_STREAM_TIMEOUT_MS)]
    pub stream_timeout_ms: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl EngineConfig {
    pub fn stream_timeout(&self) -> Duration {
        Duration::from_millis(self.stream_timeout_ms)
    }
}

/// Settings for the built-in tools.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolSettings {
    /// Root directory generated files are written under.
    pub file_save_dir: PathBuf,
    pub image_api_key: Option<String>,
    pub image_app_id: Option<String>,
    pub image_base_url: String,
}

impl fmt::Debug for ToolSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ToolSettings")
            .field("file_save_dir", &self.file_save_dir)
            .field("image_api_key", &self.image_api_key.as_ref().map(|_| ".."))
            .field("image_app_id", &self.image_app_id)
            .field("image_base_url", &self.image_base_url)
            .finish()
    }
}

impl Default for ToolSettings {
    fn default() -> Self {
        Self {
            file_save_dir: default_file_save_dir(),
            image_api_key: None,
            image_app_id: None,
            image_base_url: DEFAULT_IMAGE_BASE_URL.to_string(),
        }
    }
}

impl ToolSettings {
    /// API key and app id, when both are configured.
    pub fn image_credentials(&self) -> Option<(&str, &str)> {
        match (&self.image_api_key, &self.image_app_id) {
            (Some(key), Some(app)) if !key.is_empty() && !app.is_empty() => {
                Some((key.as_str(), app.as_str()))
            }
            _ => None,
        }
    }
}

fn default_file_save_dir() -> PathBuf {
    directories::ProjectDirs::from("", "", DEFAULT_NAME)
        .map(|dirs| dirs.data_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from("tmp"))
}

/// Full configuration file.
///
/// ```toml
/// [engine]
/// max_steps = 5
/// stream_timeout_ms = 60000
///
/// [tools]
/// file_save_dir = "/var/lib/steprun"
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StepRunConfig {
    pub engine: EngineConfig,
    pub tools: ToolSettings,
}

impl StepRunConfig {
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        Ok(toml::from_str(raw)?)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path.as_ref())?;
        Self::from_toml_str(&raw)
    }

    /// Defaults overlaid with environment variables (`.env` is loaded if present).
    pub fn from_env() -> Result<Self> {
        Self::default().apply_env()
    }

    /// Overlay `STEPRUN_*` environment variables onto this config.
    pub fn apply_env(self) -> Result<Self> {
        let _ = dotenvy::dotenv(); // load .env if present, ignore error
        self.apply_env_with(|key| std::env::var(key).ok())
    }

    /// Overlay values from an arbitrary lookup (used by `apply_env`).
    pub fn apply_env_with(mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        if let Some(name) = lookup("STEPRUN_NAME") {
            self.engine.name = name;
        }
        if let Some(raw) = lookup("STEPRUN_MAX_STEPS") {
            self.engine.max_steps = parse_env("STEPRUN_MAX_STEPS", &raw)?;
        }
        if let Some(raw) = lookup("STEPRUN_STREAM_TIMEOUT_MS") {
            self.engine.stream_timeout_ms = parse_env("STEPRUN_STREAM_TIMEOUT_MS", &raw)?;
        }
        if let Some(dir) = lookup("STEPRUN_FILE_SAVE_DIR") {
            self.tools.file_save_dir = PathBuf::from(dir);
        }
        if let Some(key) = lookup("STEPRUN_IMAGE_API_KEY") {
            self.tools.image_api_key = Some(key);
        }
        if let Some(app) = lookup("STEPRUN_IMAGE_APP_ID") {
            self.tools.image_app_id = Some(app);
        }
        if let Some(url) = lookup("STEPRUN_IMAGE_BASE_URL") {
            self.tools.image_base_url = url;
        }
        Ok(self)
    }
}

fn parse_env<T: std::str::FromStr>(key: &str, raw: &str) -> Result<T>
where
    T::Err: fmt::Display,
{
    raw.trim()
        .parse()
        .map_err(|e| EngineError::Configuration(format!("{key}={raw:?}: {e}")))
}
