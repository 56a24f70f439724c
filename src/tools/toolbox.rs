//! Registry of the tools a step unit can call.

use std::sync::Arc;

use super::arguments::ToolArguments;
use super::builtin::{ImageTool, PdfTool};
use super::tool::Tool;
use super::types::ToolDefinition;
use crate::config::ToolSettings;
use crate::error::Result;

/// An ordered set of tools, looked up by name.
#[derive(Clone, Default)]
pub struct Toolbox {
    tools: Vec<Arc<dyn Tool>>,
}

impl Toolbox {
    pub fn new() -> Self {
        Self::default()
    }

    /// The built-in tools enabled by `settings`.
    ///
    /// `generate_pdf` is always present; `generate_image` only when image
    /// credentials are configured.
    pub fn builtin(settings: &ToolSettings) -> Result<Self> {
        let mut toolbox = Self::new();
        toolbox.register(Arc::new(PdfTool::new(&settings.file_save_dir)));
        match ImageTool::from_settings(settings)? {
            Some(image) => toolbox.register(Arc::new(image)),
            None => tracing::debug!("image credentials not configured, generate_image disabled"),
        }
        Ok(toolbox)
    }

    /// Add a tool, replacing any existing tool with the same name.
    pub fn register(&mut self, tool: Arc<dyn Tool>) {
        match self.tools.iter_mut().find(|t| t.name() == tool.name()) {
            Some(existing) => *existing = tool,
            None => self.tools.push(tool),
        }
    }

    pub fn with(mut self, tool: Arc<dyn Tool>) -> Self {
        self.register(tool);
        self
    }

    pub fn get(&self, name: &str) -> Option<&Arc<dyn Tool>> {
        self.tools.iter().find(|t| t.name() == name)
    }

    pub fn names(&self) -> Vec<&str> {
        self.tools.iter().map(|t| t.name()).collect()
    }

    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.tools.iter().map(|t| t.definition()).collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Invoke a tool by name. Always returns text.
    pub async fn invoke(&self, name: &str, args: &ToolArguments) -> String {
        let Some(tool) = self.get(name) else {
            tracing::warn!(tool = name, "unknown tool");
            return format!("Tool '{name}' not found");
        };
        if let Err(violation) = tool.parameters().validate(args.raw()) {
            tracing::warn!(tool = name, %violation, "invalid tool arguments");
            return format!("Invalid arguments for {name}: {violation}");
        }
        tracing::debug!(tool = name, "invoking tool");
        tool.invoke(args).await
    }
}

impl std::fmt::Debug for Toolbox {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Toolbox").field("tools", &self.names()).finish()
    }
}
