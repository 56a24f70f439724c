//! Tool capabilities a step unit can call.
//!
//! The engine never calls tools itself. A step unit holds a [`Toolbox`] and turns
//! tool output into step text.

pub mod arguments;
pub mod builtin;
pub mod tool;
pub mod toolbox;
pub mod types;

pub use arguments::ToolArguments;
pub use builtin::{ImageTool, PdfTool};
pub use tool::{AgentTool, Tool};
pub use toolbox::Toolbox;
pub use types::{ParameterBuilder, ToolDefinition, ToolParameters};
