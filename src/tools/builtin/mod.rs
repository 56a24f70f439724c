//! Built-in tools: PDF documents and remote image generation.
//!
//! Both follow the [`Tool`](super::Tool) failure policy and report I/O and network
//! errors as their result text.

mod image;
mod pdf;

pub use image::{ImageTool, IMAGE_REQUEST_TIMEOUT};
pub use pdf::PdfTool;
