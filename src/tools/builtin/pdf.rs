use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use printpdf::{BuiltinFont, Mm, PdfDocument};

use crate::error::{EngineError, Result};
use crate::tools::{Tool, ToolArguments, ToolParameters};

const PDF_DIR: &str = "pdf";

const PAGE_WIDTH: Mm = Mm(210.0);
const PAGE_HEIGHT: Mm = Mm(297.0);
const MARGIN_MM: f32 = 20.0;
const FONT_SIZE: f32 = 11.0;
const LINE_HEIGHT_MM: f32 = 5.5;
const WRAP_COLUMNS: usize = 90;

/// `generate_pdf`: renders text into `{root}/pdf/{file_name}`.
#[derive(Debug, Clone)]
pub struct PdfTool {
    dir: PathBuf,
    parameters: ToolParameters,
}

impl PdfTool {
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            dir: root.as_ref().join(PDF_DIR),
            parameters: ToolParameters::object()
                .string("file_name", "Name of the file to save the generated PDF", true)
                .string("content", "Content to be included in the PDF", true)
                .build(),
        }
    }

    /// Directory PDFs are written to.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    async fn write(&self, file_name: &str, content: &str) -> Result<PathBuf> {
        let path = self.target(file_name)?;
        tokio::fs::create_dir_all(&self.dir).await?;
        let (title, body, out) = (file_name.to_string(), content.to_string(), path.clone());
        tokio::task::spawn_blocking(move || render(&title, &body, &out))
            .await
            .map_err(|e| EngineError::Pdf(format!("render task failed: {e}")))??;
        Ok(path)
    }

    fn target(&self, file_name: &str) -> Result<PathBuf> {
        let file_name = file_name.trim();
        if file_name.is_empty()
            || file_name == "."
            || file_name == ".."
            || file_name.contains(['/', '\\'])
        {
            return Err(EngineError::InvalidArgument(format!(
                "file name must be a plain name: {file_name:?}"
            )));
        }
        Ok(self.dir.join(file_name))
    }
}

/// Lay `content` out on A4 pages in Helvetica, one wrapped line at a time.
fn render(title: &str, content: &str, path: &Path) -> Result<()> {
    let (doc, page, layer) = PdfDocument::new(title, PAGE_WIDTH, PAGE_HEIGHT, "text");
    let font = doc
        .add_builtin_font(BuiltinFont::Helvetica)
        .map_err(|e| EngineError::Pdf(e.to_string()))?;
    let mut current = doc.get_page(page).get_layer(layer);
    let mut y = PAGE_HEIGHT.0 - MARGIN_MM;
    for line in wrap(content, WRAP_COLUMNS) {
        if y < MARGIN_MM {
            let (page, layer) = doc.add_page(PAGE_WIDTH, PAGE_HEIGHT, "text");
            current = doc.get_page(page).get_layer(layer);
            y = PAGE_HEIGHT.0 - MARGIN_MM;
        }
        current.use_text(line, FONT_SIZE, Mm(MARGIN_MM), Mm(y), &font);
        y -= LINE_HEIGHT_MM;
    }
    let mut writer = BufWriter::new(File::create(path)?);
    doc.save(&mut writer)
        .map_err(|e| EngineError::Pdf(e.to_string()))?;
    Ok(())
}

/// Greedy word wrap; blank input lines are kept.
fn wrap(content: &str, columns: usize) -> Vec<String> {
    let mut lines = Vec::new();
    for paragraph in content.lines() {
        let mut line = String::new();
        for word in paragraph.split_whitespace() {
            let width = line.chars().count();
            if width > 0 && width + 1 + word.chars().count() > columns {
                lines.push(std::mem::take(&mut line));
            }
            if !line.is_empty() {
                line.push(' ');
            }
            line.push_str(word);
        }
        lines.push(line);
    }
    lines
}

#[async_trait]
impl Tool for PdfTool {
    fn name(&self) -> &str {
        "generate_pdf"
    }

    fn description(&self) -> &str {
        "Generate a PDF file with given content"
    }

    fn parameters(&self) -> &ToolParameters {
        &self.parameters
    }

    async fn invoke(&self, args: &ToolArguments) -> String {
        let written = match (args.get_str("file_name"), args.get_str("content")) {
            (Ok(file_name), Ok(content)) => self.write(file_name, content).await,
            (Err(err), _) | (_, Err(err)) => Err(err),
        };
        match written {
            Ok(path) => {
                tracing::info!(path = %path.display(), "pdf generated");
                format!("PDF generated successfully to: {}", path.display())
            }
            Err(err) => {
                tracing::warn!(error = %err, "pdf generation failed");
                format!("Error generating PDF: {err}")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn writes_pdf_under_pdf_dir() {
        let root = tempfile::tempdir().unwrap();
        let tool = PdfTool::new(root.path());
        let out = tool
            .invoke(&json!({"file_name": "plan.pdf", "content": "step one\nstep two"}).into())
            .await;
        let expected = root.path().join("pdf").join("plan.pdf");
        assert_eq!(out, format!("PDF generated successfully to: {}", expected.display()));
        let bytes = std::fs::read(expected).unwrap();
        assert!(bytes.starts_with(b"%PDF"));
    }

    #[tokio::test]
    async fn long_content_spills_onto_more_pages() {
        let root = tempfile::tempdir().unwrap();
        let content = "a fairly long line of generated text\n".repeat(200);
        let out = PdfTool::new(root.path())
            .invoke(&json!({"file_name": "long.pdf", "content": content}).into())
            .await;
        assert!(out.starts_with("PDF generated successfully"), "{out}");
        let bytes = std::fs::read(root.path().join("pdf").join("long.pdf")).unwrap();
        assert!(bytes.starts_with(b"%PDF"));
    }

    #[tokio::test]
    async fn path_separators_are_rejected() {
        let root = tempfile::tempdir().unwrap();
        let tool = PdfTool::new(root.path());
        let out = tool
            .invoke(&json!({"file_name": "../escape.pdf", "content": "x"}).into())
            .await;
        assert!(out.starts_with("Error generating PDF: Invalid argument"), "{out}");
        assert!(!root.path().join("escape.pdf").exists());
    }

    #[tokio::test]
    async fn missing_content_is_reported() {
        let root = tempfile::tempdir().unwrap();
        let out = PdfTool::new(root.path())
            .invoke(&json!({"file_name": "a.pdf"}).into())
            .await;
        assert_eq!(
            out,
            "Error generating PDF: Invalid argument: missing string argument: content"
        );
    }

    #[tokio::test]
    async fn io_failure_is_reported_as_text() {
        let root = tempfile::tempdir().unwrap();
        // a file where the pdf directory should be
        std::fs::write(root.path().join("pdf"), "").unwrap();
        let out = PdfTool::new(root.path())
            .invoke(&json!({"file_name": "a.pdf", "content": "x"}).into())
            .await;
        assert!(out.starts_with("Error generating PDF: IO error"), "{out}");
    }

    #[test]
    fn wrap_breaks_on_word_boundaries() {
        let lines = wrap("one two three four\n\nfive", 9);
        assert_eq!(lines, vec!["one two", "three", "four", "", "five"]);
    }
}
