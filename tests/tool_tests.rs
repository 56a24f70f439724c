//! Tests for the built-in tools and the toolbox.

use serde_json::json;
use steprun::config::ToolSettings;
use steprun::tools::{ImageTool, Tool, ToolArguments, Toolbox};
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn image_settings(base_url: String, dir: &std::path::Path) -> ToolSettings {
    let mut settings = ToolSettings::default();
    settings.file_save_dir = dir.to_path_buf();
    settings.image_api_key = Some("test-key".into());
    settings.image_app_id = Some("app-7".into());
    settings.image_base_url = base_url;
    settings
}

#[tokio::test]
async fn image_request_posts_message_payload_with_bearer_auth() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/agent/app-7/compatible-mode/v1/responses"))
        .and(header("authorization", "Bearer test-key"))
        .and(body_json(json!({
            "input": [{
                "type": "message",
                "role": "user",
                "content": [{"type": "input_text", "text": "a lighthouse at dusk"}]
            }]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"output":"https://img.test/1.png"}"#))
        .expect(1)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let settings = image_settings(format!("{}/agent/", server.uri()), dir.path());
    let tool = ImageTool::from_settings(&settings).unwrap().expect("credentials set");

    let out = tool
        .invoke(&ToolArguments::new(json!({"text": "a lighthouse at dusk"})))
        .await;

    assert_eq!(out, r#"{"output":"https://img.test/1.png"}"#);
}

#[tokio::test]
async fn image_error_status_is_reported_with_payload() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(401).set_body_string("bad key"))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let settings = image_settings(format!("{}/", server.uri()), dir.path());
    let toolbox = Toolbox::builtin(&settings).unwrap();

    let out = toolbox
        .invoke("generate_image", &ToolArguments::new(json!({"text": "cat"})))
        .await;

    assert!(
        out.starts_with("Error sending image generation request: API error (status 401): bad key; payload="),
        "{out}"
    );
    assert!(out.contains(r#""text":"cat""#), "{out}");
}

#[tokio::test]
async fn image_connection_failure_is_text() {
    let dir = tempfile::tempdir().unwrap();
    // nothing listens on port 9 locally
    let settings = image_settings("http://127.0.0.1:9/".into(), dir.path());
    let tool = ImageTool::from_settings(&settings).unwrap().unwrap();

    let out = tool.invoke(&ToolArguments::new(json!({"text": "x"}))).await;

    assert!(out.starts_with("Error sending image generation request: Network error"), "{out}");
}

#[tokio::test]
async fn pdf_tool_through_toolbox_writes_pdf() {
    let dir = tempfile::tempdir().unwrap();
    let mut settings = ToolSettings::default();
    settings.file_save_dir = dir.path().to_path_buf();
    let toolbox = Toolbox::builtin(&settings).unwrap();

    let out = toolbox
        .invoke(
            "generate_pdf",
            &ToolArguments::new(json!({"file_name": "report.pdf", "content": "all good"})),
        )
        .await;

    let written = dir.path().join("pdf").join("report.pdf");
    assert_eq!(out, format!("PDF generated successfully to: {}", written.display()));
    assert!(std::fs::read(written).unwrap().starts_with(b"%PDF"));
}

#[tokio::test]
async fn toolbox_reports_schema_violations_before_invoking() {
    let dir = tempfile::tempdir().unwrap();
    let mut settings = ToolSettings::default();
    settings.file_save_dir = dir.path().to_path_buf();
    let toolbox = Toolbox::builtin(&settings).unwrap();

    let out = toolbox
        .invoke("generate_pdf", &ToolArguments::new(json!({"file_name": "a.pdf"})))
        .await;

    assert_eq!(out, "Invalid arguments for generate_pdf: missing required field 'content'");
    assert!(!dir.path().join("pdf").exists());
}

#[test]
fn definitions_describe_builtin_tools() {
    let dir = tempfile::tempdir().unwrap();
    let settings = image_settings("https://images.test/".into(), dir.path());
    let defs = Toolbox::builtin(&settings).unwrap().definitions();

    let names: Vec<&str> = defs.iter().map(|d| d.name.as_str()).collect();
    assert_eq!(names, vec!["generate_pdf", "generate_image"]);
    assert_eq!(defs[0].parameters["required"], json!(["file_name", "content"]));
    assert_eq!(defs[1].description, "Generate an image based on a text description");
}
