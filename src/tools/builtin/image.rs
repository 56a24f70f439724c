use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::config::ToolSettings;
use crate::error::{EngineError, Result};
use crate::tools::{Tool, ToolArguments, ToolParameters};

pub const IMAGE_REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

/// `generate_image`: asks a remote agent app to generate an image from text.
///
/// The response body is returned as-is.
#[derive(Clone)]
pub struct ImageTool {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
    parameters: ToolParameters,
}

impl ImageTool {
    pub fn new(api_key: impl Into<String>, app_id: &str, base_url: &str) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(IMAGE_REQUEST_TIMEOUT)
            .build()?;
        Ok(Self {
            client,
            endpoint: format!("{base_url}{app_id}/compatible-mode/v1/responses"),
            api_key: api_key.into(),
            parameters: ToolParameters::object()
                .string("text", "Description of the image to generate", true)
                .build(),
        })
    }

    /// `None` when the settings carry no image credentials.
    pub fn from_settings(settings: &ToolSettings) -> Result<Option<Self>> {
        settings
            .image_credentials()
            .map(|(key, app)| Self::new(key, app, &settings.image_base_url))
            .transpose()
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn request_body(text: &str) -> Value {
        json!({
            "input": [{
                "type": "message",
                "role": "user",
                "content": [{"type": "input_text", "text": text}],
            }]
        })
    }

    async fn send(&self, body: &Value) -> Result<String> {
        let resp = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(body)
            .send()
            .await?;
        let status = resp.status();
        let text = resp.text().await?;
        if !status.is_success() {
            return Err(EngineError::Api {
                status: status.as_u16(),
                message: text,
            });
        }
        Ok(text)
    }
}

#[async_trait]
impl Tool for ImageTool {
    fn name(&self) -> &str {
        "generate_image"
    }

    fn description(&self) -> &str {
        "Generate an image based on a text description"
    }

    fn parameters(&self) -> &ToolParameters {
        &self.parameters
    }

    async fn invoke(&self, args: &ToolArguments) -> String {
        let text = args.get_str_opt("text").unwrap_or_default();
        let body = Self::request_body(text);
        match self.send(&body).await {
            Ok(resp) => resp,
            Err(err) => {
                tracing::warn!(endpoint = %self.endpoint, error = %err, "image generation failed");
                format!("Error sending image generation request: {err}; payload={body}")
            }
        }
    }
}

impl std::fmt::Debug for ImageTool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImageTool")
            .field("endpoint", &self.endpoint)
            .finish_non_exhaustive()
    }
}
