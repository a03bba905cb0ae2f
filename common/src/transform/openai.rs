// OpenAI image edit adapter

use crate::config::TransformConfig;
use crate::errors::TransformError;
use crate::transform::prepare::{prepare_edit_inputs, EditInputs};
use crate::transform::ImageTransformer;
use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use reqwest::multipart::{Form, Part};
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, instrument, warn};

#[derive(Debug, Deserialize)]
struct EditResponse {
    #[serde(default)]
    data: Vec<EditData>,
}

#[derive(Debug, Deserialize)]
struct EditData {
    #[serde(default)]
    b64_json: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: ErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    message: String,
}

/// Calls `POST {base_url}/images/edits` with a transparent mask
pub struct OpenAiImageEditor {
    client: Client,
    api_key: String,
    endpoint: String,
    model: Option<String>,
    size: String,
}

impl OpenAiImageEditor {
    pub fn new(config: &TransformConfig) -> Result<Self, TransformError> {
        let mut builder = Client::builder();
        if let Some(secs) = config.timeout_seconds {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        let client = builder.build().map_err(|e| {
            TransformError::Transport(format!("Failed to create HTTP client: {}", e))
        })?;

        Ok(Self {
            client,
            api_key: config.api_key.clone(),
            endpoint: format!("{}/images/edits", config.base_url.trim_end_matches('/')),
            model: config.model.clone(),
            size: config.size.clone(),
        })
    }

    fn build_form(&self, inputs: EditInputs, prompt: &str) -> Result<Form, TransformError> {
        let image = Part::bytes(inputs.image_png)
            .file_name("image.png")
            .mime_str("image/png")
            .map_err(|e| TransformError::Transport(e.to_string()))?;
        let mask = Part::bytes(inputs.mask_png)
            .file_name("mask.png")
            .mime_str("image/png")
            .map_err(|e| TransformError::Transport(e.to_string()))?;

        let mut form = Form::new()
            .part("image", image)
            .part("mask", mask)
            .text("prompt", prompt.to_string())
            .text("n", "1")
            .text("size", self.size.clone())
            .text("response_format", "b64_json");

        if let Some(model) = &self.model {
            form = form.text("model", model.clone());
        }

        Ok(form)
    }
}

#[async_trait]
impl ImageTransformer for OpenAiImageEditor {
    #[instrument(skip(self, image), fields(size = image.len(), endpoint = %self.endpoint))]
    async fn transform(&self, image: &[u8], prompt: &str) -> Result<Vec<u8>, TransformError> {
        let source = image.to_vec();
        let inputs = tokio::task::spawn_blocking(move || prepare_edit_inputs(&source))
            .await
            .map_err(|e| TransformError::InvalidImage(format!("Image preparation aborted: {}", e)))??;

        let form = self.build_form(inputs, prompt)?;

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .multipart(form)
            .send()
            .await
            .map_err(|e| TransformError::Transport(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| TransformError::Transport(format!("Failed to read response: {}", e)))?;

        if !status.is_success() {
            warn!(status = %status, "Image edit provider returned an error");
            return Err(TransformError::Provider(provider_message(status, &body)));
        }

        let parsed: EditResponse = serde_json::from_str(&body)
            .map_err(|e| TransformError::MalformedResponse(e.to_string()))?;

        let encoded = parsed
            .data
            .into_iter()
            .next()
            .and_then(|d| d.b64_json)
            .ok_or_else(|| {
                TransformError::MalformedResponse("response contains no b64_json image".to_string())
            })?;

        let edited = BASE64
            .decode(encoded.as_bytes())
            .map_err(|e| TransformError::MalformedResponse(format!("invalid base64 image: {}", e)))?;

        debug!(output_size = edited.len(), "Image edited");
        Ok(edited)
    }
}

/// Prefer the provider's own error message, fall back to status and raw body
fn provider_message(status: reqwest::StatusCode, body: &str) -> String {
    match serde_json::from_str::<ErrorResponse>(body) {
        Ok(err) => err.error.message,
        Err(_) if body.trim().is_empty() => format!("provider returned status {}", status),
        Err(_) => format!("provider returned status {}: {}", status, body.trim()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_joins_base_url() {
        let mut config = crate::config::Settings::default().transform;
        config.base_url = "http://localhost:1234/v1/".to_string();
        let editor = OpenAiImageEditor::new(&config).unwrap();
        assert_eq!(editor.endpoint, "http://localhost:1234/v1/images/edits");
    }

    #[test]
    fn test_provider_message_extraction() {
        let status = reqwest::StatusCode::TOO_MANY_REQUESTS;
        assert_eq!(
            provider_message(status, r#"{"error":{"message":"rate limited","type":"x"}}"#),
            "rate limited"
        );
        assert_eq!(
            provider_message(status, "upstream down"),
            "provider returned status 429 Too Many Requests: upstream down"
        );
        assert_eq!(
            provider_message(status, ""),
            "provider returned status 429 Too Many Requests"
        );
    }
}
