use std::time::Instant;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::debug;

use super::traits::{GenerationRequest, ProviderError, TextProvider};
use super::{ProviderSettings, send_with_backoff};

/// Gemini `generateContent` adapter (text and vision)
pub struct GeminiClient {
    http: Client,
    settings: ProviderSettings,
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(default, rename = "promptFeedback")]
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<Content>,
    #[serde(default, rename = "finishReason")]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
struct Part {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PromptFeedback {
    #[serde(default, rename = "blockReason")]
    block_reason: Option<String>,
}

impl GeminiClient {
    pub fn new(settings: ProviderSettings) -> Result<Self, ProviderError> {
        let http = settings.build_client()?;
        Ok(Self { http, settings })
    }

    fn request_body(request: &GenerationRequest) -> Value {
        let mut parts = vec![json!({ "text": request.prompt })];
        for image in &request.images {
            parts.push(json!({
                "inline_data": {
                    "mime_type": image.mime_type,
                    "data": image.to_base64(),
                }
            }));
        }

        let mut body = json!({
            "contents": [{ "parts": parts }],
            "generationConfig": {
                "temperature": request.params.temperature,
                "maxOutputTokens": request.params.max_tokens,
            }
        });
        if let Some(system) = &request.system {
            body["systemInstruction"] = json!({ "parts": [{ "text": system }] });
        }
        body
    }
}

/// Concatenate the text parts of the first candidate.
/// Blocked prompts and candidates without parts yield an empty string.
fn extract_text(response: GenerateContentResponse) -> String {
    if let Some(reason) = response.prompt_feedback.and_then(|f| f.block_reason) {
        debug!("gemini prompt blocked: {}", reason);
        return String::new();
    }
    let Some(candidate) = response.candidates.into_iter().next() else {
        return String::new();
    };
    let Some(content) = candidate.content else {
        debug!(
            "gemini candidate without content (finish_reason={:?})",
            candidate.finish_reason
        );
        return String::new();
    };
    content
        .parts
        .into_iter()
        .filter_map(|p| p.text)
        .collect::<Vec<_>>()
        .join("")
        .trim()
        .to_string()
}

#[async_trait]
impl TextProvider for GeminiClient {
    fn id(&self) -> &str {
        "gemini"
    }

    fn model(&self) -> &str {
        &self.settings.model
    }

    fn accepts_images(&self) -> bool {
        true
    }

    async fn generate(&self, request: &GenerationRequest) -> Result<String, ProviderError> {
        let started = Instant::now();
        let url = self
            .settings
            .endpoint(&format!("models/{}:generateContent", self.settings.model));
        let body = Self::request_body(request);

        let response = send_with_backoff("gemini", &self.settings.retry, self.settings.timeout, || {
            self.http
                .post(&url)
                .query(&[("key", self.settings.api_key.as_str())])
                .json(&body)
        })
        .await?;

        let parsed: GenerateContentResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::Decode(e.to_string()))?;
        let text = extract_text(parsed);
        debug!(
            model = %self.settings.model,
            images = request.images.len(),
            chars = text.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "gemini generateContent complete"
        );
        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clients::traits::ImageInput;

    fn parse(v: Value) -> GenerateContentResponse {
        serde_json::from_value(v).unwrap()
    }

    #[test]
    fn joins_text_parts_of_first_candidate() {
        let resp = parse(json!({
            "candidates": [
                {"content": {"parts": [{"text": "{\"caption\":"}, {"text": "\"hi\"}"}]}},
                {"content": {"parts": [{"text": "ignored"}]}}
            ]
        }));
        assert_eq!(extract_text(resp), "{\"caption\":\"hi\"}");
    }

    #[test]
    fn safety_block_is_empty_not_error() {
        let resp = parse(json!({
            "candidates": [{"finishReason": "SAFETY"}]
        }));
        assert_eq!(extract_text(resp), "");

        let resp = parse(json!({"promptFeedback": {"blockReason": "OTHER"}}));
        assert_eq!(extract_text(resp), "");
    }

    #[test]
    fn body_carries_inline_images() {
        let req = GenerationRequest {
            prompt: "describe".into(),
            images: vec![ImageInput::jpeg(vec![1, 2, 3])],
            ..Default::default()
        };
        let body = GeminiClient::request_body(&req);
        let parts = body["contents"][0]["parts"].as_array().unwrap();
        assert_eq!(parts.len(), 2);
        assert_eq!(parts[1]["inline_data"]["mime_type"], "image/jpeg");
        assert_eq!(parts[1]["inline_data"]["data"], "AQID");
    }
}
