use async_trait::async_trait;
use reqwest::Client;
use serde_json::{Value, json};
use tracing::debug;

use super::traits::{GenerationRequest, ProviderError, TextProvider};
use super::{ProviderSettings, send_with_backoff};

/// HuggingFace hosted inference, text only
pub struct HuggingFaceClient {
    http: Client,
    settings: ProviderSettings,
}

impl HuggingFaceClient {
    pub fn new(settings: ProviderSettings) -> Result<Self, ProviderError> {
        let http = settings.build_client()?;
        Ok(Self { http, settings })
    }
}

/// `generated_text` from either `[{"generated_text": ..}]` or `{"generated_text": ..}`
pub(crate) fn extract_generated_text(value: &Value) -> Result<String, ProviderError> {
    let item = match value {
        Value::Array(items) => match items.first() {
            Some(first) => first,
            None => return Ok(String::new()),
        },
        other => other,
    };
    if let Some(err) = item.get("error").and_then(Value::as_str) {
        return Err(ProviderError::Decode(format!("inference error: {err}")));
    }
    Ok(item
        .get("generated_text")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .trim()
        .to_string())
}

#[async_trait]
impl TextProvider for HuggingFaceClient {
    fn id(&self) -> &str {
        "huggingface"
    }

    fn model(&self) -> &str {
        &self.settings.model
    }

    async fn generate(&self, request: &GenerationRequest) -> Result<String, ProviderError> {
        let url = self.settings.endpoint(&self.settings.model);
        let inputs = match &request.system {
            Some(system) => format!("{system}\n\n{}", request.prompt),
            None => request.prompt.clone(),
        };
        let body = json!({
            "inputs": inputs,
            "parameters": {
                "max_new_tokens": request.params.max_tokens,
                "temperature": request.params.temperature,
                "return_full_text": false,
            }
        });

        let response = send_with_backoff("huggingface", &self.settings.retry, self.settings.timeout, || {
            self.http
                .post(&url)
                .bearer_auth(&self.settings.api_key)
                .json(&body)
        })
        .await?;

        let value: Value = response
            .json()
            .await
            .map_err(|e| ProviderError::Decode(e.to_string()))?;
        let text = extract_generated_text(&value)?;
        debug!(model = %self.settings.model, chars = text.len(), "huggingface inference complete");
        Ok(text)
    }
}
