use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::debug;

use super::traits::{GenerationRequest, ProviderError, TextProvider};
use super::{ProviderSettings, send_with_backoff};

/// Chat-completions adapter shared by OpenAI and OpenRouter
pub struct OpenAiCompatClient {
    id: &'static str,
    http: Client,
    settings: ProviderSettings,
    vision: bool,
    extra_headers: Vec<(&'static str, String)>,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: Option<ChatMessage>,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    #[serde(default)]
    content: Option<String>,
}

impl OpenAiCompatClient {
    pub fn openai(settings: ProviderSettings) -> Result<Self, ProviderError> {
        let http = settings.build_client()?;
        Ok(Self {
            id: "openai",
            http,
            settings,
            vision: false,
            extra_headers: Vec::new(),
        })
    }

    /// OpenRouter; `vision` selects whether images are forwarded as `image_url` parts
    pub fn openrouter(settings: ProviderSettings, vision: bool) -> Result<Self, ProviderError> {
        let http = settings.build_client()?;
        Ok(Self {
            id: "openrouter",
            http,
            settings,
            vision,
            extra_headers: vec![
                ("HTTP-Referer", "https://social-leaf.app".to_string()),
                ("X-Title", "Social Leaf".to_string()),
            ],
        })
    }

    fn messages(&self, request: &GenerationRequest) -> Value {
        let mut messages = Vec::new();
        if let Some(system) = &request.system {
            messages.push(json!({ "role": "system", "content": system }));
        }

        if self.vision && !request.images.is_empty() {
            let mut content = vec![json!({ "type": "text", "text": request.prompt })];
            for image in &request.images {
                content.push(json!({
                    "type": "image_url",
                    "image_url": { "url": image.to_data_url() }
                }));
            }
            messages.push(json!({ "role": "user", "content": content }));
        } else {
            messages.push(json!({ "role": "user", "content": request.prompt }));
        }
        Value::Array(messages)
    }
}

#[async_trait]
impl TextProvider for OpenAiCompatClient {
    fn id(&self) -> &str {
        self.id
    }

    fn model(&self) -> &str {
        &self.settings.model
    }

    fn accepts_images(&self) -> bool {
        self.vision
    }

    async fn generate(&self, request: &GenerationRequest) -> Result<String, ProviderError> {
        let url = self.settings.endpoint("chat/completions");
        let body = json!({
            "model": self.settings.model,
            "messages": self.messages(request),
            "temperature": request.params.temperature,
            "max_tokens": request.params.max_tokens,
        });

        let response = send_with_backoff(self.id, &self.settings.retry, self.settings.timeout, || {
            let mut builder = self
                .http
                .post(&url)
                .bearer_auth(&self.settings.api_key)
                .json(&body);
            for (name, value) in &self.extra_headers {
                builder = builder.header(*name, value);
            }
            builder
        })
        .await?;

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::Decode(e.to_string()))?;
        let text = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message)
            .and_then(|m| m.content)
            .unwrap_or_default()
            .trim()
            .to_string();
        debug!(provider = self.id, model = %self.settings.model, chars = text.len(), "chat completion complete");
        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clients::traits::ImageInput;

    fn settings() -> ProviderSettings {
        ProviderSettings::new("http://localhost:1", "k", "m")
    }

    #[test]
    fn text_only_client_ignores_images() {
        let client = OpenAiCompatClient::openai(settings()).unwrap();
        let req = GenerationRequest {
            system: Some("sys".into()),
            prompt: "hello".into(),
            images: vec![ImageInput::jpeg(vec![0])],
            ..Default::default()
        };
        let messages = client.messages(&req);
        assert_eq!(messages[0]["role"], "system");
        assert_eq!(messages[1]["content"], "hello");
    }

    #[test]
    fn vision_client_sends_data_urls() {
        let client = OpenAiCompatClient::openrouter(settings(), true).unwrap();
        let req = GenerationRequest {
            prompt: "caption".into(),
            images: vec![ImageInput::jpeg(vec![1, 2, 3])],
            ..Default::default()
        };
        let messages = client.messages(&req);
        let url = &messages[0]["content"][1]["image_url"]["url"];
        assert_eq!(url, "data:image/jpeg;base64,AQID");
    }
}
