use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Image attached to a generation request
#[derive(Debug, Clone)]
pub struct ImageInput {
    pub mime_type: String,
    pub data: Vec<u8>,
}

impl ImageInput {
    pub fn jpeg(data: Vec<u8>) -> Self {
        Self {
            mime_type: "image/jpeg".to_string(),
            data,
        }
    }

    pub fn to_base64(&self) -> String {
        STANDARD.encode(&self.data)
    }

    /// `data:` URL form used by OpenAI-compatible vision endpoints
    pub fn to_data_url(&self) -> String {
        format!("data:{};base64,{}", self.mime_type, self.to_base64())
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct GenerationParams {
    pub temperature: f32,
    pub max_tokens: u32,
}

impl Default for GenerationParams {
    fn default() -> Self {
        Self {
            temperature: 0.7,
            max_tokens: 500,
        }
    }
}

/// One provider call: a prompt plus zero or more images
#[derive(Debug, Clone, Default)]
pub struct GenerationRequest {
    pub system: Option<String>,
    pub prompt: String,
    pub images: Vec<ImageInput>,
    pub params: GenerationParams,
}

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("provider returned HTTP {status}: {body}")]
    Http { status: u16, body: String },
    #[error("transport error: {0}")]
    Transport(String),
    #[error("provider timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },
    #[error("rate limited after {attempts} attempts")]
    RateLimited { attempts: u32 },
    #[error("provider not configured: {0}")]
    NotConfigured(String),
    #[error("decode error: {0}")]
    Decode(String),
}

impl From<reqwest::Error> for ProviderError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ProviderError::Timeout { timeout_ms: 0 }
        } else if err.is_decode() {
            ProviderError::Decode(err.to_string())
        } else {
            ProviderError::Transport(err.to_string())
        }
    }
}

/// A text-generating provider adapter.
///
/// Hard failures surface as `Err`; a blocked or empty generation is `Ok("")`.
#[async_trait]
pub trait TextProvider: Send + Sync {
    /// Stable provider id used in logs ("gemini", "openai", ...)
    fn id(&self) -> &str;

    fn model(&self) -> &str;

    /// Whether images in the request are forwarded to the provider
    fn accepts_images(&self) -> bool {
        false
    }

    async fn generate(&self, request: &GenerationRequest) -> Result<String, ProviderError>;
}
