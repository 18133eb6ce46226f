use reqwest::Client;
use serde_json::json;
use tracing::info;

use super::traits::ProviderError;
use super::{ProviderSettings, send_with_backoff};

pub const DEFAULT_VOICE_ID: &str = "21m00Tcm4TlvDq8ikWAM";
const ENERGETIC_VOICE_ID: &str = "pNInz6obpgDQGcFmaJgB";
const BORING_VOICE_ID: &str = "ErXwobaYiN019PkySvjV";

/// Pick the voice for a delivery style; unknown styles keep the requested voice
pub fn voice_for_style<'a>(style: Option<&str>, requested: Option<&'a str>) -> &'a str {
    match style {
        Some("energetic") => ENERGETIC_VOICE_ID,
        Some("boring") => BORING_VOICE_ID,
        _ => requested
            .filter(|v| !v.trim().is_empty())
            .unwrap_or(DEFAULT_VOICE_ID),
    }
}

/// ElevenLabs text-to-speech; `settings.model` is the synthesis model id
pub struct ElevenLabsClient {
    http: Client,
    settings: ProviderSettings,
}

impl ElevenLabsClient {
    pub fn new(settings: ProviderSettings) -> Result<Self, ProviderError> {
        let http = settings.build_client()?;
        Ok(Self { http, settings })
    }

    /// Returns `audio/mpeg` bytes
    pub async fn synthesize(&self, text: &str, voice_id: &str) -> Result<Vec<u8>, ProviderError> {
        let url = self.settings.endpoint(&format!("text-to-speech/{voice_id}"));
        let body = json!({
            "text": text,
            "model_id": self.settings.model,
            "voice_settings": {
                "stability": 0.5,
                "similarity_boost": 0.75,
            }
        });

        let response = send_with_backoff("elevenlabs", &self.settings.retry, self.settings.timeout, || {
            self.http
                .post(&url)
                .header("xi-api-key", &self.settings.api_key)
                .header(reqwest::header::ACCEPT, "audio/mpeg")
                .json(&body)
        })
        .await?;

        let bytes = response.bytes().await?;
        if bytes.is_empty() {
            return Err(ProviderError::Decode("empty audio payload".into()));
        }
        info!(voice_id, bytes = bytes.len(), "speech synthesized");
        Ok(bytes.to_vec())
    }
}
