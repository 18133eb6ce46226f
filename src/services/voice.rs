//! Voice coach: script hooks and text-to-speech

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::AppContext;
use crate::capabilities::fallbacks::demo_script_result;
use crate::capabilities::{CapabilityPayload, CapabilityRequest};
use crate::clients::elevenlabs::{ElevenLabsClient, voice_for_style};
use crate::clients::{ProviderSettings, RetryPolicy};
use crate::error::{Result, SocialLeafError};
use crate::normalize::NormalizedResult;

/// ElevenLabs rejects longer requests
pub const MAX_SPEECH_CHARS: usize = 5_000;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScriptAnalysis {
    pub average_hook: String,
    pub high_retention_hook: String,
    pub why_high_retention_works: String,
    pub retention_score: f64,
    pub retention_score_reason: String,
    pub source: String,
}

impl From<NormalizedResult> for ScriptAnalysis {
    fn from(r: NormalizedResult) -> Self {
        Self {
            average_hook: r.str_field("average_hook"),
            high_retention_hook: r.str_field("high_retention_hook"),
            why_high_retention_works: r.str_field("why_high_retention_works"),
            retention_score: r.f64_field("retention_score"),
            retention_score_reason: r.str_field("retention_score_reason"),
            source: r.source,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SpeechRequest {
    pub text: String,
    #[serde(default)]
    pub voice_id: Option<String>,
    #[serde(default)]
    pub style: Option<String>,
}

pub async fn analyze_script(ctx: &AppContext, script: &str) -> Result<ScriptAnalysis> {
    if ctx.config.runtime.gemini_api_key.is_none() {
        warn!("GEMINI_API_KEY not set; returning demo script analysis");
        return Ok(demo_script_result().into());
    }
    let request = CapabilityRequest::new(CapabilityPayload::Script {
        script: script.to_string(),
    });
    let result = ctx.run(request).await?;
    Ok(result.into())
}

pub async fn synthesize(ctx: &AppContext, request: &SpeechRequest) -> Result<Vec<u8>> {
    let text = request.text.trim();
    if text.is_empty() {
        return Err(SocialLeafError::InvalidParams {
            message: "text must not be empty".to_string(),
        });
    }
    if text.chars().count() > MAX_SPEECH_CHARS {
        return Err(SocialLeafError::InvalidParams {
            message: format!("text exceeds {MAX_SPEECH_CHARS} characters"),
        });
    }

    let key = ctx
        .config
        .runtime
        .elevenlabs_api_key
        .as_deref()
        .ok_or_else(|| SocialLeafError::Config {
            message: "ELEVENLABS_API_KEY is not configured".to_string(),
        })?;

    let providers = &ctx.config.providers;
    let settings = ProviderSettings::new(
        &providers.elevenlabs_base_url,
        key,
        &ctx.config.models.elevenlabs_model,
    )
    .with_timeout(Duration::from_millis(providers.speech_timeout_ms))
    .with_retry(RetryPolicy::new(
        providers.rate_limit_attempts,
        providers.rate_limit_base_delay_ms,
    ));
    let client = ElevenLabsClient::new(settings).map_err(|e| SocialLeafError::Config {
        message: e.to_string(),
    })?;

    let voice = voice_for_style(request.style.as_deref(), request.voice_id.as_deref());
    let audio = client
        .synthesize(text, voice)
        .await
        .map_err(|e| SocialLeafError::Upstream {
            message: format!("speech synthesis failed: {e}"),
        })?;
    info!(voice, bytes = audio.len(), "speech synthesized");
    Ok(audio)
}
