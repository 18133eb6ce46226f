//! Capability kinds, request payloads and per-capability configuration

pub mod chains;
pub mod fallbacks;
pub mod prompts;
pub mod schema;

use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::clients::{GenerationParams, ImageInput};
use crate::config::ProvidersConfig;
use crate::error::{Result, SocialLeafError};

pub use chains::ChainBuilder;
pub use schema::{Schema, schema_for};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CapabilityKind {
    CaptionGeneration,
    HookDetection,
    ScriptAnalysis,
    PersonaGeneration,
    NarrativeReport,
    AnalyticsQuery,
    InsightSummary,
}

impl CapabilityKind {
    pub const ALL: [CapabilityKind; 7] = [
        CapabilityKind::CaptionGeneration,
        CapabilityKind::HookDetection,
        CapabilityKind::ScriptAnalysis,
        CapabilityKind::PersonaGeneration,
        CapabilityKind::NarrativeReport,
        CapabilityKind::AnalyticsQuery,
        CapabilityKind::InsightSummary,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CapabilityKind::CaptionGeneration => "caption_generation",
            CapabilityKind::HookDetection => "hook_detection",
            CapabilityKind::ScriptAnalysis => "script_analysis",
            CapabilityKind::PersonaGeneration => "persona_generation",
            CapabilityKind::NarrativeReport => "narrative_report",
            CapabilityKind::AnalyticsQuery => "analytics_query",
            CapabilityKind::InsightSummary => "insight_summary",
        }
    }

    /// Image-bearing capabilities get the longer vision timeout
    pub fn is_vision(&self) -> bool {
        matches!(
            self,
            CapabilityKind::CaptionGeneration | CapabilityKind::HookDetection
        )
    }

    pub fn schema(&self) -> &'static Schema {
        schema_for(*self)
    }

    pub fn timeout(&self, providers: &ProvidersConfig) -> Duration {
        if self.is_vision() {
            Duration::from_millis(providers.vision_timeout_ms)
        } else {
            Duration::from_millis(providers.text_timeout_ms)
        }
    }

    pub fn default_params(&self) -> GenerationParams {
        let (temperature, max_tokens) = match self {
            CapabilityKind::CaptionGeneration => (0.8, 400),
            CapabilityKind::HookDetection => (0.7, 300),
            CapabilityKind::ScriptAnalysis => (0.7, 400),
            CapabilityKind::PersonaGeneration => (0.6, 400),
            CapabilityKind::NarrativeReport => (0.5, 500),
            CapabilityKind::AnalyticsQuery => (0.5, 500),
            CapabilityKind::InsightSummary => (0.5, 200),
        };
        GenerationParams {
            temperature,
            max_tokens,
        }
    }
}

impl std::fmt::Display for CapabilityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One extracted video frame
#[derive(Debug, Clone)]
pub struct Frame {
    pub timestamp_sec: f64,
    pub jpeg: Vec<u8>,
}

/// Optional steering for caption generation
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CaptionBrief {
    pub niche: Option<String>,
    pub tone: Option<String>,
    pub goal: Option<String>,
    pub cta: Option<String>,
}

/// Capability-specific input
#[derive(Debug, Clone)]
pub enum CapabilityPayload {
    Caption {
        images: Vec<ImageInput>,
        brief: CaptionBrief,
    },
    Hook {
        frames: Vec<Frame>,
        video_duration: f64,
    },
    Script {
        script: String,
    },
    Persona {
        context: Value,
    },
    Narrative {
        context: Value,
    },
    Query {
        question: String,
        context: Value,
    },
    Insight {
        context: Value,
    },
}

impl CapabilityPayload {
    pub fn kind(&self) -> CapabilityKind {
        match self {
            CapabilityPayload::Caption { .. } => CapabilityKind::CaptionGeneration,
            CapabilityPayload::Hook { .. } => CapabilityKind::HookDetection,
            CapabilityPayload::Script { .. } => CapabilityKind::ScriptAnalysis,
            CapabilityPayload::Persona { .. } => CapabilityKind::PersonaGeneration,
            CapabilityPayload::Narrative { .. } => CapabilityKind::NarrativeReport,
            CapabilityPayload::Query { .. } => CapabilityKind::AnalyticsQuery,
            CapabilityPayload::Insight { .. } => CapabilityKind::InsightSummary,
        }
    }

    /// Images forwarded to vision-capable providers
    pub fn images(&self) -> Vec<ImageInput> {
        match self {
            CapabilityPayload::Caption { images, .. } => images.clone(),
            CapabilityPayload::Hook { frames, .. } => frames
                .iter()
                .map(|f| ImageInput::jpeg(f.jpeg.clone()))
                .collect(),
            _ => Vec::new(),
        }
    }
}

/// Immutable per-call request. The kind is derived from the payload so the two cannot disagree.
#[derive(Debug, Clone)]
pub struct CapabilityRequest {
    pub payload: CapabilityPayload,
    pub params: GenerationParams,
}

impl CapabilityRequest {
    pub fn new(payload: CapabilityPayload) -> Self {
        let params = payload.kind().default_params();
        Self { payload, params }
    }

    pub fn kind(&self) -> CapabilityKind {
        self.payload.kind()
    }

    /// Reject structurally invalid input before any provider is called
    pub fn validate(&self) -> Result<()> {
        let problem = match &self.payload {
            CapabilityPayload::Hook { frames, .. } if frames.is_empty() => {
                Some("No frames provided for analysis")
            }
            CapabilityPayload::Caption { images, .. } if images.is_empty() => {
                Some("At least one image is required for caption generation")
            }
            CapabilityPayload::Script { script } if script.trim().is_empty() => {
                Some("Script must not be empty")
            }
            CapabilityPayload::Query { question, .. } if question.trim().is_empty() => {
                Some("Question must not be empty")
            }
            _ => None,
        };
        match problem {
            Some(message) => Err(SocialLeafError::InvalidParams {
                message: message.to_string(),
            }),
            None => Ok(()),
        }
    }
}
