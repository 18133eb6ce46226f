//! Prompt templates per capability

use serde_json::Value;

use super::{CaptionBrief, CapabilityPayload, CapabilityRequest, Frame};
use crate::clients::GenerationRequest;

const ANALYTICS_SYSTEM: &str = "You are a social media analytics expert. Answer questions about the \
user's social media performance. Be concise, data-driven, and actionable. If you don't have \
specific data, provide general best practices.";

const INSIGHT_SYSTEM: &str =
    "Generate a brief, actionable insight about social media performance. Be specific and data-driven.";

const STRATEGIST_SYSTEM: &str = "You are a senior social media growth strategist. Respond with JSON only.";

/// Build the provider request. Providers that do not accept images get a
/// text-only prompt that describes the frames instead.
pub fn build(request: &CapabilityRequest, accepts_images: bool) -> GenerationRequest {
    let (system, prompt) = match &request.payload {
        CapabilityPayload::Caption { images, brief } => {
            (None, caption_prompt(brief, images.len(), accepts_images))
        }
        CapabilityPayload::Hook {
            frames,
            video_duration,
        } => (None, hook_prompt(frames, *video_duration, accepts_images)),
        CapabilityPayload::Script { script } => (Some(STRATEGIST_SYSTEM), script_prompt(script)),
        CapabilityPayload::Persona { context } => (Some(STRATEGIST_SYSTEM), persona_prompt(context)),
        CapabilityPayload::Narrative { context } => {
            (Some(STRATEGIST_SYSTEM), narrative_prompt(context))
        }
        CapabilityPayload::Query { question, context } => (
            Some(ANALYTICS_SYSTEM),
            format!("Context:\n{}\n\nQuestion: {question}", render_context(context)),
        ),
        CapabilityPayload::Insight { context } => (
            Some(INSIGHT_SYSTEM),
            format!(
                "Analyze this data and provide one key insight:\n{}",
                render_context(context)
            ),
        ),
    };

    GenerationRequest {
        system: system.map(str::to_string),
        prompt,
        images: if accepts_images {
            request.payload.images()
        } else {
            Vec::new()
        },
        params: request.params,
    }
}

fn or_default<'a>(value: &'a Option<String>, fallback: &'a str) -> &'a str {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .unwrap_or(fallback)
}

fn caption_prompt(brief: &CaptionBrief, image_count: usize, sees_images: bool) -> String {
    let niche = or_default(&brief.niche, "general lifestyle");
    let tone = or_default(&brief.tone, "friendly");
    let goal = or_default(&brief.goal, "engagement");
    let cta = or_default(&brief.cta, "Follow for more!");
    let subject = if sees_images {
        format!("the attached image{}", if image_count == 1 { "" } else { "s" })
    } else {
        format!("an Instagram post in the {niche} niche (image not available, write from the brief)")
    };

    format!(
        r##"You are an expert Instagram copywriter.

Write a caption for {subject}.
Niche: {niche}
Tone: {tone}
Goal: {goal}
Call to action: {cta}

Rules:
- Caption under 150 words, hook in the first line
- 5-10 relevant, niche-specific hashtags
- No generic filler

Respond ONLY with valid JSON:
{{
  "caption": "<caption text>",
  "hashtags": ["#tag1", "#tag2"],
  "cta": "<call to action>",
  "style": "<one word describing the style>"
}}"##
    )
}

const HOOK_SCORING_RULES: &str = "Rules for scoring:
- Opening shots with text overlays = 75-85
- Faces with emotion = 80-90
- Action/movement = 70-80
- Static/plain = 50-65
- Surprising/unusual = 85-95";

fn hook_prompt(frames: &[Frame], video_duration: f64, sees_images: bool) -> String {
    let last = frames.len().saturating_sub(1);
    let frame_lines = frames
        .iter()
        .enumerate()
        .map(|(i, f)| {
            let role = match i {
                0 => "Opening shot - first thing viewers see",
                1 => "Early hook moment - action begins",
                _ => "Attention window - make or break moment",
            };
            format!("- Frame {i} ({:.1}s): {role}", f.timestamp_sec)
        })
        .collect::<Vec<_>>()
        .join("\n");

    let intro = if sees_images {
        format!(
            "You are given {} frames from the first seconds of a short-form video, in order.",
            frames.len()
        )
    } else {
        "Analyze this video based on the frame descriptions.".to_string()
    };

    format!(
        r#"You are an expert social media content analyst.

{intro}
{frame_lines}

Which frame would STOP SCROLLING most effectively?

{HOOK_SCORING_RULES}

Respond ONLY with valid JSON:
{{
  "frame_index": <0 to {last}>,
  "timestamp_sec": <timestamp of that frame>,
  "hook_score": <60-95>,
  "reason": "<30-50 word explanation>",
  "visual_elements": ["<element1>", "<element2>"],
  "improvement_tip": "<actionable advice>"
}}

Video duration: {video_duration:.1}s"#
    )
}

fn script_prompt(script: &str) -> String {
    format!(
        r#"Given a video script, generate TWO opening hooks:

1. An AVERAGE hook (low curiosity, informational, generic)
2. A HIGH-RETENTION hook that:
   - Is directly related to the script content
   - Creates curiosity WITHOUT clickbait
   - Clearly hints at the topic
   - Is suitable for Instagram Reels / YouTube Shorts
   - Is under 12 words

Rules for the HIGH-RETENTION hook:
- Must mention or imply the topic
- No generic phrases like "You won't believe", "This will shock you", "Wait till the end"
- Natural, not marketing-speak

Script:
"{script}"

Also rate the high_retention_hook from 1-10 for audience retention and give one reason.

Return JSON only, no Markdown fences:
{{
  "average_hook": "...",
  "high_retention_hook": "...",
  "why_high_retention_works": "one short sentence",
  "retention_score": 8.7,
  "retention_score_reason": "one short sentence"
}}"#
    )
}

fn persona_prompt(context: &Value) -> String {
    format!(
        r#"Build the primary audience persona for this creator from their analytics.

Analytics:
{}

Return JSON only:
{{
  "persona_name": "<short memorable name>",
  "summary": "<two sentences>",
  "age_range": "<e.g. 18-24>",
  "interests": ["..."],
  "content_preferences": ["..."],
  "best_platform": "<instagram|youtube|twitter|linkedin>"
}}"#,
        render_context(context)
    )
}

fn narrative_prompt(context: &Value) -> String {
    format!(
        r#"Write a short performance report for a creator from the analytics below.

Analytics:
{}

Return JSON only:
{{
  "headline": "<one line>",
  "summary": "<three to four sentences>",
  "highlights": ["..."],
  "recommendations": ["..."]
}}"#,
        render_context(context)
    )
}

fn render_context(context: &Value) -> String {
    match context {
        Value::Null => "No data yet".to_string(),
        Value::String(s) => s.clone(),
        other => serde_json::to_string_pretty(other).unwrap_or_else(|_| other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clients::ImageInput;
    use serde_json::json;

    fn hook_request() -> CapabilityRequest {
        CapabilityRequest::new(CapabilityPayload::Hook {
            frames: (0..3)
                .map(|i| Frame {
                    timestamp_sec: i as f64,
                    jpeg: vec![i as u8],
                })
                .collect(),
            video_duration: 2.0,
        })
    }

    #[test]
    fn text_only_providers_get_no_images() {
        let req = build(&hook_request(), false);
        assert!(req.images.is_empty());
        assert!(req.prompt.contains("frame descriptions"));
        assert!(req.prompt.contains("Frame 2 (2.0s)"));
    }

    #[test]
    fn vision_providers_get_every_frame() {
        let req = build(&hook_request(), true);
        assert_eq!(req.images.len(), 3);
        assert!(req.prompt.contains("<0 to 2>"));
    }

    #[test]
    fn caption_brief_falls_back_to_defaults() {
        let request = CapabilityRequest::new(CapabilityPayload::Caption {
            images: vec![ImageInput::jpeg(vec![1])],
            brief: CaptionBrief {
                niche: Some("  ".into()),
                tone: Some("witty".into()),
                ..Default::default()
            },
        });
        let req = build(&request, true);
        assert!(req.prompt.contains("Niche: general lifestyle"));
        assert!(req.prompt.contains("Tone: witty"));
        assert!(req.prompt.contains("the attached image."));
    }

    #[test]
    fn caption_prompt_shows_json_shape_with_hashtags() {
        let prompt = caption_prompt(&CaptionBrief::default(), 2, false);
        assert!(prompt.contains(r##""hashtags": ["#tag1", "#tag2"],"##));
        assert!(prompt.contains("image not available"));
        assert!(prompt.trim_end().ends_with('}'));
        assert!(!prompt.contains("{{"));
    }

    #[test]
    fn query_carries_system_prompt_and_context() {
        let request = CapabilityRequest::new(CapabilityPayload::Query {
            question: "When should I post?".into(),
            context: json!({"engagement_rate": 5.2}),
        });
        let req = build(&request, false);
        assert!(req.system.unwrap().contains("analytics expert"));
        assert!(req.prompt.contains("\"engagement_rate\": 5.2"));
        assert!(req.prompt.ends_with("Question: When should I post?"));
    }
}
