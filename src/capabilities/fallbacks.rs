//! Terminal results returned when every provider in a chain fails.
//! All of them are deterministic functions of the request.

use serde_json::{Map, Value, json};

use super::{CaptionBrief, CapabilityPayload, CapabilityRequest, Frame};
use crate::normalize::{NormalizedResult, from_values};

pub const FALLBACK_SOURCE: &str = "fallback";

pub const SCRIPT_UNAVAILABLE_REASON: &str = "All AI providers are currently unavailable";

pub fn terminal_fallback(request: &CapabilityRequest) -> NormalizedResult {
    let values = match &request.payload {
        CapabilityPayload::Caption { brief, .. } => caption_fallback(brief),
        CapabilityPayload::Hook {
            frames,
            video_duration,
        } => hook_fallback(frames, *video_duration),
        CapabilityPayload::Script { .. } => script_unavailable(),
        CapabilityPayload::Persona { context } => persona_fallback(context),
        CapabilityPayload::Narrative { context } => narrative_fallback(context),
        CapabilityPayload::Query { question, context } => {
            object(json!({ "answer": query_fallback_answer(question, context) }))
        }
        CapabilityPayload::Insight { .. } => object(json!({
            "summary": "Your Reels receive 43% higher engagement than images, especially when posted after 8 PM. Consider creating more short-form video content."
        })),
    };
    from_values(values, request.kind().schema()).with_source(FALLBACK_SOURCE)
}

fn object(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}

fn caption_fallback(brief: &CaptionBrief) -> Map<String, Value> {
    let niche = brief
        .niche
        .as_deref()
        .map(str::trim)
        .filter(|n| !n.is_empty());
    let caption = match niche {
        Some(niche) => format!(
            "Bringing you something new from the world of {niche}. Which detail caught your eye first? Tell us below!"
        ),
        None => "Moments like this are worth sharing. Which detail caught your eye first? Tell us below!".to_string(),
    };
    let mut hashtags: Vec<String> = Vec::new();
    if let Some(niche) = niche {
        let tag: String = niche.chars().filter(|c| c.is_alphanumeric()).collect();
        if !tag.is_empty() {
            hashtags.push(format!("#{}", tag.to_lowercase()));
        }
    }
    hashtags.extend(["#instagood", "#contentcreator", "#explorepage"].map(String::from));

    let mut values = object(json!({
        "caption": caption,
        "hashtags": hashtags,
    }));
    if let Some(cta) = brief.cta.as_deref().filter(|c| !c.trim().is_empty()) {
        values.insert("cta".into(), Value::String(cta.to_string()));
    }
    if let Some(tone) = brief.tone.as_deref().filter(|t| !t.trim().is_empty()) {
        values.insert("style".into(), Value::String(tone.to_string()));
    }
    values
}

/// Heuristic pick by video length: ultra-short videos hook on the opening
/// frame, short ones on the one-second mark, longer ones on the opening again.
fn hook_fallback(frames: &[Frame], video_duration: f64) -> Map<String, Value> {
    let (preferred, score, reason, elements, tip) = if video_duration <= 3.0 {
        (
            0usize,
            74,
            "In ultra-short content, the opening frame IS the hook. First impressions are everything.",
            ["opening shot", "immediate impact"],
            "Add bold text overlay in the first 0.5 seconds to maximize retention",
        )
    } else if video_duration <= 10.0 {
        (
            1,
            77,
            "The 1-second mark captures attention after the initial scroll pause. Motion and change draw the eye.",
            ["early action", "visual momentum"],
            "Ensure something dynamic happens within the first 2 seconds",
        )
    } else {
        (
            0,
            72,
            "For longer content, the hook needs to establish value quickly while promising more.",
            ["attention grabber", "promise of value"],
            "Consider adding a text hook or face reveal in the opening seconds",
        )
    };

    let index = preferred.min(frames.len().saturating_sub(1));
    let timestamp = frames
        .get(index)
        .map(|f| f.timestamp_sec)
        .unwrap_or(index as f64);

    object(json!({
        "frame_index": index,
        "timestamp_sec": timestamp,
        "hook_score": score,
        "reason": reason,
        "visual_elements": elements,
        "improvement_tip": tip,
    }))
}

fn script_unavailable() -> Map<String, Value> {
    object(json!({
        "average_hook": "Error: AI Service Unavailable",
        "high_retention_hook": "We are experiencing high traffic with our AI providers. Please try again in a few minutes.",
        "why_high_retention_works": "N/A",
        "retention_score": 0.0,
        "retention_score_reason": SCRIPT_UNAVAILABLE_REASON,
    }))
}

/// Canned script analysis served when no Gemini key is configured at all
pub fn demo_script_result() -> NormalizedResult {
    let values = object(json!({
        "average_hook": "Today I want to talk about productivity tips.",
        "high_retention_hook": "Stop wasting 3 hours every single day without realizing it.",
        "why_high_retention_works": "It creates immediate urgency and addresses a specific pain point.",
        "retention_score": 8.5,
        "retention_score_reason": "Strong negative emotion trigger and curiosity gap.",
    }));
    from_values(values, &super::schema::SCRIPT_SCHEMA).with_source("demo")
}

fn best_platform_from(context: &Value) -> String {
    context
        .get("best_platform")
        .and_then(Value::as_str)
        .unwrap_or("instagram")
        .to_string()
}

fn persona_fallback(context: &Value) -> Map<String, Value> {
    object(json!({
        "persona_name": "The Curious Scroller",
        "summary": "Young, mobile-first viewers who discover content through short-form video and save posts they find useful. They reward consistency and a clear point of view.",
        "interests": ["short-form video", "how-to content", "behind the scenes"],
        "content_preferences": ["reels", "carousels", "quick tips"],
        "best_platform": best_platform_from(context),
    }))
}

fn narrative_fallback(context: &Value) -> Map<String, Value> {
    let overview = context.get("overview").unwrap_or(context);
    let impressions = overview
        .get("total_impressions")
        .and_then(Value::as_i64)
        .unwrap_or(0);
    let engagement = overview
        .get("engagement_rate")
        .and_then(Value::as_f64)
        .unwrap_or(0.0);
    object(json!({
        "summary": format!(
            "Your content reached {impressions} impressions with an engagement rate of {engagement}%. Short-form video continues to lead, and evening posts outperform the rest of the day."
        ),
        "highlights": [
            format!("{impressions} total impressions"),
            format!("{engagement}% engagement rate"),
            format!("Strongest platform: {}", best_platform_from(context)),
        ],
        "recommendations": [
            "Create 3-5 short-form videos per week",
            "Post between 7-9 PM on weekdays",
            "Use 5-7 niche hashtags instead of generic ones",
        ],
    }))
}

/// Keyword-matched answer used when no provider answers an analytics question
pub fn query_fallback_answer(question: &str, context: &Value) -> String {
    let q = question.to_lowercase();
    if q.contains("best") && q.contains("post") {
        return "Based on your data, your best performing posts are Reels/short videos, with an average engagement rate 3.2x higher than static images. Focus on creating more short-form video content.".to_string();
    }
    if q.contains("time") || q.contains("when") {
        return "Your optimal posting times are 7-9 PM on weekdays (IST). Posts during these hours receive 45% more engagement than other times.".to_string();
    }
    if q.contains("drop") || q.contains("decrease") {
        return "Engagement drops are often caused by algorithm changes or reduced posting frequency. Try posting consistently at peak hours and focus on video content.".to_string();
    }
    if q.contains("grow") || q.contains("increase") {
        return "To grow your engagement: 1) Post 4-5 times per week, 2) Create more Reels/Shorts, 3) Post between 7-9 PM, 4) Engage with your audience in comments.".to_string();
    }
    let rate = context
        .get("engagement_rate")
        .and_then(Value::as_f64)
        .unwrap_or(5.0);
    format!(
        "Based on your analytics:\n• Your engagement rate is performing well at {rate}%\n• Best content type: Reels/Short videos (3.2x better engagement)\n• Best posting time: 7-9 PM on weekdays\n• Tip: Focus on video content and consistent posting for best results."
    )
}
