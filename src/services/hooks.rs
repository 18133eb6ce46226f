//! Video hook analysis: upload → frames → hook_detection → report

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde_json::{Map, Value, json};
use tracing::info;

use super::AppContext;
use crate::capabilities::{CapabilityPayload, CapabilityRequest, Frame};
use crate::error::Result;
use crate::media::{check_video_upload, frames::save_temp_video};
use crate::normalize::NormalizedResult;

/// Video length assumed when only one frame came back
const SINGLE_FRAME_DURATION: f64 = 3.0;

#[derive(Debug, Clone, Copy)]
pub struct HookOptions {
    pub interval_sec: f64,
    pub max_frames: usize,
}

/// Duration estimate from the last sampled timestamp
pub fn video_duration(frames: &[Frame]) -> f64 {
    match frames.last() {
        Some(last) if frames.len() > 1 && last.timestamp_sec > 0.0 => last.timestamp_sec,
        _ => SINGLE_FRAME_DURATION,
    }
}

pub fn summary(result: &NormalizedResult) -> String {
    let mut out = format!(
        "🎯 Best Hook at {:.1}s (Score: {}/100)\n📝 {}\n",
        result.f64_field("timestamp_sec"),
        result.i64_field("hook_score"),
        result.str_field("reason"),
    );
    let elements = result.list_field("visual_elements");
    if !elements.is_empty() {
        out.push_str(&format!("👀 Key Elements: {}", elements.join(", ")));
    }
    out
}

/// Clamp the chosen frame into range and attach report metadata
pub fn finish_report(mut result: NormalizedResult, frames: &[Frame], filename: &str) -> Value {
    let last = frames.len().saturating_sub(1) as i64;
    let index = result.i64_field("frame_index").clamp(0, last);
    let chosen = frames.get(index as usize);
    // the reported time always belongs to the frame actually chosen
    if let Some(frame) = chosen {
        result
            .fields
            .insert("timestamp_sec".into(), json!(frame.timestamp_sec));
    }
    let frame_image = chosen.map(|f| STANDARD.encode(&f.jpeg)).unwrap_or_default();
    let summary = summary(&result);

    let mut fields: Map<String, Value> = result.fields;
    fields.insert("frame_index".into(), json!(index));
    fields.insert("frame_image".into(), json!(frame_image));
    fields.insert("total_frames_analyzed".into(), json!(frames.len()));
    fields.insert("video_filename".into(), json!(filename));
    fields.insert("summary".into(), json!(summary));
    fields.insert("source".into(), json!(result.source));
    fields.insert("degraded".into(), json!(result.degraded));
    Value::Object(fields)
}

pub async fn analyze_upload(
    ctx: &AppContext,
    filename: &str,
    bytes: Vec<u8>,
    options: HookOptions,
) -> Result<Value> {
    let ext = check_video_upload(filename, bytes.len(), &ctx.config.hooks)?;
    // Removed when this function returns, on every path
    let video = save_temp_video(bytes, &ext).await?;
    let frames = ctx
        .frames
        .extract(video.path(), options.interval_sec, options.max_frames)
        .await?;

    let request = CapabilityRequest::new(CapabilityPayload::Hook {
        video_duration: video_duration(&frames),
        frames: frames.clone(),
    });
    let result = ctx.run(request).await?;
    info!(
        filename,
        frames = frames.len(),
        source = %result.source,
        "hook analysis complete"
    );
    Ok(finish_report(result, &frames, filename))
}
