//! Post generation: optimised image plus an AI caption

use serde::Serialize;
use tracing::info;

use super::AppContext;
use crate::capabilities::{CaptionBrief, CapabilityPayload, CapabilityRequest};
use crate::clients::ImageInput;
use crate::error::Result;
use crate::media::optimize_image;

#[derive(Debug, Clone, Serialize)]
pub struct PostPreview {
    pub caption: String,
    pub hashtags: Vec<String>,
    pub cta: String,
    pub style: String,
    pub optimized_image_path: String,
    pub auto_post: bool,
    pub source: String,
}

/// Trim empty form values so prompt defaults apply
pub fn clean_brief(brief: CaptionBrief) -> CaptionBrief {
    let clean = |v: Option<String>| v.map(|s| s.trim().to_string()).filter(|s| !s.is_empty());
    CaptionBrief {
        niche: clean(brief.niche),
        tone: clean(brief.tone),
        goal: clean(brief.goal),
        cta: clean(brief.cta),
    }
}

pub async fn generate_post(
    ctx: &AppContext,
    image: Vec<u8>,
    brief: CaptionBrief,
    auto_post: bool,
) -> Result<PostPreview> {
    let optimized = optimize_image(image, &ctx.config.server.media_dir).await?;
    let jpeg = tokio::fs::read(&optimized.path).await?;

    let request = CapabilityRequest::new(CapabilityPayload::Caption {
        images: vec![ImageInput::jpeg(jpeg)],
        brief: clean_brief(brief),
    });
    let result = ctx.run(request).await?;
    info!(
        path = %optimized.path.display(),
        source = %result.source,
        "post preview generated"
    );

    Ok(PostPreview {
        caption: result.str_field("caption"),
        hashtags: result.list_field("hashtags"),
        cta: result.str_field("cta"),
        style: result.str_field("style"),
        optimized_image_path: optimized.path.display().to_string(),
        auto_post,
        source: result.source,
    })
}
