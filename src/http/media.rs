//! Upload-driven handlers: hook detection, voice coach, post generation

use axum::{
    Extension, Json,
    extract::{Multipart, Query, State, multipart::MultipartError},
    http::header,
    response::IntoResponse,
};
use serde::Deserialize;
use serde_json::{Value, json};

use super::{HttpState, require_feature};
use crate::auth::AuthUser;
use crate::capabilities::CaptionBrief;
use crate::deserializers::parse_bool;
use crate::error::{Result, SocialLeafError};
use crate::plans::Feature;
use crate::services::captions::{self, PostPreview};
use crate::services::hooks::{self, HookOptions};
use crate::services::voice::{self, ScriptAnalysis, SpeechRequest};

#[derive(Debug, Default, Deserialize)]
pub struct HookQuery {
    pub interval: Option<f64>,
    pub max_frames: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub struct ScriptBody {
    pub script: String,
}

fn bad_upload(e: MultipartError) -> SocialLeafError {
    SocialLeafError::InvalidParams {
        message: format!("Invalid multipart body: {e}"),
    }
}

fn missing(field: &str) -> SocialLeafError {
    SocialLeafError::InvalidParams {
        message: format!("Missing '{field}' file field"),
    }
}

pub async fn analyze_hook(
    State(state): State<HttpState>,
    Extension(user): Extension<AuthUser>,
    Query(q): Query<HookQuery>,
    mut multipart: Multipart,
) -> Result<Json<Value>> {
    require_feature(&state, &user, Feature::Vlm).await?;

    let mut upload = None;
    while let Some(field) = multipart.next_field().await.map_err(bad_upload)? {
        if field.name() == Some("video") {
            let filename = field.file_name().unwrap_or_default().to_string();
            let bytes = field.bytes().await.map_err(bad_upload)?;
            upload = Some((filename, bytes.to_vec()));
        }
    }
    let (filename, bytes) = upload.ok_or_else(|| missing("video"))?;

    let hooks_config = &state.app.config.hooks;
    let options = HookOptions {
        interval_sec: q.interval.unwrap_or(hooks_config.default_interval_sec),
        max_frames: q
            .max_frames
            .unwrap_or(hooks_config.max_frames)
            .min(hooks_config.max_frames),
    };
    let report = hooks::analyze_upload(&state.app, &filename, bytes, options).await?;
    Ok(Json(report))
}

pub async fn hooks_health(State(state): State<HttpState>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "gemini_configured": state.app.config.hook_gemini_key().is_some(),
    }))
}

pub async fn analyze_script(
    State(state): State<HttpState>,
    Extension(user): Extension<AuthUser>,
    Json(body): Json<ScriptBody>,
) -> Result<Json<ScriptAnalysis>> {
    require_feature(&state, &user, Feature::VoiceCoach).await?;
    Ok(Json(voice::analyze_script(&state.app, &body.script).await?))
}

pub async fn speech(
    State(state): State<HttpState>,
    Extension(user): Extension<AuthUser>,
    Json(body): Json<SpeechRequest>,
) -> Result<impl IntoResponse> {
    require_feature(&state, &user, Feature::VoiceCoach).await?;
    let audio = voice::synthesize(&state.app, &body).await?;
    Ok(([(header::CONTENT_TYPE, "audio/mpeg")], audio))
}

pub async fn generate_post(
    State(state): State<HttpState>,
    Extension(user): Extension<AuthUser>,
    mut multipart: Multipart,
) -> Result<Json<PostPreview>> {
    require_feature(&state, &user, Feature::CreatePost).await?;

    let mut image = None;
    let mut brief = CaptionBrief::default();
    let mut auto_post = false;
    while let Some(field) = multipart.next_field().await.map_err(bad_upload)? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "image" => image = Some(field.bytes().await.map_err(bad_upload)?.to_vec()),
            "niche" => brief.niche = Some(field.text().await.map_err(bad_upload)?),
            "tone" => brief.tone = Some(field.text().await.map_err(bad_upload)?),
            "goal" => brief.goal = Some(field.text().await.map_err(bad_upload)?),
            "cta" => brief.cta = Some(field.text().await.map_err(bad_upload)?),
            "auto_post" => {
                auto_post = parse_bool(&field.text().await.map_err(bad_upload)?)
            }
            _ => {}
        }
    }
    let image = image.filter(|b| !b.is_empty()).ok_or_else(|| missing("image"))?;

    let preview = captions::generate_post(&state.app, image, brief, auto_post).await?;
    Ok(Json(preview))
}
