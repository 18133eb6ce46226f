//! Profiles, platform connections, OAuth and live platform data

use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    response::Redirect,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::info;

use super::HttpState;
use crate::auth::{AuthUser, decode_token};
use crate::error::{Result, SocialLeafError};
use crate::platforms::Platform;
use crate::platforms::instagram::PublicProfile;
use crate::platforms::oauth::client_for;
use crate::platforms::youtube::{ChannelOverview, FeaturedChannel};
use crate::services::users;
use crate::store::{OAuthTokens, Profile};

#[derive(Debug, Default, Deserialize)]
pub struct ProfileBody {
    pub name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct PlanBody {
    pub plan: String,
}

#[derive(Debug, Serialize)]
pub struct PlanChange {
    pub success: bool,
    pub plan: Option<String>,
    pub plan_status: Option<String>,
    pub trial_ends_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
pub struct ConnectBody {
    pub platform_name: String,
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub account_name: Option<String>,
}

/// Connection summary; tokens are never echoed back
#[derive(Debug, Serialize)]
pub struct ConnectedPlatform {
    pub platform_name: String,
    pub account_name: Option<String>,
    pub connected: bool,
    pub expires_at: Option<DateTime<Utc>>,
}

impl From<OAuthTokens> for ConnectedPlatform {
    fn from(t: OAuthTokens) -> Self {
        Self {
            platform_name: t.platform,
            account_name: t.account_name,
            connected: true,
            expires_at: t.expires_at,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct OAuthStartQuery {
    pub user_id: Option<String>,
    pub token: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct OAuthCallbackQuery {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
}

pub async fn me(
    State(state): State<HttpState>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<Profile>> {
    let profile = users::get_or_create_profile(state.app.store.as_ref(), &user, None).await?;
    Ok(Json(profile))
}

pub async fn update_profile(
    State(state): State<HttpState>,
    Extension(user): Extension<AuthUser>,
    Json(body): Json<ProfileBody>,
) -> Result<Json<Value>> {
    let profile = users::update_name(state.app.store.as_ref(), &user, body.name).await?;
    Ok(Json(json!({"success": true, "profile": profile})))
}

pub async fn update_plan(
    State(state): State<HttpState>,
    Extension(user): Extension<AuthUser>,
    Json(body): Json<PlanBody>,
) -> Result<Json<PlanChange>> {
    let profile =
        users::update_plan(state.app.store.as_ref(), &user, &body.plan, Utc::now()).await?;
    Ok(Json(PlanChange {
        success: true,
        plan: profile.plan,
        plan_status: profile.plan_status,
        trial_ends_at: profile.trial_ends_at,
    }))
}

pub async fn connected_platforms(
    State(state): State<HttpState>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<Vec<ConnectedPlatform>>> {
    let rows = state.app.store.connected_platforms(&user.user_id).await?;
    Ok(Json(rows.into_iter().map(ConnectedPlatform::from).collect()))
}

/// Store a token obtained outside the redirect flow
pub async fn connect_platform(
    State(state): State<HttpState>,
    Extension(user): Extension<AuthUser>,
    Json(body): Json<ConnectBody>,
) -> Result<Json<Value>> {
    let platform = Platform::from_path(body.platform_name.trim())?;
    if body.access_token.trim().is_empty() {
        return Err(SocialLeafError::InvalidParams {
            message: "access_token must not be empty".to_string(),
        });
    }
    state
        .app
        .store
        .save_tokens(OAuthTokens {
            user_id: user.user_id.clone(),
            platform: platform.as_str().to_string(),
            access_token: body.access_token,
            refresh_token: body.refresh_token,
            expires_at: None,
            account_name: body.account_name,
        })
        .await?;
    info!(user_id = %user.user_id, platform = platform.as_str(), "platform token stored");
    Ok(Json(json!({"success": true, "platform_name": platform})))
}

/// The browser redirect carries no bearer header, so the caller's token rides
/// in the query. A bare `user_id` is only honoured outside production.
fn oauth_user(q: &OAuthStartQuery, allow_demo: bool) -> Result<String> {
    if let Some(token) = q.token.as_deref().filter(|t| !t.is_empty()) {
        return Ok(decode_token(token, allow_demo)?.user_id);
    }
    let user_id = q
        .user_id
        .as_deref()
        .map(str::trim)
        .filter(|id| !id.is_empty() && allow_demo);
    match user_id {
        Some(id) => Ok(id.to_string()),
        None => Err(SocialLeafError::Unauthorized {
            message: "token query parameter is required".to_string(),
        }),
    }
}

fn oauth_not_configured(platform: Platform) -> SocialLeafError {
    SocialLeafError::Config {
        message: format!("OAuth client for {platform} is not configured"),
    }
}

pub async fn oauth_start(
    State(state): State<HttpState>,
    Path(name): Path<String>,
    Query(q): Query<OAuthStartQuery>,
) -> Result<Redirect> {
    let platform = Platform::from_path(&name)?;
    let config = &state.app.config;
    let user_id = oauth_user(&q, !config.runtime.is_production())?;
    let client = client_for(&config.runtime, platform).ok_or_else(|| oauth_not_configured(platform))?;
    let url = state
        .app
        .oauth
        .authorize_url(platform, client, &user_id, Utc::now())
        .await?;
    Ok(Redirect::temporary(&url))
}

pub async fn oauth_callback(
    State(state): State<HttpState>,
    Path(name): Path<String>,
    Query(q): Query<OAuthCallbackQuery>,
) -> Result<Json<Value>> {
    let platform = Platform::from_path(&name)?;
    if let Some(error) = q.error {
        return Err(SocialLeafError::InvalidParams {
            message: format!("Authorization was not granted: {error}"),
        });
    }
    let client = client_for(&state.app.config.runtime, platform)
        .ok_or_else(|| oauth_not_configured(platform))?;
    let tokens = state
        .app
        .oauth
        .complete(
            platform,
            client,
            q.code.as_deref().unwrap_or_default(),
            q.state.as_deref().unwrap_or_default(),
            Utc::now(),
        )
        .await?;
    state.app.store.save_tokens(tokens).await?;
    Ok(Json(json!({
        "success": true,
        "platform": platform,
        "connected": true,
        "message": format!("{platform} connected successfully"),
    })))
}

pub async fn real_platform(
    State(state): State<HttpState>,
    Extension(user): Extension<AuthUser>,
    Path(name): Path<String>,
) -> Result<Json<Value>> {
    let platform = Platform::from_path(&name)?;
    let data = state
        .app
        .platforms
        .real_data(state.app.store.as_ref(), &user.user_id, platform)
        .await;
    Ok(Json(data))
}

pub async fn real_all(
    State(state): State<HttpState>,
    Extension(user): Extension<AuthUser>,
) -> Json<Value> {
    Json(
        state
            .app
            .platforms
            .all_real_data(state.app.store.as_ref(), &user.user_id)
            .await,
    )
}

pub async fn youtube_featured(State(state): State<HttpState>) -> Json<Vec<FeaturedChannel>> {
    Json(state.app.platforms.youtube.featured().await)
}

pub async fn youtube_channel(
    State(state): State<HttpState>,
    Path(channel_id): Path<String>,
) -> Json<ChannelOverview> {
    Json(state.app.platforms.youtube.channel_overview(&channel_id).await)
}

pub async fn instagram_public(
    State(state): State<HttpState>,
    Path(username): Path<String>,
) -> Result<Json<PublicProfile>> {
    Ok(Json(state.app.platforms.instagram.public_profile(&username).await?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64::Engine;
    use base64::engine::general_purpose::URL_SAFE_NO_PAD;

    fn query(user_id: Option<&str>, token: Option<&str>) -> OAuthStartQuery {
        OAuthStartQuery {
            user_id: user_id.map(str::to_string),
            token: token.map(str::to_string),
        }
    }

    #[test]
    fn token_identifies_the_oauth_user() {
        let jwt = format!(
            "{}.{}.sig",
            URL_SAFE_NO_PAD.encode(r#"{"alg":"HS256"}"#),
            URL_SAFE_NO_PAD.encode(r#"{"sub":"user-9"}"#)
        );
        let q = query(Some("someone-else"), Some(&jwt));
        assert_eq!(oauth_user(&q, false).unwrap(), "user-9");
    }

    #[test]
    fn bare_user_id_only_outside_production() {
        assert_eq!(oauth_user(&query(Some(" u1 "), None), true).unwrap(), "u1");
        assert!(matches!(
            oauth_user(&query(Some("u1"), None), false),
            Err(SocialLeafError::Unauthorized { .. })
        ));
        assert!(oauth_user(&query(None, None), true).is_err());
    }
}
