//! HTTP transport for the social-leaf API
//!
//! Axum router with bearer authentication on `/api/*`. Demo, health, OAuth
//! redirect and public platform routes skip authentication.

mod accounts;
mod analytics;
mod demo;
mod media;

use std::sync::Arc;

use axum::{
    Json, Router,
    body::Body,
    extract::{DefaultBodyLimit, State},
    http::{HeaderValue, Method, Request, header},
    middleware::{self, Next},
    response::IntoResponse,
    routing::{get, post, put},
};
use serde_json::{Value, json};
use tower::ServiceBuilder;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{debug, info, warn};

use crate::auth::{AuthUser, bearer_token, decode_token};
use crate::config::ServerConfig;
use crate::error::{Result, SocialLeafError};
use crate::plans::{Feature, assert_feature_access};
use crate::services::{AppContext, users};

/// Shared state for HTTP handlers
#[derive(Clone)]
pub struct HttpState {
    pub app: Arc<AppContext>,
}

impl HttpState {
    pub fn new(app: AppContext) -> Self {
        Self { app: Arc::new(app) }
    }
}

const PUBLIC_PREFIXES: [&str; 4] = ["/demo/", "/auth/", "/api/youtube/", "/api/instagram/public/"];
const PUBLIC_PATHS: [&str; 3] = ["/", "/health", "/api/hooks/health"];

/// Paths served without a bearer token
pub fn is_public(path: &str) -> bool {
    PUBLIC_PATHS.contains(&path) || PUBLIC_PREFIXES.iter().any(|p| path.starts_with(p))
}

async fn root_handler() -> Json<Value> {
    Json(json!({"message": "Welcome to Social Leaf API", "version": env!("CARGO_PKG_VERSION")}))
}

/// Health check endpoint
async fn health_handler() -> Json<Value> {
    Json(json!({"status": "healthy", "service": "social-leaf-api"}))
}

fn cors_layer(server: &ServerConfig) -> CorsLayer {
    let base = CorsLayer::new().allow_methods(Any).allow_headers(Any);
    if server.cors_origins.iter().any(|o| o == "*") {
        return base.allow_origin(Any);
    }
    let origins: Vec<HeaderValue> = server
        .cors_origins
        .iter()
        .filter_map(|o| match HeaderValue::from_str(o) {
            Ok(v) => Some(v),
            Err(_) => {
                warn!("ignoring invalid CORS origin '{}'", o);
                None
            }
        })
        .collect();
    base.allow_origin(AllowOrigin::list(origins))
}

/// Load (or create) the caller's profile and check the plan gate
pub(crate) async fn require_feature(state: &HttpState, user: &AuthUser, feature: Feature) -> Result<()> {
    let profile = users::get_or_create_profile(state.app.store.as_ref(), user, None).await?;
    assert_feature_access(&profile, feature)
}

/// Build the full application router
pub fn router(state: HttpState) -> Router {
    let config = state.app.config.clone();
    let allow_demo = !config.runtime.is_production();
    let body_limit = config.server.max_upload_mb.max(1) * 1024 * 1024;

    Router::new()
        .route("/", get(root_handler))
        .route("/health", get(health_handler))
        // Analytics
        .route("/api/analytics/overview", get(analytics::overview))
        .route("/api/analytics/platform/:platform", get(analytics::platform))
        .route("/api/analytics/compare", get(analytics::compare))
        // AI assistant
        .route("/api/ai/query", post(analytics::query))
        .route("/api/ai/insights", get(analytics::insights))
        .route("/api/ai/generate-insights", post(analytics::generate_insights))
        .route("/api/ai/recommendations", get(analytics::recommendations))
        .route("/api/ai/best-time-to-post", get(analytics::best_time))
        .route("/api/ai/persona", post(analytics::persona))
        // Reports
        .route("/api/reports/summary", get(analytics::summary_report))
        .route("/api/reports/pdf-data", get(analytics::pdf_report))
        .route("/api/reports/export/csv", get(analytics::export_csv))
        .route("/api/reports/best-time", get(analytics::best_time))
        .route("/api/reports/narrative", get(analytics::narrative))
        // Media
        .route("/api/hooks/analyze", post(media::analyze_hook))
        .route("/api/hooks/health", get(media::hooks_health))
        .route("/api/voice-coach/analyze", post(media::analyze_script))
        .route("/api/voice-coach/speech", post(media::speech))
        .route("/api/post/generate", post(media::generate_post))
        // Accounts and platforms
        .route("/api/users/me", get(accounts::me))
        .route("/api/users/me/profile", post(accounts::update_profile))
        .route("/api/users/me/plan", put(accounts::update_plan))
        .route("/api/platforms/", get(accounts::connected_platforms))
        .route("/api/platforms/connect", post(accounts::connect_platform))
        .route("/auth/:platform", get(accounts::oauth_start))
        .route("/auth/:platform/callback", get(accounts::oauth_callback))
        .route("/api/real/all", get(accounts::real_all))
        .route("/api/real/:platform", get(accounts::real_platform))
        .route("/api/youtube/featured", get(accounts::youtube_featured))
        .route("/api/youtube/channel/:channel_id", get(accounts::youtube_channel))
        .route("/api/instagram/public/:username", get(accounts::instagram_public))
        // Demo
        .route("/demo/analytics", get(demo::analytics))
        .route("/demo/platform/:platform", get(demo::platform))
        .route("/demo/insights", get(demo::insights))
        .route("/demo/recommendations", get(demo::recommendations))
        .route("/demo/best-times", get(demo::best_times))
        .route("/demo/best-time/:platform", get(demo::best_time_for))
        .route("/demo/full-dashboard", get(demo::full_dashboard))
        .route("/demo/content-comparison", get(demo::content_comparison))
        .route("/demo/report", get(demo::report))
        .layer(DefaultBodyLimit::max(body_limit))
        // Bearer auth layer; the caller identity lands in request extensions
        .layer(middleware::from_fn_with_state(
            allow_demo,
            |State(allow_demo): State<bool>, mut req: Request<Body>, next: Next| async move {
                if req.method() == Method::OPTIONS || is_public(req.uri().path()) {
                    return next.run(req).await;
                }
                let header = req
                    .headers()
                    .get(header::AUTHORIZATION)
                    .and_then(|h| h.to_str().ok());
                let identity = bearer_token(header).and_then(|t| decode_token(t, allow_demo));
                match identity {
                    Ok(user) => {
                        debug!(user_id = %user.user_id, path = %req.uri().path(), "authenticated");
                        req.extensions_mut().insert(user);
                        next.run(req).await
                    }
                    Err(e) => e.into_response(),
                }
            },
        ))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors_layer(&config.server)),
        )
        .with_state(state)
}

/// Start the HTTP server
pub async fn start_http_server(app: AppContext) -> Result<()> {
    let bind = app.config.server.bind;
    if !app.config.runtime.is_production() {
        warn!("Demo bearer token is accepted; set APP_ENV=production to disable it");
    }
    let router = router(HttpState::new(app));

    let listener = tokio::net::TcpListener::bind(bind)
        .await
        .map_err(|e| SocialLeafError::Internal {
            message: format!("Failed to bind HTTP listener on {bind}: {e}"),
        })?;

    info!("Starting HTTP server on {}", bind);

    axum::serve(listener, router)
        .await
        .map_err(|e| SocialLeafError::Internal {
            message: format!("HTTP server error: {e}"),
        })?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn public_paths() {
        assert!(is_public("/"));
        assert!(is_public("/health"));
        assert!(is_public("/demo/full-dashboard"));
        assert!(is_public("/auth/youtube/callback"));
        assert!(is_public("/api/hooks/health"));
        assert!(is_public("/api/youtube/featured"));
        assert!(is_public("/api/instagram/public/natgeo"));
        assert!(!is_public("/api/hooks/analyze"));
        assert!(!is_public("/api/analytics/overview"));
        assert!(!is_public("/healthz"));
    }
}
