//! Router-level tests: auth, plan gates, demo data and CSV export

use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use chrono::Utc;
use http_body_util::BodyExt;
use serde_json::{Value, json};
use social_leaf::auth::DEMO_TOKEN;
use social_leaf::config::Config;
use social_leaf::http::{HttpState, router};
use social_leaf::services::AppContext;
use social_leaf::store::{MemoryStore, MetricRow, PostRow};
use tower::ServiceExt;

fn app_with(config: Config) -> Router {
    let ctx = AppContext::new(config, Arc::new(MemoryStore::new())).unwrap();
    router(HttpState::new(ctx))
}

fn app_on(store: Arc<MemoryStore>) -> Router {
    let ctx = AppContext::new(Config::default(), store).unwrap();
    router(HttpState::new(ctx))
}

fn app() -> Router {
    app_with(Config::default())
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn authed(method: &str, uri: &str, body: Option<Value>) -> Request<Body> {
    let builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::AUTHORIZATION, format!("Bearer {DEMO_TOKEN}"));
    match body {
        Some(json) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

async fn body_bytes(response: axum::response::Response) -> Vec<u8> {
    response.into_body().collect().await.unwrap().to_bytes().to_vec()
}

async fn body_json(response: axum::response::Response) -> Value {
    serde_json::from_slice(&body_bytes(response).await).unwrap()
}

#[tokio::test]
async fn health_needs_no_token() {
    let response = app().oneshot(get("/health")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["status"], "healthy");
}

#[tokio::test]
async fn api_without_bearer_is_unauthorized() {
    let response = app().oneshot(get("/api/analytics/overview")).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_json(response).await["error"]["code"], 401);
}

#[tokio::test]
async fn demo_token_rejected_in_production() {
    let mut config = Config::default();
    config.runtime.app_env = "production".into();
    let response = app_with(config)
        .oneshot(authed("GET", "/api/analytics/overview", None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn empty_store_serves_demo_overview() {
    let response = app()
        .oneshot(authed("GET", "/api/analytics/overview?days=7", None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["total_impressions"], 125430);
    assert_eq!(body["engagement_rate"], 6.8);
}

#[tokio::test]
async fn overview_only_counts_the_callers_posts() {
    let store = Arc::new(MemoryStore::new());
    store
        .insert_posts(vec![PostRow {
            id: "other-post".into(),
            user_id: "someone_else".into(),
            platform: "instagram".into(),
            content_type: Some("reel".into()),
            caption: None,
            posted_at: Some(Utc::now()),
        }])
        .await;
    store
        .insert_metrics(vec![MetricRow {
            post_id: Some("other-post".into()),
            likes: 10,
            reach: 100,
            impressions: 424242,
            collected_at: Some(Utc::now()),
            ..Default::default()
        }])
        .await;

    let response = app_on(store)
        .oneshot(authed("GET", "/api/analytics/overview", None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_ne!(body["total_impressions"], 424242);
    assert_eq!(body["total_impressions"], 125430);
}

#[tokio::test]
async fn cors_allows_configured_origin() {
    let response = app()
        .oneshot(
            Request::builder()
                .uri("/health")
                .header(header::ORIGIN, "http://localhost:5173")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN],
        "http://localhost:5173"
    );
}

#[tokio::test]
async fn unknown_platform_is_a_bad_request() {
    let response = app()
        .oneshot(authed("GET", "/api/analytics/platform/myspace", None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn starter_plan_cannot_use_voice_coach() {
    let response = app()
        .oneshot(authed(
            "POST",
            "/api/voice-coach/analyze",
            Some(json!({"script": "Hello there"})),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    let body = body_json(response).await;
    assert_eq!(body["error"], "plan_restriction");
    assert_eq!(body["feature"], "voice_coach");
    assert_eq!(body["current_plan"], "starter");
    assert_eq!(body["required_plans"], json!(["professional", "business"]));
}

#[tokio::test]
async fn upgraded_plan_unlocks_voice_coach() {
    let app = app();
    let response = app
        .clone()
        .oneshot(authed("PUT", "/api/users/me/plan", Some(json!({"plan": "professional"}))))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["plan_status"], "trialing");

    let response = app
        .oneshot(authed(
            "POST",
            "/api/voice-coach/analyze",
            Some(json!({"script": "Hello there"})),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["retention_score"], 8.5);
}

#[tokio::test]
async fn bad_plan_name_is_rejected() {
    let response = app()
        .oneshot(authed("PUT", "/api/users/me/plan", Some(json!({"plan": "gold"}))))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn csv_export_is_an_attachment_with_header_row() {
    let response = app()
        .oneshot(authed("GET", "/api/reports/export/csv?data_type=posts", None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_TYPE], "text/csv");
    let disposition = response.headers()[header::CONTENT_DISPOSITION]
        .to_str()
        .unwrap()
        .to_string();
    assert!(disposition.starts_with("attachment; filename=social_leaf_posts_"));

    let body = String::from_utf8(body_bytes(response).await).unwrap();
    let mut lines = body.lines();
    assert_eq!(
        lines.next(),
        Some("post_id,platform,content_type,posted_at,likes,comments,shares,reach,impressions,engagement_rate")
    );
    assert!(lines.next().is_some());
}

#[tokio::test]
async fn unsupported_csv_type_is_rejected() {
    let response = app()
        .oneshot(authed("GET", "/api/reports/export/csv?data_type=audio", None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn demo_dashboard_is_public() {
    let response = app().oneshot(get("/demo/full-dashboard")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["platforms"].as_array().unwrap().len(), 4);
    assert_eq!(body["recommendations"].as_array().unwrap().len(), 5);
    assert_eq!(body["best_times"]["timezone"], "IST");
}

#[tokio::test]
async fn unconnected_platform_reports_how_to_connect() {
    let response = app()
        .oneshot(authed("GET", "/api/real/youtube", None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["connected"], false);
    assert!(body["message"].as_str().unwrap().contains("/auth/youtube"));
}

#[tokio::test]
async fn connected_platform_listing_hides_tokens() {
    let app = app();
    let response = app
        .clone()
        .oneshot(authed(
            "POST",
            "/api/platforms/connect",
            Some(json!({"platform_name": "twitter", "access_token": "secret-token"})),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app.oneshot(authed("GET", "/api/platforms/", None)).await.unwrap();
    let bytes = body_bytes(response).await;
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body[0]["platform_name"], "twitter");
    assert!(!String::from_utf8(bytes).unwrap().contains("secret-token"));
}

#[tokio::test]
async fn query_answers_from_keyword_fallback_without_providers() {
    let response = app()
        .oneshot(authed(
            "POST",
            "/api/ai/query",
            Some(json!({"question": "When should I post?"})),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert!(body["answer"].as_str().unwrap().contains("7-9 PM"));
    assert_eq!(body["source"], "fallback");
}

#[tokio::test]
async fn oauth_start_without_client_is_a_server_error() {
    let response = app()
        .oneshot(get("/auth/linkedin?user_id=u1"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn production_oauth_start_needs_a_real_token() {
    let production = || {
        let mut config = Config::default();
        config.runtime.app_env = "production".into();
        app_with(config)
    };

    let response = production()
        .oneshot(get("/auth/linkedin?user_id=victim"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = production()
        .oneshot(get(&format!("/auth/linkedin?token={DEMO_TOKEN}")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}
