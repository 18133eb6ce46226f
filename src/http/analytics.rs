//! Analytics, assistant and report handlers

use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::header,
    response::IntoResponse,
};
use chrono::Utc;
use serde::Deserialize;
use serde_json::{Value, json};

use super::HttpState;
use crate::analytics::reports::{CsvKind, ReportKind, build_report};
use crate::analytics::{AnalyticsOverview, PlatformComparison, PlatformMetrics, best_time, reports, window_days};
use crate::auth::AuthUser;
use crate::error::Result;
use crate::platforms::Platform;
use crate::services::assistant::{self, GeneratedInsight, PersonaRequest, QueryAnswer};
use crate::store::{InsightRow, RecommendationRow};

#[derive(Debug, Default, Deserialize)]
pub struct DaysQuery {
    pub days: Option<i64>,
}

#[derive(Debug, Default, Deserialize)]
pub struct BestTimeQuery {
    pub platform: Option<String>,
    pub content_type: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CsvQuery {
    #[serde(default = "default_csv_type")]
    pub data_type: String,
}

fn default_csv_type() -> String {
    "analytics".to_string()
}

#[derive(Debug, Deserialize)]
pub struct QueryBody {
    pub question: String,
}

pub async fn overview(
    State(state): State<HttpState>,
    Extension(user): Extension<AuthUser>,
    Query(q): Query<DaysQuery>,
) -> Json<AnalyticsOverview> {
    let overview = state
        .app
        .analytics
        .overview(&user.user_id, window_days(q.days), Utc::now())
        .await;
    Json(overview)
}

pub async fn platform(
    State(state): State<HttpState>,
    Extension(user): Extension<AuthUser>,
    Path(name): Path<String>,
    Query(q): Query<DaysQuery>,
) -> Result<Json<PlatformMetrics>> {
    let platform = Platform::from_path(&name)?;
    let metrics = state
        .app
        .analytics
        .platform(&user.user_id, platform, window_days(q.days), Utc::now())
        .await;
    Ok(Json(metrics))
}

pub async fn compare(
    State(state): State<HttpState>,
    Extension(user): Extension<AuthUser>,
) -> Json<PlatformComparison> {
    Json(state.app.analytics.compare(&user.user_id, Utc::now()).await)
}

pub async fn query(
    State(state): State<HttpState>,
    Extension(user): Extension<AuthUser>,
    Json(body): Json<QueryBody>,
) -> Result<Json<QueryAnswer>> {
    let answer = assistant::answer_query(&state.app, &user, &body.question, Utc::now()).await?;
    Ok(Json(answer))
}

pub async fn insights(
    State(state): State<HttpState>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<Vec<InsightRow>>> {
    Ok(Json(assistant::list_insights(&state.app, &user).await?))
}

pub async fn generate_insights(
    State(state): State<HttpState>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<GeneratedInsight>> {
    Ok(Json(assistant::generate_insight(&state.app, &user, Utc::now()).await?))
}

pub async fn recommendations(
    State(state): State<HttpState>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<Vec<RecommendationRow>>> {
    Ok(Json(
        assistant::list_recommendations(&state.app, &user, Utc::now()).await?,
    ))
}

pub async fn best_time(Query(q): Query<BestTimeQuery>) -> Json<Value> {
    let platform = q.platform.map(|p| p.to_lowercase());
    let content_type = q.content_type.map(|c| c.to_lowercase());
    Json(best_time::best_times(platform.as_deref(), content_type.as_deref()))
}

pub async fn persona(
    State(state): State<HttpState>,
    Extension(user): Extension<AuthUser>,
    body: Option<Json<PersonaRequest>>,
) -> Result<Json<Value>> {
    let request = body.map(|Json(r)| r).unwrap_or_default();
    Ok(Json(assistant::persona(&state.app, &user, request, Utc::now()).await?))
}

pub async fn narrative(
    State(state): State<HttpState>,
    Extension(user): Extension<AuthUser>,
    Query(q): Query<DaysQuery>,
) -> Result<Json<Value>> {
    let days = window_days(q.days);
    Ok(Json(assistant::narrative(&state.app, &user, days, Utc::now()).await?))
}

pub async fn summary_report(
    State(state): State<HttpState>,
    Extension(user): Extension<AuthUser>,
    Query(q): Query<DaysQuery>,
) -> Json<reports::Report> {
    let report = build_report(
        &state.app.analytics,
        &user.user_id,
        ReportKind::Summary,
        window_days(q.days),
        Utc::now(),
    )
    .await;
    Json(report)
}

pub async fn pdf_report(
    State(state): State<HttpState>,
    Extension(user): Extension<AuthUser>,
    Query(q): Query<DaysQuery>,
) -> Json<reports::Report> {
    let report = build_report(
        &state.app.analytics,
        &user.user_id,
        ReportKind::Pdf,
        window_days(q.days),
        Utc::now(),
    )
    .await;
    Json(report)
}

pub async fn export_csv(
    State(state): State<HttpState>,
    Extension(user): Extension<AuthUser>,
    Query(q): Query<CsvQuery>,
) -> Result<impl IntoResponse> {
    let kind = CsvKind::parse(q.data_type.trim())?;
    let now = Utc::now();
    let body = reports::export_csv(&state.app.analytics, &user.user_id, kind, now).await?;
    let disposition = format!(
        "attachment; filename=social_leaf_{}_{}.csv",
        kind.as_str(),
        now.format("%Y%m%d")
    );
    Ok((
        [
            (header::CONTENT_TYPE, "text/csv".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        body,
    ))
}

/// Shared body for `/demo/report`
pub(super) async fn demo_report(state: &HttpState) -> Value {
    let report = build_report(
        &state.app.analytics,
        "demo-user",
        ReportKind::Summary,
        crate::analytics::DEFAULT_DAYS,
        Utc::now(),
    )
    .await;
    json!(report)
}
