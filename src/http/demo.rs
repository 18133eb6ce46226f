//! Unauthenticated demo endpoints backed by the canned dashboard data

use axum::{
    Json,
    extract::{Path, State},
};
use serde_json::{Value, json};

use super::HttpState;
use crate::analytics::insights::{
    Insight, InsightInputs, Recommendation, recommendations as standing_recommendations, rule_insights,
};
use crate::analytics::{AnalyticsOverview, PlatformMetrics, best_time, demo};
use crate::error::Result;
use crate::platforms::Platform;

fn demo_insights() -> Vec<Insight> {
    let overview = demo::overview();
    rule_insights(&InsightInputs {
        engagement_rate: overview.engagement_rate,
        growth_rate: overview.growth_rate,
        ..InsightInputs::default()
    })
}

pub async fn analytics() -> Json<AnalyticsOverview> {
    Json(demo::overview())
}

pub async fn platform(Path(name): Path<String>) -> Result<Json<PlatformMetrics>> {
    Ok(Json(demo::platform_metrics(Platform::from_path(&name)?)))
}

pub async fn insights() -> Json<Vec<Insight>> {
    Json(demo_insights())
}

pub async fn recommendations() -> Json<Vec<Recommendation>> {
    Json(standing_recommendations())
}

pub async fn best_times() -> Json<Value> {
    Json(best_time::best_times(None, None))
}

pub async fn best_time_for(Path(name): Path<String>) -> Json<Value> {
    Json(best_time::best_times(Some(&name.to_lowercase()), None))
}

pub async fn full_dashboard() -> Json<Value> {
    Json(json!({
        "overview": demo::overview(),
        "platforms": demo::all_platform_metrics(),
        "insights": demo_insights(),
        "recommendations": standing_recommendations(),
        "best_times": best_time::best_times(None, None),
        "generated_at": demo::demo_generated_at(),
    }))
}

pub async fn content_comparison() -> Json<Value> {
    Json(demo::content_comparison())
}

pub async fn report(State(state): State<HttpState>) -> Json<Value> {
    Json(super::analytics::demo_report(&state).await)
}
