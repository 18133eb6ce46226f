//! Analytics assistant: questions, insights, persona and narrative reports

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use tracing::warn;

use super::AppContext;
use crate::analytics::insights::recommendations;
use crate::analytics::{AnalyticsOverview, PlatformComparison};
use crate::auth::AuthUser;
use crate::capabilities::{CapabilityPayload, CapabilityRequest};
use crate::error::Result;
use crate::normalize::NormalizedResult;
use crate::store::{InsightRow, MetricRow, RecommendationRow};

const CONTEXT_POSTS: usize = 50;
const CONTEXT_METRICS: usize = 100;
const QUERY_SAMPLE: usize = 10;
const INSIGHT_SAMPLE: usize = 20;
const LIST_LIMIT: usize = 10;

#[derive(Debug, Clone, Serialize)]
pub struct QueryAnswer {
    pub answer: String,
    pub data: Value,
    pub source: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct GeneratedInsight {
    pub message: &'static str,
    pub id: String,
    pub insight: String,
    pub source: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PersonaRequest {
    #[serde(default)]
    pub niche: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

/// Result fields plus provenance, as returned to clients
pub fn with_provenance(result: NormalizedResult) -> Value {
    let mut fields: Map<String, Value> = result.fields;
    fields.insert("source".into(), json!(result.source));
    fields.insert("degraded".into(), json!(result.degraded));
    Value::Object(fields)
}

async fn recent_metrics(ctx: &AppContext, user: &AuthUser) -> Vec<MetricRow> {
    ctx.store
        .recent_metrics(&user.user_id, CONTEXT_METRICS)
        .await
        .unwrap_or_else(|e| {
            warn!(error = %e, "recent metrics unavailable");
            Vec::new()
        })
}

pub async fn answer_query(
    ctx: &AppContext,
    user: &AuthUser,
    question: &str,
    now: DateTime<Utc>,
) -> Result<QueryAnswer> {
    let posts = ctx
        .store
        .posts_for_user(&user.user_id, None)
        .await
        .unwrap_or_else(|e| {
            warn!(error = %e, "posts unavailable for query context");
            Vec::new()
        });
    let posts_analyzed = posts.len().min(CONTEXT_POSTS);
    let metrics = recent_metrics(ctx, user).await;
    let overview = ctx.analytics.overview(&user.user_id, crate::analytics::DEFAULT_DAYS, now).await;

    let sample: Vec<&MetricRow> = metrics.iter().take(QUERY_SAMPLE).collect();
    let recent = if sample.is_empty() {
        json!("No data yet")
    } else {
        json!(sample)
    };
    let context = json!({
        "posts": posts_analyzed,
        "engagement_rate": overview.engagement_rate,
        "total_impressions": overview.total_impressions,
        "recent_metrics": recent,
    });

    let request = CapabilityRequest::new(CapabilityPayload::Query {
        question: question.to_string(),
        context,
    });
    let result = ctx.run(request).await?;
    Ok(QueryAnswer {
        answer: result.str_field("answer"),
        data: json!({ "posts_analyzed": posts_analyzed }),
        source: result.source,
    })
}

pub async fn list_insights(ctx: &AppContext, user: &AuthUser) -> Result<Vec<InsightRow>> {
    ctx.store.insights_for_user(&user.user_id, LIST_LIMIT).await
}

/// Summarise recent metrics and persist the insight; store failures surface
pub async fn generate_insight(
    ctx: &AppContext,
    user: &AuthUser,
    now: DateTime<Utc>,
) -> Result<GeneratedInsight> {
    let metrics = recent_metrics(ctx, user).await;
    let sample: Vec<&MetricRow> = metrics.iter().take(INSIGHT_SAMPLE).collect();
    let request = CapabilityRequest::new(CapabilityPayload::Insight {
        context: json!({ "recent_metrics": sample }),
    });
    let result = ctx.run(request).await?;
    let summary = result.str_field("summary");

    let saved = ctx
        .store
        .insert_insight(InsightRow {
            id: String::new(),
            user_id: user.user_id.clone(),
            summary: summary.clone(),
            generated_at: now,
        })
        .await?;

    Ok(GeneratedInsight {
        message: "Insight generated",
        id: saved.id,
        insight: summary,
        source: result.source,
    })
}

/// Stored recommendations, or the standing list when none exist yet
pub async fn list_recommendations(
    ctx: &AppContext,
    user: &AuthUser,
    now: DateTime<Utc>,
) -> Result<Vec<RecommendationRow>> {
    let stored = ctx
        .store
        .recommendations_for_user(&user.user_id, LIST_LIMIT)
        .await?;
    if !stored.is_empty() {
        return Ok(stored);
    }
    Ok(recommendations()
        .into_iter()
        .map(|r| RecommendationRow {
            id: format!("rec_{}", r.priority),
            user_id: user.user_id.clone(),
            recommendation_type: r.kind,
            content: r.content,
            generated_at: now,
        })
        .collect())
}

fn analytics_context(overview: &AnalyticsOverview, comparison: &PlatformComparison) -> Map<String, Value> {
    let mut map = Map::new();
    map.insert("overview".into(), json!(overview));
    map.insert("platforms".into(), json!(comparison.platforms));
    map.insert("best_platform".into(), json!(comparison.best_platform));
    map
}

pub async fn persona(
    ctx: &AppContext,
    user: &AuthUser,
    request: PersonaRequest,
    now: DateTime<Utc>,
) -> Result<Value> {
    let overview = ctx.analytics.overview(&user.user_id, crate::analytics::DEFAULT_DAYS, now).await;
    let comparison = ctx.analytics.compare(&user.user_id, now).await;
    let mut context = analytics_context(&overview, &comparison);
    if let Some(niche) = request.niche.filter(|n| !n.trim().is_empty()) {
        context.insert("niche".into(), json!(niche));
    }
    if let Some(notes) = request.notes.filter(|n| !n.trim().is_empty()) {
        context.insert("notes".into(), json!(notes));
    }

    let result = ctx
        .run(CapabilityRequest::new(CapabilityPayload::Persona {
            context: Value::Object(context),
        }))
        .await?;
    Ok(with_provenance(result))
}

pub async fn narrative(
    ctx: &AppContext,
    user: &AuthUser,
    days: i64,
    now: DateTime<Utc>,
) -> Result<Value> {
    let overview = ctx.analytics.overview(&user.user_id, days, now).await;
    let comparison = ctx.analytics.compare(&user.user_id, now).await;
    let mut context = analytics_context(&overview, &comparison);
    context.insert("days".into(), json!(days));

    let result = ctx
        .run(CapabilityRequest::new(CapabilityPayload::Narrative {
            context: Value::Object(context),
        }))
        .await?;
    let mut report = with_provenance(result);
    if let Value::Object(map) = &mut report {
        map.insert("period_days".into(), json!(days));
        map.insert("generated_at".into(), json!(now));
    }
    Ok(report)
}
