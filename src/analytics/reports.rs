//! Summary / PDF report payloads and CSV export

use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use serde_json::Value;
use tracing::warn;

use super::insights::{Insight, InsightInputs, Recommendation, recommendations, rule_insights};
use super::{Analytics, AnalyticsOverview, PlatformMetrics, best_time, demo};
use crate::error::{Result, SocialLeafError};
use crate::store::{MetricRow, PostRow};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportKind {
    Summary,
    Pdf,
}

impl ReportKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReportKind::Summary => "summary",
            ReportKind::Pdf => "pdf",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ReportPeriod {
    pub days: i64,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Report {
    pub report_type: &'static str,
    pub title: String,
    pub user_id: String,
    pub period: ReportPeriod,
    pub overview: AnalyticsOverview,
    pub platforms: Vec<PlatformMetrics>,
    pub best_platform: Option<String>,
    pub insights: Vec<Insight>,
    pub recommendations: Vec<Recommendation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub best_times: Option<Value>,
    pub generated_at: DateTime<Utc>,
}

/// Content type with the highest average engagement among `rows`
fn best_content_type(posts: &[PostRow], metrics: &[MetricRow]) -> Option<String> {
    let kinds: HashMap<&str, &str> = posts
        .iter()
        .filter_map(|p| Some((p.id.as_str(), p.content_type.as_deref()?)))
        .collect();
    let mut buckets: HashMap<&str, Vec<MetricRow>> = HashMap::new();
    for m in metrics {
        if let Some(kind) = m.post_id.as_deref().and_then(|id| kinds.get(id).copied()) {
            buckets.entry(kind).or_default().push(m.clone());
        }
    }
    buckets
        .into_iter()
        .map(|(kind, rows)| (kind, super::aggregate(&rows).engagement_rate))
        .max_by(|a, b| a.1.total_cmp(&b.1).then_with(|| b.0.cmp(a.0)))
        .map(|(kind, _)| kind.to_string())
}

pub async fn build_report(
    analytics: &Analytics,
    user_id: &str,
    kind: ReportKind,
    days: i64,
    now: DateTime<Utc>,
) -> Report {
    let overview = analytics.overview(user_id, days, now).await;
    let comparison = analytics.compare(user_id, now).await;
    let (posts, metrics) = post_metrics(analytics, user_id, now).await;
    let best_type = best_content_type(&posts, &metrics).unwrap_or_else(|| "reel".to_string());

    let insights = rule_insights(&InsightInputs {
        engagement_rate: overview.engagement_rate,
        growth_rate: overview.growth_rate,
        best_content_type: &best_type,
    });

    let title = match kind {
        ReportKind::Summary => format!("Social Leaf Summary ({days} days)"),
        ReportKind::Pdf => format!("Social Leaf Analytics Report ({days} days)"),
    };

    Report {
        report_type: kind.as_str(),
        title,
        user_id: user_id.to_string(),
        period: ReportPeriod {
            days,
            start: now - Duration::days(days),
            end: now,
        },
        overview,
        platforms: comparison.platforms,
        best_platform: comparison.best_platform,
        insights,
        recommendations: recommendations(),
        best_times: (kind == ReportKind::Pdf).then(|| best_time::best_times(None, None)),
        generated_at: now,
    }
}

/// The user's posts and their metrics; empty on store errors
async fn post_metrics(
    analytics: &Analytics,
    user_id: &str,
    now: DateTime<Utc>,
) -> (Vec<PostRow>, Vec<MetricRow>) {
    let store = analytics.store();
    let posts = match store.posts_for_user(user_id, None).await {
        Ok(posts) => posts,
        Err(e) => {
            warn!(error = %e, "posts query failed");
            return (Vec::new(), Vec::new());
        }
    };
    let ids: Vec<String> = posts.iter().map(|p| p.id.clone()).collect();
    match store.metrics_for_posts(&ids, now - Duration::days(365)).await {
        Ok(metrics) => (posts, metrics),
        Err(e) => {
            warn!(error = %e, "post metrics query failed");
            (posts, Vec::new())
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CsvKind {
    Analytics,
    Posts,
}

impl CsvKind {
    pub fn parse(value: &str) -> Result<Self> {
        match value {
            "analytics" => Ok(CsvKind::Analytics),
            "posts" => Ok(CsvKind::Posts),
            other => Err(SocialLeafError::InvalidParams {
                message: format!("Unsupported data_type '{other}'; expected 'analytics' or 'posts'"),
            }),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            CsvKind::Analytics => "analytics",
            CsvKind::Posts => "posts",
        }
    }
}

fn finish(writer: csv::Writer<Vec<u8>>) -> Result<String> {
    let bytes = writer
        .into_inner()
        .map_err(|e| SocialLeafError::Internal {
            message: format!("csv flush failed: {e}"),
        })?;
    String::from_utf8(bytes).map_err(|e| SocialLeafError::Internal {
        message: format!("csv output not utf-8: {e}"),
    })
}

pub fn platforms_csv(platforms: &[PlatformMetrics]) -> Result<String> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record([
        "platform",
        "impressions",
        "likes",
        "comments",
        "shares",
        "engagement_rate",
    ])?;
    for p in platforms {
        writer.write_record([
            p.platform.clone(),
            p.impressions.to_string(),
            p.likes.to_string(),
            p.comments.to_string(),
            p.shares.to_string(),
            p.engagement_rate.to_string(),
        ])?;
    }
    finish(writer)
}

/// One row per post using the most recent metric snapshot for it
pub fn posts_csv(rows: &[(PostRow, MetricRow)]) -> Result<String> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record([
        "post_id",
        "platform",
        "content_type",
        "posted_at",
        "likes",
        "comments",
        "shares",
        "reach",
        "impressions",
        "engagement_rate",
    ])?;
    for (post, m) in rows {
        writer.write_record([
            post.id.clone(),
            post.platform.clone(),
            post.content_type.clone().unwrap_or_default(),
            post.posted_at.map(|t| t.to_rfc3339()).unwrap_or_default(),
            m.likes.to_string(),
            m.comments.to_string(),
            m.shares.to_string(),
            m.reach.to_string(),
            m.impressions.to_string(),
            super::engagement_rate(m.likes, m.comments, m.shares, m.reach).to_string(),
        ])?;
    }
    finish(writer)
}

fn latest_per_post(posts: Vec<PostRow>, metrics: Vec<MetricRow>) -> Vec<(PostRow, MetricRow)> {
    let mut latest: HashMap<String, MetricRow> = HashMap::new();
    for m in metrics {
        let Some(id) = m.post_id.clone() else { continue };
        match latest.get(&id) {
            Some(existing) if existing.collected_at >= m.collected_at => {}
            _ => {
                latest.insert(id, m);
            }
        }
    }
    posts
        .into_iter()
        .map(|p| {
            let m = latest.remove(&p.id).unwrap_or_default();
            (p, m)
        })
        .collect()
}

pub async fn export_csv(
    analytics: &Analytics,
    user_id: &str,
    kind: CsvKind,
    now: DateTime<Utc>,
) -> Result<String> {
    match kind {
        CsvKind::Analytics => platforms_csv(&analytics.compare(user_id, now).await.platforms),
        CsvKind::Posts => {
            let (posts, metrics) = post_metrics(analytics, user_id, now).await;
            let rows = if posts.is_empty() {
                demo::posts_with_metrics(user_id, now)
            } else {
                latest_per_post(posts, metrics)
            };
            posts_csv(&rows)
        }
    }
}
