//! Dashboard analytics: store aggregation with demo substitution.
//!
//! Read endpoints never fail on store trouble. An empty window or a store
//! error yields the canned demo figures instead, logged at `warn`.

pub mod aggregate;
pub mod best_time;
pub mod demo;
pub mod insights;
pub mod reports;

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::platforms::Platform;
use crate::store::{MetricRow, Store};

pub use aggregate::{AggregatedMetrics, aggregate, engagement_rate, round2};

pub const DEFAULT_DAYS: i64 = 30;
const MAX_DAYS: i64 = 365;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalyticsOverview {
    pub total_impressions: i64,
    pub engagement_rate: f64,
    pub total_comments: i64,
    pub total_shares: i64,
    pub growth_rate: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlatformMetrics {
    pub platform: String,
    pub impressions: i64,
    pub likes: i64,
    pub comments: i64,
    pub shares: i64,
    pub engagement_rate: f64,
}

impl PlatformMetrics {
    fn from_aggregate(platform: Platform, agg: &AggregatedMetrics) -> Self {
        Self {
            platform: platform.as_str().to_string(),
            impressions: agg.impressions,
            likes: agg.likes,
            comments: agg.comments,
            shares: agg.shares,
            engagement_rate: agg.engagement_rate,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlatformComparison {
    pub platforms: Vec<PlatformMetrics>,
    pub best_platform: Option<String>,
    pub best_engagement_rate: f64,
}

impl PlatformComparison {
    pub fn from_metrics(platforms: Vec<PlatformMetrics>) -> Self {
        let best = platforms
            .iter()
            .max_by(|a, b| a.engagement_rate.total_cmp(&b.engagement_rate));
        let best_platform = best.map(|p| p.platform.clone());
        let best_engagement_rate = best.map(|p| p.engagement_rate).unwrap_or(0.0);
        Self {
            platforms,
            best_platform,
            best_engagement_rate,
        }
    }
}

/// Clamp a `days` query parameter into a sane look-back window
pub fn window_days(days: Option<i64>) -> i64 {
    days.unwrap_or(DEFAULT_DAYS).clamp(1, MAX_DAYS)
}

#[derive(Clone)]
pub struct Analytics {
    store: Arc<dyn Store>,
}

impl Analytics {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<dyn Store> {
        &self.store
    }

    /// The user's totals for the last `days`, with growth measured against the
    /// window before it
    pub async fn overview(&self, user_id: &str, days: i64, now: DateTime<Utc>) -> AnalyticsOverview {
        let window_start = now - Duration::days(days);
        let rows = match self
            .store
            .metrics_since(user_id, now - Duration::days(days * 2))
            .await
        {
            Ok(rows) => rows,
            Err(e) => {
                warn!(error = %e, "metrics query failed; serving demo overview");
                return demo::overview();
            }
        };

        let (current, previous): (Vec<MetricRow>, Vec<MetricRow>) = rows
            .into_iter()
            .partition(|r| r.collected_at.is_none_or(|at| at >= window_start));

        if current.is_empty() {
            debug!(days, "no metrics in window; serving demo overview");
            return demo::overview();
        }

        let agg = aggregate(&current);
        let prior = aggregate(&previous);
        AnalyticsOverview {
            total_impressions: agg.impressions,
            engagement_rate: agg.engagement_rate,
            total_comments: agg.comments,
            total_shares: agg.shares,
            growth_rate: aggregate::growth_rate(agg.impressions, prior.impressions),
        }
    }

    pub async fn platform(
        &self,
        user_id: &str,
        platform: Platform,
        days: i64,
        now: DateTime<Utc>,
    ) -> PlatformMetrics {
        match self.platform_rows(user_id, platform, days, now).await {
            Ok(rows) if !rows.is_empty() => {
                PlatformMetrics::from_aggregate(platform, &aggregate(&rows))
            }
            Ok(_) => {
                debug!(platform = platform.as_str(), "no platform metrics; serving demo");
                demo::platform_metrics(platform)
            }
            Err(e) => {
                warn!(platform = platform.as_str(), error = %e, "platform query failed; serving demo");
                demo::platform_metrics(platform)
            }
        }
    }

    async fn platform_rows(
        &self,
        user_id: &str,
        platform: Platform,
        days: i64,
        now: DateTime<Utc>,
    ) -> crate::error::Result<Vec<MetricRow>> {
        let posts = self
            .store
            .posts_for_user(user_id, Some(platform.as_str()))
            .await?;
        if posts.is_empty() {
            return Ok(Vec::new());
        }
        let ids: Vec<String> = posts.into_iter().map(|p| p.id).collect();
        self.store
            .metrics_for_posts(&ids, now - Duration::days(days))
            .await
    }

    pub async fn compare(&self, user_id: &str, now: DateTime<Utc>) -> PlatformComparison {
        let mut platforms = Vec::with_capacity(Platform::ALL.len());
        for platform in Platform::ALL {
            platforms.push(self.platform(user_id, platform, DEFAULT_DAYS, now).await);
        }
        PlatformComparison::from_metrics(platforms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{MemoryStore, PostRow};

    fn metric(post: &str, likes: i64, reach: i64, impressions: i64, at: DateTime<Utc>) -> MetricRow {
        MetricRow {
            post_id: Some(post.to_string()),
            likes,
            reach,
            impressions,
            collected_at: Some(at),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn empty_store_serves_demo_overview() {
        let analytics = Analytics::new(Arc::new(MemoryStore::new()));
        assert_eq!(analytics.overview("u1", 30, Utc::now()).await, demo::overview());
    }

    fn post(id: &str, user: &str, platform: &str, now: DateTime<Utc>) -> PostRow {
        PostRow {
            id: id.into(),
            user_id: user.into(),
            platform: platform.into(),
            content_type: None,
            caption: None,
            posted_at: Some(now),
        }
    }

    #[tokio::test]
    async fn overview_aggregates_window_and_growth() {
        let now = Utc::now();
        let store = MemoryStore::new();
        store
            .insert_posts(vec![post("p1", "u1", "instagram", now), post("p2", "u1", "instagram", now)])
            .await;
        store
            .insert_metrics(vec![
                metric("p1", 10, 100, 150, now - Duration::days(1)),
                metric("p2", 5, 100, 100, now - Duration::days(40)),
            ])
            .await;
        let analytics = Analytics::new(Arc::new(store));
        let overview = analytics.overview("u1", 30, now).await;
        assert_eq!(overview.total_impressions, 150);
        assert_eq!(overview.engagement_rate, 10.0);
        assert_eq!(overview.growth_rate, 50.0);
    }

    #[tokio::test]
    async fn overview_ignores_other_users_metrics() {
        let now = Utc::now();
        let store = MemoryStore::new();
        store
            .insert_posts(vec![post("mine", "u1", "twitter", now), post("theirs", "u2", "twitter", now)])
            .await;
        store
            .insert_metrics(vec![
                metric("mine", 3, 100, 200, now),
                metric("theirs", 50, 100, 424242, now),
            ])
            .await;
        let analytics = Analytics::new(Arc::new(store));

        assert_eq!(analytics.overview("u1", 30, now).await.total_impressions, 200);
        assert_eq!(analytics.overview("u2", 30, now).await.total_impressions, 424242);
        assert_eq!(analytics.overview("u3", 30, now).await, demo::overview());
    }

    #[tokio::test]
    async fn platform_uses_only_that_platforms_posts() {
        let now = Utc::now();
        let store = MemoryStore::new();
        store
            .insert_posts(vec![PostRow {
                id: "yt1".into(),
                user_id: "u1".into(),
                platform: "youtube".into(),
                content_type: Some("video".into()),
                caption: None,
                posted_at: Some(now),
            }])
            .await;
        store
            .insert_metrics(vec![
                metric("yt1", 20, 200, 400, now),
                metric("other", 99, 99, 99, now),
            ])
            .await;
        let analytics = Analytics::new(Arc::new(store));

        let yt = analytics.platform("u1", Platform::Youtube, 30, now).await;
        assert_eq!(yt.likes, 20);
        assert_eq!(yt.engagement_rate, 10.0);

        let ig = analytics.platform("u1", Platform::Instagram, 30, now).await;
        assert_eq!(ig, demo::platform_metrics(Platform::Instagram));
    }

    #[test]
    fn comparison_picks_highest_engagement() {
        let cmp = PlatformComparison::from_metrics(demo::all_platform_metrics());
        assert_eq!(cmp.best_platform.as_deref(), Some("instagram"));
        assert_eq!(cmp.best_engagement_rate, 8.2);

        let empty = PlatformComparison::from_metrics(Vec::new());
        assert_eq!(empty.best_platform, None);
        assert_eq!(empty.best_engagement_rate, 0.0);
    }

    #[test]
    fn window_is_clamped() {
        assert_eq!(window_days(None), 30);
        assert_eq!(window_days(Some(0)), 1);
        assert_eq!(window_days(Some(10_000)), 365);
    }
}
