use serde::{Deserialize, Serialize};

use crate::store::MetricRow;

/// Summed metrics with a guarded engagement ratio; built fresh per request
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct AggregatedMetrics {
    pub impressions: i64,
    pub likes: i64,
    pub comments: i64,
    pub shares: i64,
    pub reach: i64,
    pub engagement_rate: f64,
}

pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// `(likes + comments + shares) / reach * 100`, two decimals; zero reach gives 0
pub fn engagement_rate(likes: i64, comments: i64, shares: i64, reach: i64) -> f64 {
    if reach <= 0 {
        return 0.0;
    }
    let interactions = likes.saturating_add(comments).saturating_add(shares);
    round2(interactions as f64 / reach as f64 * 100.0)
}

/// Percentage change between two windows; no baseline gives 0
pub fn growth_rate(current: i64, previous: i64) -> f64 {
    if previous <= 0 {
        return 0.0;
    }
    round2((current - previous) as f64 / previous as f64 * 100.0)
}

pub fn aggregate(rows: &[MetricRow]) -> AggregatedMetrics {
    let mut out = AggregatedMetrics::default();
    for row in rows {
        out.impressions = out.impressions.saturating_add(row.impressions);
        out.likes = out.likes.saturating_add(row.likes);
        out.comments = out.comments.saturating_add(row.comments);
        out.shares = out.shares.saturating_add(row.shares);
        out.reach = out.reach.saturating_add(row.reach);
    }
    out.engagement_rate = engagement_rate(out.likes, out.comments, out.shares, out.reach);
    out
}
