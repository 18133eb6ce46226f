//! Canned dashboard data served when the store is empty or unavailable

use chrono::{DateTime, Duration, TimeZone, Utc};
use serde_json::{Value, json};

use super::{AnalyticsOverview, PlatformMetrics};
use crate::platforms::Platform;
use crate::store::{MetricRow, PostRow};

pub fn overview() -> AnalyticsOverview {
    AnalyticsOverview {
        total_impressions: 125_430,
        engagement_rate: 6.8,
        total_comments: 3_420,
        total_shares: 1_856,
        growth_rate: 12.5,
    }
}

pub fn platform_metrics(platform: Platform) -> PlatformMetrics {
    let (impressions, likes, comments, shares, engagement_rate) = match platform {
        Platform::Instagram => (58_200, 4_120, 1_530, 890, 8.2),
        Platform::Youtube => (42_100, 2_980, 1_120, 540, 6.9),
        Platform::Twitter => (15_800, 760, 420, 310, 4.1),
        Platform::Linkedin => (9_330, 510, 350, 116, 5.3),
    };
    PlatformMetrics {
        platform: platform.as_str().to_string(),
        impressions,
        likes,
        comments,
        shares,
        engagement_rate,
    }
}

pub fn all_platform_metrics() -> Vec<PlatformMetrics> {
    Platform::ALL.into_iter().map(platform_metrics).collect()
}

pub fn content_comparison() -> Value {
    json!({
        "by_content_type": {
            "reel": {"avg_likes": 3500, "avg_comments": 120, "avg_shares": 85, "engagement_rate": 8.5},
            "carousel": {"avg_likes": 2800, "avg_comments": 95, "avg_shares": 60, "engagement_rate": 6.2},
            "image": {"avg_likes": 1500, "avg_comments": 45, "avg_shares": 25, "engagement_rate": 4.1},
            "video": {"avg_likes": 4200, "avg_comments": 180, "avg_shares": 110, "engagement_rate": 7.8},
            "short": {"avg_likes": 5000, "avg_comments": 200, "avg_shares": 150, "engagement_rate": 9.2},
        },
        "best_performing": "short",
        "worst_performing": "image",
        "recommendation": "Short-form videos (Reels/Shorts) perform 2.2x better than static images"
    })
}

/// Fixed timestamp stamped on the full demo dashboard
pub fn demo_generated_at() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 24, 1, 30, 0)
        .single()
        .unwrap_or_else(Utc::now)
}

/// Demo posts paired with their latest metrics, for CSV export
pub fn posts_with_metrics(user_id: &str, now: DateTime<Utc>) -> Vec<(PostRow, MetricRow)> {
    let seed: [(Platform, &str, i64, i64, i64, i64, i64); 8] = [
        (Platform::Instagram, "reel", 4_200, 160, 95, 48_000, 61_000),
        (Platform::Instagram, "carousel", 2_700, 90, 58, 39_500, 44_100),
        (Platform::Instagram, "image", 1_450, 40, 22, 31_200, 35_800),
        (Platform::Youtube, "video", 3_900, 210, 120, 52_300, 70_400),
        (Platform::Youtube, "short", 5_100, 230, 160, 60_800, 82_500),
        (Platform::Twitter, "post", 640, 88, 140, 18_900, 24_300),
        (Platform::Linkedin, "post", 520, 61, 35, 11_400, 13_900),
        (Platform::Linkedin, "article", 380, 44, 29, 8_700, 10_200),
    ];

    seed.into_iter()
        .enumerate()
        .map(|(i, (platform, content_type, likes, comments, shares, reach, impressions))| {
            let id = format!("demo_post_{}", i + 1);
            let posted_at = now - Duration::days(2 * i as i64 + 1);
            let post = PostRow {
                id: id.clone(),
                user_id: user_id.to_string(),
                platform: platform.as_str().to_string(),
                content_type: Some(content_type.to_string()),
                caption: None,
                posted_at: Some(posted_at),
            };
            let metric = MetricRow {
                post_id: Some(id),
                platform: Some(platform.as_str().to_string()),
                likes,
                comments,
                shares,
                reach,
                impressions,
                collected_at: Some(posted_at + Duration::hours(24)),
                ..Default::default()
            };
            (post, metric)
        })
        .collect()
}
