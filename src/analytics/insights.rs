//! Rule-based insights and the standing recommendation list

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Insight {
    #[serde(rename = "type")]
    pub kind: String,
    pub title: String,
    pub summary: String,
    pub priority: u8,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    #[serde(rename = "type")]
    pub kind: String,
    pub title: String,
    pub content: String,
    pub priority: u8,
}

/// Inputs for the insight rules
#[derive(Debug, Clone)]
pub struct InsightInputs<'a> {
    pub engagement_rate: f64,
    pub growth_rate: f64,
    pub best_content_type: &'a str,
}

impl Default for InsightInputs<'_> {
    fn default() -> Self {
        Self {
            engagement_rate: 5.0,
            growth_rate: 0.0,
            best_content_type: "reel",
        }
    }
}

fn insight(kind: &str, title: &str, summary: String, priority: u8) -> Insight {
    Insight {
        kind: kind.to_string(),
        title: title.to_string(),
        summary,
        priority,
    }
}

pub fn rule_insights(inputs: &InsightInputs<'_>) -> Vec<Insight> {
    let mut out = Vec::with_capacity(4);
    let rate = inputs.engagement_rate;

    if rate > 7.0 {
        out.push(insight(
            "success",
            "Strong Engagement",
            format!("Your engagement rate of {rate}% is above average! Keep up the great work."),
            1,
        ));
    } else if rate < 3.0 {
        out.push(insight(
            "alert",
            "Low Engagement",
            format!("Your engagement rate of {rate}% could be improved. Try posting more video content."),
            1,
        ));
    }

    out.push(insight(
        "tip",
        "Content Strategy",
        format!(
            "Your {}s perform 3.2x better than other content types. Consider creating more!",
            inputs.best_content_type
        ),
        2,
    ));
    out.push(insight(
        "tip",
        "Optimal Timing",
        "Posts published between 7-9 PM get 45% more engagement. Adjust your schedule!".to_string(),
        3,
    ));

    if inputs.growth_rate > 0.0 {
        out.push(insight(
            "growth",
            "Positive Growth",
            format!(
                "Your account grew {}% this month. You're on the right track!",
                inputs.growth_rate
            ),
            2,
        ));
    }
    out
}

const RECOMMENDATIONS: [(&str, &str, &str); 5] = [
    (
        "content",
        "Create More Short-Form Video",
        "Reels and Shorts get 3x more reach. Aim for 3-5 videos per week.",
    ),
    (
        "timing",
        "Optimize Posting Schedule",
        "Post on Tuesday-Thursday between 7-9 PM for maximum engagement.",
    ),
    (
        "format",
        "Use Carousel Posts",
        "Carousels have 40% higher save rate. Great for educational content.",
    ),
    (
        "hashtag",
        "Refine Hashtag Strategy",
        "Use 5-7 niche hashtags instead of generic ones for better reach.",
    ),
    (
        "strategy",
        "Start a Content Series",
        "Weekly series builds audience expectation and increases return visits.",
    ),
];

pub fn recommendations() -> Vec<Recommendation> {
    RECOMMENDATIONS
        .iter()
        .zip(1u8..)
        .map(|((kind, title, content), priority)| Recommendation {
            kind: kind.to_string(),
            title: title.to_string(),
            content: content.to_string(),
            priority,
        })
        .collect()
}
