//! Row store used by analytics, insights, profiles and OAuth tokens.
//!
//! `RestStore` talks to a Supabase/PostgREST endpoint; `MemoryStore` keeps
//! everything in process and is used when no Supabase URL is configured.

pub mod memory;
pub mod rest;

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::config::Config;
use crate::deserializers::de_count;
use crate::error::Result;

pub use memory::MemoryStore;
pub use rest::RestStore;

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct MetricRow {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub post_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub platform: Option<String>,
    #[serde(default, deserialize_with = "de_count")]
    pub likes: i64,
    #[serde(default, deserialize_with = "de_count")]
    pub comments: i64,
    #[serde(default, deserialize_with = "de_count")]
    pub shares: i64,
    #[serde(default, deserialize_with = "de_count")]
    pub reach: i64,
    #[serde(default, deserialize_with = "de_count")]
    pub impressions: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub engagement_rate: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub collected_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PostRow {
    pub id: String,
    pub user_id: String,
    pub platform: String,
    #[serde(default)]
    pub content_type: Option<String>,
    #[serde(default)]
    pub caption: Option<String>,
    #[serde(default)]
    pub posted_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InsightRow {
    #[serde(default)]
    pub id: String,
    pub user_id: String,
    pub summary: String,
    pub generated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RecommendationRow {
    pub id: String,
    pub user_id: String,
    pub recommendation_type: String,
    pub content: String,
    pub generated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Profile {
    pub id: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub plan: Option<String>,
    #[serde(default)]
    pub plan_status: Option<String>,
    #[serde(default)]
    pub trial_ends_at: Option<DateTime<Utc>>,
    #[serde(default = "default_role")]
    pub role: String,
}

fn default_role() -> String {
    "user".to_string()
}

impl Profile {
    /// Fresh profile created on first login
    pub fn new(id: &str, email: &str, name: Option<String>) -> Self {
        Self {
            id: id.to_string(),
            email: email.to_string(),
            name,
            plan: Some("starter".to_string()),
            plan_status: Some("active".to_string()),
            trial_ends_at: None,
            role: default_role(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OAuthTokens {
    pub user_id: String,
    pub platform: String,
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub account_name: Option<String>,
}

/// Opaque row store. Read paths return empty vectors for "no data"; errors are
/// transport or decode failures.
#[async_trait]
pub trait Store: Send + Sync {
    /// Metrics on posts owned by `user_id`
    async fn metrics_since(&self, user_id: &str, since: DateTime<Utc>) -> Result<Vec<MetricRow>>;

    async fn metrics_for_posts(&self, post_ids: &[String], since: DateTime<Utc>) -> Result<Vec<MetricRow>>;

    /// Newest first, limited to posts owned by `user_id`
    async fn recent_metrics(&self, user_id: &str, limit: usize) -> Result<Vec<MetricRow>>;

    async fn posts_for_user(&self, user_id: &str, platform: Option<&str>) -> Result<Vec<PostRow>>;

    async fn insights_for_user(&self, user_id: &str, limit: usize) -> Result<Vec<InsightRow>>;

    async fn insert_insight(&self, row: InsightRow) -> Result<InsightRow>;

    async fn recommendations_for_user(&self, user_id: &str, limit: usize) -> Result<Vec<RecommendationRow>>;

    async fn get_profile(&self, user_id: &str) -> Result<Option<Profile>>;

    async fn upsert_profile(&self, profile: Profile) -> Result<Profile>;

    async fn save_tokens(&self, tokens: OAuthTokens) -> Result<()>;

    async fn tokens(&self, user_id: &str, platform: &str) -> Result<Option<OAuthTokens>>;

    async fn connected_platforms(&self, user_id: &str) -> Result<Vec<OAuthTokens>>;
}

/// Pick the store backend from configuration
pub fn create_store(config: &Config) -> Result<Arc<dyn Store>> {
    let runtime = &config.runtime;
    match (&runtime.supabase_url, runtime.supabase_service_key.as_ref().or(runtime.supabase_key.as_ref())) {
        (Some(url), Some(key)) => {
            info!("Using Supabase REST store at {}", url);
            Ok(Arc::new(RestStore::new(url, key)?))
        }
        (Some(_), None) => {
            warn!("SUPABASE_URL set without a key; falling back to in-memory store");
            Ok(Arc::new(MemoryStore::new()))
        }
        _ => {
            info!("No SUPABASE_URL configured; using in-memory store");
            Ok(Arc::new(MemoryStore::new()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn metric_rows_tolerate_missing_fields() {
        let row: MetricRow =
            serde_json::from_str(r#"{"likes": 4, "reach": null, "shares": "2"}"#).unwrap();
        assert_eq!(row.likes, 4);
        assert_eq!(row.reach, 0);
        assert_eq!(row.shares, 2);
        assert_eq!(row.comments, 0);
    }

    #[test]
    fn profile_role_defaults_to_user() {
        let p: Profile = serde_json::from_str(r#"{"id": "u1"}"#).unwrap();
        assert_eq!(p.role, "user");
        assert_eq!(p.plan, None);
    }

    #[test]
    fn backend_follows_configuration() {
        let config = Config::default();
        assert!(create_store(&config).is_ok());
    }
}
