use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use super::{InsightRow, MetricRow, OAuthTokens, PostRow, Profile, RecommendationRow, Store};
use crate::error::Result;

#[derive(Default)]
struct Tables {
    metrics: Vec<MetricRow>,
    posts: Vec<PostRow>,
    insights: Vec<InsightRow>,
    recommendations: Vec<RecommendationRow>,
    profiles: HashMap<String, Profile>,
    tokens: HashMap<(String, String), OAuthTokens>,
}

/// In-process store; nothing survives a restart
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert_metrics(&self, rows: impl IntoIterator<Item = MetricRow>) {
        self.tables.write().await.metrics.extend(rows);
    }

    pub async fn insert_posts(&self, rows: impl IntoIterator<Item = PostRow>) {
        self.tables.write().await.posts.extend(rows);
    }

    pub async fn insert_recommendations(&self, rows: impl IntoIterator<Item = RecommendationRow>) {
        self.tables.write().await.recommendations.extend(rows);
    }
}

fn owned_by(tables: &Tables, user_id: &str) -> HashSet<String> {
    tables
        .posts
        .iter()
        .filter(|p| p.user_id == user_id)
        .map(|p| p.id.clone())
        .collect()
}

fn on_posts(row: &MetricRow, post_ids: &HashSet<String>) -> bool {
    row.post_id.as_ref().is_some_and(|id| post_ids.contains(id))
}

fn collected_since(row: &MetricRow, since: DateTime<Utc>) -> bool {
    // rows without a timestamp are treated as current
    row.collected_at.is_none_or(|at| at >= since)
}

fn newest_first<T, F>(mut rows: Vec<T>, key: F, limit: usize) -> Vec<T>
where
    F: Fn(&T) -> Option<DateTime<Utc>>,
{
    rows.sort_by_key(|r| std::cmp::Reverse(key(r)));
    rows.truncate(limit);
    rows
}

#[async_trait]
impl Store for MemoryStore {
    async fn metrics_since(&self, user_id: &str, since: DateTime<Utc>) -> Result<Vec<MetricRow>> {
        let tables = self.tables.read().await;
        let owned = owned_by(&tables, user_id);
        Ok(tables
            .metrics
            .iter()
            .filter(|m| on_posts(m, &owned))
            .filter(|m| collected_since(m, since))
            .cloned()
            .collect())
    }

    async fn metrics_for_posts(&self, post_ids: &[String], since: DateTime<Utc>) -> Result<Vec<MetricRow>> {
        let tables = self.tables.read().await;
        Ok(tables
            .metrics
            .iter()
            .filter(|m| m.post_id.as_ref().is_some_and(|id| post_ids.contains(id)))
            .filter(|m| collected_since(m, since))
            .cloned()
            .collect())
    }

    async fn recent_metrics(&self, user_id: &str, limit: usize) -> Result<Vec<MetricRow>> {
        let tables = self.tables.read().await;
        let owned = owned_by(&tables, user_id);
        let rows: Vec<MetricRow> = tables
            .metrics
            .iter()
            .filter(|m| on_posts(m, &owned))
            .cloned()
            .collect();
        Ok(newest_first(rows, |m| m.collected_at, limit))
    }

    async fn posts_for_user(&self, user_id: &str, platform: Option<&str>) -> Result<Vec<PostRow>> {
        let tables = self.tables.read().await;
        let rows: Vec<PostRow> = tables
            .posts
            .iter()
            .filter(|p| p.user_id == user_id)
            .filter(|p| platform.is_none_or(|wanted| p.platform == wanted))
            .cloned()
            .collect();
        Ok(newest_first(rows, |p| p.posted_at, usize::MAX))
    }

    async fn insights_for_user(&self, user_id: &str, limit: usize) -> Result<Vec<InsightRow>> {
        let tables = self.tables.read().await;
        let rows: Vec<InsightRow> = tables
            .insights
            .iter()
            .filter(|i| i.user_id == user_id)
            .cloned()
            .collect();
        Ok(newest_first(rows, |i| Some(i.generated_at), limit))
    }

    async fn insert_insight(&self, mut row: InsightRow) -> Result<InsightRow> {
        if row.id.is_empty() {
            row.id = uuid::Uuid::new_v4().to_string();
        }
        self.tables.write().await.insights.push(row.clone());
        Ok(row)
    }

    async fn recommendations_for_user(&self, user_id: &str, limit: usize) -> Result<Vec<RecommendationRow>> {
        let tables = self.tables.read().await;
        let rows: Vec<RecommendationRow> = tables
            .recommendations
            .iter()
            .filter(|r| r.user_id == user_id)
            .cloned()
            .collect();
        Ok(newest_first(rows, |r| Some(r.generated_at), limit))
    }

    async fn get_profile(&self, user_id: &str) -> Result<Option<Profile>> {
        Ok(self.tables.read().await.profiles.get(user_id).cloned())
    }

    async fn upsert_profile(&self, profile: Profile) -> Result<Profile> {
        self.tables
            .write()
            .await
            .profiles
            .insert(profile.id.clone(), profile.clone());
        Ok(profile)
    }

    async fn save_tokens(&self, tokens: OAuthTokens) -> Result<()> {
        let key = (tokens.user_id.clone(), tokens.platform.clone());
        self.tables.write().await.tokens.insert(key, tokens);
        Ok(())
    }

    async fn tokens(&self, user_id: &str, platform: &str) -> Result<Option<OAuthTokens>> {
        let key = (user_id.to_string(), platform.to_string());
        Ok(self.tables.read().await.tokens.get(&key).cloned())
    }

    async fn connected_platforms(&self, user_id: &str) -> Result<Vec<OAuthTokens>> {
        let tables = self.tables.read().await;
        let mut rows: Vec<OAuthTokens> = tables
            .tokens
            .values()
            .filter(|t| t.user_id == user_id)
            .cloned()
            .collect();
        rows.sort_by(|a, b| a.platform.cmp(&b.platform));
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn metric(post: &str, likes: i64, age_days: i64) -> MetricRow {
        MetricRow {
            post_id: Some(post.to_string()),
            likes,
            collected_at: Some(Utc::now() - Duration::days(age_days)),
            ..Default::default()
        }
    }

    fn post(id: &str, user: &str) -> PostRow {
        PostRow {
            id: id.into(),
            user_id: user.into(),
            platform: "instagram".into(),
            content_type: None,
            caption: None,
            posted_at: None,
        }
    }

    #[tokio::test]
    async fn metrics_window_and_post_filter() {
        let store = MemoryStore::new();
        store.insert_posts([post("p1", "u1"), post("p2", "u1")]).await;
        store
            .insert_metrics([metric("p1", 1, 1), metric("p2", 2, 2), metric("p1", 3, 40)])
            .await;

        let since = Utc::now() - Duration::days(30);
        assert_eq!(store.metrics_since("u1", since).await.unwrap().len(), 2);

        let p1 = store
            .metrics_for_posts(&["p1".to_string()], since)
            .await
            .unwrap();
        assert_eq!(p1.len(), 1);
        assert_eq!(p1[0].likes, 1);

        let recent = store.recent_metrics("u1", 1).await.unwrap();
        assert_eq!(recent[0].likes, 1);
    }

    #[tokio::test]
    async fn metric_reads_never_cross_users() {
        let store = MemoryStore::new();
        store.insert_posts([post("mine", "u1"), post("theirs", "u2")]).await;
        store
            .insert_metrics([metric("mine", 1, 1), metric("theirs", 50, 1), metric("orphan", 9, 1)])
            .await;

        let since = Utc::now() - Duration::days(30);
        let rows = store.metrics_since("u1", since).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].likes, 1);

        let recent = store.recent_metrics("u2", 10).await.unwrap();
        assert_eq!(recent.len(), 1);
        assert_eq!(recent[0].likes, 50);
        assert!(store.recent_metrics("u3", 10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn insights_get_ids_and_newest_first() {
        let store = MemoryStore::new();
        for (i, summary) in ["old", "new"].iter().enumerate() {
            store
                .insert_insight(InsightRow {
                    id: String::new(),
                    user_id: "u".into(),
                    summary: summary.to_string(),
                    generated_at: Utc::now() + Duration::seconds(i as i64),
                })
                .await
                .unwrap();
        }
        let rows = store.insights_for_user("u", 10).await.unwrap();
        assert_eq!(rows[0].summary, "new");
        assert!(!rows[0].id.is_empty());
        assert!(store.insights_for_user("other", 10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn tokens_are_scoped_per_user_and_platform() {
        let store = MemoryStore::new();
        store
            .save_tokens(OAuthTokens {
                user_id: "u".into(),
                platform: "youtube".into(),
                access_token: "t".into(),
                refresh_token: None,
                expires_at: None,
                account_name: None,
            })
            .await
            .unwrap();
        assert!(store.tokens("u", "youtube").await.unwrap().is_some());
        assert!(store.tokens("u", "twitter").await.unwrap().is_none());
        assert!(store.tokens("v", "youtube").await.unwrap().is_none());
        assert_eq!(store.connected_platforms("u").await.unwrap().len(), 1);
    }
}
