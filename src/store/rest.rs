//! Supabase PostgREST client (`/rest/v1/{table}`)

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use reqwest::{Client, RequestBuilder, Response};
use serde::{Deserialize, Serialize};
use serde::de::DeserializeOwned;
use tracing::debug;

use super::{InsightRow, MetricRow, OAuthTokens, PostRow, Profile, RecommendationRow, Store};
use crate::error::{Result, SocialLeafError};

#[derive(Deserialize)]
struct IdRow {
    id: String,
}

pub struct RestStore {
    http: Client,
    base_url: String,
    api_key: String,
}

fn store_err(message: impl Into<String>) -> SocialLeafError {
    SocialLeafError::Store {
        message: message.into(),
    }
}

fn ts(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// PostgREST `in.(a,b)` list with quoted members
fn in_list(values: &[String]) -> String {
    let quoted: Vec<String> = values
        .iter()
        .map(|v| format!("\"{}\"", v.replace('"', "")))
        .collect();
    format!("in.({})", quoted.join(","))
}

impl RestStore {
    pub fn new(supabase_url: &str, api_key: &str) -> Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(20))
            .user_agent(format!("social-leaf/{}", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| store_err(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            http,
            base_url: supabase_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
        })
    }

    fn table_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{}", self.base_url, table)
    }

    fn authed(&self, builder: RequestBuilder) -> RequestBuilder {
        builder
            .header("apikey", &self.api_key)
            .bearer_auth(&self.api_key)
    }

    async fn check(table: &str, response: Response) -> Result<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(store_err(format!("{table}: HTTP {status}: {body}")))
    }

    async fn select<T: DeserializeOwned>(&self, table: &str, query: &[(&str, String)]) -> Result<Vec<T>> {
        debug!(table, ?query, "store select");
        let response = self
            .authed(self.http.get(self.table_url(table)))
            .query(query)
            .send()
            .await
            .map_err(|e| store_err(format!("{table}: {e}")))?;
        let response = Self::check(table, response).await?;
        response
            .json::<Vec<T>>()
            .await
            .map_err(|e| store_err(format!("{table}: decode failed: {e}")))
    }

    /// Ids of the posts owned by `user_id`; metric reads are scoped through these
    async fn post_ids(&self, user_id: &str) -> Result<Vec<String>> {
        let rows: Vec<IdRow> = self
            .select(
                "posts",
                &[("select", "id".into()), ("user_id", format!("eq.{user_id}"))],
            )
            .await?;
        Ok(rows.into_iter().map(|r| r.id).collect())
    }

    async fn insert<T, R>(&self, table: &str, row: &T, upsert: bool) -> Result<R>
    where
        T: Serialize + Sync,
        R: DeserializeOwned,
    {
        let prefer = if upsert {
            "resolution=merge-duplicates,return=representation"
        } else {
            "return=representation"
        };
        let response = self
            .authed(self.http.post(self.table_url(table)))
            .header("Prefer", prefer)
            .json(row)
            .send()
            .await
            .map_err(|e| store_err(format!("{table}: {e}")))?;
        let response = Self::check(table, response).await?;
        let mut rows = response
            .json::<Vec<R>>()
            .await
            .map_err(|e| store_err(format!("{table}: decode failed: {e}")))?;
        if rows.is_empty() {
            return Err(store_err(format!("{table}: insert returned no rows")));
        }
        Ok(rows.swap_remove(0))
    }
}

#[async_trait]
impl Store for RestStore {
    async fn metrics_since(&self, user_id: &str, since: DateTime<Utc>) -> Result<Vec<MetricRow>> {
        let ids = self.post_ids(user_id).await?;
        self.metrics_for_posts(&ids, since).await
    }

    async fn metrics_for_posts(&self, post_ids: &[String], since: DateTime<Utc>) -> Result<Vec<MetricRow>> {
        if post_ids.is_empty() {
            return Ok(Vec::new());
        }
        self.select(
            "metrics",
            &[
                ("select", "*".into()),
                ("post_id", in_list(post_ids)),
                ("collected_at", format!("gte.{}", ts(since))),
            ],
        )
        .await
    }

    async fn recent_metrics(&self, user_id: &str, limit: usize) -> Result<Vec<MetricRow>> {
        let ids = self.post_ids(user_id).await?;
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        self.select(
            "metrics",
            &[
                ("select", "*".into()),
                ("post_id", in_list(&ids)),
                ("order", "collected_at.desc".into()),
                ("limit", limit.to_string()),
            ],
        )
        .await
    }

    async fn posts_for_user(&self, user_id: &str, platform: Option<&str>) -> Result<Vec<PostRow>> {
        let mut query = vec![
            ("select", "*".to_string()),
            ("user_id", format!("eq.{user_id}")),
            ("order", "posted_at.desc".into()),
        ];
        if let Some(platform) = platform {
            query.push(("platform", format!("eq.{platform}")));
        }
        self.select("posts", &query).await
    }

    async fn insights_for_user(&self, user_id: &str, limit: usize) -> Result<Vec<InsightRow>> {
        self.select(
            "insights",
            &[
                ("select", "*".into()),
                ("user_id", format!("eq.{user_id}")),
                ("order", "generated_at.desc".into()),
                ("limit", limit.to_string()),
            ],
        )
        .await
    }

    async fn insert_insight(&self, row: InsightRow) -> Result<InsightRow> {
        #[derive(Serialize)]
        struct NewInsight<'a> {
            user_id: &'a str,
            summary: &'a str,
            generated_at: DateTime<Utc>,
        }
        let new = NewInsight {
            user_id: &row.user_id,
            summary: &row.summary,
            generated_at: row.generated_at,
        };
        self.insert("insights", &new, false).await
    }

    async fn recommendations_for_user(&self, user_id: &str, limit: usize) -> Result<Vec<RecommendationRow>> {
        self.select(
            "recommendations",
            &[
                ("select", "*".into()),
                ("user_id", format!("eq.{user_id}")),
                ("order", "generated_at.desc".into()),
                ("limit", limit.to_string()),
            ],
        )
        .await
    }

    async fn get_profile(&self, user_id: &str) -> Result<Option<Profile>> {
        let rows: Vec<Profile> = self
            .select(
                "profiles",
                &[("select", "*".into()), ("id", format!("eq.{user_id}"))],
            )
            .await?;
        Ok(rows.into_iter().next())
    }

    async fn upsert_profile(&self, profile: Profile) -> Result<Profile> {
        self.insert("profiles", &profile, true).await
    }

    async fn save_tokens(&self, tokens: OAuthTokens) -> Result<()> {
        let _: OAuthTokens = self.insert("oauth_tokens", &tokens, true).await?;
        Ok(())
    }

    async fn tokens(&self, user_id: &str, platform: &str) -> Result<Option<OAuthTokens>> {
        let rows: Vec<OAuthTokens> = self
            .select(
                "oauth_tokens",
                &[
                    ("select", "*".into()),
                    ("user_id", format!("eq.{user_id}")),
                    ("platform", format!("eq.{platform}")),
                ],
            )
            .await?;
        Ok(rows.into_iter().next())
    }

    async fn connected_platforms(&self, user_id: &str) -> Result<Vec<OAuthTokens>> {
        self.select(
            "oauth_tokens",
            &[
                ("select", "*".into()),
                ("user_id", format!("eq.{user_id}")),
                ("order", "platform.asc".into()),
            ],
        )
        .await
    }
}
