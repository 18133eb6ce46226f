//! Instagram via the Facebook Graph API, plus public profile scraping

use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::debug;

use super::get_json;
use crate::deserializers::de_count;
use crate::error::{Result, SocialLeafError};

const BROWSER_UA: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
                          (KHTML, like Gecko) Chrome/120.0 Safari/537.36";

static OG_DESCRIPTION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"<meta[^>]+property="og:description"[^>]+content="([^"]*)""#).unwrap()
});

static OG_TITLE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"<meta[^>]+property="og:title"[^>]+content="([^"]*)""#).unwrap());

static COUNTS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)([\d.,]+)\s*([KMB]?)\s+Followers,\s*([\d.,]+)\s*([KMB]?)\s+Following,\s*([\d.,]+)\s*([KMB]?)\s+Posts").unwrap()
});

#[derive(Debug, Deserialize)]
struct DataList<T> {
    #[serde(default = "Vec::new")]
    data: Vec<T>,
}

#[derive(Debug, Deserialize)]
struct Page {
    id: String,
}

#[derive(Debug, Deserialize)]
struct PageAccount {
    instagram_business_account: Option<Page>,
}

#[derive(Debug, Deserialize)]
struct Account {
    id: String,
    username: Option<String>,
    name: Option<String>,
    biography: Option<String>,
    profile_picture_url: Option<String>,
    #[serde(default, deserialize_with = "de_count")]
    followers_count: i64,
    #[serde(default, deserialize_with = "de_count")]
    follows_count: i64,
    #[serde(default, deserialize_with = "de_count")]
    media_count: i64,
}

#[derive(Debug, Deserialize)]
struct InsightValue {
    #[serde(default, deserialize_with = "de_count")]
    value: i64,
}

#[derive(Debug, Deserialize)]
struct InsightMetric {
    name: String,
    #[serde(default)]
    values: Vec<InsightValue>,
}

/// Counts scraped from a public profile's Open Graph tags
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PublicProfile {
    pub username: String,
    pub full_name: Option<String>,
    pub followers: i64,
    pub following: i64,
    pub posts: i64,
    pub source: &'static str,
}

/// `1,234` / `12.5K` / `3M` → integer count
fn parse_count(number: &str, suffix: &str) -> Option<i64> {
    let cleaned = number.replace(',', "");
    let value: f64 = cleaned.parse().ok()?;
    let scale = match suffix.to_ascii_uppercase().as_str() {
        "K" => 1_000.0,
        "M" => 1_000_000.0,
        "B" => 1_000_000_000.0,
        _ => 1.0,
    };
    Some((value * scale).round() as i64)
}

fn unescape(text: &str) -> String {
    text.replace("&amp;", "&")
        .replace("&#064;", "@")
        .replace("&quot;", "\"")
        .replace("&#039;", "'")
}

pub fn parse_public_profile(username: &str, html: &str) -> Option<PublicProfile> {
    let description = unescape(OG_DESCRIPTION.captures(html)?.get(1)?.as_str());
    let caps = COUNTS.captures(&description)?;
    let count = |n: usize| parse_count(&caps[n], &caps[n + 1]);

    let full_name = OG_TITLE
        .captures(html)
        .and_then(|c| c.get(1))
        .map(|m| unescape(m.as_str()))
        .and_then(|title| {
            title
                .split(" (")
                .next()
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
        });

    Some(PublicProfile {
        username: username.to_string(),
        full_name,
        followers: count(1)?,
        following: count(3)?,
        posts: count(5)?,
        source: "og_description",
    })
}

fn valid_username(username: &str) -> bool {
    !username.is_empty()
        && username.len() <= 30
        && username
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '.' || c == '_')
}

pub struct InstagramClient {
    http: Client,
    graph_url: String,
    web_url: String,
}

impl InstagramClient {
    pub fn new(http: Client, graph_url: &str, web_url: &str) -> Self {
        Self {
            http,
            graph_url: graph_url.trim_end_matches('/').to_string(),
            web_url: web_url.trim_end_matches('/').to_string(),
        }
    }

    /// me/accounts → first page → linked business account → account fields
    async fn business_account(&self, token: &str) -> Result<Account> {
        let pages: DataList<Page> = get_json(
            "graph me/accounts",
            self.http
                .get(format!("{}/me/accounts", self.graph_url))
                .query(&[("access_token", token)]),
        )
        .await?;
        let page = pages.data.into_iter().next().ok_or_else(|| SocialLeafError::NotFound {
            message: "no Facebook pages on this account".to_string(),
        })?;

        let linked: PageAccount = get_json(
            "graph page",
            self.http
                .get(format!("{}/{}", self.graph_url, page.id))
                .query(&[("fields", "instagram_business_account"), ("access_token", token)]),
        )
        .await?;
        let ig = linked
            .instagram_business_account
            .ok_or_else(|| SocialLeafError::NotFound {
                message: "page has no Instagram business account".to_string(),
            })?;

        get_json(
            "graph instagram account",
            self.http.get(format!("{}/{}", self.graph_url, ig.id)).query(&[
                (
                    "fields",
                    "id,username,name,biography,followers_count,follows_count,media_count,profile_picture_url",
                ),
                ("access_token", token),
            ]),
        )
        .await
    }

    pub async fn insights(&self, token: &str) -> Result<Value> {
        let account = self.business_account(token).await?;

        let metrics: DataList<InsightMetric> = match get_json(
            "graph insights",
            self.http
                .get(format!("{}/{}/insights", self.graph_url, account.id))
                .query(&[
                    ("metric", "impressions,reach,profile_views"),
                    ("period", "day"),
                    ("access_token", token),
                ]),
        )
        .await
        {
            Ok(list) => list,
            Err(e) => {
                debug!(error = %e, "instagram insights unavailable");
                DataList { data: Vec::new() }
            }
        };
        let metric = |name: &str| {
            metrics
                .data
                .iter()
                .find(|m| m.name == name)
                .and_then(|m| m.values.first())
                .map(|v| v.value)
                .unwrap_or(0)
        };

        Ok(json!({
            "platform": "instagram",
            "connected": true,
            "account": {
                "id": account.id,
                "username": account.username,
                "name": account.name,
                "bio": account.biography,
                "profile_picture": account.profile_picture_url,
            },
            "metrics": {
                "followers": account.followers_count,
                "following": account.follows_count,
                "posts": account.media_count,
                "impressions": metric("impressions"),
                "reach": metric("reach"),
                "profile_views": metric("profile_views"),
            },
        }))
    }

    pub async fn public_profile(&self, username: &str) -> Result<PublicProfile> {
        let username = username.trim().trim_start_matches('@');
        if !valid_username(username) {
            return Err(SocialLeafError::InvalidParams {
                message: format!("Invalid Instagram username '{username}'"),
            });
        }

        let response = self
            .http
            .get(format!("{}/{}/", self.web_url, username))
            .header(reqwest::header::USER_AGENT, BROWSER_UA)
            .header(reqwest::header::ACCEPT_LANGUAGE, "en-US,en;q=0.9")
            .send()
            .await?;
        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(SocialLeafError::NotFound {
                message: format!("Instagram profile @{username}"),
            });
        }
        if !status.is_success() {
            return Err(SocialLeafError::Upstream {
                message: format!("instagram profile page: HTTP {status}"),
            });
        }
        let html = response.text().await?;
        parse_public_profile(username, &html).ok_or_else(|| SocialLeafError::Upstream {
            message: format!("could not read public counts for @{username}"),
        })
    }
}
