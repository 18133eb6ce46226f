//! Social platform adapters and the OAuth connect flow

pub mod instagram;
pub mod linkedin;
pub mod oauth;
pub mod twitter;
pub mod youtube;

use std::fmt;
use std::time::Duration;

use chrono::Utc;
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use tracing::{debug, warn};

use crate::config::Config;
use crate::error::{Result, SocialLeafError};
use crate::store::Store;

pub use instagram::InstagramClient;
pub use linkedin::LinkedInClient;
pub use twitter::TwitterClient;
pub use youtube::YouTubeClient;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Instagram,
    Youtube,
    Twitter,
    Linkedin,
}

impl Platform {
    pub const ALL: [Platform; 4] = [
        Platform::Instagram,
        Platform::Youtube,
        Platform::Twitter,
        Platform::Linkedin,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::Instagram => "instagram",
            Platform::Youtube => "youtube",
            Platform::Twitter => "twitter",
            Platform::Linkedin => "linkedin",
        }
    }

    pub fn parse(name: &str) -> Option<Platform> {
        let name = name.trim().to_ascii_lowercase();
        Platform::ALL.into_iter().find(|p| p.as_str() == name)
    }

    /// Parse a path segment, rejecting unknown platforms as caller errors
    pub fn from_path(name: &str) -> Result<Platform> {
        Platform::parse(name).ok_or_else(|| SocialLeafError::InvalidParams {
            message: format!(
                "Unknown platform '{name}'; expected one of instagram, youtube, twitter, linkedin"
            ),
        })
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub(crate) fn http_client(timeout: Duration) -> Result<Client> {
    Client::builder()
        .timeout(timeout)
        .user_agent(format!("social-leaf/{}", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(|e| SocialLeafError::Internal {
            message: format!("failed to build HTTP client: {e}"),
        })
}

/// Send a request and decode a JSON body, mapping non-2xx to `Upstream`
pub(crate) async fn get_json<T: DeserializeOwned>(what: &str, builder: RequestBuilder) -> Result<T> {
    let response = builder.send().await?;
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(SocialLeafError::Upstream {
            message: format!("{what}: HTTP {status}: {}", crate::clients::truncate(&body, 200)),
        });
    }
    response.json::<T>().await.map_err(|e| SocialLeafError::Upstream {
        message: format!("{what}: invalid JSON: {e}"),
    })
}

pub fn not_connected(platform: Platform) -> Value {
    let name = match platform {
        Platform::Instagram => "Instagram",
        Platform::Youtube => "YouTube",
        Platform::Twitter => "Twitter",
        Platform::Linkedin => "LinkedIn",
    };
    json!({
        "platform": platform.as_str(),
        "connected": false,
        "message": format!("{name} not connected. Visit /auth/{platform} to connect."),
    })
}

/// All platform adapters, built once at startup
pub struct PlatformClients {
    pub youtube: YouTubeClient,
    pub instagram: InstagramClient,
    pub twitter: TwitterClient,
    pub linkedin: LinkedInClient,
}

impl PlatformClients {
    pub fn new(config: &Config) -> Result<Self> {
        let cfg = &config.platforms;
        let http = http_client(Duration::from_millis(cfg.timeout_ms))?;
        Ok(Self {
            youtube: YouTubeClient::new(
                http.clone(),
                &cfg.youtube_base_url,
                config.runtime.youtube_api_key.clone(),
            ),
            instagram: InstagramClient::new(http.clone(), &cfg.graph_base_url, &cfg.instagram_web_url),
            twitter: TwitterClient::new(http.clone(), &cfg.twitter_base_url),
            linkedin: LinkedInClient::new(http, &cfg.linkedin_base_url),
        })
    }

    /// Live account metrics for a connected platform; not-connected payload otherwise
    pub async fn real_data(&self, store: &dyn Store, user_id: &str, platform: Platform) -> Value {
        let tokens = match store.tokens(user_id, platform.as_str()).await {
            Ok(Some(tokens)) => tokens,
            Ok(None) => {
                debug!(user_id, platform = platform.as_str(), "no stored tokens");
                return not_connected(platform);
            }
            Err(e) => {
                warn!(platform = platform.as_str(), error = %e, "token lookup failed");
                return not_connected(platform);
            }
        };

        let token = tokens.access_token.as_str();
        let fetched = match platform {
            Platform::Youtube => self.youtube.my_channel(token).await,
            Platform::Instagram => self.instagram.insights(token).await,
            Platform::Twitter => self.twitter.me(token).await,
            Platform::Linkedin => self.linkedin.userinfo(token).await,
        };

        match fetched {
            Ok(mut value) => {
                if let Value::Object(map) = &mut value {
                    map.insert("fetched_at".into(), json!(Utc::now()));
                }
                value
            }
            Err(e) => {
                warn!(platform = platform.as_str(), error = %e, "platform fetch failed");
                json!({
                    "platform": platform.as_str(),
                    "connected": true,
                    "error": e.to_string(),
                })
            }
        }
    }

    pub async fn all_real_data(&self, store: &dyn Store, user_id: &str) -> Value {
        let mut out = Map::new();
        for platform in Platform::ALL {
            out.insert(
                platform.as_str().to_string(),
                self.real_data(store, user_id, platform).await,
            );
        }
        Value::Object(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    #[test]
    fn parse_is_case_insensitive() {
        assert_eq!(Platform::parse("YouTube"), Some(Platform::Youtube));
        assert_eq!(Platform::parse("tiktok"), None);
        assert!(matches!(
            Platform::from_path("myspace"),
            Err(SocialLeafError::InvalidParams { .. })
        ));
    }

    #[tokio::test]
    async fn unconnected_platforms_report_so() {
        let clients = PlatformClients::new(&Config::default()).unwrap();
        let store = MemoryStore::new();
        let all = clients.all_real_data(&store, "u1").await;
        for platform in Platform::ALL {
            assert_eq!(all[platform.as_str()]["connected"], false);
        }
        assert_eq!(
            all["twitter"]["message"],
            "Twitter not connected. Visit /auth/twitter to connect."
        );
    }
}
