//! OAuth 2.0 authorization-code flow for connecting platform accounts.
//!
//! `state` is a random id remembered in process for ten minutes together
//! with the user it was issued to, so the public callback can attribute the
//! tokens without a bearer header. Twitter additionally requires PKCE.

use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use reqwest::{Client, Url};
use serde::Deserialize;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::Platform;
use crate::config::{OAuthClient, RuntimeConfig};
use crate::error::{Result, SocialLeafError};
use crate::store::OAuthTokens;

const STATE_TTL_MINUTES: i64 = 10;
/// Upper bound on outstanding authorization states; the oldest is evicted first
pub const MAX_PENDING_STATES: usize = 1024;

#[derive(Debug, Clone)]
pub struct OAuthEndpoints {
    pub authorize_url: String,
    pub token_url: String,
    pub scope: &'static str,
    pub pkce: bool,
    pub basic_auth: bool,
    pub extra_params: &'static [(&'static str, &'static str)],
}

impl OAuthEndpoints {
    pub fn for_platform(platform: Platform) -> Self {
        match platform {
            Platform::Youtube => Self {
                authorize_url: "https://accounts.google.com/o/oauth2/v2/auth".into(),
                token_url: "https://oauth2.googleapis.com/token".into(),
                scope: "https://www.googleapis.com/auth/youtube.readonly \
                        https://www.googleapis.com/auth/yt-analytics.readonly",
                pkce: false,
                basic_auth: false,
                extra_params: &[("access_type", "offline"), ("prompt", "consent")],
            },
            Platform::Instagram => Self {
                authorize_url: "https://www.facebook.com/v18.0/dialog/oauth".into(),
                token_url: "https://graph.facebook.com/v18.0/oauth/access_token".into(),
                scope: "instagram_basic,instagram_manage_insights,pages_show_list,pages_read_engagement",
                pkce: false,
                basic_auth: false,
                extra_params: &[],
            },
            Platform::Twitter => Self {
                authorize_url: "https://twitter.com/i/oauth2/authorize".into(),
                token_url: "https://api.twitter.com/2/oauth2/token".into(),
                scope: "tweet.read users.read offline.access",
                pkce: true,
                basic_auth: true,
                extra_params: &[],
            },
            Platform::Linkedin => Self {
                authorize_url: "https://www.linkedin.com/oauth/v2/authorization".into(),
                token_url: "https://www.linkedin.com/oauth/v2/accessToken".into(),
                scope: "openid profile email",
                pkce: false,
                basic_auth: false,
                extra_params: &[],
            },
        }
    }
}

/// Client credentials for a platform; YouTube uses the Google client
pub fn client_for(runtime: &RuntimeConfig, platform: Platform) -> Option<&OAuthClient> {
    match platform {
        Platform::Youtube => runtime.google_oauth.as_ref(),
        Platform::Instagram => runtime.instagram_oauth.as_ref(),
        Platform::Twitter => runtime.twitter_oauth.as_ref(),
        Platform::Linkedin => runtime.linkedin_oauth.as_ref(),
    }
}

#[derive(Debug, Clone)]
struct PendingAuth {
    user_id: String,
    platform: Platform,
    verifier: Option<String>,
    issued_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    expires_in: Option<i64>,
}

pub struct OAuthFlow {
    http: Client,
    redirect_base: String,
    endpoints: HashMap<Platform, OAuthEndpoints>,
    pending: Mutex<HashMap<String, PendingAuth>>,
}

fn caller(message: impl Into<String>) -> SocialLeafError {
    SocialLeafError::InvalidParams {
        message: message.into(),
    }
}

impl OAuthFlow {
    pub fn new(http: Client, redirect_base: &str) -> Self {
        let endpoints = Platform::ALL
            .into_iter()
            .map(|p| (p, OAuthEndpoints::for_platform(p)))
            .collect();
        Self {
            http,
            redirect_base: redirect_base.trim_end_matches('/').to_string(),
            endpoints,
            pending: Mutex::new(HashMap::new()),
        }
    }

    /// Replace the endpoints for one platform
    pub fn with_endpoints(mut self, platform: Platform, endpoints: OAuthEndpoints) -> Self {
        self.endpoints.insert(platform, endpoints);
        self
    }

    pub fn redirect_uri(&self, platform: Platform) -> String {
        format!("{}/auth/{}/callback", self.redirect_base, platform)
    }

    fn endpoints(&self, platform: Platform) -> OAuthEndpoints {
        self.endpoints
            .get(&platform)
            .cloned()
            .unwrap_or_else(|| OAuthEndpoints::for_platform(platform))
    }

    /// Build the provider consent URL and remember the issued state
    pub async fn authorize_url(
        &self,
        platform: Platform,
        client: &OAuthClient,
        user_id: &str,
        now: DateTime<Utc>,
    ) -> Result<String> {
        let endpoints = self.endpoints(platform);
        let state = Uuid::new_v4().simple().to_string();
        let verifier = endpoints.pkce.then(|| {
            format!("{}{}", Uuid::new_v4().simple(), Uuid::new_v4().simple())
        });

        let redirect_uri = self.redirect_uri(platform);
        let mut params: Vec<(&str, &str)> = vec![
            ("response_type", "code"),
            ("client_id", client.client_id.as_str()),
            ("redirect_uri", redirect_uri.as_str()),
            ("scope", endpoints.scope),
            ("state", state.as_str()),
        ];
        if let Some(verifier) = verifier.as_deref() {
            params.push(("code_challenge", verifier));
            params.push(("code_challenge_method", "plain"));
        }
        params.extend(endpoints.extra_params.iter().copied());

        let url = Url::parse_with_params(&endpoints.authorize_url, &params)
            .map_err(|e| SocialLeafError::Config {
                message: format!("bad authorize URL for {platform}: {e}"),
            })?;

        let mut pending = self.pending.lock().await;
        pending.retain(|_, p| now - p.issued_at < Duration::minutes(STATE_TTL_MINUTES));
        while pending.len() >= MAX_PENDING_STATES {
            let Some(oldest) = pending
                .iter()
                .min_by_key(|(_, p)| p.issued_at)
                .map(|(state, _)| state.clone())
            else {
                break;
            };
            pending.remove(&oldest);
            warn!("oauth state table full; evicted oldest pending authorization");
        }
        pending.insert(
            state,
            PendingAuth {
                user_id: user_id.to_string(),
                platform,
                verifier,
                issued_at: now,
            },
        );
        debug!(platform = platform.as_str(), user_id, "issued oauth state");
        Ok(url.to_string())
    }

    /// Exchange an authorization code for tokens. The state is single-use.
    pub async fn complete(
        &self,
        platform: Platform,
        client: &OAuthClient,
        code: &str,
        state: &str,
        now: DateTime<Utc>,
    ) -> Result<OAuthTokens> {
        if code.trim().is_empty() {
            return Err(caller("Missing authorization code"));
        }
        let pending = self
            .pending
            .lock()
            .await
            .remove(state)
            .ok_or_else(|| caller("Unknown or expired OAuth state"))?;
        if pending.platform != platform {
            return Err(caller("OAuth state was issued for a different platform"));
        }
        if now - pending.issued_at >= Duration::minutes(STATE_TTL_MINUTES) {
            return Err(caller("Unknown or expired OAuth state"));
        }

        let endpoints = self.endpoints(platform);
        let redirect_uri = self.redirect_uri(platform);
        let mut form: Vec<(&str, &str)> = vec![
            ("grant_type", "authorization_code"),
            ("code", code),
            ("redirect_uri", redirect_uri.as_str()),
            ("client_id", client.client_id.as_str()),
        ];
        if !endpoints.basic_auth {
            form.push(("client_secret", client.client_secret.as_str()));
        }
        if let Some(verifier) = pending.verifier.as_deref() {
            form.push(("code_verifier", verifier));
        }

        let mut request = self.http.post(&endpoints.token_url).form(&form);
        if endpoints.basic_auth {
            request = request.basic_auth(&client.client_id, Some(&client.client_secret));
        }
        let token: TokenResponse =
            super::get_json(&format!("{platform} token exchange"), request).await?;

        info!(platform = platform.as_str(), user_id = %pending.user_id, "platform connected");
        Ok(OAuthTokens {
            user_id: pending.user_id,
            platform: platform.as_str().to_string(),
            access_token: token.access_token,
            refresh_token: token.refresh_token,
            expires_at: token
                .expires_in
                .and_then(Duration::try_seconds)
                .and_then(|ttl| now.checked_add_signed(ttl)),
            account_name: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> OAuthClient {
        OAuthClient {
            client_id: "cid".into(),
            client_secret: "secret".into(),
        }
    }

    fn state_of(url: &str) -> String {
        Url::parse(url)
            .unwrap()
            .query_pairs()
            .find(|(k, _)| k == "state")
            .map(|(_, v)| v.into_owned())
            .unwrap()
    }

    #[tokio::test]
    async fn authorize_url_carries_client_and_redirect() {
        let flow = OAuthFlow::new(Client::new(), "http://localhost:8000/");
        let url = flow
            .authorize_url(Platform::Youtube, &client(), "u1", Utc::now())
            .await
            .unwrap();
        assert!(url.starts_with("https://accounts.google.com/o/oauth2/v2/auth?"));
        assert!(url.contains("client_id=cid"));
        assert!(url.contains("access_type=offline"));
        assert!(url.contains(
            "redirect_uri=http%3A%2F%2Flocalhost%3A8000%2Fauth%2Fyoutube%2Fcallback"
        ));
        assert!(!url.contains("code_challenge"));
    }

    #[tokio::test]
    async fn twitter_uses_pkce() {
        let flow = OAuthFlow::new(Client::new(), "http://localhost:8000");
        let url = flow
            .authorize_url(Platform::Twitter, &client(), "u1", Utc::now())
            .await
            .unwrap();
        assert!(url.contains("code_challenge_method=plain"));
    }

    #[tokio::test]
    async fn unknown_or_mismatched_state_is_rejected() {
        let flow = OAuthFlow::new(Client::new(), "http://localhost:8000");
        let now = Utc::now();
        assert!(matches!(
            flow.complete(Platform::Youtube, &client(), "code", "nope", now).await,
            Err(SocialLeafError::InvalidParams { .. })
        ));

        let url = flow
            .authorize_url(Platform::Youtube, &client(), "u1", now)
            .await
            .unwrap();
        let state = state_of(&url);
        assert!(
            flow.complete(Platform::Linkedin, &client(), "code", &state, now)
                .await
                .is_err()
        );
        // consumed by the failed attempt
        assert!(
            flow.complete(Platform::Youtube, &client(), "code", &state, now)
                .await
                .is_err()
        );
    }

    #[tokio::test]
    async fn twitter_exchange_sends_verifier_with_basic_auth() {
        use wiremock::matchers::{body_string_contains, header_exists, method, path};
        use wiremock::{Mock, MockServer, ResponseTemplate};

        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/token"))
            .and(header_exists("authorization"))
            .and(body_string_contains("code_verifier="))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "access_token": "at",
                "refresh_token": "rt",
                "expires_in": 7200
            })))
            .mount(&server)
            .await;

        let mut endpoints = OAuthEndpoints::for_platform(Platform::Twitter);
        endpoints.token_url = format!("{}/token", server.uri());
        let flow = OAuthFlow::new(Client::new(), "http://localhost:8000")
            .with_endpoints(Platform::Twitter, endpoints);

        let now = Utc::now();
        let url = flow
            .authorize_url(Platform::Twitter, &client(), "u1", now)
            .await
            .unwrap();
        let tokens = flow
            .complete(Platform::Twitter, &client(), "abc", &state_of(&url), now)
            .await
            .unwrap();
        assert_eq!(tokens.user_id, "u1");
        assert_eq!(tokens.platform, "twitter");
        assert_eq!(tokens.access_token, "at");
        assert_eq!(tokens.refresh_token.as_deref(), Some("rt"));
        assert_eq!(tokens.expires_at, Some(now + Duration::seconds(7200)));
    }

    #[tokio::test]
    async fn absurd_expires_in_leaves_expiry_unset() {
        use wiremock::matchers::{method, path};
        use wiremock::{Mock, MockServer, ResponseTemplate};

        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "access_token": "at",
                "expires_in": i64::MAX
            })))
            .mount(&server)
            .await;

        let mut endpoints = OAuthEndpoints::for_platform(Platform::Linkedin);
        endpoints.token_url = format!("{}/token", server.uri());
        let flow = OAuthFlow::new(Client::new(), "http://localhost:8000")
            .with_endpoints(Platform::Linkedin, endpoints);

        let now = Utc::now();
        let url = flow
            .authorize_url(Platform::Linkedin, &client(), "u1", now)
            .await
            .unwrap();
        let tokens = flow
            .complete(Platform::Linkedin, &client(), "abc", &state_of(&url), now)
            .await
            .unwrap();
        assert_eq!(tokens.access_token, "at");
        assert_eq!(tokens.expires_at, None);
    }

    #[tokio::test]
    async fn pending_states_are_capped_oldest_first() {
        let flow = OAuthFlow::new(Client::new(), "http://localhost:8000");
        let start = Utc::now();
        let first = flow
            .authorize_url(Platform::Youtube, &client(), "u0", start)
            .await
            .unwrap();
        for i in 1..=MAX_PENDING_STATES {
            flow.authorize_url(
                Platform::Youtube,
                &client(),
                "flood",
                start + Duration::milliseconds(i as i64),
            )
            .await
            .unwrap();
        }
        assert_eq!(flow.pending.lock().await.len(), MAX_PENDING_STATES);
        assert!(!flow.pending.lock().await.contains_key(&state_of(&first)));
    }

    #[tokio::test]
    async fn expired_state_is_rejected() {
        let flow = OAuthFlow::new(Client::new(), "http://localhost:8000");
        let issued = Utc::now() - Duration::minutes(11);
        let url = flow
            .authorize_url(Platform::Linkedin, &client(), "u1", issued)
            .await
            .unwrap();
        let err = flow
            .complete(Platform::Linkedin, &client(), "code", &state_of(&url), Utc::now())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("expired"));
    }
}
