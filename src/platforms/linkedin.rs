use reqwest::Client;
use serde::Deserialize;
use serde_json::{Value, json};

use super::get_json;
use crate::error::Result;

/// OpenID Connect `userinfo` claims
#[derive(Debug, Deserialize)]
struct UserInfo {
    sub: String,
    name: Option<String>,
    email: Option<String>,
    picture: Option<String>,
    locale: Option<Value>,
}

pub struct LinkedInClient {
    http: Client,
    base_url: String,
}

impl LinkedInClient {
    pub fn new(http: Client, base_url: &str) -> Self {
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub async fn userinfo(&self, access_token: &str) -> Result<Value> {
        let info: UserInfo = get_json(
            "linkedin userinfo",
            self.http
                .get(format!("{}/userinfo", self.base_url))
                .bearer_auth(access_token),
        )
        .await?;
        Ok(json!({
            "platform": "linkedin",
            "connected": true,
            "account": {
                "id": info.sub,
                "name": info.name,
                "email": info.email,
                "profile_picture": info.picture,
                "locale": info.locale,
            },
            // userinfo carries no audience counts
            "metrics": {},
        }))
    }
}
