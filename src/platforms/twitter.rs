use reqwest::Client;
use serde::Deserialize;
use serde_json::{Value, json};

use super::get_json;
use crate::deserializers::de_count;
use crate::error::Result;

#[derive(Debug, Default, Deserialize)]
struct PublicMetrics {
    #[serde(default, deserialize_with = "de_count")]
    followers_count: i64,
    #[serde(default, deserialize_with = "de_count")]
    following_count: i64,
    #[serde(default, deserialize_with = "de_count")]
    tweet_count: i64,
    #[serde(default, deserialize_with = "de_count")]
    listed_count: i64,
}

#[derive(Debug, Deserialize)]
struct User {
    id: String,
    username: Option<String>,
    name: Option<String>,
    description: Option<String>,
    profile_image_url: Option<String>,
    #[serde(default)]
    public_metrics: PublicMetrics,
}

#[derive(Debug, Deserialize)]
struct Envelope {
    data: User,
}

/// Twitter API v2 `users/me`
pub struct TwitterClient {
    http: Client,
    base_url: String,
}

impl TwitterClient {
    pub fn new(http: Client, base_url: &str) -> Self {
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub async fn me(&self, access_token: &str) -> Result<Value> {
        let envelope: Envelope = get_json(
            "twitter users/me",
            self.http
                .get(format!("{}/users/me", self.base_url))
                .bearer_auth(access_token)
                .query(&[(
                    "user.fields",
                    "public_metrics,description,profile_image_url",
                )]),
        )
        .await?;
        Ok(to_payload(envelope.data))
    }
}

fn to_payload(user: User) -> Value {
    let m = user.public_metrics;
    json!({
        "platform": "twitter",
        "connected": true,
        "account": {
            "id": user.id,
            "username": user.username,
            "name": user.name,
            "bio": user.description,
            "profile_picture": user.profile_image_url,
        },
        "metrics": {
            "followers": m.followers_count,
            "following": m.following_count,
            "tweets": m.tweet_count,
            "listed": m.listed_count,
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_public_metrics() {
        let env: Envelope = serde_json::from_str(
            r#"{"data":{"id":"42","username":"leaf","name":"Leaf",
                "public_metrics":{"followers_count":10,"following_count":2,"tweet_count":7}}}"#,
        )
        .unwrap();
        let v = to_payload(env.data);
        assert_eq!(v["metrics"]["followers"], 10);
        assert_eq!(v["metrics"]["listed"], 0);
        assert_eq!(v["account"]["username"], "leaf");
    }
}
