//! YouTube Data API v3.
//!
//! Public channel lookups use the API key. Without a key, or when any call
//! fails, the demo channel and video set is returned instead.

use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::{debug, warn};

use super::get_json;
use crate::deserializers::{de_bool_forgiving, de_count};
use crate::error::{Result, SocialLeafError};

pub const FEATURED_CHANNELS: [(&str, &str); 4] = [
    ("tseries", "UCq-Fj5jknLsUf-MWSy4_brA"),
    ("mrbeast", "UCX6OQ3DkcsbYNE6H8uQQuVA"),
    ("pewdiepie", "UC-lHJZR3Gqxm24_Vd_AJ5Yw"),
    ("cocomelon", "UCbCmjCuTUZos6Inko4u57UQ"),
];

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelStatistics {
    pub subscribers: i64,
    pub views: i64,
    pub videos: i64,
    pub hidden_subscriber_count: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelStats {
    pub id: String,
    pub title: Option<String>,
    pub description: String,
    pub custom_url: String,
    pub thumbnail: Option<String>,
    pub banner: Option<String>,
    pub country: Option<String>,
    pub published_at: Option<String>,
    pub statistics: ChannelStatistics,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub demo: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VideoStatistics {
    pub views: i64,
    pub likes: i64,
    pub comments: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoStats {
    pub id: String,
    pub title: Option<String>,
    pub description: String,
    pub thumbnail: Option<String>,
    pub published_at: Option<String>,
    pub duration: Option<String>,
    pub statistics: VideoStatistics,
}

#[derive(Debug, Clone, Serialize)]
pub struct FeaturedChannel {
    pub key: String,
    pub channel: ChannelStats,
    pub recent_videos: Vec<VideoStats>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ChannelOverview {
    pub channel: ChannelStats,
    pub recent_videos: Vec<VideoStats>,
}

// Wire types

#[derive(Debug, Deserialize)]
struct ListResponse<T> {
    #[serde(default = "Vec::new")]
    items: Vec<T>,
}

#[derive(Debug, Default, Deserialize)]
struct Thumb {
    url: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct Thumbnails {
    high: Option<Thumb>,
    default: Option<Thumb>,
}

impl Thumbnails {
    fn best(self) -> Option<String> {
        self.high.or(self.default).and_then(|t| t.url)
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Snippet {
    title: Option<String>,
    #[serde(default)]
    description: String,
    custom_url: Option<String>,
    #[serde(default)]
    thumbnails: Thumbnails,
    country: Option<String>,
    published_at: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawChannelStatistics {
    #[serde(default, deserialize_with = "de_count")]
    subscriber_count: i64,
    #[serde(default, deserialize_with = "de_count")]
    view_count: i64,
    #[serde(default, deserialize_with = "de_count")]
    video_count: i64,
    #[serde(default, deserialize_with = "de_bool_forgiving")]
    hidden_subscriber_count: bool,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BrandingChannel {
    banner_external_url: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct Branding {
    #[serde(default)]
    channel: BrandingChannel,
}

#[derive(Debug, Deserialize)]
struct RelatedPlaylists {
    uploads: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChannelContentDetails {
    related_playlists: RelatedPlaylists,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChannelItem {
    id: String,
    #[serde(default)]
    snippet: Snippet,
    #[serde(default)]
    statistics: RawChannelStatistics,
    #[serde(default)]
    branding_settings: Branding,
    content_details: Option<ChannelContentDetails>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PlaylistContentDetails {
    video_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PlaylistItem {
    content_details: PlaylistContentDetails,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawVideoStatistics {
    #[serde(default, deserialize_with = "de_count")]
    view_count: i64,
    #[serde(default, deserialize_with = "de_count")]
    like_count: i64,
    #[serde(default, deserialize_with = "de_count")]
    comment_count: i64,
}

#[derive(Debug, Default, Deserialize)]
struct VideoContentDetails {
    duration: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct VideoItem {
    id: String,
    #[serde(default)]
    snippet: Snippet,
    #[serde(default)]
    statistics: RawVideoStatistics,
    #[serde(default)]
    content_details: VideoContentDetails,
}

fn clip(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}

impl From<ChannelItem> for ChannelStats {
    fn from(item: ChannelItem) -> Self {
        let s = item.statistics;
        ChannelStats {
            id: item.id,
            title: item.snippet.title,
            description: clip(&item.snippet.description, 200),
            custom_url: item.snippet.custom_url.unwrap_or_default(),
            thumbnail: item.snippet.thumbnails.best(),
            banner: item.branding_settings.channel.banner_external_url,
            country: item.snippet.country,
            published_at: item.snippet.published_at,
            statistics: ChannelStatistics {
                subscribers: s.subscriber_count,
                views: s.view_count,
                videos: s.video_count,
                hidden_subscriber_count: s.hidden_subscriber_count,
            },
            demo: false,
        }
    }
}

impl From<VideoItem> for VideoStats {
    fn from(item: VideoItem) -> Self {
        VideoStats {
            id: item.id,
            title: item.snippet.title,
            description: clip(&item.snippet.description, 150),
            thumbnail: item.snippet.thumbnails.best(),
            published_at: item.snippet.published_at,
            duration: item.content_details.duration,
            statistics: VideoStatistics {
                views: item.statistics.view_count,
                likes: item.statistics.like_count,
                comments: item.statistics.comment_count,
            },
        }
    }
}

pub fn demo_channel(channel_id: &str) -> ChannelStats {
    ChannelStats {
        id: channel_id.to_string(),
        title: Some("Demo Channel".to_string()),
        description: "This is a demo channel for Social Leaf".to_string(),
        custom_url: "@demochannel".to_string(),
        thumbnail: Some("https://via.placeholder.com/88".to_string()),
        banner: None,
        country: None,
        published_at: None,
        statistics: ChannelStatistics {
            subscribers: 25_000,
            views: 1_500_000,
            videos: 150,
            hidden_subscriber_count: false,
        },
        demo: true,
    }
}

const DEMO_TITLES: [&str; 10] = [
    "Getting Started Tutorial",
    "Advanced Tips & Tricks",
    "Product Review 2024",
    "Behind the Scenes",
    "Q&A Session",
    "Weekly Update",
    "How To Guide",
    "Live Stream Recap",
    "Top 10 Features",
    "Community Spotlight",
];

pub fn demo_videos(count: usize) -> Vec<VideoStats> {
    DEMO_TITLES
        .iter()
        .take(count)
        .enumerate()
        .map(|(i, title)| {
            let views = 12_000 + 7_350 * i as i64;
            VideoStats {
                id: format!("yt_video_{i}"),
                title: Some(title.to_string()),
                description: format!("Description for {title}"),
                thumbnail: Some("https://via.placeholder.com/120x90".to_string()),
                published_at: None,
                duration: None,
                statistics: VideoStatistics {
                    views,
                    likes: views / 20,
                    comments: views / 100,
                },
            }
        })
        .collect()
}

pub struct YouTubeClient {
    http: Client,
    base_url: String,
    api_key: Option<String>,
}

impl YouTubeClient {
    pub fn new(http: Client, base_url: &str, api_key: Option<String>) -> Self {
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    async fn fetch_channel(&self, key: &str, channel_id: &str, part: &str) -> Result<ChannelItem> {
        let list: ListResponse<ChannelItem> = get_json(
            "youtube channels",
            self.http
                .get(self.url("channels"))
                .query(&[("part", part), ("id", channel_id), ("key", key)]),
        )
        .await?;
        list.items
            .into_iter()
            .next()
            .ok_or_else(|| SocialLeafError::NotFound {
                message: format!("YouTube channel {channel_id}"),
            })
    }

    async fn fetch_videos(&self, key: &str, channel_id: &str, max_results: usize) -> Result<Vec<VideoStats>> {
        let channel = self.fetch_channel(key, channel_id, "contentDetails").await?;
        let uploads = channel
            .content_details
            .map(|c| c.related_playlists.uploads)
            .ok_or_else(|| SocialLeafError::Upstream {
                message: "youtube channel has no uploads playlist".to_string(),
            })?;

        let max = max_results.to_string();
        let playlist: ListResponse<PlaylistItem> = get_json(
            "youtube playlistItems",
            self.http.get(self.url("playlistItems")).query(&[
                ("part", "contentDetails"),
                ("playlistId", uploads.as_str()),
                ("maxResults", max.as_str()),
                ("key", key),
            ]),
        )
        .await?;

        let ids: Vec<String> = playlist
            .items
            .into_iter()
            .map(|i| i.content_details.video_id)
            .collect();
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let joined = ids.join(",");
        let videos: ListResponse<VideoItem> = get_json(
            "youtube videos",
            self.http.get(self.url("videos")).query(&[
                ("part", "snippet,statistics,contentDetails"),
                ("id", joined.as_str()),
                ("key", key),
            ]),
        )
        .await?;
        Ok(videos.items.into_iter().map(VideoStats::from).collect())
    }

    pub async fn channel_stats(&self, channel_id: &str) -> ChannelStats {
        let Some(key) = self.api_key.as_deref() else {
            debug!("no YOUTUBE_API_KEY; serving demo channel");
            return demo_channel(channel_id);
        };
        match self
            .fetch_channel(key, channel_id, "snippet,statistics,brandingSettings")
            .await
        {
            Ok(item) => item.into(),
            Err(e) => {
                warn!(channel_id, error = %e, "youtube channel lookup failed; serving demo");
                demo_channel(channel_id)
            }
        }
    }

    pub async fn channel_videos(&self, channel_id: &str, max_results: usize) -> Vec<VideoStats> {
        let Some(key) = self.api_key.as_deref() else {
            return demo_videos(max_results);
        };
        match self.fetch_videos(key, channel_id, max_results).await {
            Ok(videos) => videos,
            Err(e) => {
                warn!(channel_id, error = %e, "youtube video lookup failed; serving demo");
                demo_videos(max_results)
            }
        }
    }

    pub async fn channel_overview(&self, channel_id: &str) -> ChannelOverview {
        let (channel, recent_videos) =
            tokio::join!(self.channel_stats(channel_id), self.channel_videos(channel_id, 6));
        ChannelOverview {
            channel,
            recent_videos,
        }
    }

    pub async fn featured(&self) -> Vec<FeaturedChannel> {
        let mut out = Vec::with_capacity(FEATURED_CHANNELS.len());
        for (key, channel_id) in FEATURED_CHANNELS {
            let (channel, recent_videos) =
                tokio::join!(self.channel_stats(channel_id), self.channel_videos(channel_id, 3));
            out.push(FeaturedChannel {
                key: key.to_string(),
                channel,
                recent_videos,
            });
        }
        out
    }

    /// Authenticated user's own channel (`mine=true`) using an OAuth token
    pub async fn my_channel(&self, access_token: &str) -> Result<Value> {
        let list: ListResponse<ChannelItem> = get_json(
            "youtube channels (mine)",
            self.http
                .get(self.url("channels"))
                .bearer_auth(access_token)
                .query(&[("part", "snippet,statistics"), ("mine", "true")]),
        )
        .await?;
        let item = list.items.into_iter().next().ok_or_else(|| SocialLeafError::NotFound {
            message: "no YouTube channel on this account".to_string(),
        })?;
        let stats = ChannelStats::from(item);
        Ok(json!({
            "platform": "youtube",
            "connected": true,
            "account": {
                "id": stats.id,
                "title": stats.title,
                "custom_url": stats.custom_url,
                "thumbnail": stats.thumbnail,
            },
            "metrics": {
                "subscribers": stats.statistics.subscribers,
                "views": stats.statistics.views,
                "videos": stats.statistics.videos,
            },
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn channel_counts_arrive_as_strings() {
        let raw = r#"{"items":[{"id":"UC1","snippet":{"title":"T","description":"d",
            "thumbnails":{"default":{"url":"u"}}},
            "statistics":{"subscriberCount":"1200","viewCount":"99","videoCount":"3",
            "hiddenSubscriberCount":false}}]}"#;
        let list: ListResponse<ChannelItem> = serde_json::from_str(raw).unwrap();
        let stats = ChannelStats::from(list.items.into_iter().next().unwrap());
        assert_eq!(stats.statistics.subscribers, 1200);
        assert_eq!(stats.thumbnail.as_deref(), Some("u"));
        assert!(!stats.demo);
    }

    #[test]
    fn long_descriptions_are_clipped() {
        let raw = format!(
            r#"{{"id":"v1","snippet":{{"description":"{}"}},"statistics":{{"likeCount":"5"}}}}"#,
            "x".repeat(400)
        );
        let video = VideoStats::from(serde_json::from_str::<VideoItem>(&raw).unwrap());
        assert_eq!(video.description.len(), 150);
        assert_eq!(video.statistics.likes, 5);
        assert_eq!(video.statistics.views, 0);
    }

    #[tokio::test]
    async fn no_api_key_serves_demo() {
        let client = YouTubeClient::new(Client::new(), "http://127.0.0.1:9", None);
        let featured = client.featured().await;
        assert_eq!(featured.len(), 4);
        assert_eq!(featured[1].key, "mrbeast");
        assert!(featured[1].channel.demo);
        assert_eq!(featured[1].recent_videos.len(), 3);
        assert_eq!(client.channel_videos("x", 20).await.len(), 10);
    }
}
