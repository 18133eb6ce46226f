use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::PathBuf;

/// Main configuration structure loaded from social_leaf.toml and environment variables
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub providers: ProvidersConfig,
    pub models: ModelConfig,
    pub hooks: HookConfig,
    pub platforms: PlatformConfig,
    /// Runtime configuration (secrets) loaded from environment variables
    #[serde(skip)]
    pub runtime: RuntimeConfig,
}

/// HTTP surface configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: SocketAddr,
    pub cors_origins: Vec<String>,
    pub max_upload_mb: usize,
    /// Where optimized post images are written
    pub media_dir: PathBuf,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: SocketAddr::from(([0, 0, 0, 0], 8000)),
            cors_origins: vec![
                "http://localhost:5173".to_string(),
                "http://localhost:3000".to_string(),
                "http://localhost:8080".to_string(),
            ],
            max_upload_mb: 100,
            media_dir: std::env::temp_dir().join("social_leaf_media"),
        }
    }
}

/// Base URLs, timeouts and retry policy for outbound AI providers
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ProvidersConfig {
    pub gemini_base_url: String,
    pub openai_base_url: String,
    pub openrouter_base_url: String,
    pub huggingface_base_url: String,
    pub elevenlabs_base_url: String,
    pub text_timeout_ms: u64,
    pub vision_timeout_ms: u64,
    pub speech_timeout_ms: u64,
    pub rate_limit_attempts: u32,
    pub rate_limit_base_delay_ms: u64,
}

impl Default for ProvidersConfig {
    fn default() -> Self {
        Self {
            gemini_base_url: "https://generativelanguage.googleapis.com/v1beta".to_string(),
            openai_base_url: "https://api.openai.com/v1".to_string(),
            openrouter_base_url: "https://openrouter.ai/api/v1".to_string(),
            huggingface_base_url: "https://router.huggingface.co/hf-inference/models".to_string(),
            elevenlabs_base_url: "https://api.elevenlabs.io/v1".to_string(),
            text_timeout_ms: 30_000,
            vision_timeout_ms: 60_000,
            speech_timeout_ms: 30_000,
            rate_limit_attempts: 3,
            rate_limit_base_delay_ms: 2_000,
        }
    }
}

/// Model names per provider role
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ModelConfig {
    pub gemini_vision: String,
    pub gemini_text: String,
    /// Tried in order for script analysis
    pub gemini_script: Vec<String>,
    pub openai_chat: String,
    pub openrouter_vision: String,
    pub openrouter_text: String,
    pub huggingface_text: String,
    pub elevenlabs_model: String,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            gemini_vision: "gemini-1.5-flash".to_string(),
            gemini_text: "gemini-flash-latest".to_string(),
            gemini_script: vec![
                "gemini-1.5-flash".to_string(),
                "gemini-1.5-pro".to_string(),
                "gemini-pro".to_string(),
            ],
            openai_chat: "gpt-3.5-turbo".to_string(),
            openrouter_vision: "meta-llama/llama-3.2-11b-vision-instruct:free".to_string(),
            openrouter_text: "mistralai/mistral-7b-instruct:free".to_string(),
            huggingface_text: "mistralai/Mistral-7B-Instruct-v0.3".to_string(),
            elevenlabs_model: "eleven_multilingual_v2".to_string(),
        }
    }
}

/// Hook analysis upload and frame limits
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct HookConfig {
    pub allowed_extensions: Vec<String>,
    pub max_file_mb: usize,
    /// Frames actually sent to providers
    pub max_frames: usize,
    pub default_interval_sec: f64,
    pub ffmpeg_bin: String,
}

impl Default for HookConfig {
    fn default() -> Self {
        Self {
            allowed_extensions: [".mp4", ".mov", ".avi", ".webm", ".mkv"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            max_file_mb: 100,
            max_frames: 3,
            default_interval_sec: 1.0,
            ffmpeg_bin: "ffmpeg".to_string(),
        }
    }
}

/// Base URLs for social platform APIs
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct PlatformConfig {
    pub youtube_base_url: String,
    pub graph_base_url: String,
    pub instagram_web_url: String,
    pub twitter_base_url: String,
    pub linkedin_base_url: String,
    pub timeout_ms: u64,
}

impl Default for PlatformConfig {
    fn default() -> Self {
        Self {
            youtube_base_url: "https://www.googleapis.com/youtube/v3".to_string(),
            graph_base_url: "https://graph.facebook.com/v18.0".to_string(),
            instagram_web_url: "https://www.instagram.com".to_string(),
            twitter_base_url: "https://api.twitter.com/2".to_string(),
            linkedin_base_url: "https://api.linkedin.com/v2".to_string(),
            timeout_ms: 15_000,
        }
    }
}

/// OAuth client credentials for one platform
#[derive(Debug, Clone, Default)]
pub struct OAuthClient {
    pub client_id: String,
    pub client_secret: String,
}

/// Runtime configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub app_env: String,
    pub log_level: String,
    pub supabase_url: Option<String>,
    pub supabase_key: Option<String>,
    pub supabase_service_key: Option<String>,
    pub openai_api_key: Option<String>,
    pub gemini_api_key: Option<String>,
    /// Dedicated quota key used only by hook detection
    pub gemini_api_key_secondary: Option<String>,
    pub huggingface_api_key: Option<String>,
    pub openrouter_api_key: Option<String>,
    pub elevenlabs_api_key: Option<String>,
    pub youtube_api_key: Option<String>,
    pub google_oauth: Option<OAuthClient>,
    pub instagram_oauth: Option<OAuthClient>,
    pub twitter_oauth: Option<OAuthClient>,
    pub linkedin_oauth: Option<OAuthClient>,
    pub oauth_redirect_base: String,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            app_env: "development".to_string(),
            log_level: "social_leaf=info,tower_http=info".to_string(),
            supabase_url: None,
            supabase_key: None,
            supabase_service_key: None,
            openai_api_key: None,
            gemini_api_key: None,
            gemini_api_key_secondary: None,
            huggingface_api_key: None,
            openrouter_api_key: None,
            elevenlabs_api_key: None,
            youtube_api_key: None,
            google_oauth: None,
            instagram_oauth: None,
            twitter_oauth: None,
            linkedin_oauth: None,
            oauth_redirect_base: "http://localhost:8000".to_string(),
        }
    }
}

/// Treat unset, empty and template placeholder values as absent
fn is_placeholder(s: &str) -> bool {
    let t = s.trim();
    t.is_empty()
        || t.contains("${")
        || t.eq_ignore_ascii_case("your-api-key-here")
        || t.eq_ignore_ascii_case("changeme")
}

impl RuntimeConfig {
    /// Load runtime configuration from environment variables
    pub fn load_from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build runtime configuration from an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let secret = |key: &str| lookup(key).filter(|v| !is_placeholder(v));
        let oauth = |id_key: &str, secret_key: &str| match (secret(id_key), secret(secret_key)) {
            (Some(client_id), Some(client_secret)) => Some(OAuthClient {
                client_id,
                client_secret,
            }),
            _ => None,
        };

        let defaults = Self::default();
        Self {
            app_env: lookup("APP_ENV").unwrap_or(defaults.app_env),
            log_level: lookup("RUST_LOG").unwrap_or(defaults.log_level),
            supabase_url: secret("SUPABASE_URL"),
            supabase_key: secret("SUPABASE_KEY"),
            supabase_service_key: secret("SUPABASE_SERVICE_KEY"),
            openai_api_key: secret("OPENAI_API_KEY"),
            gemini_api_key: secret("GEMINI_API_KEY"),
            gemini_api_key_secondary: secret("GEMINI_API_KEY_SECONDARY"),
            huggingface_api_key: secret("HUGGINGFACE_API_KEY"),
            openrouter_api_key: secret("OPENROUTER_API_KEY"),
            elevenlabs_api_key: secret("ELEVENLABS_API_KEY"),
            youtube_api_key: secret("YOUTUBE_API_KEY"),
            google_oauth: oauth("GOOGLE_CLIENT_ID", "GOOGLE_CLIENT_SECRET"),
            instagram_oauth: oauth("INSTAGRAM_CLIENT_ID", "INSTAGRAM_CLIENT_SECRET"),
            twitter_oauth: oauth("TWITTER_CLIENT_ID", "TWITTER_CLIENT_SECRET"),
            linkedin_oauth: oauth("LINKEDIN_CLIENT_ID", "LINKEDIN_CLIENT_SECRET"),
            oauth_redirect_base: lookup("OAUTH_REDIRECT_BASE")
                .filter(|v| !v.trim().is_empty())
                .unwrap_or(defaults.oauth_redirect_base),
        }
    }

    pub fn is_production(&self) -> bool {
        self.app_env.eq_ignore_ascii_case("production")
    }
}

impl Config {
    /// Load configuration from TOML file and environment variables
    /// Uses SOCIAL_LEAF_CONFIG environment variable or defaults to "social_leaf.toml"
    pub fn load() -> anyhow::Result<Self> {
        crate::load_env();

        let config_path = std::env::var("SOCIAL_LEAF_CONFIG")
            .unwrap_or_else(|_| "social_leaf.toml".to_string());
        Self::load_from(&config_path)
    }

    /// Load from an explicit TOML path, falling back to defaults when it is missing
    pub fn load_from(config_path: &str) -> anyhow::Result<Self> {
        let mut config: Config = if let Ok(content) = std::fs::read_to_string(config_path) {
            Self::from_toml(&content)?
        } else {
            tracing::warn!("Config file {} not found, using defaults", config_path);
            Self::default()
        };

        config.runtime = RuntimeConfig::load_from_env();

        // Env overrides for the HTTP surface (env-first)
        if let Ok(v) = std::env::var("SOCIAL_LEAF_BIND") {
            match v.parse::<SocketAddr>() {
                Ok(bind) => config.server.bind = bind,
                Err(_) => tracing::warn!("SOCIAL_LEAF_BIND '{}' is not a socket address", v),
            }
        }
        if let Ok(origins) = std::env::var("CORS_ORIGINS") {
            config.server.cors_origins = parse_origins(&origins);
        }

        config.validate();
        Ok(config)
    }

    /// Parse configuration from TOML
    pub fn from_toml(src: &str) -> anyhow::Result<Self> {
        Ok(toml::from_str(src)?)
    }

    /// Clamp out-of-range tuning values
    pub fn validate(&mut self) {
        let p = &mut self.providers;
        if p.rate_limit_attempts == 0 {
            p.rate_limit_attempts = 1;
        } else if p.rate_limit_attempts > 3 {
            tracing::warn!(
                "rate_limit_attempts {} exceeds max 3, clamping to 3",
                p.rate_limit_attempts
            );
            p.rate_limit_attempts = 3;
        }
        for (name, value) in [
            ("text_timeout_ms", &mut p.text_timeout_ms),
            ("vision_timeout_ms", &mut p.vision_timeout_ms),
            ("speech_timeout_ms", &mut p.speech_timeout_ms),
        ] {
            let clamped = (*value).clamp(15_000, 60_000);
            if clamped != *value {
                tracing::warn!("{} {} out of range, clamping to {}", name, value, clamped);
                *value = clamped;
            }
        }

        if self.hooks.max_frames == 0 {
            self.hooks.max_frames = 1;
        }
        if self.models.gemini_script.is_empty() {
            self.models.gemini_script = ModelConfig::default().gemini_script;
        }
        if self.runtime.supabase_url.is_some() && self.runtime.supabase_key.is_none() {
            tracing::warn!("SUPABASE_URL is set without SUPABASE_KEY; store requests will fail");
        }
    }

    /// Gemini key used by hook detection: the secondary key when present
    pub fn hook_gemini_key(&self) -> Option<&str> {
        self.runtime
            .gemini_api_key_secondary
            .as_deref()
            .or(self.runtime.gemini_api_key.as_deref())
    }
}

/// Split a comma separated origin list
pub fn parse_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|o| o.trim().to_string())
        .filter(|o| !o.is_empty())
        .collect()
}
