//! Social Leaf: social media analytics and AI content assistance backend.
//!
//! Provider fallback orchestration and response normalization sit under
//! `orchestrator` and `normalize`; `services` composes them with the store,
//! platform adapters and media handling, and `http` exposes the API.

pub mod analytics;
pub mod auth;
pub mod capabilities;
pub mod clients;
pub mod config;
pub mod deserializers;
pub mod error;
pub mod http;
pub mod media;
pub mod normalize;
pub mod orchestrator;
pub mod plans;
pub mod platforms;
pub mod services;
pub mod store;

/// Load `.env` from `SOCIAL_LEAF_ENV_FILE` or the working directory, ignoring a missing file
pub fn load_env() {
    match std::env::var("SOCIAL_LEAF_ENV_FILE") {
        Ok(path) => {
            let _ = dotenvy::from_path(path);
        }
        Err(_) => {
            let _ = dotenvy::dotenv();
        }
    }
}
