//! Request-level workflows shared by the HTTP handlers.
//!
//! `AppContext` is built once at startup and owns everything a request
//! needs: configuration, the store, the orchestrator and platform adapters.
//! Provider chains are rebuilt per call from configuration.

pub mod assistant;
pub mod captions;
pub mod hooks;
pub mod users;
pub mod voice;

use std::sync::Arc;
use std::time::Duration;

use tracing::debug;

use crate::analytics::Analytics;
use crate::capabilities::chains::ProviderChain;
use crate::capabilities::{CapabilityKind, CapabilityRequest, ChainBuilder};
use crate::config::Config;
use crate::error::Result;
use crate::media::FrameExtractor;
use crate::normalize::NormalizedResult;
use crate::orchestrator::Orchestrator;
use crate::platforms::PlatformClients;
use crate::platforms::oauth::OAuthFlow;
use crate::store::Store;

pub struct AppContext {
    pub config: Arc<Config>,
    pub store: Arc<dyn Store>,
    pub orchestrator: Orchestrator,
    pub analytics: Analytics,
    pub platforms: PlatformClients,
    pub oauth: OAuthFlow,
    pub frames: FrameExtractor,
}

impl AppContext {
    pub fn new(config: Config, store: Arc<dyn Store>) -> Result<Self> {
        let orchestrator = Orchestrator::new(&config.providers);
        let platforms = PlatformClients::new(&config)?;
        let oauth_http =
            crate::platforms::http_client(Duration::from_millis(config.platforms.timeout_ms))?;
        let oauth = OAuthFlow::new(oauth_http, &config.runtime.oauth_redirect_base);
        let frames = FrameExtractor::new(config.hooks.ffmpeg_bin.clone());
        Ok(Self {
            analytics: Analytics::new(store.clone()),
            config: Arc::new(config),
            store,
            orchestrator,
            platforms,
            oauth,
            frames,
        })
    }

    pub fn chain(&self, kind: CapabilityKind) -> ProviderChain {
        ChainBuilder::new(&self.config).chain_for(kind)
    }

    /// Run one capability through its configured provider chain
    pub async fn run(&self, request: CapabilityRequest) -> Result<NormalizedResult> {
        let chain = self.chain(request.kind());
        debug!(capability = %request.kind(), providers = chain.len(), "running capability");
        self.orchestrator.execute(&request, &chain).await
    }
}
