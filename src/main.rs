use std::net::SocketAddr;

use anyhow::Result;
use clap::Parser;
use social_leaf::config::Config;
use social_leaf::services::AppContext;
use social_leaf::store::create_store;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Social Leaf analytics and content assistant API
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Address to listen on (overrides config and SOCIAL_LEAF_BIND)
    #[arg(long)]
    bind: Option<SocketAddr>,

    /// Path to the TOML config file (overrides SOCIAL_LEAF_CONFIG)
    #[arg(long)]
    config: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    social_leaf::load_env();
    let args = Args::parse();

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("social_leaf=info,tower_http=info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let mut config = match args.config.as_deref() {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };
    if let Some(bind) = args.bind {
        config.server.bind = bind;
    }

    info!(
        env = %config.runtime.app_env,
        bind = %config.server.bind,
        "Starting Social Leaf API"
    );

    let store = create_store(&config)?;
    let app = AppContext::new(config, store)?;
    social_leaf::http::start_http_server(app).await?;

    Ok(())
}
