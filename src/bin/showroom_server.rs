use anyhow::Result;
use tracing_subscriber::EnvFilter;

use showroom_ar::catalog::{routes, AppState};
use showroom_ar::config::Config;

const CONFIG_PATH: &str = "config.toml";

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Config::load_or_default(CONFIG_PATH);
    let addr = format!("{}:{}", config.server.bind_addr, config.server.port);

    let state = AppState::new(config.server).await?;
    let app = routes::router(state);

    tracing::info!("showroom server listening on {addr} (version {})", env!("GIT_VERSION"));
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
