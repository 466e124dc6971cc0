use std::sync::Arc;

use campuschat::{app, config::Config, store::{Seed, SqliteStore}, AppState};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = Config::from_env()?;

    let store = SqliteStore::connect(&config.database_url).await?;
    if let Some(seed_file) = &config.seed_file {
        Seed::from_file(seed_file)?.apply(&store).await?;
    }

    let app_state = AppState::new(Arc::new(store));
    if let Err(err) = app_state.directory.refresh().await {
        // the roster can be reloaded later through /users/refresh
        warn!(error = %err, "initial directory load failed");
    }

    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    info!(addr = %config.bind_addr, "listening");
    axum::serve(listener, app(app_state)).await?;
    Ok(())
}
