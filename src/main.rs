use anyhow::{Context, Result};
use clap::Parser;
use tokio::net::TcpListener;
use tracing::info;

use qrstyle::config::Config;
use qrstyle::logging::init_logging;
use qrstyle::server::{router, AppState};

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::parse();
    init_logging(config.log_filter.as_deref())?;

    let state = AppState::from_config(&config).context("building logo fetcher")?;
    let app = router(state);

    let listener = TcpListener::bind(config.listen)
        .await
        .with_context(|| format!("binding {}", config.listen))?;
    info!(
        addr = %listener.local_addr()?,
        history_capacity = config.history_capacity,
        max_image_side = config.max_image_side,
        "listening"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    info!("shut down");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::warn!(?err, "could not listen for ctrl-c");
        std::future::pending::<()>().await;
    }
}
