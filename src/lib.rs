pub mod api;
pub mod config;
pub mod db;
pub mod error;
pub mod models;
mod mutations;
pub mod queries;
mod utils;

use anyhow::Context;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

pub use config::AppConfig;
pub use db::Store;
pub use error::{Action, DirectoryError, Entity};

fn init_tracing(config: &AppConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.log_filter.as_str()));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Opens (and on first run seeds) the database, then serves the directory
/// until interrupted.
pub fn run() -> anyhow::Result<()> {
    let config = AppConfig::load()?;
    init_tracing(&config);

    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to start runtime")?
        .block_on(serve(config))
}

async fn serve(config: AppConfig) -> anyhow::Result<()> {
    let database = config.database_path();
    let seed = config.seed_demo_data;
    let store_config = config.clone();
    let seeded = tokio::task::spawn_blocking(move || -> anyhow::Result<bool> {
        let mut store = Store::open_default(&store_config)
            .with_context(|| format!("failed to open {}", store_config.database_path().display()))?;
        if !seed {
            return Ok(false);
        }
        Ok(store.seed_if_empty()?)
    })
    .await??;
    tracing::info!(database = %database.display(), seeded, "directory ready");

    let app = api::router(api::AppState::new(database));
    let listener = tokio::net::TcpListener::bind((config.host.as_str(), config.port))
        .await
        .with_context(|| format!("failed to bind {}:{}", config.host, config.port))?;
    tracing::info!(address = %listener.local_addr()?, "listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    tracing::info!("shut down");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}
