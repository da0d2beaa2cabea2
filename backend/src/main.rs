use std::time::Duration;

use anyhow::Context;
use backend::config::Config;
use backend::sessions::ExpiringMemoryStore;
use backend::{app_with_sessions, logging, AppState};
use clap::Parser;
use tracing::info;

const SESSION_SWEEP_PERIOD: Duration = Duration::from_secs(60 * 60);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    let config = Config::parse();
    logging::init_tracing(&config.log_filter)?;

    let state = match &config.data_dir {
        Some(dir) => AppState::with_persistence(dir.clone())
            .await
            .with_context(|| format!("failed to open room directory {}", dir.display()))?,
        None => AppState::default(),
    };
    let sessions = ExpiringMemoryStore::default();
    sessions.spawn_sweeper(SESSION_SWEEP_PERIOD);
    let app = app_with_sessions(state, sessions, time::Duration::days(config.session_days));

    let listener = tokio::net::TcpListener::bind(config.bind)
        .await
        .with_context(|| format!("failed to bind {}", config.bind))?;
    info!(
        bind = %config.bind,
        persistent = config.data_dir.is_some(),
        "starting server"
    );
    axum::serve(listener, app).await.context("server error")?;
    Ok(())
}
