mod config;
mod coordinator;
mod error;
mod filter;
mod models;
mod normalize;
mod notify;
mod schedule;
mod scrapers;
mod store;

use config::Config;
use coordinator::{RunCoordinator, Source};
use notify::{Dispatcher, TelegramBot};
use scrapers::{ChromeRenderer, HttpFetcher};
use std::sync::Arc;
use store::SeenStore;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let config = Config::from_env()?;

    info!("🏠 Flat Scout booting (state file: {})", config.state_file.display());

    let store = SeenStore::load(&config.state_file).await;
    let messenger = Arc::new(TelegramBot::new(&config.telegram_token)?);
    let dispatcher = Dispatcher::new(store, messenger, config.telegram_chat_id.clone());

    // Process-wide transport handles, shared by every run
    let fetcher = Arc::new(HttpFetcher::new(&config.http)?);
    let renderer = Arc::new(ChromeRenderer::new());

    let sources: Vec<Source> = scrapers::registry(&config, fetcher, renderer.clone())?
        .into_iter()
        .map(|scraper| Source {
            criteria: config.criteria_for(scraper.prefix()),
            scraper,
        })
        .collect();
    info!(
        "Scanning {} sources: {}",
        sources.len(),
        sources
            .iter()
            .map(|s| s.scraper.source_name())
            .collect::<Vec<_>>()
            .join(", ")
    );

    let coordinator = Arc::new(RunCoordinator::new(sources, dispatcher));
    let mut scheduler = schedule::start_scheduler(&config.cron_schedule, coordinator).await?;

    shutdown_signal().await;
    info!("Graceful shutdown …");

    scheduler.shutdown().await?;
    renderer.shutdown().await;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
