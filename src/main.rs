use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

mod api;
mod commands;
mod config;
mod models;
mod services;
mod utils;

use api::CoinGeckoClient;
use config::Config;
use services::chart_service::{ChartController, ChartStyle, PngSurface};
use services::dashboard_service::TerminalView;
use services::market_service::{MarketDataPoller, PollerCommand};

#[tokio::main]
async fn main() {
    dotenv::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env()
            .add_directive("market_pulse=debug".parse().unwrap())
            .add_directive("reqwest=warn".parse().unwrap())
            .add_directive("hyper=warn".parse().unwrap()))
        .with_target(true)
        .with_thread_ids(true)
        .init();

    info!("📊 Starting Market Pulse v{}...", env!("CARGO_PKG_VERSION"));

    let config = match Config::from_env() {
        Ok(c) => c,
        Err(e) => {
            error!("Invalid configuration: {}", e);
            return;
        }
    };
    info!(
        "Tracking {} over {} from {}; chart -> {}",
        config.selection.asset,
        config.selection.range,
        config.api_base_url,
        config.chart.output_path.display()
    );

    let client = match CoinGeckoClient::new(config.api_base_url.clone(), config.http_timeout) {
        Ok(c) => c,
        Err(e) => {
            error!("Failed to create HTTP client: {}", e);
            return;
        }
    };

    let poller = MarketDataPoller::new(
        Arc::new(client),
        TerminalView::new(),
        ChartController::new(PngSurface::new(config.chart.clone()), ChartStyle::default()),
        config.selection,
        config.poll_interval,
    );

    let (tx, rx) = mpsc::channel(16);
    let mut poller_task = tokio::spawn(poller.run(rx));
    if let Err(e) = commands::read_stdin(tx.clone()) {
        error!("Failed to start stdin reader: {}", e);
        return;
    }

    println!("{}", commands::help::help_text());

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            info!("Ctrl-C received, shutting down");
            let _ = tx.send(PollerCommand::Shutdown).await;
            if let Err(e) = (&mut poller_task).await {
                error!("Poller task failed: {}", e);
            }
        }
        result = &mut poller_task => {
            match result {
                Ok(poller) => info!("Stopped while showing {}", poller.selection().asset),
                Err(e) => error!("Poller task failed: {}", e),
            }
        }
    }
}
