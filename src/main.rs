// =============================================================================
// Trapgate Desk Engine — Main Entry Point
// =============================================================================
//
// The engine starts Paused: the periodic market scan only runs after an
// explicit resume via the API. The tracker simulation advances only on
// request — frames are never ticked in the background.
// =============================================================================

// ── Module declarations ──────────────────────────────────────────────────────
mod api;
mod app_state;
mod decision;
mod error;
mod portfolio;
mod providers;
mod runtime_config;
mod scan;
mod session;
mod signal;
mod stages;
mod tracker;
mod types;

use std::sync::Arc;

use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::app_state::AppState;
use crate::runtime_config::RuntimeConfig;
use crate::types::TradingMode;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // ── 1. Environment & config ──────────────────────────────────────────
    let _ = dotenv::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("╔══════════════════════════════════════════════════════════╗");
    info!("║        Trapgate Desk Engine — Starting Up               ║");
    info!("╚══════════════════════════════════════════════════════════╝");

    let mut config = RuntimeConfig::load("runtime_config.json").unwrap_or_else(|e| {
        warn!(error = %e, "Failed to load config, using defaults");
        RuntimeConfig::default()
    });

    // SAFETY: always start with the scan loop paused.
    config.trading_mode = TradingMode::Paused;

    // Override symbols from env if available.
    if let Ok(syms) = std::env::var("TRAPGATE_SYMBOLS") {
        config.symbols = syms
            .split(',')
            .map(|s| s.trim().to_uppercase())
            .filter(|s| !s.is_empty())
            .collect();
    }
    if config.symbols.is_empty() {
        config.symbols = vec![
            "AAPL".into(),
            "MSFT".into(),
            "NVDA".into(),
            "AMZN".into(),
            "GOOGL".into(),
            "TSLA".into(),
        ];
    }

    info!(symbols = ?config.symbols, "Configured scan universe");
    info!(
        trading_mode = %config.trading_mode,
        scan_interval_secs = config.scan_interval_secs,
        "Engine starting Paused"
    );

    // ── 2. Build shared state ────────────────────────────────────────────
    let tracker_seed = std::env::var("TRAPGATE_TRACKER_SEED")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or_else(rand::random::<u64>);
    info!(tracker_seed, "Tracker simulation seeded");

    let bind_addr = config.bind_addr.clone();
    let state = Arc::new(AppState::new(config, tracker_seed));

    // ── 3. Periodic scan loop ────────────────────────────────────────────
    {
        let state = state.clone();
        tokio::spawn(async move {
            let interval_secs = state.runtime_config.read().scan_interval_secs.max(10);
            let mut ticker = tokio::time::interval(std::time::Duration::from_secs(interval_secs));
            loop {
                ticker.tick().await;
                let mode = state.runtime_config.read().trading_mode;
                match mode {
                    TradingMode::Live => {
                        scan::run_market_scan(&state).await;
                    }
                    TradingMode::Paused => {}
                    TradingMode::Killed => {
                        warn!("Engine killed — scan loop exiting");
                        break;
                    }
                }
            }
        });
    }

    // ── 4. Serve the API ─────────────────────────────────────────────────
    let app = api::rest::router(state);
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    info!(addr = %bind_addr, "REST API listening");
    axum::serve(listener, app).await?;

    Ok(())
}
