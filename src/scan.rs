// =============================================================================
// Market Scan — Fetch, Evaluate, Record
// =============================================================================
//
// One scan pass walks the configured universe: fetch daily history, run the
// signal engine, and append the results to the session store. A failing
// instrument is recorded and skipped — a scan never dies because one feed
// does. Each evaluation is a pure function of its own series, so per-symbol
// ordering is irrelevant; the loop stays sequential for simplicity.

use tracing::{info, warn};

use crate::app_state::AppState;
use crate::error::EngineError;
use crate::session::{InputKind, ScanRecord};
use crate::stages::intake::{build_entry, now_stamp};

/// Digest of one scan pass.
#[derive(Debug, Clone, serde::Serialize)]
pub struct ScanOutcome {
    pub scanned: usize,
    pub failed: Vec<String>,
}

/// Run one market scan over the configured symbols.
pub async fn run_market_scan(state: &AppState) -> ScanOutcome {
    let (symbols, history_days) = {
        let config = state.runtime_config.read();
        (config.symbols.clone(), config.history_days)
    };
    let engine = state.signal_engine();

    let mut records = Vec::with_capacity(symbols.len());
    let mut failed = Vec::new();

    for symbol in &symbols {
        let series = match state.history.daily(symbol, history_days).await {
            Ok(series) => series,
            Err(e) => {
                warn!(symbol = %symbol, error = %e, "no data for instrument, skipping");
                state.push_error(format!("scan: {e}"));
                failed.push(symbol.clone());
                continue;
            }
        };

        let snapshot = match engine.evaluate(&series) {
            Ok(snapshot) => snapshot,
            Err(e @ EngineError::InvalidInput(_)) => {
                warn!(symbol = %symbol, error = %e, "provider returned malformed series");
                state.push_error(format!("scan: {symbol}: {e}"));
                failed.push(symbol.clone());
                continue;
            }
            Err(e) => {
                state.push_error(format!("scan: {symbol}: {e}"));
                failed.push(symbol.clone());
                continue;
            }
        };

        let content = format!(
            "Scan | {} | Price {:.2} | Signal {} | Z {:.3} | Gate {:.3}",
            symbol, snapshot.price, snapshot.signal, snapshot.z_trap, snapshot.gate
        );
        match build_entry(
            InputKind::Scan,
            content,
            Some(symbol.clone()),
            Some(snapshot.signal),
        ) {
            Ok(entry) => state.store.append_intake(entry),
            Err(e) => warn!(symbol = %symbol, error = %e, "scan intake entry rejected"),
        }

        records.push(ScanRecord {
            ticker: symbol.trim().to_uppercase(),
            at: now_stamp(),
            snapshot,
        });
    }

    let scanned = records.len();
    state.store.set_last_scan(records);
    state.increment_version();

    info!(scanned, failed = failed.len(), "market scan complete");
    ScanOutcome { scanned, failed }
}

/// Pull headlines for every configured symbol into the intake log.
pub async fn run_news_pull(state: &AppState) -> ScanOutcome {
    let symbols = state.runtime_config.read().symbols.clone();

    let mut pulled = 0usize;
    let mut failed = Vec::new();

    for symbol in &symbols {
        let items = match state.news.headlines(symbol).await {
            Ok(items) => items,
            Err(e) => {
                warn!(symbol = %symbol, error = %e, "news unavailable for instrument");
                state.push_error(format!("news: {e}"));
                failed.push(symbol.clone());
                continue;
            }
        };

        for item in items {
            let raw = if item.summary.is_empty() {
                item.headline.clone()
            } else {
                format!("{} — {}", item.headline, item.summary)
            };
            match build_entry(InputKind::News, raw, Some(item.ticker.clone()), None) {
                Ok(entry) => {
                    state.store.append_intake(entry);
                    pulled += 1;
                }
                Err(e) => warn!(symbol = %symbol, error = %e, "news intake entry rejected"),
            }
        }
    }

    state.increment_version();
    info!(pulled, failed = failed.len(), "news pull complete");
    ScanOutcome {
        scanned: pulled,
        failed,
    }
}
