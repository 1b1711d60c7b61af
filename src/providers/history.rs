// =============================================================================
// Price History Client — Stooq Daily Bars over CSV
// =============================================================================
//
// Downloads daily OHLCV history and reduces it to the close/volume series the
// signal engine consumes. The contract with callers is strict: either a
// usable chronological series or `DataSourceUnavailable` — transport errors,
// bad status codes, and unparseable payloads all collapse into the latter so
// that one dead instrument never takes a scan down.

use std::time::Duration;

use tracing::{debug, instrument, warn};

use crate::error::EngineError;
use crate::types::{PricePoint, PriceSeries};

/// Default public endpoint serving `Date,Open,High,Low,Close,Volume` CSV.
const DEFAULT_BASE_URL: &str = "https://stooq.com";

/// HTTP client for daily price history.
#[derive(Clone)]
pub struct HistoryClient {
    client: reqwest::Client,
    base_url: String,
}

impl HistoryClient {
    pub fn new() -> Self {
        Self::with_base_url(DEFAULT_BASE_URL)
    }

    /// Used by tests and alternate deployments to point at another host.
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .expect("failed to build reqwest client");
        Self {
            client,
            base_url: base_url.into(),
        }
    }

    /// Fetch up to `days` most recent daily bars for `symbol`.
    #[instrument(skip(self), name = "history::daily")]
    pub async fn daily(&self, symbol: &str, days: u32) -> Result<PriceSeries, EngineError> {
        let sym = symbol.trim().to_lowercase();
        if sym.is_empty() {
            return Err(EngineError::invalid("empty symbol"));
        }

        let url = format!("{}/q/d/l/?s={}.us&i=d", self.base_url, sym);

        let resp = self.client.get(&url).send().await.map_err(|e| {
            warn!(symbol = %symbol, error = %e, "history request failed");
            EngineError::unavailable(format!("history request for {symbol} failed: {e}"))
        })?;

        let status = resp.status();
        if !status.is_success() {
            warn!(symbol = %symbol, status = %status, "history endpoint returned error status");
            return Err(EngineError::unavailable(format!(
                "history endpoint returned {status} for {symbol}"
            )));
        }

        let body = resp.text().await.map_err(|e| {
            EngineError::unavailable(format!("history body for {symbol} unreadable: {e}"))
        })?;

        let mut points = parse_daily_csv(&body)
            .map_err(|e| EngineError::unavailable(format!("history for {symbol}: {e}")))?;

        let start = points.len().saturating_sub(days as usize);
        points.drain(..start);

        debug!(symbol = %symbol, bars = points.len(), "history fetched");
        Ok(PriceSeries::new(symbol.trim().to_uppercase(), points))
    }
}

impl Default for HistoryClient {
    fn default() -> Self {
        Self::new()
    }
}

/// Parse `Date,Open,High,Low,Close,Volume` CSV into chronological points.
///
/// Rows with unparseable dates or closes are errors; a missing volume column
/// degrades to 0 (the engine falls back to return-entropy in that case).
fn parse_daily_csv(text: &str) -> Result<Vec<PricePoint>, String> {
    let mut lines = text.lines().filter(|l| !l.trim().is_empty());

    let header = lines.next().ok_or_else(|| "empty response".to_string())?;
    if !header.to_lowercase().contains("close") {
        return Err("no close column in response".to_string());
    }

    let mut points = Vec::new();
    for (i, line) in lines.enumerate() {
        let fields: Vec<&str> = line.split(',').collect();
        if fields.len() < 5 {
            return Err(format!("row {i} has {} fields", fields.len()));
        }

        let date = chrono::NaiveDate::parse_from_str(fields[0], "%Y-%m-%d")
            .map_err(|e| format!("row {i} date: {e}"))?;
        let close: f64 = fields[4]
            .trim()
            .parse()
            .map_err(|e| format!("row {i} close: {e}"))?;
        let volume: f64 = fields
            .get(5)
            .and_then(|v| v.trim().parse().ok())
            .unwrap_or(0.0);

        let at = date
            .and_hms_opt(0, 0, 0)
            .map(|dt| dt.and_utc().timestamp_millis())
            .unwrap_or(0);

        points.push(PricePoint { at, close, volume });
    }

    if points.is_empty() {
        return Err("no data rows".to_string());
    }
    points.sort_by_key(|p| p.at);
    Ok(points)
}
