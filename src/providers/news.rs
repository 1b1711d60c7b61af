// =============================================================================
// News Client — Bounded Headline Feed per Instrument
// =============================================================================
//
// Fetches a bounded list of headline/summary/publish-time records for one
// instrument from a configurable JSON endpoint:
//
//   GET {base_url}/news?symbol=AAPL
//   -> [ { "headline": "...", "summary": "...", "published_at": "..." }, ... ]
//
// Headlines only confirm conviction downstream (news counts nudge sizing);
// they never gate the pipeline, so every failure degrades to
// `DataSourceUnavailable` and an empty result is a valid answer.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};

use crate::error::EngineError;

/// One headline record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewsItem {
    pub ticker: String,
    pub headline: String,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub published_at: String,
}

/// HTTP client for the headline feed.
#[derive(Clone)]
pub struct NewsClient {
    client: reqwest::Client,
    base_url: String,
    limit: usize,
}

impl NewsClient {
    pub fn new(base_url: impl Into<String>, limit: usize) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .expect("failed to build reqwest client");
        Self {
            client,
            base_url: base_url.into(),
            limit,
        }
    }

    /// Fetch up to `limit` recent headlines for `symbol`.
    #[instrument(skip(self), name = "news::headlines")]
    pub async fn headlines(&self, symbol: &str) -> Result<Vec<NewsItem>, EngineError> {
        let sym = symbol.trim().to_uppercase();
        if sym.is_empty() {
            return Err(EngineError::invalid("empty symbol"));
        }

        let url = format!("{}/news?symbol={}", self.base_url, sym);

        let resp = self.client.get(&url).send().await.map_err(|e| {
            warn!(symbol = %sym, error = %e, "news request failed");
            EngineError::unavailable(format!("news request for {sym} failed: {e}"))
        })?;

        let status = resp.status();
        if !status.is_success() {
            return Err(EngineError::unavailable(format!(
                "news endpoint returned {status} for {sym}"
            )));
        }

        let body: serde_json::Value = resp.json().await.map_err(|e| {
            EngineError::unavailable(format!("news body for {sym} unparseable: {e}"))
        })?;

        let items = parse_headlines(&sym, &body, self.limit);
        debug!(symbol = %sym, count = items.len(), "headlines fetched");
        Ok(items)
    }
}

/// Extract headline records from the feed payload, dropping malformed rows.
fn parse_headlines(ticker: &str, body: &serde_json::Value, limit: usize) -> Vec<NewsItem> {
    let Some(rows) = body.as_array() else {
        return Vec::new();
    };

    rows.iter()
        .filter_map(|row| {
            let headline = row["headline"].as_str()?.trim();
            if headline.is_empty() {
                return None;
            }
            Some(NewsItem {
                ticker: ticker.to_string(),
                headline: headline.to_string(),
                summary: row["summary"].as_str().unwrap_or_default().to_string(),
                published_at: row["published_at"].as_str().unwrap_or_default().to_string(),
            })
        })
        .take(limit)
        .collect()
}
