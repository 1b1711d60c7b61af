// =============================================================================
// Runtime Configuration — Hot-reloadable engine settings with atomic save
// =============================================================================
//
// Central configuration hub for the Trapgate engine.  Every tunable threshold
// of the metric pipeline and the tracker lives here rather than as a constant
// in code: the quantile/threshold values are empirically chosen and subject to
// retuning without a rebuild.
//
// Persistence uses an atomic tmp + rename pattern to prevent corruption on
// crash.  All fields carry `#[serde(default)]` so that adding new fields
// never breaks loading an older config file.
//
// =============================================================================

use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::types::TradingMode;

// =============================================================================
// Default-value helpers (required by serde `default = "..."` attribute)
// =============================================================================

fn default_symbols() -> Vec<String> {
    vec![
        "AAPL".to_string(),
        "MSFT".to_string(),
        "NVDA".to_string(),
        "AMZN".to_string(),
        "GOOGL".to_string(),
        "TSLA".to_string(),
    ]
}

fn default_history_days() -> u32 {
    90
}

fn default_scan_interval_secs() -> u64 {
    300
}

fn default_bind_addr() -> String {
    "0.0.0.0:8080".to_string()
}

fn default_news_limit() -> usize {
    10
}

fn default_window() -> usize {
    14
}

fn default_lookback() -> usize {
    100
}

fn default_entropy_bins() -> usize {
    10
}

fn default_return_proxy_scale() -> f64 {
    1.5
}

fn default_trap_threshold() -> f64 {
    0.75
}

fn default_sigma_percentile() -> f64 {
    0.85
}

fn default_sigma_percentile_window() -> usize {
    200
}

fn default_location_window() -> usize {
    50
}

fn default_buy_location() -> f64 {
    0.4
}

fn default_sell_location() -> f64 {
    0.6
}

fn default_bullseye_quantile() -> f64 {
    0.85
}

fn default_bullseye_window() -> usize {
    120
}

fn default_bullseye_trap_cap() -> f64 {
    0.85
}

fn default_grid_size() -> usize {
    32
}

fn default_grid_noise() -> f64 {
    0.02
}

fn default_persistence_threshold() -> f64 {
    0.02
}

fn default_z_threshold() -> f64 {
    0.4
}

fn default_change_threshold() -> f64 {
    0.15
}

fn default_cluster_eps() -> f64 {
    2.5
}

fn default_min_samples() -> usize {
    3
}

fn default_match_radius_mult() -> f64 {
    2.0
}

fn default_max_positions() -> usize {
    12
}

fn default_max_qty_per_ticker() -> f64 {
    200.0
}

fn default_max_actions_per_run() -> usize {
    10
}

fn default_base_qty() -> f64 {
    10.0
}

// =============================================================================
// SignalParams
// =============================================================================

/// Tunable parameters for the signal-engine metric pipeline.
///
/// The percentile/threshold values carry no theoretical derivation; they are
/// tuning knobs, which is why they live in config rather than in code.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignalParams {
    /// Rolling window (samples) for returns volatility and flow entropy.
    #[serde(default = "default_window")]
    pub window: usize,

    /// Window (samples) for min/max normalization of the volatility statistic.
    #[serde(default = "default_lookback")]
    pub lookback: usize,

    /// Number of equal-width bins for the flow entropy histogram.
    #[serde(default = "default_entropy_bins")]
    pub entropy_bins: usize,

    /// Multiplier applied to returns when they stand in for missing volume.
    #[serde(default = "default_return_proxy_scale")]
    pub return_proxy_scale: f64,

    /// Trap strength above which a sample is a regime-change candidate.
    #[serde(default = "default_trap_threshold")]
    pub trap_threshold: f64,

    /// Flow must exceed its own rolling percentile at this level for phase-0.
    #[serde(default = "default_sigma_percentile")]
    pub sigma_percentile: f64,

    /// Window for the rolling flow percentile (full series when shorter).
    #[serde(default = "default_sigma_percentile_window")]
    pub sigma_percentile_window: usize,

    /// Window for the relative price location min/max.
    #[serde(default = "default_location_window")]
    pub location_window: usize,

    /// Price location below which a phase-0 sample classifies BUY.
    #[serde(default = "default_buy_location")]
    pub buy_location: f64,

    /// Price location above which a phase-0 sample classifies SELL.
    #[serde(default = "default_sell_location")]
    pub sell_location: f64,

    /// Gate quantile a signal must reach for bullseye confirmation.
    #[serde(default = "default_bullseye_quantile")]
    pub bullseye_quantile: f64,

    /// Trailing window of gate samples for the bullseye quantile.
    #[serde(default = "default_bullseye_window")]
    pub bullseye_window: usize,

    /// Maximum trap strength a bullseye signal may carry.
    #[serde(default = "default_bullseye_trap_cap")]
    pub bullseye_trap_cap: f64,
}

impl Default for SignalParams {
    fn default() -> Self {
        Self {
            window: default_window(),
            lookback: default_lookback(),
            entropy_bins: default_entropy_bins(),
            return_proxy_scale: default_return_proxy_scale(),
            trap_threshold: default_trap_threshold(),
            sigma_percentile: default_sigma_percentile(),
            sigma_percentile_window: default_sigma_percentile_window(),
            location_window: default_location_window(),
            buy_location: default_buy_location(),
            sell_location: default_sell_location(),
            bullseye_quantile: default_bullseye_quantile(),
            bullseye_window: default_bullseye_window(),
            bullseye_trap_cap: default_bullseye_trap_cap(),
        }
    }
}

// =============================================================================
// TrackerParams
// =============================================================================

/// Tunable parameters for the grid simulator, field metrics, clustering, and
/// proto-object matching.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackerParams {
    /// Side length of the square toroidal grid.
    #[serde(default = "default_grid_size")]
    pub grid_size: usize,

    /// Magnitude of the bounded per-step perturbation.
    #[serde(default = "default_grid_noise")]
    pub grid_noise: f64,

    /// Per-cell change below which the persistence counter increments.
    #[serde(default = "default_persistence_threshold")]
    pub persistence_threshold: f64,

    /// Trap-strength floor for a reaction point.
    #[serde(default = "default_z_threshold")]
    pub z_threshold: f64,

    /// Frame-to-frame change floor for a reaction point.
    #[serde(default = "default_change_threshold")]
    pub change_threshold: f64,

    /// Spatial radius for density clustering.
    #[serde(default = "default_cluster_eps")]
    pub cluster_eps: f64,

    /// Density floor: minimum neighbours within eps to seed/grow a cluster.
    #[serde(default = "default_min_samples")]
    pub min_samples: usize,

    /// Match acceptance distance as a multiple of `cluster_eps`.
    #[serde(default = "default_match_radius_mult")]
    pub match_radius_mult: f64,
}

impl TrackerParams {
    /// Centroid distance at or below which a frame-to-frame match is accepted.
    pub fn dist_thresh(&self) -> f64 {
        self.cluster_eps * self.match_radius_mult
    }
}

impl Default for TrackerParams {
    fn default() -> Self {
        Self {
            grid_size: default_grid_size(),
            grid_noise: default_grid_noise(),
            persistence_threshold: default_persistence_threshold(),
            z_threshold: default_z_threshold(),
            change_threshold: default_change_threshold(),
            cluster_eps: default_cluster_eps(),
            min_samples: default_min_samples(),
            match_radius_mult: default_match_radius_mult(),
        }
    }
}

// =============================================================================
// RiskLimits
// =============================================================================

/// Paper-trading guard rails for the plan executor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskLimits {
    /// Maximum number of open positions (new BUYs beyond this are skipped).
    #[serde(default = "default_max_positions")]
    pub max_positions: usize,

    /// Maximum quantity held per ticker.
    #[serde(default = "default_max_qty_per_ticker")]
    pub max_qty_per_ticker: f64,

    /// Maximum trade actions applied per executor run.
    #[serde(default = "default_max_actions_per_run")]
    pub max_actions_per_run: usize,

    /// Base order quantity before coupling/news/gate multipliers.
    #[serde(default = "default_base_qty")]
    pub base_qty: f64,
}

impl Default for RiskLimits {
    fn default() -> Self {
        Self {
            max_positions: default_max_positions(),
            max_qty_per_ticker: default_max_qty_per_ticker(),
            max_actions_per_run: default_max_actions_per_run(),
            base_qty: default_base_qty(),
        }
    }
}

// =============================================================================
// RuntimeConfig
// =============================================================================

/// Top-level runtime configuration for the Trapgate engine.
///
/// Every field has a serde default so that older JSON files missing new fields
/// will still deserialise correctly.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuntimeConfig {
    /// Current engine mode: Live (scan loop runs), Paused, or Killed.
    #[serde(default)]
    pub trading_mode: TradingMode,

    /// Instruments covered by the market scan.
    #[serde(default = "default_symbols")]
    pub symbols: Vec<String>,

    /// Days of daily history requested from the provider per scan.
    #[serde(default = "default_history_days")]
    pub history_days: u32,

    /// Seconds between automatic scans while Live.
    #[serde(default = "default_scan_interval_secs")]
    pub scan_interval_secs: u64,

    /// Listen address for the REST API.
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    /// Maximum headlines kept per news fetch.
    #[serde(default = "default_news_limit")]
    pub news_limit: usize,

    /// Metric pipeline thresholds.
    #[serde(default)]
    pub signal: SignalParams,

    /// Tracker simulation and matching thresholds.
    #[serde(default)]
    pub tracker: TrackerParams,

    /// Paper-trading limits.
    #[serde(default)]
    pub risk: RiskLimits,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            trading_mode: TradingMode::Paused,
            symbols: default_symbols(),
            history_days: default_history_days(),
            scan_interval_secs: default_scan_interval_secs(),
            bind_addr: default_bind_addr(),
            news_limit: default_news_limit(),
            signal: SignalParams::default(),
            tracker: TrackerParams::default(),
            risk: RiskLimits::default(),
        }
    }
}

impl RuntimeConfig {
    /// Load configuration from a JSON file at `path`.
    ///
    /// If the file does not exist, returns an error so the caller can fall
    /// back to defaults with a warning.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read runtime config from {}", path.display()))?;

        let config: Self = serde_json::from_str(&content)
            .with_context(|| format!("failed to parse runtime config from {}", path.display()))?;

        info!(
            path = %path.display(),
            symbols = ?config.symbols,
            trading_mode = %config.trading_mode,
            "runtime config loaded"
        );

        Ok(config)
    }

    /// Persist the current configuration to `path` using an atomic write
    /// (write to `.tmp`, then rename).
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();

        let content = serde_json::to_string_pretty(self)
            .context("failed to serialise runtime config to JSON")?;

        let tmp_path = path.with_extension("json.tmp");

        std::fs::write(&tmp_path, &content)
            .with_context(|| format!("failed to write tmp config to {}", tmp_path.display()))?;

        std::fs::rename(&tmp_path, path)
            .with_context(|| format!("failed to rename tmp config to {}", path.display()))?;

        info!(path = %path.display(), "runtime config saved (atomic)");
        Ok(())
    }
}

// =============================================================================
// Tests
// =============================================================================
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_has_expected_values() {
        let cfg = RuntimeConfig::default();
        assert_eq!(cfg.trading_mode, TradingMode::Paused);
        assert_eq!(cfg.symbols.len(), 6);
        assert_eq!(cfg.symbols[0], "AAPL");
        assert_eq!(cfg.signal.window, 14);
        assert_eq!(cfg.signal.lookback, 100);
        assert!((cfg.signal.trap_threshold - 0.75).abs() < f64::EPSILON);
        assert!((cfg.signal.bullseye_trap_cap - 0.85).abs() < f64::EPSILON);
        assert_eq!(cfg.tracker.grid_size, 32);
        assert!((cfg.tracker.cluster_eps - 2.5).abs() < f64::EPSILON);
        assert_eq!(cfg.risk.max_positions, 12);
        assert!((cfg.risk.max_qty_per_ticker - 200.0).abs() < f64::EPSILON);
    }

    #[test]
    fn deserialise_empty_json_uses_defaults() {
        let cfg: RuntimeConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(cfg.trading_mode, TradingMode::Paused);
        assert_eq!(cfg.signal.entropy_bins, 10);
        assert_eq!(cfg.tracker.min_samples, 3);
        assert_eq!(cfg.risk.max_actions_per_run, 10);
    }

    #[test]
    fn deserialise_partial_json_fills_defaults() {
        let json = r#"{ "trading_mode": "Live", "symbols": ["IBM"], "signal": { "window": 20 } }"#;
        let cfg: RuntimeConfig = serde_json::from_str(json).unwrap();
        assert_eq!(cfg.trading_mode, TradingMode::Live);
        assert_eq!(cfg.symbols, vec!["IBM"]);
        assert_eq!(cfg.signal.window, 20);
        // Untouched siblings keep their defaults.
        assert_eq!(cfg.signal.lookback, 100);
        assert!((cfg.signal.return_proxy_scale - 1.5).abs() < f64::EPSILON);
    }

    #[test]
    fn roundtrip_serialisation() {
        let cfg = RuntimeConfig::default();
        let json = serde_json::to_string(&cfg).unwrap();
        let cfg2: RuntimeConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(cfg.symbols, cfg2.symbols);
        assert_eq!(cfg.signal.window, cfg2.signal.window);
        assert_eq!(cfg.tracker.grid_size, cfg2.tracker.grid_size);
    }

    #[test]
    fn dist_thresh_is_eps_multiple() {
        let p = TrackerParams::default();
        assert!((p.dist_thresh() - 5.0).abs() < 1e-12);
    }
}
