// =============================================================================
// Signal Engine — Metric Pipeline and Classifier
// =============================================================================
//
// Converts one price/volume series into a `MetricSnapshot`:
//
//   1. Trap strength Z from normalized inverse rolling volatility.
//   2. Flow Sigma from binned entropy of volume (or scaled returns).
//   3. Gate = (1 - Z) * Sigma, the composite opportunity scalar.
//   4. Relative price location inside its rolling min/max band.
//   5. Phase-0 detection: Z above its threshold AND Sigma above its own
//      rolling percentile. Only phase-0 samples can classify BUY/SELL.
//   6. Rise score for ranking, bullseye confirmation for conviction.
//
// Evaluation is a pure function of the input series: no side effects, no
// state carried between calls. A series shorter than the window resolves to a
// neutral WAIT snapshot; a malformed series is an InvalidInput error.

use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::error::EngineError;
use crate::runtime_config::SignalParams;
use crate::signal::entropy::{backfill, rolling_entropy};
use crate::signal::volatility::{log_returns, trap_series};
use crate::types::{PriceSeries, Signal};

// =============================================================================
// MetricSnapshot
// =============================================================================

/// Immutable per-instrument evaluation result. Computed fresh on each call,
/// never mutated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricSnapshot {
    /// Last close of the evaluated series.
    pub price: f64,
    /// Trap strength in [0, 1]; high means the regime looks stuck.
    pub z_trap: f64,
    /// Flow entropy, >= 0.
    pub sigma: f64,
    /// Composite opportunity scalar, (1 - z_trap) * sigma, >= 0.
    pub gate: f64,
    /// Relative price location inside the rolling band, [0, 1].
    pub price_location: f64,
    /// Unbounded ranking score; never thresholded.
    pub rise_score: f64,
    /// Discrete classification.
    pub signal: Signal,
    /// True when the sample qualified as a regime-change candidate.
    pub phase_zero: bool,
    /// BUY additionally confirmed by the gate quantile filter.
    pub bullseye_buy: bool,
    /// SELL additionally confirmed by the gate quantile filter.
    pub bullseye_sell: bool,
    /// True when the series was too short and the metrics are neutral.
    pub insufficient_history: bool,
}

impl MetricSnapshot {
    /// Neutral WAIT snapshot for a series with insufficient history.
    /// Deliberately not an error: "not enough data yet" is an answer.
    pub fn neutral(price: f64) -> Self {
        Self {
            price,
            z_trap: 0.0,
            sigma: 0.0,
            gate: 0.0,
            price_location: 0.5,
            rise_score: 0.0,
            signal: Signal::Wait,
            phase_zero: false,
            bullseye_buy: false,
            bullseye_sell: false,
            insufficient_history: true,
        }
    }
}

// =============================================================================
// SignalEngine
// =============================================================================

/// Stateless evaluator; all tunables come from [`SignalParams`].
pub struct SignalEngine {
    params: SignalParams,
}

impl SignalEngine {
    pub fn new(params: SignalParams) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &SignalParams {
        &self.params
    }

    /// Evaluate one series into a [`MetricSnapshot`].
    ///
    /// Returns `Err(InvalidInput)` for a malformed series (empty, non-finite
    /// values); a merely short series yields `Ok` with a neutral snapshot.
    pub fn evaluate(&self, series: &PriceSeries) -> Result<MetricSnapshot, EngineError> {
        series.validate()?;

        let p = &self.params;
        let n = series.len();
        let price = series.last_close().unwrap_or(0.0);

        if n < p.window {
            trace!(
                ticker = %series.ticker,
                available = n,
                window = p.window,
                "insufficient history, neutral snapshot"
            );
            return Ok(MetricSnapshot::neutral(price));
        }

        let closes = series.closes();
        let volumes = series.volumes();
        let t = n - 1;

        // --- Trap strength -----------------------------------------------------
        let z_series = trap_series(&closes, p.window, p.lookback);
        let z_trap = z_series[t].unwrap_or(1.0);

        // --- Flow entropy ------------------------------------------------------
        // Volume drives the flow metric; when the feed carries no volume at
        // all, scaled returns stand in (`return_proxy_scale` is a tunable,
        // not a law).
        let has_volume = volumes.iter().any(|v| *v > 0.0);
        let flow_source: Vec<f64> = if has_volume {
            volumes
        } else {
            log_returns(&closes)
                .iter()
                .map(|r| r * p.return_proxy_scale)
                .collect()
        };
        let sigma_series = backfill(&rolling_entropy(&flow_source, p.window, p.entropy_bins));
        let sigma = sigma_series[t];

        // --- Gate --------------------------------------------------------------
        let gate = (1.0 - z_trap) * sigma;
        let gate_series: Vec<Option<f64>> = z_series
            .iter()
            .zip(sigma_series.iter())
            .map(|(z, s)| z.map(|z| (1.0 - z) * s))
            .collect();

        // --- Price location ----------------------------------------------------
        let price_location = rolling_location(&closes, p.location_window);

        // --- Phase classification ----------------------------------------------
        let pct_start = n.saturating_sub(p.sigma_percentile_window);
        let sigma_p = percentile(&sigma_series[pct_start..], p.sigma_percentile);
        let (phase_zero, signal) = classify(z_trap, sigma, sigma_p, price_location, p);

        // --- Rise score --------------------------------------------------------
        let rise_score = 0.6 * gate + 0.3 * sigma - 0.4 * z_trap;

        // --- Bullseye confirmation ---------------------------------------------
        let gate_tail: Vec<f64> = gate_series
            .iter()
            .rev()
            .take(p.bullseye_window)
            .flatten()
            .copied()
            .collect();
        let confirmed = bullseye_confirms(gate, &gate_tail, z_trap, p);
        let bullseye_buy = signal == Signal::Buy && confirmed;
        let bullseye_sell = signal == Signal::Sell && confirmed;

        debug!(
            ticker = %series.ticker,
            signal = %signal,
            z_trap = format!("{:.3}", z_trap),
            sigma = format!("{:.3}", sigma),
            gate = format!("{:.3}", gate),
            location = format!("{:.3}", price_location),
            phase_zero,
            "series evaluated"
        );

        Ok(MetricSnapshot {
            price,
            z_trap,
            sigma,
            gate,
            price_location,
            rise_score,
            signal,
            phase_zero,
            bullseye_buy,
            bullseye_sell,
            insufficient_history: false,
        })
    }
}

// =============================================================================
// Classification logic
// =============================================================================

/// Phase-0 gate and directional classification from the final-sample metrics.
///
/// A sample is a regime-change candidate only when the trap strength exceeds
/// its threshold while the flow sits above its own rolling percentile; the
/// direction then comes from where the price sits inside its recent band.
fn classify(
    z_trap: f64,
    sigma: f64,
    sigma_percentile: f64,
    location: f64,
    p: &SignalParams,
) -> (bool, Signal) {
    let phase_zero = z_trap > p.trap_threshold && sigma > sigma_percentile;
    if !phase_zero {
        return (false, Signal::Wait);
    }

    let signal = if location < p.buy_location {
        Signal::Buy
    } else if location > p.sell_location {
        Signal::Sell
    } else {
        Signal::Wait
    };
    (true, signal)
}

/// Bullseye check: the gate must reach its configured quantile within the
/// trailing gate distribution while the trap strength stays under the cap.
fn bullseye_confirms(gate: f64, gate_tail: &[f64], z_trap: f64, p: &SignalParams) -> bool {
    if gate_tail.is_empty() || z_trap > p.bullseye_trap_cap {
        return false;
    }
    gate >= percentile(gate_tail, p.bullseye_quantile)
}

/// Relative position of the last value inside the min/max band of the
/// trailing `window` values, clamped to [0, 1]; 0.5 when the band is flat.
fn rolling_location(closes: &[f64], window: usize) -> f64 {
    let Some(&last) = closes.last() else {
        return 0.5;
    };
    let start = closes.len().saturating_sub(window);
    let band = &closes[start..];
    let lo = band.iter().copied().fold(f64::INFINITY, f64::min);
    let hi = band.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let range = hi - lo;
    if range > 0.0 {
        ((last - lo) / range).clamp(0.0, 1.0)
    } else {
        0.5
    }
}

/// Linearly interpolated percentile of an (unsorted, possibly gappy) sample.
/// `q` is a fraction in [0, 1]. Undefined elements are skipped; an empty
/// sample yields 0.0.
fn percentile(values: &[impl AsOptionF64], q: f64) -> f64 {
    let mut sorted: Vec<f64> = values.iter().filter_map(|v| v.as_option()).collect();
    if sorted.is_empty() {
        return 0.0;
    }
    sorted.sort_by(f64::total_cmp);

    let rank = q.clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    if lo == hi {
        sorted[lo]
    } else {
        let frac = rank - lo as f64;
        sorted[lo] * (1.0 - frac) + sorted[hi] * frac
    }
}

/// Lets `percentile` accept both `&[f64]` and `&[Option<f64>]` samples.
trait AsOptionF64 {
    fn as_option(&self) -> Option<f64>;
}

impl AsOptionF64 for f64 {
    fn as_option(&self) -> Option<f64> {
        Some(*self)
    }
}

impl AsOptionF64 for Option<f64> {
    fn as_option(&self) -> Option<f64> {
        *self
    }
}
