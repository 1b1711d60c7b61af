// =============================================================================
// Trap Strength — Normalized Inverse Rolling Volatility
// =============================================================================
//
// The trap metric reads recent volatility *relative to its own recent range*:
// a market whose rolling return volatility sits at the bottom of the range it
// has occupied over the lookback is "stuck" (trap strength near 1); one at the
// top of its range is "free" (trap strength near 0).
//
//   vol_t  = sample std of log returns over `window`
//   norm_t = (vol_t - min_lookback) / (max_lookback - min_lookback)
//   Z_t    = clamp(1 - norm_t, 0, 1)
//
// A zero range is a defined case, not an error: norm resolves to 0 and the
// trap strength to 1.

/// Log return at each step. The first element is 0, and any non-finite value
/// (zero or missing price) is sanitized to 0.
pub fn log_returns(closes: &[f64]) -> Vec<f64> {
    let mut out = vec![0.0; closes.len()];
    for i in 1..closes.len() {
        let r = (closes[i] / closes[i - 1]).ln();
        out[i] = if r.is_finite() { r } else { 0.0 };
    }
    out
}

/// Rolling sample standard deviation over trailing windows of `window`
/// elements. `None` until a full window is available (and for `window < 2`,
/// where a sample deviation is undefined).
pub fn rolling_std(values: &[f64], window: usize) -> Vec<Option<f64>> {
    let mut out = vec![None; values.len()];
    if window < 2 {
        return out;
    }
    for i in (window - 1)..values.len() {
        let slice = &values[i + 1 - window..=i];
        let mean = slice.iter().sum::<f64>() / window as f64;
        let var = slice.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / (window - 1) as f64;
        out[i] = Some(var.sqrt());
    }
    out
}

/// Trap-strength series: the rolling volatility of `closes` normalized against
/// its own rolling min/max over `lookback` samples, inverted and clamped to
/// `[0, 1]`. `None` wherever the volatility statistic is not yet defined.
pub fn trap_series(closes: &[f64], window: usize, lookback: usize) -> Vec<Option<f64>> {
    let returns = log_returns(closes);
    let vol = rolling_std(&returns, window);

    let mut out = vec![None; closes.len()];
    for i in 0..vol.len() {
        let Some(v) = vol[i] else { continue };

        let start = i.saturating_sub(lookback.saturating_sub(1));
        let mut lo = f64::INFINITY;
        let mut hi = f64::NEG_INFINITY;
        for s in vol[start..=i].iter().flatten() {
            lo = lo.min(*s);
            hi = hi.max(*s);
        }

        let range = hi - lo;
        let norm = if range > 0.0 {
            ((v - lo) / range).clamp(0.0, 1.0)
        } else {
            0.0
        };
        out[i] = Some((1.0 - norm).clamp(0.0, 1.0));
    }
    out
}
