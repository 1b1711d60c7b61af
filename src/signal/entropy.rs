// =============================================================================
// Flow ("Sigma") — Binned Shannon Entropy of Recent Volume
// =============================================================================
//
// Measures informational activity by bucketing the rolling window of volumes
// (or scaled returns, when no volume is available) into equal-width bins and
// computing the Shannon entropy of the empirical distribution:
//
//   H = -sum(p_i * log2(p_i))
//
// A window with zero spread lands every sample in one bin and yields H = 0.
// Windows with insufficient samples have no defined entropy; those gaps are
// backfilled from the nearest subsequent valid value so that downstream
// consumers always see a fully populated series.

/// Shannon entropy (base 2) of `values` bucketed into `bins` equal-width bins.
///
/// Returns 0.0 for a degenerate window (zero spread or fewer than 2 samples).
pub fn binned_entropy(values: &[f64], bins: usize) -> f64 {
    if values.len() < 2 || bins == 0 {
        return 0.0;
    }

    let mut lo = f64::INFINITY;
    let mut hi = f64::NEG_INFINITY;
    for v in values {
        lo = lo.min(*v);
        hi = hi.max(*v);
    }
    let width = (hi - lo) / bins as f64;
    if width <= 0.0 {
        return 0.0;
    }

    let mut counts = vec![0usize; bins];
    for v in values {
        let idx = (((v - lo) / width) as usize).min(bins - 1);
        counts[idx] += 1;
    }

    let n = values.len() as f64;
    counts
        .iter()
        .filter(|&&c| c > 0)
        .map(|&c| {
            let p = c as f64 / n;
            -p * p.log2()
        })
        .sum()
}

/// Rolling binned entropy over trailing windows of `window` elements.
/// `None` until a full window is available.
pub fn rolling_entropy(values: &[f64], window: usize, bins: usize) -> Vec<Option<f64>> {
    let mut out = vec![None; values.len()];
    if window == 0 {
        return out;
    }
    for i in (window.saturating_sub(1))..values.len() {
        out[i] = Some(binned_entropy(&values[i + 1 - window..=i], bins));
    }
    out
}

/// Replace every undefined element with the nearest subsequent defined value.
/// A series with no defined value at all backfills to 0.0 throughout.
pub fn backfill(series: &[Option<f64>]) -> Vec<f64> {
    let mut out = vec![0.0; series.len()];
    let mut next = 0.0;
    for i in (0..series.len()).rev() {
        if let Some(v) = series[i] {
            next = v;
        }
        out[i] = next;
    }
    out
}
