// =============================================================================
// Field Metrics — Trap Strength, Change, Persistence, Coherence
// =============================================================================
//
// Per-cell diagnostics over the simulated grid:
//
//   persistence — consecutive steps a cell has stayed (nearly) unchanged
//   Z           — trap strength: crowding (|cell - field mean|) plus
//                 normalized persistence, clamped to [0, 1]
//   Sigma       — frame-to-frame absolute change
//   coherence   — -1 decohered (low Z, high change), +1 coherent (high Z,
//                 low change), 0 otherwise
//
// A reaction point is a coordinate where both Z and Sigma exceed their
// configured thresholds; the set is ephemeral and recomputed every frame.

use crate::tracker::grid::Grid;

/// Per-cell counter of consecutive near-unchanged steps.
#[derive(Debug, Clone)]
pub struct PersistenceMap {
    size: usize,
    counts: Vec<f64>,
}

impl PersistenceMap {
    pub fn new(size: usize) -> Self {
        Self {
            size,
            counts: vec![0.0; size * size],
        }
    }

    pub fn counts(&self) -> &[f64] {
        &self.counts
    }

    /// Increment cells whose change stayed under `threshold`, reset the rest.
    pub fn update(&mut self, grid: &Grid, prev: &Grid, threshold: f64) {
        debug_assert_eq!(grid.size(), self.size);
        for (i, count) in self.counts.iter_mut().enumerate() {
            let delta = (grid.cells()[i] - prev.cells()[i]).abs();
            if delta < threshold {
                *count += 1.0;
            } else {
                *count = 0.0;
            }
        }
    }

    pub fn max(&self) -> f64 {
        self.counts.iter().copied().fold(0.0, f64::max)
    }
}

/// Trap-strength field: crowding plus normalized persistence, clamped.
pub fn trap_field(grid: &Grid, persistence: &PersistenceMap) -> Vec<f64> {
    let mean = grid.mean();
    let pers_max = persistence.max() + 1e-6;
    grid.cells()
        .iter()
        .zip(persistence.counts().iter())
        .map(|(c, p)| ((c - mean).abs() + p / pers_max).clamp(0.0, 1.0))
        .collect()
}

/// Frame-to-frame absolute change field.
pub fn change_field(grid: &Grid, prev: &Grid) -> Vec<f64> {
    grid.cells()
        .iter()
        .zip(prev.cells().iter())
        .map(|(a, b)| (a - b).abs())
        .collect()
}

/// Coordinates where both trap strength and change exceed their thresholds.
pub fn reaction_points(
    z: &[f64],
    sigma: &[f64],
    size: usize,
    z_threshold: f64,
    change_threshold: f64,
) -> Vec<(usize, usize)> {
    let mut out = Vec::new();
    for row in 0..size {
        for col in 0..size {
            let i = row * size + col;
            if z[i] > z_threshold && sigma[i] > change_threshold {
                out.push((row, col));
            }
        }
    }
    out
}

/// Per-cell coherence label: -1 decohered, +1 coherent, 0 neutral.
pub fn coherence_field(z: &[f64], sigma: &[f64]) -> Vec<i8> {
    z.iter()
        .zip(sigma.iter())
        .map(|(&z, &s)| {
            if z < 0.3 && s > 0.2 {
                -1
            } else if z > 0.5 && s < 0.1 {
                1
            } else {
                0
            }
        })
        .collect()
}
