// =============================================================================
// Grid Simulator — Toroidal Diffusion Field with Bounded Noise
// =============================================================================
//
// A square grid of cells in [0, 1]. Each step applies a 3x3 smoothing kernel
// with wrap-around (toroidal) boundaries, adds a bounded uniform perturbation,
// and clamps back into [0, 1]. The tracker downstream only requires a
// same-shape successor field per step.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// 3x3 diffusion kernel: heavy centre, light corners.
const KERNEL: [[f64; 3]; 3] = [
    [0.05, 0.10, 0.05],
    [0.10, 0.40, 0.10],
    [0.05, 0.10, 0.05],
];

/// Square field of `[0, 1]` cells, row-major.
#[derive(Debug, Clone)]
pub struct Grid {
    size: usize,
    cells: Vec<f64>,
}

impl Grid {
    pub fn from_cells(size: usize, cells: Vec<f64>) -> Self {
        assert_eq!(cells.len(), size * size, "cell count must match size^2");
        Self { size, cells }
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn cells(&self) -> &[f64] {
        &self.cells
    }

    pub fn get(&self, row: usize, col: usize) -> f64 {
        self.cells[row * self.size + col]
    }

    /// Toroidal read: indices wrap modulo the grid size.
    fn get_wrapped(&self, row: isize, col: isize) -> f64 {
        let n = self.size as isize;
        let r = row.rem_euclid(n) as usize;
        let c = col.rem_euclid(n) as usize;
        self.cells[r * self.size + c]
    }

    pub fn mean(&self) -> f64 {
        if self.cells.is_empty() {
            return 0.0;
        }
        self.cells.iter().sum::<f64>() / self.cells.len() as f64
    }
}

/// Owns the evolving grid plus its noise source.
pub struct GridSim {
    grid: Grid,
    noise: f64,
    rng: StdRng,
}

impl GridSim {
    /// Seeded construction so that simulations are reproducible.
    pub fn new(size: usize, noise: f64, seed: u64) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        let cells = (0..size * size).map(|_| rng.gen_range(0.0..1.0)).collect();
        Self {
            grid: Grid::from_cells(size, cells),
            noise,
            rng,
        }
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    /// Advance one step: kernel diffusion with wrap-around, then a bounded
    /// uniform perturbation in [-noise, +noise], clamped to [0, 1].
    pub fn step(&mut self) -> &Grid {
        let n = self.grid.size;
        let mut next = vec![0.0; n * n];

        for row in 0..n {
            for col in 0..n {
                let mut acc = 0.0;
                for (dr, kernel_row) in KERNEL.iter().enumerate() {
                    for (dc, k) in kernel_row.iter().enumerate() {
                        acc += k
                            * self
                                .grid
                                .get_wrapped(row as isize + dr as isize - 1, col as isize + dc as isize - 1);
                    }
                }
                let perturbed = if self.noise > 0.0 {
                    acc + self.rng.gen_range(-self.noise..=self.noise)
                } else {
                    acc
                };
                next[row * n + col] = perturbed.clamp(0.0, 1.0);
            }
        }

        self.grid = Grid::from_cells(n, next);
        &self.grid
    }
}
