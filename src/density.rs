//! Fixed-point density grid built by Gaussian splatting
//!
//! Each particle deposits a Gaussian footprint into an R³ grid of `u32`
//! cells (value ×1000). Deposits use atomic adds so any number of particles
//! may write overlapping cells concurrently; the sum is order-independent.

use std::sync::atomic::{AtomicU32, Ordering};

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::particle::Particle;

/// Default grid resolution per axis
pub const DEFAULT_GRID_RESOLUTION: u32 = 64;

/// Default half-width of the world cube the grid covers
pub const DEFAULT_GRID_HALF_EXTENT: f32 = 5.0;

/// Default splat radius in cells
pub const DEFAULT_SPLAT_RADIUS: f32 = 2.0;

/// Default per-particle splat strength
pub const DEFAULT_SPLAT_STRENGTH: f32 = 1.5;

/// Default speed gain: `speed_factor = 1 + speed * gain`
pub const DEFAULT_SPEED_GAIN: f32 = 0.3;

/// Fixed-point scale for stored densities
pub const FIXED_POINT_SCALE: f32 = 1000.0;

/// Density grid parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DensityParams {
    pub resolution: u32,
    pub half_extent: f32,
    pub splat_radius: f32,
    pub splat_strength: f32,
    pub speed_gain: f32,
}

impl Default for DensityParams {
    fn default() -> Self {
        Self {
            resolution: DEFAULT_GRID_RESOLUTION,
            half_extent: DEFAULT_GRID_HALF_EXTENT,
            splat_radius: DEFAULT_SPLAT_RADIUS,
            splat_strength: DEFAULT_SPLAT_STRENGTH,
            speed_gain: DEFAULT_SPEED_GAIN,
        }
    }
}

impl DensityParams {
    /// World-space edge length of one cell
    pub fn cell_size(&self) -> f32 {
        2.0 * self.half_extent / self.resolution as f32
    }

    /// Continuous grid coordinates of a world position (cell `i` spans `[i, i+1)`)
    pub fn world_to_grid(&self, p: [f32; 3]) -> [f32; 3] {
        let inv = 1.0 / self.cell_size();
        [
            (p[0] + self.half_extent) * inv,
            (p[1] + self.half_extent) * inv,
            (p[2] + self.half_extent) * inv,
        ]
    }

    /// World position of a cell centre
    pub fn cell_center(&self, cell: [u32; 3]) -> [f32; 3] {
        let size = self.cell_size();
        [
            (cell[0] as f32 + 0.5) * size - self.half_extent,
            (cell[1] as f32 + 0.5) * size - self.half_extent,
            (cell[2] as f32 + 0.5) * size - self.half_extent,
        ]
    }
}

/// Fixed-point contribution of one particle to one cell, or 0 beyond the radius
pub fn splat_contribution(params: &DensityParams, dist_sq: f32, speed: f32) -> u32 {
    let radius = params.splat_radius;
    if dist_sq > radius * radius {
        return 0;
    }
    let sigma = radius * 0.5;
    let weight = (-dist_sq / (2.0 * sigma * sigma)).exp();
    let speed_factor = 1.0 + speed * params.speed_gain;
    let value = weight * params.splat_strength * speed_factor * FIXED_POINT_SCALE;
    // Truncate toward zero, never negative
    value.max(0.0) as u32
}

/// R³ grid of atomically accumulated fixed-point densities
#[derive(Debug)]
pub struct DensityGrid {
    params: DensityParams,
    cells: Vec<AtomicU32>,
}

impl DensityGrid {
    pub fn new(params: DensityParams) -> Self {
        let r = params.resolution as usize;
        let cells = (0..r * r * r).map(|_| AtomicU32::new(0)).collect();
        Self { params, cells }
    }

    pub fn params(&self) -> &DensityParams {
        &self.params
    }

    pub fn resolution(&self) -> u32 {
        self.params.resolution
    }

    fn index(&self, x: u32, y: u32, z: u32) -> usize {
        let r = self.params.resolution as usize;
        x as usize + r * (y as usize + r * z as usize)
    }

    /// Zero every cell
    pub fn clear(&mut self) {
        for cell in &mut self.cells {
            *cell.get_mut() = 0;
        }
    }

    /// Deposit one particle's Gaussian footprint
    pub fn splat_particle(&self, position: [f32; 3], speed: f32) {
        let params = &self.params;
        let res = params.resolution as i64;
        let g = params.world_to_grid(position);
        let base = [
            g[0].floor() as i64,
            g[1].floor() as i64,
            g[2].floor() as i64,
        ];
        let reach = params.splat_radius.ceil() as i64;

        for dz in -reach..=reach {
            let z = base[2] + dz;
            if z < 0 || z >= res {
                continue;
            }
            for dy in -reach..=reach {
                let y = base[1] + dy;
                if y < 0 || y >= res {
                    continue;
                }
                for dx in -reach..=reach {
                    let x = base[0] + dx;
                    if x < 0 || x >= res {
                        continue;
                    }
                    let ox = x as f32 + 0.5 - g[0];
                    let oy = y as f32 + 0.5 - g[1];
                    let oz = z as f32 + 0.5 - g[2];
                    let value = splat_contribution(params, ox * ox + oy * oy + oz * oz, speed);
                    if value > 0 {
                        let idx = self.index(x as u32, y as u32, z as u32);
                        self.cells[idx].fetch_add(value, Ordering::Relaxed);
                    }
                }
            }
        }
    }

    /// Clear the grid, then splat every particle in parallel
    pub fn rebuild(&mut self, particles: &[Particle]) {
        self.clear();
        let grid = &*self;
        particles
            .par_iter()
            .for_each(|p| grid.splat_particle(p.position, p.speed));
    }

    /// Raw fixed-point value of a cell
    pub fn cell(&self, x: u32, y: u32, z: u32) -> u32 {
        self.cells[self.index(x, y, z)].load(Ordering::Relaxed)
    }

    /// Density of a cell in real units
    pub fn density(&self, x: u32, y: u32, z: u32) -> f32 {
        self.cell(x, y, z) as f32 / FIXED_POINT_SCALE
    }

    /// Sum of all raw cell values
    pub fn total(&self) -> u64 {
        self.cells
            .iter()
            .map(|c| c.load(Ordering::Relaxed) as u64)
            .sum()
    }

    /// Copy of the raw cells, x-fastest, as uploaded to the GPU
    pub fn snapshot(&self) -> Vec<u32> {
        self.cells
            .iter()
            .map(|c| c.load(Ordering::Relaxed))
            .collect()
    }

    /// Trilinear density sample at a world position, clamped at the grid edges
    pub fn sample(&self, world: [f32; 3]) -> f32 {
        if self.params.resolution == 0 {
            return 0.0;
        }
        let max = (self.params.resolution - 1) as f32;
        let g = self.params.world_to_grid(world);
        // Shift so integer coordinates sit on cell centres
        let c = [
            (g[0] - 0.5).clamp(0.0, max),
            (g[1] - 0.5).clamp(0.0, max),
            (g[2] - 0.5).clamp(0.0, max),
        ];
        let i0 = [
            c[0].floor() as u32,
            c[1].floor() as u32,
            c[2].floor() as u32,
        ];
        let last = self.params.resolution - 1;
        let i1 = [
            (i0[0] + 1).min(last),
            (i0[1] + 1).min(last),
            (i0[2] + 1).min(last),
        ];
        let f = [
            c[0] - i0[0] as f32,
            c[1] - i0[1] as f32,
            c[2] - i0[2] as f32,
        ];

        let lerp = |a: f32, b: f32, t: f32| a + (b - a) * t;
        let d = |x: u32, y: u32, z: u32| self.density(x, y, z);

        let x00 = lerp(d(i0[0], i0[1], i0[2]), d(i1[0], i0[1], i0[2]), f[0]);
        let x10 = lerp(d(i0[0], i1[1], i0[2]), d(i1[0], i1[1], i0[2]), f[0]);
        let x01 = lerp(d(i0[0], i0[1], i1[2]), d(i1[0], i0[1], i1[2]), f[0]);
        let x11 = lerp(d(i0[0], i1[1], i1[2]), d(i1[0], i1[1], i1[2]), f[0]);
        let y0 = lerp(x00, x10, f[1]);
        let y1 = lerp(x01, x11, f[1]);
        lerp(y0, y1, f[2])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::particle::crystal;

    fn small_params() -> DensityParams {
        DensityParams {
            resolution: 16,
            ..Default::default()
        }
    }

    #[test]
    fn cell_center_round_trips_to_grid() {
        let params = small_params();
        let g = params.world_to_grid(params.cell_center([3, 7, 11]));
        assert!((g[0] - 3.5).abs() < 1e-4);
        assert!((g[1] - 7.5).abs() < 1e-4);
        assert!((g[2] - 11.5).abs() < 1e-4);
    }

    #[test]
    fn splat_at_cell_center_stays_within_radius() {
        let params = small_params();
        let mut grid = DensityGrid::new(params.clone());
        grid.clear();
        let centre = [8u32, 8, 8];
        grid.splat_particle(params.cell_center(centre), 0.0);

        let radius = params.splat_radius;
        let mut inside = 0u64;
        for z in 0..16 {
            for y in 0..16 {
                for x in 0..16 {
                    let d = [
                        x as f32 - centre[0] as f32,
                        y as f32 - centre[1] as f32,
                        z as f32 - centre[2] as f32,
                    ];
                    let dist = (d[0] * d[0] + d[1] * d[1] + d[2] * d[2]).sqrt();
                    let v = grid.cell(x, y, z);
                    if dist > radius + 1e-4 {
                        assert_eq!(v, 0, "cell at distance {} received {}", dist, v);
                    } else {
                        inside += v as u64;
                    }
                }
            }
        }
        assert_eq!(inside, grid.total());
        // Peak is the full strength at zero distance
        assert_eq!(grid.cell(8, 8, 8), 1500);
    }

    #[test]
    fn speed_increases_contribution() {
        let params = DensityParams::default();
        let slow = splat_contribution(&params, 0.0, 0.0);
        let fast = splat_contribution(&params, 0.0, 8.0);
        assert_eq!(slow, 1500);
        assert_eq!(fast, (1.5f32 * (1.0 + 8.0 * 0.3) * 1000.0) as u32);
        assert_eq!(splat_contribution(&params, 4.01, 0.0), 0);
    }

    #[test]
    fn particles_outside_grid_are_skipped() {
        let mut grid = DensityGrid::new(small_params());
        grid.clear();
        grid.splat_particle([100.0, 0.0, 0.0], 1.0);
        assert_eq!(grid.total(), 0);

        // Partially inside: only in-bounds cells receive density
        grid.splat_particle([-4.99, -4.99, -4.99], 0.0);
        assert!(grid.total() > 0);
    }

    #[test]
    fn rebuild_clears_previous_frame() {
        let mut grid = DensityGrid::new(small_params());
        let particles = crystal(16);
        grid.rebuild(&particles);
        let first = grid.total();
        assert!(first > 0);

        grid.rebuild(&particles);
        assert_eq!(grid.total(), first);

        grid.rebuild(&[]);
        assert_eq!(grid.total(), 0);
    }

    #[test]
    fn parallel_rebuild_matches_serial_splat() {
        let params = small_params();
        let particles = crystal(128);

        let mut parallel = DensityGrid::new(params.clone());
        parallel.rebuild(&particles);

        let mut serial = DensityGrid::new(params);
        serial.clear();
        for p in &particles {
            serial.splat_particle(p.position, p.speed);
        }

        assert_eq!(parallel.snapshot(), serial.snapshot());
    }

    #[test]
    fn trilinear_sample_matches_cells_at_centres() {
        let params = small_params();
        let mut grid = DensityGrid::new(params.clone());
        grid.clear();
        grid.splat_particle(params.cell_center([5, 5, 5]), 0.0);

        let at_centre = grid.sample(params.cell_center([5, 5, 5]));
        assert!((at_centre - 1.5).abs() < 1e-4);

        let neighbour = grid.sample(params.cell_center([6, 5, 5]));
        assert!((neighbour - grid.density(6, 5, 5)).abs() < 1e-4);

        // Halfway between two centres is the average
        let a = params.cell_center([5, 5, 5]);
        let b = params.cell_center([6, 5, 5]);
        let half = grid.sample([(a[0] + b[0]) * 0.5, a[1], a[2]]);
        let expected = (grid.density(5, 5, 5) + grid.density(6, 5, 5)) * 0.5;
        assert!((half - expected).abs() < 1e-3);
    }

    #[test]
    fn sample_is_edge_clamped() {
        let grid = DensityGrid::new(small_params());
        assert_eq!(grid.sample([-50.0, 0.0, 50.0]), 0.0);
    }

    #[test]
    fn empty_grid_samples_zero() {
        let grid = DensityGrid::new(DensityParams {
            resolution: 0,
            ..Default::default()
        });
        assert_eq!(grid.total(), 0);
        assert_eq!(grid.sample([0.0, 0.0, 0.0]), 0.0);
    }
}
