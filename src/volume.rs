//! CPU reference for the volumetric raymarch
//!
//! Mirrors the `RAYMARCH` fragment shader step for step so the GPU output can
//! be checked against it, and so the volume can be rendered headless without
//! an adapter.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::density::DensityGrid;
use crate::math::{self, Mat4, add, mul_vec4, scale};
use crate::palette::{self, background, blackbody_lut, sample_lut, vignette};
use crate::renderer::CameraFrame;

/// Default number of fixed march steps
pub const DEFAULT_STEPS: u32 = 96;

/// Default Beer-Lambert absorption coefficient
pub const DEFAULT_ABSORPTION: f32 = 1.8;

/// Densities at or below this are treated as empty space
pub const DEFAULT_DENSITY_THRESHOLD: f32 = 0.01;

/// Accumulated alpha at which marching stops
pub const DEFAULT_EARLY_EXIT_ALPHA: f32 = 0.97;

/// Margin added to the grid bounds before intersecting
pub const DEFAULT_AABB_MARGIN: f32 = 0.05;

/// Density that maps to the top of the blackbody table
pub const DEFAULT_COLOUR_SCALE: f32 = 6.0;

/// Extra emission per unit density
pub const DEFAULT_EMISSION_BOOST: f32 = 0.15;

/// Raymarch settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VolumeParams {
    pub steps: u32,
    pub absorption: f32,
    pub density_threshold: f32,
    pub early_exit_alpha: f32,
    pub aabb_margin: f32,
    pub colour_scale: f32,
    pub emission_boost: f32,
}

impl Default for VolumeParams {
    fn default() -> Self {
        Self {
            steps: DEFAULT_STEPS,
            absorption: DEFAULT_ABSORPTION,
            density_threshold: DEFAULT_DENSITY_THRESHOLD,
            early_exit_alpha: DEFAULT_EARLY_EXIT_ALPHA,
            aabb_margin: DEFAULT_AABB_MARGIN,
            colour_scale: DEFAULT_COLOUR_SCALE,
            emission_boost: DEFAULT_EMISSION_BOOST,
        }
    }
}

/// Pixel centre to UV in `[0, 1]`, origin top-left
pub fn pixel_uv(x: u32, y: u32, width: u32, height: u32) -> [f32; 2] {
    [
        (x as f32 + 0.5) / width as f32,
        (y as f32 + 0.5) / height as f32,
    ]
}

/// World-space ray direction through a UV, from inverse projection and view
pub fn ray_direction(inv_proj: &Mat4, inv_view: &Mat4, uv: [f32; 2]) -> [f32; 3] {
    let ndc = [uv[0] * 2.0 - 1.0, 1.0 - uv[1] * 2.0];
    let view = mul_vec4(inv_proj, [ndc[0], ndc[1], -1.0, 1.0]);
    let w = if view[3].abs() > math::EPSILON {
        view[3]
    } else {
        1.0
    };
    let dir_view = [view[0] / w, view[1] / w, view[2] / w];
    let world = mul_vec4(inv_view, [dir_view[0], dir_view[1], dir_view[2], 0.0]);
    math::normalize([world[0], world[1], world[2]])
}

/// Slab intersection with the cube `[-half, half]³`.
///
/// Returns `(t_near, t_far)`, or `None` when the ray misses.
pub fn intersect_aabb(origin: [f32; 3], dir: [f32; 3], half: f32) -> Option<(f32, f32)> {
    let mut t_near = f32::NEG_INFINITY;
    let mut t_far = f32::INFINITY;
    for axis in 0..3 {
        if dir[axis].abs() < 1e-8 {
            if origin[axis] < -half || origin[axis] > half {
                return None;
            }
            continue;
        }
        let inv = 1.0 / dir[axis];
        let t0 = (-half - origin[axis]) * inv;
        let t1 = (half - origin[axis]) * inv;
        t_near = t_near.max(t0.min(t1));
        t_far = t_far.min(t0.max(t1));
    }
    (t_near <= t_far).then_some((t_near, t_far))
}

/// Front-to-back raymarch compositor
#[derive(Debug, Clone)]
pub struct VolumeCompositor {
    params: VolumeParams,
    lut: Vec<[f32; 4]>,
}

impl VolumeCompositor {
    pub fn new(params: VolumeParams) -> Self {
        Self {
            params,
            lut: blackbody_lut(),
        }
    }

    pub fn params(&self) -> &VolumeParams {
        &self.params
    }

    /// Accumulated `(colour, alpha)` along one ray, before the background blend
    pub fn march(&self, grid: &DensityGrid, origin: [f32; 3], dir: [f32; 3]) -> ([f32; 3], f32) {
        let p = &self.params;
        let half = grid.params().half_extent + p.aabb_margin;
        let mut acc_c = [0.0f32; 3];
        let mut acc_a = 0.0f32;

        let Some((t_near, t_far)) = intersect_aabb(origin, dir, half) else {
            return (acc_c, acc_a);
        };
        if t_far <= 0.0 || p.steps == 0 {
            return (acc_c, acc_a);
        }

        let t_start = t_near.max(0.0);
        let step = (t_far - t_start) / p.steps as f32;

        for i in 0..p.steps {
            let t = t_start + (i as f32 + 0.5) * step;
            let density = grid.sample(add(origin, scale(dir, t)));
            if density > p.density_threshold {
                let alpha = 1.0 - (-density * p.absorption * step).exp();
                let colour = sample_lut(&self.lut, density / p.colour_scale);
                let emission = scale(colour, 1.0 + density * p.emission_boost);
                let weight = alpha * (1.0 - acc_a);
                acc_c = add(acc_c, scale(emission, weight));
                acc_a += weight;
            }
            if acc_a > p.early_exit_alpha {
                break;
            }
        }
        (acc_c, acc_a)
    }

    /// Final pixel colour: volume over background, then vignette
    pub fn shade(
        &self,
        grid: &DensityGrid,
        origin: [f32; 3],
        dir: [f32; 3],
        uv: [f32; 2],
    ) -> [f32; 3] {
        let (acc_c, acc_a) = self.march(grid, origin, dir);
        let colour = add(acc_c, scale(background(uv), 1.0 - acc_a));
        scale(colour, vignette(uv))
    }

    /// Render a full RGBA8 frame, rows in parallel
    pub fn render(
        &self,
        grid: &DensityGrid,
        camera: &CameraFrame,
        projection: &Mat4,
        width: u32,
        height: u32,
    ) -> Vec<u8> {
        let mut pixels = vec![0u8; width as usize * height as usize * 4];
        if width == 0 || height == 0 {
            return pixels;
        }
        let inv_proj = math::inverse(projection).unwrap_or(math::IDENTITY);
        let inv_view = math::inverse(&camera.view_matrix).unwrap_or(math::IDENTITY);

        pixels
            .par_chunks_mut(width as usize * 4)
            .enumerate()
            .for_each(|(y, row)| {
                for (x, px) in row.chunks_exact_mut(4).enumerate() {
                    let uv = pixel_uv(x as u32, y as u32, width, height);
                    let dir = ray_direction(&inv_proj, &inv_view, uv);
                    let c = self.shade(grid, camera.eye, dir, uv);
                    px[0] = palette::to_u8(c[0]);
                    px[1] = palette::to_u8(c[1]);
                    px[2] = palette::to_u8(c[2]);
                    px[3] = 255;
                }
            });
        pixels
    }
}

impl Default for VolumeCompositor {
    fn default() -> Self {
        Self::new(VolumeParams::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::camera::OrbitCamera;
    use crate::density::DensityParams;
    use crate::particle::crystal;

    fn small_grid() -> DensityGrid {
        DensityGrid::new(DensityParams {
            resolution: 24,
            ..Default::default()
        })
    }

    #[test]
    fn slab_intersection() {
        let hit = intersect_aabb([0.0, 0.0, 10.0], [0.0, 0.0, -1.0], 5.0);
        assert_eq!(hit, Some((5.0, 15.0)));

        assert_eq!(
            intersect_aabb([0.0, 8.0, 10.0], [0.0, 0.0, -1.0], 5.0),
            None
        );

        // Inside the box: near is negative, far positive
        let (near, far) = intersect_aabb([0.0, 0.0, 0.0], [1.0, 0.0, 0.0], 5.0).unwrap();
        assert!(near < 0.0 && (far - 5.0).abs() < 1e-6);

        // Box entirely behind the ray
        let (_, far) = intersect_aabb([0.0, 0.0, 10.0], [0.0, 0.0, 1.0], 5.0).unwrap();
        assert!(far <= 0.0);
    }

    #[test]
    fn centre_ray_points_at_origin() {
        let camera = OrbitCamera::default();
        let frame = camera.frame(0.7, [0.0, 0.0]);
        let inv_proj = math::inverse(&camera.projection_matrix(1.0)).unwrap();
        let inv_view = math::inverse(&frame.view_matrix).unwrap();
        let dir = ray_direction(&inv_proj, &inv_view, [0.5, 0.5]);
        let to_origin = math::normalize(math::scale(frame.eye, -1.0));
        assert!(math::dot(dir, to_origin) > 0.9999);
    }

    #[test]
    fn empty_grid_renders_background() {
        let grid = small_grid();
        let compositor = VolumeCompositor::default();
        let camera = OrbitCamera::default();
        let frame = camera.frame(0.0, [0.0, 0.0]);
        let pixels = compositor.render(&grid, &frame, &camera.projection_matrix(1.0), 8, 8);
        assert_eq!(pixels.len(), 8 * 8 * 4);

        for y in 0..8 {
            for x in 0..8 {
                let uv = pixel_uv(x, y, 8, 8);
                let bg = scale(background(uv), vignette(uv));
                let i = ((y * 8 + x) * 4) as usize;
                assert_eq!(pixels[i], palette::to_u8(bg[0]));
                assert_eq!(pixels[i + 2], palette::to_u8(bg[2]));
                assert_eq!(pixels[i + 3], 255);
            }
        }
    }

    #[test]
    fn dense_crystal_glows_through_centre() {
        let mut grid = small_grid();
        grid.rebuild(&crystal(512));
        let compositor = VolumeCompositor::default();
        let (colour, alpha) = compositor.march(&grid, [0.0, 0.0, 12.0], [0.0, 0.0, -1.0]);
        assert!(alpha > 0.5, "alpha = {}", alpha);
        assert!(alpha <= 1.0);
        assert!(colour[0] > 0.1);
    }

    #[test]
    fn march_stops_once_opaque() {
        let mut grid = small_grid();
        // Pile density onto one spot until it is effectively opaque
        let particles = vec![crate::particle::Particle::at_home([0.0, 0.0, 0.0]); 400];
        grid.rebuild(&particles);
        let compositor = VolumeCompositor::default();
        let (_, alpha) = compositor.march(&grid, [0.0, 0.0, 12.0], [0.0, 0.0, -1.0]);
        assert!(alpha > DEFAULT_EARLY_EXIT_ALPHA);
        assert!(alpha < 1.0 + 1e-6);
    }

    #[test]
    fn ray_looking_away_sees_nothing() {
        let grid = small_grid();
        let compositor = VolumeCompositor::default();
        let (colour, alpha) = compositor.march(&grid, [0.0, 0.0, 12.0], [0.0, 0.0, 1.0]);
        assert_eq!(alpha, 0.0);
        assert_eq!(colour, [0.0, 0.0, 0.0]);
    }
}
