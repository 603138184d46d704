//! CPU fallback: soft particle sprites plus a separable bloom
//!
//! This path never builds a density grid. Particles are drawn as additive
//! soft circles into an `f32` buffer, blurred with a fixed 9-tap kernel and
//! composited over the background.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::camera::{CameraParams, perspective};
use crate::error::{RenderError, RenderResult};
use crate::histogram::{NUM_BINS, SpeedHistogram};
use crate::integrator::{IntegratorParams, ParticleIntegrator};
use crate::math::{Mat4, mul_mat4, mul_vec4};
use crate::palette::{self, background, glow_gradient, vignette};
use crate::particle::{Particle, crystal};
use crate::renderer::{CameraFrame, Renderer};
use crate::rng::LcgNoise;

/// Normalized 9-tap Gaussian weights, centre tap first
pub const BLUR_WEIGHTS: [f32; 5] = [
    0.227_027_03,
    0.194_594_6,
    0.121_621_62,
    0.054_054_055,
    0.016_216_217,
];

/// Default sprite size in world units before perspective scaling
pub const DEFAULT_POINT_WORLD_SIZE: f32 = 0.35;

/// Default sprite size ceiling in pixels (device point-size limit)
pub const DEFAULT_MAX_POINT_SIZE: f32 = 64.0;

/// Default weight of the blurred layer in the composite
pub const DEFAULT_BLOOM: f32 = 1.4;

/// Default peak sprite intensity
pub const DEFAULT_SPRITE_INTENSITY: f32 = 0.6;

/// Glow compositor settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GlowParams {
    pub point_world_size: f32,
    pub max_point_size: f32,
    pub bloom: f32,
    pub sprite_intensity: f32,
}

impl Default for GlowParams {
    fn default() -> Self {
        Self {
            point_world_size: DEFAULT_POINT_WORLD_SIZE,
            max_point_size: DEFAULT_MAX_POINT_SIZE,
            bloom: DEFAULT_BLOOM,
            sprite_intensity: DEFAULT_SPRITE_INTENSITY,
        }
    }
}

/// Sprite intensity at distance `d` from the centre of a sprite of radius `r`
pub fn sprite_falloff(d: f32, r: f32) -> f32 {
    if r <= 0.0 || d >= r {
        return 0.0;
    }
    let k = 1.0 - d / r;
    k * k
}

/// 9-tap sample at index `i` of a line of `len` values, clamped at both ends
fn blur_tap(i: usize, len: usize, fetch: impl Fn(usize) -> [f32; 3]) -> [f32; 3] {
    let last = len as isize - 1;
    let mut acc = [0.0f32; 3];
    for (k, &w) in BLUR_WEIGHTS.iter().enumerate() {
        let offsets: &[isize] = if k == 0 { &[0] } else { &[-1, 1] };
        for &sign in offsets {
            let c = fetch((i as isize + sign * k as isize).clamp(0, last) as usize);
            acc[0] += c[0] * w;
            acc[1] += c[1] * w;
            acc[2] += c[2] * w;
        }
    }
    acc
}

/// Additive sprite rasterizer with bloom
#[derive(Debug, Clone)]
pub struct GlowCompositor {
    params: GlowParams,
    width: u32,
    height: u32,
    sharp: Vec<[f32; 3]>,
    scratch: Vec<[f32; 3]>,
    blurred: Vec<[f32; 3]>,
}

impl GlowCompositor {
    pub fn new(params: GlowParams, width: u32, height: u32) -> Self {
        let mut compositor = Self {
            params,
            width: 0,
            height: 0,
            sharp: Vec::new(),
            scratch: Vec::new(),
            blurred: Vec::new(),
        };
        compositor.resize(width, height);
        compositor
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        self.width = width;
        self.height = height;
        let n = width as usize * height as usize;
        self.sharp = vec![[0.0; 3]; n];
        self.scratch = vec![[0.0; 3]; n];
        self.blurred = vec![[0.0; 3]; n];
    }

    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Sharp sprite layer from the last `rasterize`
    pub fn sharp(&self) -> &[[f32; 3]] {
        &self.sharp
    }

    /// Clear the sharp layer and splat every visible particle into it
    pub fn rasterize(&mut self, particles: &[Particle], view_proj: &Mat4, max_speed: f32) {
        self.sharp.iter_mut().for_each(|c| *c = [0.0; 3]);
        let (w, h) = (self.width as f32, self.height as f32);
        if self.width == 0 || self.height == 0 {
            return;
        }

        for p in particles {
            let clip = mul_vec4(
                view_proj,
                [p.position[0], p.position[1], p.position[2], 1.0],
            );
            if clip[3] <= 0.0 {
                continue;
            }
            let sx = (clip[0] / clip[3] * 0.5 + 0.5) * w;
            let sy = (0.5 - clip[1] / clip[3] * 0.5) * h;
            let size = self.params.point_world_size * h / clip[3];
            let size = size.clamp(1.0, self.params.max_point_size);
            let radius = size * 0.5;

            let x0 = (sx - radius).floor().max(0.0) as i64;
            let x1 = ((sx + radius).ceil() as i64).min(self.width as i64 - 1);
            let y0 = (sy - radius).floor().max(0.0) as i64;
            let y1 = ((sy + radius).ceil() as i64).min(self.height as i64 - 1);
            if x0 > x1 || y0 > y1 {
                continue;
            }

            let colour = glow_gradient(if max_speed > 0.0 {
                p.speed / max_speed
            } else {
                0.0
            });
            for y in y0..=y1 {
                for x in x0..=x1 {
                    let dx = x as f32 + 0.5 - sx;
                    let dy = y as f32 + 0.5 - sy;
                    let k = sprite_falloff((dx * dx + dy * dy).sqrt(), radius)
                        * self.params.sprite_intensity;
                    if k > 0.0 {
                        let c = &mut self.sharp[y as usize * self.width as usize + x as usize];
                        c[0] += colour[0] * k;
                        c[1] += colour[1] * k;
                        c[2] += colour[2] * k;
                    }
                }
            }
        }
    }

    /// Horizontal then vertical 9-tap blur of the sharp layer
    pub fn blur(&mut self) {
        let width = self.width as usize;
        let height = self.height as usize;
        if width == 0 || height == 0 {
            return;
        }

        let sharp = &self.sharp;
        self.scratch
            .par_chunks_mut(width)
            .enumerate()
            .for_each(|(y, row)| {
                for (x, slot) in row.iter_mut().enumerate() {
                    *slot = blur_tap(x, width, |j| sharp[y * width + j]);
                }
            });

        let horizontal = &self.scratch;
        self.blurred
            .par_chunks_mut(width)
            .enumerate()
            .for_each(|(y, row)| {
                for (x, slot) in row.iter_mut().enumerate() {
                    *slot = blur_tap(y, height, |j| horizontal[j * width + x]);
                }
            });
    }

    /// Blurred layer from the last `blur`
    pub fn blurred(&self) -> &[[f32; 3]] {
        &self.blurred
    }

    /// Background, sharp and bloom, tone mapped and vignetted, as RGBA8
    pub fn composite(&self) -> Vec<u8> {
        let width = self.width as usize;
        let mut pixels = vec![0u8; width * self.height as usize * 4];
        if width == 0 {
            return pixels;
        }
        let bloom = self.params.bloom;
        pixels
            .par_chunks_mut(width * 4)
            .enumerate()
            .for_each(|(y, row)| {
                for (x, px) in row.chunks_exact_mut(4).enumerate() {
                    let i = y * width + x;
                    let uv = [
                        (x as f32 + 0.5) / self.width as f32,
                        (y as f32 + 0.5) / self.height as f32,
                    ];
                    let bg = background(uv);
                    let v = vignette(uv);
                    for k in 0..3 {
                        let hdr = bg[k] + self.sharp[i][k] + self.blurred[i][k] * bloom;
                        px[k] = palette::to_u8((1.0 - (-hdr).exp()) * v);
                    }
                    px[3] = 255;
                }
            });
        pixels
    }

    /// Full pipeline for one frame
    pub fn render(&mut self, particles: &[Particle], view_proj: &Mat4, max_speed: f32) -> Vec<u8> {
        self.rasterize(particles, view_proj, max_speed);
        self.blur();
        self.composite()
    }
}

/// CPU simulation with the glow compositor
pub struct CpuGlowRenderer {
    particles: Vec<Particle>,
    integrator: ParticleIntegrator,
    histogram: SpeedHistogram,
    histogram_ready: bool,
    compositor: GlowCompositor,
    camera: CameraParams,
    pixels: Vec<u8>,
    initialized: bool,
}

impl CpuGlowRenderer {
    pub fn new(
        particle_count: usize,
        integrator: IntegratorParams,
        glow: GlowParams,
        camera: CameraParams,
        size: (u32, u32),
    ) -> Self {
        Self {
            particles: crystal(particle_count),
            integrator: ParticleIntegrator::new(integrator),
            histogram: SpeedHistogram::new(),
            histogram_ready: false,
            compositor: GlowCompositor::new(glow, size.0, size.1),
            camera,
            pixels: Vec::new(),
            initialized: false,
        }
    }

    pub fn particles(&self) -> &[Particle] {
        &self.particles
    }

    fn projection(&self) -> Mat4 {
        let (w, h) = self.compositor.size();
        let aspect = if h > 0 { w as f32 / h as f32 } else { 1.0 };
        perspective(self.camera.fov, aspect, self.camera.near, self.camera.far)
    }
}

impl Renderer for CpuGlowRenderer {
    fn init(&mut self) -> RenderResult<()> {
        self.initialized = true;
        debug!(particles = self.particles.len(), "cpu glow renderer ready");
        Ok(())
    }

    fn frame(
        &mut self,
        dt: f32,
        t_order: f32,
        total_time: f32,
        camera: &CameraFrame,
    ) -> RenderResult<()> {
        if !self.initialized {
            return Err(RenderError::NotInitialized);
        }

        let mut noise = LcgNoise::from_time(total_time);
        self.integrator
            .integrate(&mut self.particles, t_order, dt, &mut noise);

        let max_speed = self.integrator.params().max_speed;
        self.histogram.rebuild(&self.particles, max_speed);
        self.histogram_ready = true;

        let view_proj = mul_mat4(&self.projection(), &camera.view_matrix);
        self.pixels = self
            .compositor
            .render(&self.particles, &view_proj, max_speed);
        Ok(())
    }

    fn histogram(&mut self) -> Option<[u32; NUM_BINS]> {
        if !self.histogram_ready {
            return None;
        }
        self.histogram_ready = false;
        Some(*self.histogram.counts())
    }

    fn resize(&mut self, width: u32, height: u32) {
        debug!(width, height, "resize glow target");
        self.compositor.resize(width, height);
        self.pixels.clear();
    }

    fn read_pixels(&mut self) -> RenderResult<Vec<u8>> {
        if !self.initialized {
            return Err(RenderError::NotInitialized);
        }
        if self.pixels.is_empty() {
            return Err(RenderError::Readback("no frame rendered yet".into()));
        }
        Ok(self.pixels.clone())
    }

    fn name(&self) -> &'static str {
        "cpu-glow"
    }

    fn particle_count(&self) -> usize {
        self.particles.len()
    }

    fn size(&self) -> (u32, u32) {
        self.compositor.size()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::camera::OrbitCamera;
    use crate::math::IDENTITY;
    use crate::particle::CPU_PARTICLE_COUNT;

    fn renderer(size: (u32, u32)) -> CpuGlowRenderer {
        CpuGlowRenderer::new(
            CPU_PARTICLE_COUNT,
            IntegratorParams::default(),
            GlowParams::default(),
            CameraParams::default(),
            size,
        )
    }

    fn layer_sum(layer: &[[f32; 3]]) -> f32 {
        layer.iter().map(|c| c[0] + c[1] + c[2]).sum()
    }

    #[test]
    fn blur_weights_are_normalized() {
        let total = BLUR_WEIGHTS[0] + 2.0 * BLUR_WEIGHTS[1..].iter().sum::<f32>();
        assert!((total - 1.0).abs() < 1e-5);
    }

    #[test]
    fn sprite_falloff_is_soft_and_bounded() {
        assert_eq!(sprite_falloff(0.0, 4.0), 1.0);
        assert_eq!(sprite_falloff(2.0, 4.0), 0.25);
        assert_eq!(sprite_falloff(4.0, 4.0), 0.0);
        assert_eq!(sprite_falloff(1.0, 0.0), 0.0);
    }

    #[test]
    fn sprite_lands_at_projected_centre() {
        let mut glow = GlowCompositor::new(GlowParams::default(), 32, 32);
        // Identity projection: w = 1, so the sprite is 0.35 * 32 = 11.2 px wide
        let p = Particle::at_home([0.0, 0.0, 0.0]);
        glow.rasterize(&[p], &IDENTITY, 8.0);

        let centre = glow.sharp()[16 * 32 + 16];
        let corner = glow.sharp()[0];
        assert!(centre[1] > 0.3);
        assert_eq!(corner, [0.0, 0.0, 0.0]);
    }

    #[test]
    fn particles_behind_camera_are_skipped() {
        let mut glow = GlowCompositor::new(GlowParams::default(), 16, 16);
        let mut behind = IDENTITY;
        behind[3][3] = -1.0;
        glow.rasterize(&[Particle::at_home([0.0, 0.0, 0.0])], &behind, 8.0);
        assert_eq!(layer_sum(glow.sharp()), 0.0);
    }

    #[test]
    fn blur_preserves_energy_away_from_edges() {
        let mut glow = GlowCompositor::new(GlowParams::default(), 48, 48);
        glow.rasterize(&[Particle::at_home([0.0, 0.0, 0.0])], &IDENTITY, 8.0);
        glow.blur();
        let before = layer_sum(glow.sharp());
        let after = layer_sum(glow.blurred());
        assert!(before > 0.0);
        assert!((before - after).abs() / before < 1e-3);
        // Blur spreads light beyond the sharp footprint
        assert_eq!(glow.sharp()[24 * 48 + 24 - 11], [0.0, 0.0, 0.0]);
        assert!(glow.blurred()[24 * 48 + 24 - 9][0] > 0.0);
    }

    #[test]
    fn frame_before_init_is_rejected() {
        let mut r = renderer((16, 16));
        let camera = CameraFrame::default();
        assert!(matches!(
            r.frame(0.016, 1.0, 0.0, &camera),
            Err(RenderError::NotInitialized)
        ));
        assert!(r.histogram().is_none());
    }

    #[test]
    fn histogram_is_offered_once_per_frame() {
        let mut r = renderer((24, 16));
        r.init().unwrap();
        let camera = OrbitCamera::default().frame(0.0, [0.0, 0.0]);
        r.frame(0.016, 0.0, 0.016, &camera).unwrap();

        let hist = r.histogram().expect("histogram after frame");
        assert_eq!(
            hist.iter().map(|&c| c as usize).sum::<usize>(),
            CPU_PARTICLE_COUNT
        );
        assert!(r.histogram().is_none());
    }

    #[test]
    fn read_pixels_matches_target_size() {
        let mut r = renderer((40, 30));
        r.init().unwrap();
        assert!(matches!(r.read_pixels(), Err(RenderError::Readback(_))));

        let camera = OrbitCamera::default().frame(1.0, [0.0, 0.0]);
        r.frame(0.016, 1.0, 1.0, &camera).unwrap();
        let pixels = r.read_pixels().unwrap();
        assert_eq!(pixels.len(), 40 * 30 * 4);
        assert!(pixels.chunks_exact(4).all(|px| px[3] == 255));

        // Crystal at the centre is brighter than the corner
        let centre = &pixels[(15 * 40 + 20) * 4..][..3];
        let corner = &pixels[..3];
        let sum = |c: &[u8]| c.iter().map(|&v| v as u32).sum::<u32>();
        assert!(sum(centre) > sum(corner));

        r.resize(20, 10);
        assert_eq!(r.size(), (20, 10));
        assert!(r.read_pixels().is_err());
    }
}
