//! GPU buffer types for the volumetric backend
//!
//! These types are uploaded directly to GPU buffers. All are repr(C) with
//! explicit padding so they match the WGSL structs in `shaders`.

use bytemuck::{Pod, Zeroable};

use crate::density::{DensityParams, FIXED_POINT_SCALE};
use crate::histogram::NUM_BINS;
use crate::integrator::IntegratorParams;
use crate::math::Mat4;
use crate::particle::Particle;
use crate::volume::VolumeParams;

/// Threads per compute workgroup (matches `@workgroup_size` in WGSL)
pub const WORKGROUP_SIZE: u32 = 256;

/// A particle as stored in the GPU particle buffer.
///
/// Layout matches the WGSL `Particle` struct: `position, speed, velocity,
/// pad, home, pad`.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct GpuParticle {
    pub position: [f32; 3],
    pub speed: f32,
    pub velocity: [f32; 3],
    pub _pad0: f32,
    pub home: [f32; 3],
    pub _pad1: f32,
}

impl From<&Particle> for GpuParticle {
    fn from(p: &Particle) -> Self {
        Self {
            position: p.position,
            speed: p.speed,
            velocity: p.velocity,
            _pad0: 0.0,
            home: p.home_position(),
            _pad1: 0.0,
        }
    }
}

impl GpuParticle {
    /// Rebuild the host-side record, keeping the GPU's home site
    pub fn to_particle(&self) -> Particle {
        let mut p = Particle::at_home(self.home);
        p.position = self.position;
        p.velocity = self.velocity;
        p.speed = self.speed;
        p
    }
}

/// Per-frame uniforms for the integrate, splat and bin passes
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct SimUniforms {
    pub dt: f32,
    pub t_order: f32,
    pub time_key: u32,
    pub particle_count: u32,

    pub spring_k: f32,
    pub noise_strength: f32,
    pub damping_chaos: f32,
    pub damping_ordered: f32,

    pub max_speed: f32,
    pub boundary_radius: f32,
    pub boundary_strength: f32,
    pub grid_resolution: u32,

    pub grid_half_extent: f32,
    pub splat_radius: f32,
    pub splat_strength: f32,
    pub speed_gain: f32,

    pub fixed_scale: f32,
    pub num_bins: u32,
    pub _pad0: u32,
    pub _pad1: u32,
}

impl SimUniforms {
    pub fn new(
        integrator: &IntegratorParams,
        density: &DensityParams,
        particle_count: u32,
    ) -> Self {
        Self {
            dt: 0.0,
            t_order: 1.0,
            time_key: 0,
            particle_count,
            spring_k: integrator.spring_k,
            noise_strength: integrator.noise_strength,
            damping_chaos: integrator.damping_chaos,
            damping_ordered: integrator.damping_ordered,
            max_speed: integrator.max_speed,
            boundary_radius: integrator.boundary_radius,
            boundary_strength: integrator.boundary_strength,
            grid_resolution: density.resolution,
            grid_half_extent: density.half_extent,
            splat_radius: density.splat_radius,
            splat_strength: density.splat_strength,
            speed_gain: density.speed_gain,
            fixed_scale: FIXED_POINT_SCALE,
            num_bins: NUM_BINS as u32,
            _pad0: 0,
            _pad1: 0,
        }
    }

    /// Set the per-frame fields
    pub fn with_frame(mut self, dt: f32, t_order: f32, time_key: u32) -> Self {
        self.dt = dt;
        self.t_order = t_order;
        self.time_key = time_key;
        self
    }
}

/// Per-frame uniforms for the raymarch pass
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct RenderUniforms {
    pub inv_view: Mat4,
    pub inv_proj: Mat4,

    pub eye: [f32; 3],
    pub grid_half_extent: f32,

    pub resolution: [f32; 2],
    pub grid_resolution: u32,
    pub steps: u32,

    pub absorption: f32,
    pub density_threshold: f32,
    pub inv_fixed_scale: f32,
    pub early_exit_alpha: f32,

    pub aabb_margin: f32,
    pub colour_scale: f32,
    pub emission_boost: f32,
    pub _pad: f32,
}

impl RenderUniforms {
    pub fn new(
        inv_view: Mat4,
        inv_proj: Mat4,
        eye: [f32; 3],
        size: (u32, u32),
        density: &DensityParams,
        volume: &VolumeParams,
    ) -> Self {
        Self {
            inv_view,
            inv_proj,
            eye,
            grid_half_extent: density.half_extent,
            resolution: [size.0 as f32, size.1 as f32],
            grid_resolution: density.resolution,
            steps: volume.steps,
            absorption: volume.absorption,
            density_threshold: volume.density_threshold,
            inv_fixed_scale: 1.0 / FIXED_POINT_SCALE,
            early_exit_alpha: volume.early_exit_alpha,
            aabb_margin: volume.aabb_margin,
            colour_scale: volume.colour_scale,
            emission_boost: volume.emission_boost,
            _pad: 0.0,
        }
    }
}
