//! Spring-and-noise particle integrator
//!
//! Each tick blends two regimes by `t_order`:
//! a stiff, damped spring toward the home site (crystal) and undamped
//! random kicks (chaos). The step order is fixed:
//!
//! 1. spring force toward home, scaled by `t`
//! 2. noise force, scaled by `1 - t`
//! 3. damping = mix(chaos, ordered, t)
//! 4. velocity update, then clamp to `max_speed`
//! 5. position update
//! 6. soft boundary impulse using the new position
//! 7. cache `speed` from the corrected velocity

use serde::{Deserialize, Serialize};

use crate::math::{self, add, length, scale, sub};
use crate::particle::Particle;
use crate::rng::NoiseSource;

/// Default spring constant toward the home site
pub const DEFAULT_SPRING_K: f32 = 12.0;

/// Default noise force magnitude at full chaos
pub const DEFAULT_NOISE_STRENGTH: f32 = 4.0;

/// Default per-tick velocity retention at full chaos
pub const DEFAULT_DAMPING_CHAOS: f32 = 0.999;

/// Default per-tick velocity retention at full order
pub const DEFAULT_DAMPING_ORDERED: f32 = 0.97;

/// Maximum particle speed in world units per second
pub const DEFAULT_MAX_SPEED: f32 = 8.0;

/// Radius beyond which the soft boundary pushes particles back
pub const DEFAULT_BOUNDARY_RADIUS: f32 = 4.5;

/// Boundary impulse per unit of overshoot per second
pub const DEFAULT_BOUNDARY_STRENGTH: f32 = 2.0;

/// Integrator constants
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IntegratorParams {
    pub spring_k: f32,
    pub noise_strength: f32,
    pub damping_chaos: f32,
    pub damping_ordered: f32,
    pub max_speed: f32,
    pub boundary_radius: f32,
    pub boundary_strength: f32,
}

impl Default for IntegratorParams {
    fn default() -> Self {
        Self {
            spring_k: DEFAULT_SPRING_K,
            noise_strength: DEFAULT_NOISE_STRENGTH,
            damping_chaos: DEFAULT_DAMPING_CHAOS,
            damping_ordered: DEFAULT_DAMPING_ORDERED,
            max_speed: DEFAULT_MAX_SPEED,
            boundary_radius: DEFAULT_BOUNDARY_RADIUS,
            boundary_strength: DEFAULT_BOUNDARY_STRENGTH,
        }
    }
}

/// Rescale `v` so its length does not exceed `max_len`
pub fn clamp_length(v: [f32; 3], max_len: f32) -> [f32; 3] {
    let len = length(v);
    if len > max_len && len > math::EPSILON {
        scale(v, max_len / len)
    } else {
        v
    }
}

/// Advances particles by one tick
#[derive(Debug, Clone, Default)]
pub struct ParticleIntegrator {
    params: IntegratorParams,
}

impl ParticleIntegrator {
    pub fn new(params: IntegratorParams) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &IntegratorParams {
        &self.params
    }

    /// Advance a single particle given an unscaled noise sample
    pub fn step(&self, particle: &mut Particle, t_order: f32, dt: f32, noise: [f32; 3]) {
        let p = &self.params;
        let t = t_order.clamp(0.0, 1.0);
        let dt = dt.max(0.0);

        let spring = scale(
            sub(particle.home_position(), particle.position),
            p.spring_k * t,
        );
        let noise_force = scale(noise, p.noise_strength * (1.0 - t));
        let damping = math::mix(p.damping_chaos, p.damping_ordered, t);

        let velocity = add(
            scale(particle.velocity, damping),
            scale(add(spring, noise_force), dt),
        );
        particle.velocity = clamp_length(velocity, p.max_speed);
        particle.position = add(particle.position, scale(particle.velocity, dt));

        let dist = length(particle.position);
        if dist > p.boundary_radius {
            let inward = math::normalize(particle.position);
            let impulse = (dist - p.boundary_radius) * p.boundary_strength * dt;
            particle.velocity = sub(particle.velocity, scale(inward, impulse));
        }

        particle.speed = length(particle.velocity);
    }

    /// Advance every particle, drawing one noise sample per particle in index order
    pub fn integrate<N: NoiseSource + ?Sized>(
        &self,
        particles: &mut [Particle],
        t_order: f32,
        dt: f32,
        noise: &mut N,
    ) {
        for (index, particle) in particles.iter_mut().enumerate() {
            let sample = noise.sample(index as u32);
            self.step(particle, t_order, dt, sample);
        }
    }
}
