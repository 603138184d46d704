//! Particle records

use crate::lattice::bcc_lattice;
use crate::math;

/// Particle count used by the GPU volumetric backend
pub const GPU_PARTICLE_COUNT: usize = 2048;

/// Particle count used by the CPU glow fallback
pub const CPU_PARTICLE_COUNT: usize = 512;

/// A particle anchored to a lattice site.
///
/// `home_position` is set once at construction and never changes; particles
/// are only ever repositioned, never created or destroyed mid-session.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Particle {
    pub position: [f32; 3],
    pub velocity: [f32; 3],
    home_position: [f32; 3],
    /// Cached `|velocity|` from the last integration step
    pub speed: f32,
}

impl Particle {
    /// A particle at rest on its home site
    pub fn at_home(home: [f32; 3]) -> Self {
        Self {
            position: home,
            velocity: [0.0, 0.0, 0.0],
            home_position: home,
            speed: 0.0,
        }
    }

    pub fn home_position(&self) -> [f32; 3] {
        self.home_position
    }

    /// Distance from the home site
    pub fn displacement(&self) -> f32 {
        math::length(math::sub(self.position, self.home_position))
    }
}

/// Build `count` particles resting on a BCC lattice
pub fn crystal(count: usize) -> Vec<Particle> {
    bcc_lattice(count)
        .into_iter()
        .map(Particle::at_home)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crystal_particles_start_at_rest_on_home() {
        let particles = crystal(CPU_PARTICLE_COUNT);
        assert_eq!(particles.len(), CPU_PARTICLE_COUNT);
        for p in &particles {
            assert_eq!(p.position, p.home_position());
            assert_eq!(p.velocity, [0.0, 0.0, 0.0]);
            assert_eq!(p.speed, 0.0);
            assert_eq!(p.displacement(), 0.0);
        }
    }
}
