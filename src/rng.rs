//! Noise sources for the particle integrator
//!
//! The GPU path draws from [`HashNoise`]: a pure function of
//! `(time_key, particle_index, sub_seed)` with no shared state, so any particle
//! can be integrated independently and reproducibly. The WGSL in
//! `gpu::shaders` uses the same hash bit for bit.
//!
//! The CPU fallback uses [`LcgNoise`], a linear-congruential generator
//! seeded from the frame time and consumed in particle order.

use std::f32::consts::TAU;

/// Source of per-particle noise vectors.
///
/// Implementations are called once per particle, in index order, each frame.
pub trait NoiseSource {
    fn sample(&mut self, index: u32) -> [f32; 3];
}

/// PCG-style integer hash (same constants as the WGSL `pcg_hash`)
pub fn pcg_hash(input: u32) -> u32 {
    let state = input.wrapping_mul(747_796_405).wrapping_add(2_891_336_453);
    let word = ((state >> ((state >> 28).wrapping_add(4))) ^ state).wrapping_mul(277_803_737);
    (word >> 22) ^ word
}

/// Hash three keys into one 32-bit value
pub fn hash3(a: u32, b: u32, c: u32) -> u32 {
    pcg_hash(a ^ pcg_hash(b ^ pcg_hash(c)))
}

/// Uniform value in `[0, 1)` from the top 24 bits of a hash
pub fn hash_to_unit(h: u32) -> f32 {
    (h >> 8) as f32 / 16_777_216.0
}

/// Truncate simulation time to whole milliseconds for seeding
pub fn time_key(total_time: f32) -> u32 {
    (total_time.max(0.0) * 1000.0) as u32
}

/// Standard normal sample via Box-Muller from two hashed uniforms
pub fn gaussian(time_key: u32, index: u32, sub_seed: u32) -> f32 {
    let u1 = hash_to_unit(hash3(time_key, index, sub_seed * 2)).max(1e-7);
    let u2 = hash_to_unit(hash3(time_key, index, sub_seed * 2 + 1));
    (-2.0 * u1.ln()).sqrt() * (TAU * u2).cos()
}

/// Three independent normal samples for one particle
pub fn gaussian3(time_key: u32, index: u32) -> [f32; 3] {
    [
        gaussian(time_key, index, 0),
        gaussian(time_key, index, 1),
        gaussian(time_key, index, 2),
    ]
}

/// Stateless hashed Gaussian noise keyed by frame time and particle index
#[derive(Debug, Clone, Copy)]
pub struct HashNoise {
    time_key: u32,
}

impl HashNoise {
    pub fn new(total_time: f32) -> Self {
        Self {
            time_key: time_key(total_time),
        }
    }

    pub fn time_key(&self) -> u32 {
        self.time_key
    }
}

impl NoiseSource for HashNoise {
    fn sample(&mut self, index: u32) -> [f32; 3] {
        gaussian3(self.time_key, index)
    }
}

/// Numerical Recipes LCG, consumed sequentially
#[derive(Debug, Clone)]
pub struct LcgNoise {
    state: u32,
}

impl LcgNoise {
    const MULTIPLIER: u32 = 1_664_525;
    const INCREMENT: u32 = 1_013_904_223;

    pub fn from_seed(seed: u32) -> Self {
        Self { state: seed }
    }

    /// Seed from the frame time so consecutive frames differ
    pub fn from_time(total_time: f32) -> Self {
        Self::from_seed(pcg_hash(time_key(total_time)))
    }

    fn next_u32(&mut self) -> u32 {
        self.state = self
            .state
            .wrapping_mul(Self::MULTIPLIER)
            .wrapping_add(Self::INCREMENT);
        self.state
    }

    /// Uniform value in `[-1, 1)`
    pub fn next_signed(&mut self) -> f32 {
        hash_to_unit(self.next_u32()) * 2.0 - 1.0
    }
}

impl NoiseSource for LcgNoise {
    fn sample(&mut self, _index: u32) -> [f32; 3] {
        [self.next_signed(), self.next_signed(), self.next_signed()]
    }
}

/// No noise at all, for deterministic relaxation
#[derive(Debug, Clone, Copy, Default)]
pub struct ZeroNoise;

impl NoiseSource for ZeroNoise {
    fn sample(&mut self, _index: u32) -> [f32; 3] {
        [0.0, 0.0, 0.0]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_noise_is_reproducible_per_time_and_index() {
        let mut a = HashNoise::new(1.234);
        let mut b = HashNoise::new(1.234);
        // Query order must not matter
        let b7 = b.sample(7);
        let _ = a.sample(3);
        assert_eq!(a.sample(7), b7);
    }

    #[test]
    fn hash_noise_varies_across_frames_and_particles() {
        let mut early = HashNoise::new(1.000);
        let mut late = HashNoise::new(1.016);
        assert_ne!(early.sample(0), late.sample(0));
        assert_ne!(early.sample(0), early.sample(1));
    }

    #[test]
    fn time_key_truncates_to_milliseconds() {
        assert_eq!(time_key(1.2349), 1234);
        assert_eq!(time_key(-5.0), 0);
    }

    #[test]
    fn gaussian_samples_have_unit_variance() {
        let n = 20_000u32;
        let samples: Vec<f32> = (0..n).map(|i| gaussian(42, i, 0)).collect();
        let mean = samples.iter().sum::<f32>() / n as f32;
        let var = samples.iter().map(|s| (s - mean).powi(2)).sum::<f32>() / n as f32;
        assert!(mean.abs() < 0.05, "mean = {}", mean);
        assert!((var - 1.0).abs() < 0.1, "variance = {}", var);
        assert!(samples.iter().all(|s| s.is_finite()));
    }

    #[test]
    fn unit_hash_stays_in_range() {
        for i in 0..1000 {
            let u = hash_to_unit(pcg_hash(i));
            assert!((0.0..1.0).contains(&u));
        }
        assert!(hash_to_unit(u32::MAX) < 1.0);
    }

    #[test]
    fn lcg_is_sequential_and_bounded() {
        let mut rng = LcgNoise::from_seed(1);
        let first = rng.sample(0);
        let second = rng.sample(0);
        assert_ne!(first, second);
        for _ in 0..1000 {
            for v in rng.sample(0) {
                assert!((-1.0..1.0).contains(&v));
            }
        }
    }

    #[test]
    fn lcg_same_seed_same_stream() {
        let mut a = LcgNoise::from_time(0.5);
        let mut b = LcgNoise::from_time(0.5);
        for i in 0..10 {
            assert_eq!(a.sample(i), b.sample(i));
        }
    }

    #[test]
    fn zero_noise_is_zero() {
        assert_eq!(ZeroNoise.sample(99), [0.0, 0.0, 0.0]);
    }
}
