//! Per-frame histogram of particle speeds

use rayon::prelude::*;

use crate::particle::Particle;

/// Number of histogram bins
pub const NUM_BINS: usize = 64;

/// Upper clamp on `speed / max_speed` so the top speed lands in the last bin
const MAX_FRACTION: f32 = 0.9999;

/// Below this many particles a serial pass is cheaper than a parallel one
const PARALLEL_THRESHOLD: usize = 4096;

/// Bin index for a speed: `floor(clamp(speed / max_speed, 0, 0.9999) * bins)`
pub fn bin_for_speed(speed: f32, max_speed: f32) -> usize {
    let fraction = if max_speed > 0.0 {
        (speed / max_speed).clamp(0.0, MAX_FRACTION)
    } else {
        0.0
    };
    // NaN speeds clamp to NaN and cast to 0
    ((fraction * NUM_BINS as f32).floor() as usize).min(NUM_BINS - 1)
}

/// Fixed-size speed histogram, rebuilt from scratch every frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpeedHistogram {
    counts: [u32; NUM_BINS],
}

impl SpeedHistogram {
    pub fn new() -> Self {
        Self {
            counts: [0; NUM_BINS],
        }
    }

    /// Replace all counts with the binned speeds of `particles`.
    ///
    /// Large particle sets are binned with a partitioned parallel reduction;
    /// the result is identical to the serial pass since addition commutes.
    pub fn rebuild(&mut self, particles: &[Particle], max_speed: f32) {
        self.counts = if particles.len() >= PARALLEL_THRESHOLD {
            particles
                .par_iter()
                .fold(
                    || [0u32; NUM_BINS],
                    |mut acc, p| {
                        acc[bin_for_speed(p.speed, max_speed)] += 1;
                        acc
                    },
                )
                .reduce(
                    || [0u32; NUM_BINS],
                    |mut a, b| {
                        for (x, y) in a.iter_mut().zip(b.iter()) {
                            *x += y;
                        }
                        a
                    },
                )
        } else {
            let mut counts = [0u32; NUM_BINS];
            for p in particles {
                counts[bin_for_speed(p.speed, max_speed)] += 1;
            }
            counts
        };
    }

    pub fn counts(&self) -> &[u32; NUM_BINS] {
        &self.counts
    }

    pub fn total(&self) -> u64 {
        self.counts.iter().map(|&c| c as u64).sum()
    }
}

impl Default for SpeedHistogram {
    fn default() -> Self {
        Self::new()
    }
}
