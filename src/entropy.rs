//! Shannon entropy of the speed histogram, with a smoothed display value

use serde::{Deserialize, Serialize};

/// Default low-pass rate applied to the display value each tick
pub const DEFAULT_SMOOTHING: f32 = 0.12;

/// Reference frame rate for [`SmoothingMode::FixedTimestep`]
const REFERENCE_FPS: f32 = 60.0;

/// How the display value chases the latest normalized entropy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SmoothingMode {
    /// Fixed fraction per rendered frame; smoothing speed follows frame rate
    #[default]
    PerFrame,
    /// Fraction scaled by `dt` so the rate matches `PerFrame` at 60 fps
    FixedTimestep,
}

/// Entropy meter configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EntropyConfig {
    pub smoothing: f32,
    pub mode: SmoothingMode,
}

impl Default for EntropyConfig {
    fn default() -> Self {
        Self {
            smoothing: DEFAULT_SMOOTHING,
            mode: SmoothingMode::PerFrame,
        }
    }
}

/// Result of one entropy measurement
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct EntropyReading {
    /// Shannon entropy in bits
    pub entropy: f32,
    /// Entropy divided by `log2(bin_count)`, in `[0, 1]`
    pub normalized: f32,
}

/// Shannon entropy `H = -sum p log2 p` over the non-empty bins.
///
/// An empty histogram has entropy 0 rather than NaN.
pub fn shannon_entropy(counts: &[u32]) -> EntropyReading {
    let total: u64 = counts.iter().map(|&c| c as u64).sum();
    if total == 0 || counts.len() < 2 {
        return EntropyReading::default();
    }

    let total = total as f64;
    let entropy: f64 = counts
        .iter()
        .filter(|&&c| c > 0)
        .map(|&c| {
            let p = c as f64 / total;
            -p * p.log2()
        })
        .sum();

    let max_entropy = (counts.len() as f64).log2();
    EntropyReading {
        entropy: entropy as f32,
        normalized: (entropy / max_entropy) as f32,
    }
}

/// Consumes histograms and keeps a smoothed value for display
#[derive(Debug, Clone)]
pub struct EntropyMeter {
    config: EntropyConfig,
    latest: EntropyReading,
    display: f32,
}

impl EntropyMeter {
    pub fn new() -> Self {
        Self::with_config(EntropyConfig::default())
    }

    pub fn with_config(config: EntropyConfig) -> Self {
        Self {
            config,
            latest: EntropyReading::default(),
            display: 0.0,
        }
    }

    /// Measure a new histogram and remember it as the display target
    pub fn compute(&mut self, histogram: &[u32]) -> EntropyReading {
        self.latest = shannon_entropy(histogram);
        self.latest
    }

    /// Move the display value one step toward the latest normalized entropy
    pub fn update_display(&mut self, dt: f32) {
        let rate = match self.config.mode {
            SmoothingMode::PerFrame => self.config.smoothing,
            SmoothingMode::FixedTimestep => {
                1.0 - (1.0 - self.config.smoothing).powf(dt.max(0.0) * REFERENCE_FPS)
            }
        };
        self.display += (self.latest.normalized - self.display) * rate;
    }

    /// Most recent measurement
    pub fn latest(&self) -> EntropyReading {
        self.latest
    }

    /// Smoothed normalized entropy for display
    pub fn display(&self) -> f32 {
        self.display
    }
}

impl Default for EntropyMeter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_bin_has_zero_entropy() {
        let mut counts = [0u32; 64];
        counts[17] = 512;
        let reading = shannon_entropy(&counts);
        assert_eq!(reading.entropy, 0.0);
        assert_eq!(reading.normalized, 0.0);
    }

    #[test]
    fn uniform_histogram_is_fully_normalized() {
        let counts = [32u32; 64];
        let reading = shannon_entropy(&counts);
        assert!((reading.entropy - 6.0).abs() < 1e-5);
        assert!((reading.normalized - 1.0).abs() < 1e-5);
    }

    #[test]
    fn empty_histogram_is_zero_not_nan() {
        let reading = shannon_entropy(&[0u32; 64]);
        assert_eq!(
            reading,
            EntropyReading {
                entropy: 0.0,
                normalized: 0.0
            }
        );
    }

    #[test]
    fn two_equal_bins_is_one_bit() {
        let mut counts = [0u32; 64];
        counts[0] = 10;
        counts[63] = 10;
        let reading = shannon_entropy(&counts);
        assert!((reading.entropy - 1.0).abs() < 1e-6);
        assert!((reading.normalized - 1.0 / 6.0).abs() < 1e-6);
    }

    #[test]
    fn display_converges_per_frame() {
        let mut meter = EntropyMeter::new();
        meter.compute(&[1u32; 64]);

        meter.update_display(0.016);
        assert!((meter.display() - 0.12).abs() < 1e-5);

        for _ in 0..200 {
            meter.update_display(0.016);
        }
        assert!((meter.display() - 1.0).abs() < 1e-3);
    }

    #[test]
    fn per_frame_rate_ignores_dt() {
        let mut a = EntropyMeter::new();
        let mut b = EntropyMeter::new();
        a.compute(&[1u32; 64]);
        b.compute(&[1u32; 64]);
        a.update_display(0.001);
        b.update_display(0.05);
        assert_eq!(a.display(), b.display());
    }

    #[test]
    fn fixed_timestep_matches_per_frame_at_sixty_fps() {
        let mut meter = EntropyMeter::with_config(EntropyConfig {
            smoothing: DEFAULT_SMOOTHING,
            mode: SmoothingMode::FixedTimestep,
        });
        meter.compute(&[1u32; 64]);
        meter.update_display(1.0 / 60.0);
        assert!((meter.display() - 0.12).abs() < 1e-4);
    }

    #[test]
    fn fixed_timestep_two_half_steps_equal_one_full_step() {
        let config = EntropyConfig {
            smoothing: DEFAULT_SMOOTHING,
            mode: SmoothingMode::FixedTimestep,
        };
        let mut halves = EntropyMeter::with_config(config.clone());
        let mut whole = EntropyMeter::with_config(config);
        halves.compute(&[3u32; 64]);
        whole.compute(&[3u32; 64]);

        halves.update_display(1.0 / 120.0);
        halves.update_display(1.0 / 120.0);
        whole.update_display(1.0 / 60.0);

        assert!((halves.display() - whole.display()).abs() < 1e-5);
    }
}
