//! Simulation configuration
//!
//! Every section is `#[serde(default)]`, so a config file only needs the
//! values it changes. Files are YAML (`.yaml`, `.yml`) or JSON (`.json`).

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::camera::CameraParams;
use crate::density::DensityParams;
use crate::driver::{BackendPreference, BackendSettings};
use crate::entropy::EntropyConfig;
use crate::error::ConfigError;
use crate::glow::GlowParams;
use crate::integrator::IntegratorParams;
use crate::particle::{CPU_PARTICLE_COUNT, GPU_PARTICLE_COUNT};
use crate::state_machine::TransitionTimings;
use crate::volume::VolumeParams;

/// Output and backend settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    pub width: u32,
    pub height: u32,
    pub backend: BackendPreference,
    pub gpu_particles: usize,
    pub cpu_particles: usize,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            width: 640,
            height: 360,
            backend: BackendPreference::Auto,
            gpu_particles: GPU_PARTICLE_COUNT,
            cpu_particles: CPU_PARTICLE_COUNT,
        }
    }
}

/// Full configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    pub integrator: IntegratorParams,
    pub timings: TransitionTimings,
    pub entropy: EntropyConfig,
    pub density: DensityParams,
    pub volume: VolumeParams,
    pub glow: GlowParams,
    pub camera: CameraParams,
    pub render: RenderConfig,
}

/// On-disk config formats
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum ConfigFormat {
    Yaml,
    Json,
}

impl ConfigFormat {
    /// Detect the format from a file extension (case-insensitive)
    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();
        match ext.as_str() {
            "yaml" | "yml" => Ok(Self::Yaml),
            "json" => Ok(Self::Json),
            _ => Err(ConfigError::UnsupportedFormat(path.display().to_string())),
        }
    }
}

impl SimConfig {
    /// Read, parse and validate a config file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let format = ConfigFormat::from_path(path)?;
        let text = std::fs::read_to_string(path)?;
        let config = Self::parse(&text, format)?;
        config.validate()?;
        Ok(config)
    }

    /// Parse a config document without validating it
    pub fn parse(text: &str, format: ConfigFormat) -> Result<Self, ConfigError> {
        Ok(match format {
            ConfigFormat::Yaml => serde_yaml::from_str(text)?,
            ConfigFormat::Json => serde_json::from_str(text)?,
        })
    }

    pub fn to_text(&self, format: ConfigFormat) -> Result<String, ConfigError> {
        Ok(match format {
            ConfigFormat::Yaml => serde_yaml::to_string(self)?,
            ConfigFormat::Json => serde_json::to_string_pretty(self)?,
        })
    }

    /// Reject values the simulation cannot run with
    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |msg: &str| Err(ConfigError::Invalid(msg.to_string()));

        if self.render.width == 0 || self.render.height == 0 {
            return invalid("render.width and render.height must be non-zero");
        }
        if self.render.gpu_particles == 0 || self.render.cpu_particles == 0 {
            return invalid("particle counts must be non-zero");
        }
        if self.timings.shatter <= 0.0 || self.timings.reassemble <= 0.0 {
            return invalid("transition durations must be positive");
        }
        if self.integrator.max_speed <= 0.0 {
            return invalid("integrator.max_speed must be positive");
        }
        if self.density.resolution == 0 {
            return invalid("density.resolution must be non-zero");
        }
        if self.density.half_extent <= 0.0 || self.density.splat_radius <= 0.0 {
            return invalid("density.half_extent and density.splat_radius must be positive");
        }
        if self.volume.steps == 0 {
            return invalid("volume.steps must be non-zero");
        }
        if !(0.0..=1.0).contains(&self.entropy.smoothing) {
            return invalid("entropy.smoothing must be in [0, 1]");
        }
        Ok(())
    }

    /// Backend construction settings derived from this config
    pub fn backend_settings(&self) -> BackendSettings {
        BackendSettings {
            preference: self.render.backend,
            width: self.render.width,
            height: self.render.height,
            gpu_particles: self.render.gpu_particles,
            cpu_particles: self.render.cpu_particles,
            integrator: self.integrator.clone(),
            density: self.density.clone(),
            volume: self.volume.clone(),
            glow: self.glow.clone(),
            camera: self.camera.clone(),
        }
    }
}
