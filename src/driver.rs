//! Per-frame orchestration and backend selection
//!
//! `SimulationDriver` owns the state machine, the entropy meter and a boxed
//! renderer. One `tick` is one frame: clamp `dt`, advance the phase, draw,
//! then fold in whatever histogram the backend has ready.

use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::camera::CameraParams;
use crate::config::SimConfig;
use crate::density::DensityParams;
use crate::entropy::{EntropyConfig, EntropyMeter, EntropyReading};
use crate::error::{RenderError, RenderResult};
use crate::glow::{CpuGlowRenderer, GlowParams};
use crate::histogram::NUM_BINS;
use crate::integrator::IntegratorParams;
use crate::renderer::{CameraFrame, Renderer};
use crate::state_machine::{OrderChaosStateMachine, Phase, TransitionTimings};
use crate::volume::VolumeParams;

/// Longest step the simulation will take in one tick, in seconds
pub const MAX_DT: f32 = 1.0 / 20.0;

/// Which backend `create_renderer` should build
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum BackendPreference {
    /// GPU if an adapter is available, otherwise CPU
    #[default]
    Auto,
    Gpu,
    Cpu,
}

/// Everything needed to construct either backend
#[derive(Debug, Clone)]
pub struct BackendSettings {
    pub preference: BackendPreference,
    pub width: u32,
    pub height: u32,
    pub gpu_particles: usize,
    pub cpu_particles: usize,
    pub integrator: IntegratorParams,
    pub density: DensityParams,
    pub volume: VolumeParams,
    pub glow: GlowParams,
    pub camera: CameraParams,
}

impl Default for BackendSettings {
    fn default() -> Self {
        SimConfig::default().backend_settings()
    }
}

fn cpu_renderer(settings: &BackendSettings) -> RenderResult<Box<dyn Renderer>> {
    let mut renderer = CpuGlowRenderer::new(
        settings.cpu_particles,
        settings.integrator.clone(),
        settings.glow.clone(),
        settings.camera.clone(),
        (settings.width, settings.height),
    );
    renderer.init()?;
    Ok(Box::new(renderer))
}

#[cfg(feature = "gpu")]
fn gpu_renderer(settings: &BackendSettings) -> RenderResult<Box<dyn Renderer>> {
    use crate::gpu::{GpuRendererSettings, GpuVolumetricRenderer};

    let mut renderer = GpuVolumetricRenderer::new(GpuRendererSettings {
        particle_count: settings.gpu_particles,
        integrator: settings.integrator.clone(),
        density: settings.density.clone(),
        volume: settings.volume.clone(),
        camera: settings.camera.clone(),
        width: settings.width,
        height: settings.height,
        ..Default::default()
    });
    renderer.init()?;
    Ok(Box::new(renderer))
}

#[cfg(not(feature = "gpu"))]
fn gpu_renderer(_settings: &BackendSettings) -> RenderResult<Box<dyn Renderer>> {
    Err(RenderError::BackendUnavailable(
        "built without the `gpu` feature".into(),
    ))
}

/// Build and initialize a renderer.
///
/// `Auto` tries the GPU first and falls back to the CPU glow renderer when
/// the GPU backend is unavailable. Any other GPU error is returned as is.
pub fn create_renderer(settings: &BackendSettings) -> RenderResult<Box<dyn Renderer>> {
    let renderer = match settings.preference {
        BackendPreference::Cpu => cpu_renderer(settings)?,
        BackendPreference::Gpu => gpu_renderer(settings)?,
        BackendPreference::Auto => match gpu_renderer(settings) {
            Ok(renderer) => renderer,
            Err(RenderError::BackendUnavailable(reason)) => {
                warn!(%reason, "GPU backend unavailable, falling back to CPU");
                cpu_renderer(settings)?
            }
            Err(e) => return Err(e),
        },
    };

    info!(
        backend = renderer.name(),
        particles = renderer.particle_count(),
        "renderer ready"
    );
    Ok(renderer)
}

/// Snapshot of the driver after a tick
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FrameReport {
    pub frame: u64,
    pub total_time: f32,
    pub phase: Phase,
    pub t_order: f32,
    /// Latest measured reading
    pub entropy: EntropyReading,
    /// Smoothed normalized entropy
    pub display: f32,
    /// Whether this tick brought in a new histogram
    pub histogram_updated: bool,
}

/// Drives one renderer through the order/chaos cycle
pub struct SimulationDriver {
    renderer: Box<dyn Renderer>,
    state: OrderChaosStateMachine,
    meter: EntropyMeter,
    total_time: f32,
    frame: u64,
    dropped_frames: u64,
    last_histogram: Option<[u32; NUM_BINS]>,
}

impl SimulationDriver {
    pub fn new(renderer: Box<dyn Renderer>) -> Self {
        Self::with_config(
            renderer,
            TransitionTimings::default(),
            EntropyConfig::default(),
        )
    }

    pub fn with_config(
        renderer: Box<dyn Renderer>,
        timings: TransitionTimings,
        entropy: EntropyConfig,
    ) -> Self {
        Self {
            renderer,
            state: OrderChaosStateMachine::with_timings(timings),
            meter: EntropyMeter::with_config(entropy),
            total_time: 0.0,
            frame: 0,
            dropped_frames: 0,
            last_histogram: None,
        }
    }

    /// Advance one frame.
    ///
    /// Renderer errors are logged and counted; the state machine and meter
    /// keep running so the next tick can recover.
    pub fn tick(&mut self, dt: f32, camera: &CameraFrame) -> FrameReport {
        let dt = dt.clamp(0.0, MAX_DT);
        self.total_time += dt;
        self.state.update(dt);
        let t_order = self.state.t_order();

        if let Err(e) = self.renderer.frame(dt, t_order, self.total_time, camera) {
            self.dropped_frames += 1;
            warn!(frame = self.frame, error = %e, "frame dropped");
        }

        let histogram = self.renderer.histogram();
        if let Some(counts) = &histogram {
            self.meter.compute(counts);
            self.last_histogram = Some(*counts);
        }
        self.meter.update_display(dt);

        let report = FrameReport {
            frame: self.frame,
            total_time: self.total_time,
            phase: self.state.phase(),
            t_order,
            entropy: self.meter.latest(),
            display: self.meter.display(),
            histogram_updated: histogram.is_some(),
        };
        self.frame += 1;
        report
    }

    /// Forward a user click to the state machine
    pub fn click(&mut self) -> bool {
        self.state.click()
    }

    pub fn phase(&self) -> Phase {
        self.state.phase()
    }

    pub fn t_order(&self) -> f32 {
        self.state.t_order()
    }

    pub fn state_machine(&self) -> &OrderChaosStateMachine {
        &self.state
    }

    pub fn meter(&self) -> &EntropyMeter {
        &self.meter
    }

    /// Most recent histogram received from the renderer
    pub fn last_histogram(&self) -> Option<&[u32; NUM_BINS]> {
        self.last_histogram.as_ref()
    }

    pub fn total_time(&self) -> f32 {
        self.total_time
    }

    pub fn frames(&self) -> u64 {
        self.frame
    }

    /// Frames whose renderer call returned an error
    pub fn dropped_frames(&self) -> u64 {
        self.dropped_frames
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        self.renderer.resize(width, height);
    }

    pub fn renderer(&self) -> &dyn Renderer {
        self.renderer.as_ref()
    }

    pub fn renderer_mut(&mut self) -> &mut dyn Renderer {
        self.renderer.as_mut()
    }
}
