//! Renderer contract shared by the GPU volumetric and CPU glow backends
//!
//! A renderer owns its particles and everything downstream of them: it
//! integrates, builds its speed histogram, and draws into an offscreen
//! target. The driver only hands it timing, `t_order` and a camera.

use crate::error::RenderResult;
use crate::histogram::NUM_BINS;
use crate::math::{IDENTITY, Mat4};

/// Camera state for one frame
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraFrame {
    /// Eye position in world space
    pub eye: [f32; 3],
    /// World-to-view transform (column-major)
    pub view_matrix: Mat4,
}

impl Default for CameraFrame {
    fn default() -> Self {
        Self {
            eye: [0.0, 0.0, 0.0],
            view_matrix: IDENTITY,
        }
    }
}

/// A simulation backend that also draws the frame
///
/// Implementations are responsible for:
/// - Integrating their own particle set each frame
/// - Rebuilding the speed histogram from the integrated speeds
/// - Compositing the result into an offscreen RGBA target
pub trait Renderer {
    /// Acquire device resources; must be called once before `frame`
    fn init(&mut self) -> RenderResult<()>;

    /// Advance and draw one frame
    fn frame(
        &mut self,
        dt: f32,
        t_order: f32,
        total_time: f32,
        camera: &CameraFrame,
    ) -> RenderResult<()>;

    /// Newest histogram that is ready without blocking, if any.
    ///
    /// Returns `None` when no new histogram is available yet; callers keep
    /// their previous value.
    fn histogram(&mut self) -> Option<[u32; NUM_BINS]>;

    /// Resize the render target
    fn resize(&mut self, width: u32, height: u32);

    /// Read back the last frame as tightly packed RGBA8 rows
    fn read_pixels(&mut self) -> RenderResult<Vec<u8>>;

    /// Short backend name for logs and reports
    fn name(&self) -> &'static str;

    fn particle_count(&self) -> usize;

    /// Current render target size in pixels
    fn size(&self) -> (u32, u32);
}
