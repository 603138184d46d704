//! GPU compute simulation and volumetric rendering (wgpu)
//!
//! The whole frame runs on the device: particles are integrated in a compute
//! pass, splatted into a fixed-point atomic density grid, binned into a
//! speed histogram, and the grid is raymarched in a fullscreen fragment pass.
//!
//! # Example
//!
//! ```rust,ignore
//! use crystal_entropy::camera::OrbitCamera;
//! use crystal_entropy::gpu::{GpuRendererSettings, GpuVolumetricRenderer};
//! use crystal_entropy::renderer::Renderer;
//!
//! let mut renderer = GpuVolumetricRenderer::new(GpuRendererSettings::default());
//! renderer.init()?;
//!
//! let camera = OrbitCamera::default().frame(0.0, [0.0, 0.0]);
//! renderer.frame(1.0 / 60.0, 1.0, 0.0, &camera)?;
//!
//! // Histograms arrive a frame or two late
//! if let Some(hist) = renderer.histogram() {
//!     println!("{hist:?}");
//! }
//! ```
//!
//! # Pipeline
//!
//! - **Integrate**: spring, hash noise, damping, speed clamp and boundary
//! - **Splat**: Gaussian kernel accumulated with `atomicAdd`
//! - **Bin**: 64-bin speed histogram
//! - **Raymarch**: 96-step Beer-Lambert march through the grid
//!
//! The histogram is copied to one of two staging buffers in a separate
//! submission and mapped asynchronously, so the host never stalls on it.

mod readback;
mod renderer;
mod shaders;
mod types;

pub use readback::{HISTOGRAM_BYTES, HistogramReadback};
pub use renderer::{GpuRendererSettings, GpuVolumetricRenderer, create_device};
pub use shaders::VolumeShaders;
pub use types::{GpuParticle, RenderUniforms, SimUniforms, WORKGROUP_SIZE};
