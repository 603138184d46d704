//! GPU volumetric renderer
//!
//! Runs the whole per-frame pipeline on the device: integrate particles,
//! splat them into an atomic density grid, bin speeds into a histogram, and
//! raymarch the grid into an offscreen colour target. The histogram comes
//! back through a double-buffered async readback so the visible frame never
//! waits on the host.

use std::sync::mpsc;

use tracing::{debug, info};
use wgpu::util::DeviceExt;

use super::readback::{HISTOGRAM_BYTES, HistogramReadback};
use super::shaders::VolumeShaders;
use super::types::{GpuParticle, RenderUniforms, SimUniforms, WORKGROUP_SIZE};
use crate::camera::{CameraParams, perspective};
use crate::density::DensityParams;
use crate::error::{RenderError, RenderResult};
use crate::histogram::NUM_BINS;
use crate::integrator::IntegratorParams;
use crate::math::{self, Mat4};
use crate::palette::blackbody_lut;
use crate::particle::{Particle, crystal};
use crate::renderer::{CameraFrame, Renderer};
use crate::rng::time_key;
use crate::volume::VolumeParams;

/// Colour target format; linear so output matches the CPU reference
const COLOR_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8Unorm;

/// Everything the GPU backend needs before `init`
#[derive(Debug, Clone)]
pub struct GpuRendererSettings {
    pub particle_count: usize,
    pub integrator: IntegratorParams,
    pub density: DensityParams,
    pub volume: VolumeParams,
    pub camera: CameraParams,
    pub width: u32,
    pub height: u32,
    pub shaders: VolumeShaders,
}

impl Default for GpuRendererSettings {
    fn default() -> Self {
        Self {
            particle_count: crate::particle::GPU_PARTICLE_COUNT,
            integrator: IntegratorParams::default(),
            density: DensityParams::default(),
            volume: VolumeParams::default(),
            camera: CameraParams::default(),
            width: 640,
            height: 360,
            shaders: VolumeShaders::default(),
        }
    }
}

/// Request an adapter and device, mapping failures to `RenderError`
pub async fn create_device() -> RenderResult<(wgpu::Device, wgpu::Queue)> {
    let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
        backends: wgpu::Backends::all(),
        ..Default::default()
    });

    let adapter = instance
        .request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::HighPerformance,
            compatible_surface: None,
            force_fallback_adapter: false,
        })
        .await
        .ok_or_else(|| RenderError::BackendUnavailable("no suitable GPU adapter".into()))?;

    let adapter_info = adapter.get_info();
    debug!(adapter = %adapter_info.name, backend = ?adapter_info.backend, "adapter selected");

    adapter
        .request_device(
            &wgpu::DeviceDescriptor {
                label: Some("Volumetric Device"),
                required_features: wgpu::Features::empty(),
                required_limits: wgpu::Limits::default(),
                memory_hints: wgpu::MemoryHints::default(),
            },
            None, // trace path
        )
        .await
        .map_err(|e| RenderError::BackendUnavailable(format!("device request failed: {e}")))
}

fn buffer_entry(
    binding: u32,
    visibility: wgpu::ShaderStages,
    ty: wgpu::BufferBindingType,
) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility,
        ty: wgpu::BindingType::Buffer {
            ty,
            has_dynamic_offset: false,
            min_binding_size: None,
        },
        count: None,
    }
}

fn storage_entry(
    binding: u32,
    visibility: wgpu::ShaderStages,
    read_only: bool,
) -> wgpu::BindGroupLayoutEntry {
    buffer_entry(
        binding,
        visibility,
        wgpu::BufferBindingType::Storage { read_only },
    )
}

fn uniform_entry(binding: u32, visibility: wgpu::ShaderStages) -> wgpu::BindGroupLayoutEntry {
    buffer_entry(binding, visibility, wgpu::BufferBindingType::Uniform)
}

/// Offscreen colour target plus its padded readback buffer
struct Target {
    texture: wgpu::Texture,
    staging: wgpu::Buffer,
    width: u32,
    height: u32,
    padded_bytes_per_row: u32,
}

impl Target {
    fn new(device: &wgpu::Device, width: u32, height: u32) -> Self {
        let width = width.max(1);
        let height = height.max(1);
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("Volume Color Texture"),
            size: wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: COLOR_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::COPY_SRC,
            view_formats: &[],
        });

        // Rows must be a multiple of COPY_BYTES_PER_ROW_ALIGNMENT (256)
        let align = wgpu::COPY_BYTES_PER_ROW_ALIGNMENT;
        let padded_bytes_per_row = (width * 4).div_ceil(align) * align;
        let staging = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Pixel Staging Buffer"),
            size: (padded_bytes_per_row * height) as u64,
            usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
            mapped_at_creation: false,
        });

        Self {
            texture,
            staging,
            width,
            height,
            padded_bytes_per_row,
        }
    }
}

/// Device resources, created by `init`
struct GpuState {
    device: wgpu::Device,
    queue: wgpu::Queue,

    integrate_pipeline: wgpu::ComputePipeline,
    splat_pipeline: wgpu::ComputePipeline,
    bin_pipeline: wgpu::ComputePipeline,
    render_pipeline: wgpu::RenderPipeline,

    compute_bind_group: wgpu::BindGroup,
    render_bind_group: wgpu::BindGroup,

    particle_buffer: wgpu::Buffer,
    density_buffer: wgpu::Buffer,
    histogram_buffer: wgpu::Buffer,
    sim_uniform_buffer: wgpu::Buffer,
    render_uniform_buffer: wgpu::Buffer,
    // Kept alive for the render bind group
    _lut_buffer: wgpu::Buffer,

    target: Target,
    readback: HistogramReadback,
}

/// Compute-shader simulation with a raymarched volume
pub struct GpuVolumetricRenderer {
    settings: GpuRendererSettings,
    initial: Vec<GpuParticle>,
    state: Option<GpuState>,
    frame_index: u64,
    rendered: bool,
}

impl GpuVolumetricRenderer {
    pub fn new(settings: GpuRendererSettings) -> Self {
        let initial = crystal(settings.particle_count)
            .iter()
            .map(GpuParticle::from)
            .collect();
        Self {
            settings,
            initial,
            state: None,
            frame_index: 0,
            rendered: false,
        }
    }

    pub fn settings(&self) -> &GpuRendererSettings {
        &self.settings
    }

    fn state(&self) -> RenderResult<&GpuState> {
        self.state.as_ref().ok_or(RenderError::NotInitialized)
    }

    fn projection(&self, width: u32, height: u32) -> Mat4 {
        let camera = &self.settings.camera;
        perspective(
            camera.fov,
            width as f32 / height.max(1) as f32,
            camera.near,
            camera.far,
        )
    }

    fn build_state(&self, device: wgpu::Device, queue: wgpu::Queue) -> RenderResult<GpuState> {
        let settings = &self.settings;

        device.push_error_scope(wgpu::ErrorFilter::Validation);

        let compute_module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Volume Compute Shader"),
            source: wgpu::ShaderSource::Wgsl(settings.shaders.compute.as_str().into()),
        });
        let render_module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Volume Render Shader"),
            source: wgpu::ShaderSource::Wgsl(settings.shaders.render.as_str().into()),
        });

        let compute_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Volume Compute Bind Group Layout"),
            entries: &[
                storage_entry(0, wgpu::ShaderStages::COMPUTE, false),
                storage_entry(1, wgpu::ShaderStages::COMPUTE, false),
                storage_entry(2, wgpu::ShaderStages::COMPUTE, false),
                uniform_entry(3, wgpu::ShaderStages::COMPUTE),
            ],
        });
        let render_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Volume Render Bind Group Layout"),
            entries: &[
                storage_entry(0, wgpu::ShaderStages::FRAGMENT, true),
                storage_entry(1, wgpu::ShaderStages::FRAGMENT, true),
                uniform_entry(2, wgpu::ShaderStages::FRAGMENT),
            ],
        });

        let compute_pipeline_layout =
            device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some("Volume Compute Pipeline Layout"),
                bind_group_layouts: &[&compute_layout],
                push_constant_ranges: &[],
            });
        let render_pipeline_layout =
            device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some("Volume Render Pipeline Layout"),
                bind_group_layouts: &[&render_layout],
                push_constant_ranges: &[],
            });

        let compute_pipeline = |label: &str, entry_point: &str| {
            device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
                label: Some(label),
                layout: Some(&compute_pipeline_layout),
                module: &compute_module,
                entry_point: Some(entry_point),
                compilation_options: Default::default(),
                cache: None,
            })
        };
        let integrate_pipeline = compute_pipeline("Integrate Pipeline", "integrate");
        let splat_pipeline = compute_pipeline("Splat Pipeline", "splat");
        let bin_pipeline = compute_pipeline("Histogram Pipeline", "bin_histogram");

        let render_pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("Raymarch Pipeline"),
            layout: Some(&render_pipeline_layout),
            vertex: wgpu::VertexState {
                module: &render_module,
                entry_point: Some("vs_fullscreen"),
                compilation_options: wgpu::PipelineCompilationOptions::default(),
                buffers: &[],
            },
            fragment: Some(wgpu::FragmentState {
                module: &render_module,
                entry_point: Some("fs_raymarch"),
                compilation_options: wgpu::PipelineCompilationOptions::default(),
                targets: &[Some(wgpu::ColorTargetState {
                    format: COLOR_FORMAT,
                    blend: None,
                    write_mask: wgpu::ColorWrites::ALL,
                })],
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                cull_mode: None,
                ..Default::default()
            },
            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
            cache: None,
        });

        // Empty particle sets still need a non-zero binding
        let particle_buffer = if self.initial.is_empty() {
            device.create_buffer(&wgpu::BufferDescriptor {
                label: Some("Particle Buffer (empty)"),
                size: std::mem::size_of::<GpuParticle>() as u64,
                usage: wgpu::BufferUsages::STORAGE
                    | wgpu::BufferUsages::COPY_DST
                    | wgpu::BufferUsages::COPY_SRC,
                mapped_at_creation: false,
            })
        } else {
            device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("Particle Buffer"),
                contents: bytemuck::cast_slice(&self.initial),
                usage: wgpu::BufferUsages::STORAGE
                    | wgpu::BufferUsages::COPY_DST
                    | wgpu::BufferUsages::COPY_SRC,
            })
        };

        let res = settings.density.resolution as u64;
        let density_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Density Grid Buffer"),
            size: res * res * res * 4,
            usage: wgpu::BufferUsages::STORAGE
                | wgpu::BufferUsages::COPY_DST
                | wgpu::BufferUsages::COPY_SRC,
            mapped_at_creation: false,
        });

        let histogram_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Histogram Buffer"),
            size: HISTOGRAM_BYTES,
            usage: wgpu::BufferUsages::STORAGE
                | wgpu::BufferUsages::COPY_DST
                | wgpu::BufferUsages::COPY_SRC,
            mapped_at_creation: false,
        });

        let sim_uniforms = SimUniforms::new(
            &settings.integrator,
            &settings.density,
            self.initial.len() as u32,
        );
        let sim_uniform_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Sim Uniform Buffer"),
            contents: bytemuck::bytes_of(&sim_uniforms),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });

        let render_uniform_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Render Uniform Buffer"),
            size: std::mem::size_of::<RenderUniforms>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let lut = blackbody_lut();
        let lut_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Blackbody LUT Buffer"),
            contents: bytemuck::cast_slice(&lut),
            usage: wgpu::BufferUsages::STORAGE,
        });

        let compute_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Volume Compute Bind Group"),
            layout: &compute_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: particle_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: density_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: histogram_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 3,
                    resource: sim_uniform_buffer.as_entire_binding(),
                },
            ],
        });
        let render_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Volume Render Bind Group"),
            layout: &render_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: density_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: lut_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: render_uniform_buffer.as_entire_binding(),
                },
            ],
        });

        if let Some(error) = pollster::block_on(device.pop_error_scope()) {
            return Err(RenderError::Device(error.to_string()));
        }

        let target = Target::new(&device, settings.width, settings.height);
        let readback = HistogramReadback::new(&device);

        Ok(GpuState {
            device,
            queue,
            integrate_pipeline,
            splat_pipeline,
            bin_pipeline,
            render_pipeline,
            compute_bind_group,
            render_bind_group,
            particle_buffer,
            density_buffer,
            histogram_buffer,
            sim_uniform_buffer,
            render_uniform_buffer,
            _lut_buffer: lut_buffer,
            target,
            readback,
        })
    }

    /// Blocking copy of a storage buffer to the host
    fn read_buffer<T: bytemuck::Pod>(
        state: &GpuState,
        source: &wgpu::Buffer,
        size: u64,
    ) -> RenderResult<Vec<T>> {
        let staging = state.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Debug Readback Buffer"),
            size,
            usage: wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let mut encoder = state
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Debug Readback Encoder"),
            });
        encoder.copy_buffer_to_buffer(source, 0, &staging, 0, size);
        state.queue.submit(std::iter::once(encoder.finish()));

        let slice = staging.slice(..);
        let (tx, rx) = mpsc::channel();
        slice.map_async(wgpu::MapMode::Read, move |result| {
            let _ = tx.send(result);
        });
        let _ = state.device.poll(wgpu::Maintain::Wait);
        rx.recv()
            .map_err(|e| RenderError::Readback(e.to_string()))?
            .map_err(|e| RenderError::Readback(e.to_string()))?;

        // Mapped ranges are aligned, so the cast happens before the copy
        let values = {
            let data = slice.get_mapped_range();
            bytemuck::cast_slice::<u8, T>(&data).to_vec()
        };
        staging.unmap();
        Ok(values)
    }

    /// Blocking read of the current particle state
    pub fn read_particles(&self) -> RenderResult<Vec<Particle>> {
        let state = self.state()?;
        if self.initial.is_empty() {
            return Ok(Vec::new());
        }
        let size = std::mem::size_of_val(self.initial.as_slice()) as u64;
        let particles: Vec<GpuParticle> = Self::read_buffer(state, &state.particle_buffer, size)?;
        Ok(particles.iter().map(GpuParticle::to_particle).collect())
    }

    /// Blocking read of the raw fixed-point density grid
    pub fn read_density(&self) -> RenderResult<Vec<u32>> {
        let state = self.state()?;
        Self::read_buffer(state, &state.density_buffer, state.density_buffer.size())
    }

    /// Block until any in-flight histogram copy lands
    pub fn wait_histogram(&mut self) -> Option<[u32; NUM_BINS]> {
        let state = self.state.as_mut()?;
        state.readback.wait(&state.device)
    }
}

impl Renderer for GpuVolumetricRenderer {
    fn init(&mut self) -> RenderResult<()> {
        if self.state.is_some() {
            return Ok(());
        }
        let (device, queue) = pollster::block_on(create_device())?;
        let state = self.build_state(device, queue)?;
        info!(
            particles = self.initial.len(),
            grid = self.settings.density.resolution,
            width = state.target.width,
            height = state.target.height,
            "gpu volumetric renderer initialized"
        );
        self.state = Some(state);
        Ok(())
    }

    fn frame(
        &mut self,
        dt: f32,
        t_order: f32,
        total_time: f32,
        camera: &CameraFrame,
    ) -> RenderResult<()> {
        let state = self.state.as_ref().ok_or(RenderError::NotInitialized)?;
        let settings = &self.settings;
        let particle_count = self.initial.len() as u32;

        let base = SimUniforms::new(&settings.integrator, &settings.density, particle_count);
        let sim_uniforms = base.with_frame(dt, t_order, time_key(total_time));
        state.queue.write_buffer(
            &state.sim_uniform_buffer,
            0,
            bytemuck::bytes_of(&sim_uniforms),
        );

        let (width, height) = (state.target.width, state.target.height);
        let projection = self.projection(width, height);
        let inv_proj = math::inverse(&projection)
            .ok_or_else(|| RenderError::Device("singular projection matrix".into()))?;
        let inv_view = math::inverse(&camera.view_matrix)
            .ok_or_else(|| RenderError::Device("singular view matrix".into()))?;
        let render_uniforms = RenderUniforms::new(
            inv_view,
            inv_proj,
            camera.eye,
            (width, height),
            &settings.density,
            &settings.volume,
        );
        state.queue.write_buffer(
            &state.render_uniform_buffer,
            0,
            bytemuck::bytes_of(&render_uniforms),
        );

        let workgroups = particle_count.div_ceil(WORKGROUP_SIZE).max(1);
        let mut encoder = state
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Volume Frame Encoder"),
            });

        encoder.clear_buffer(&state.density_buffer, 0, None);

        for (label, pipeline) in [
            ("Integrate Pass", &state.integrate_pipeline),
            ("Splat Pass", &state.splat_pipeline),
        ] {
            let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
                label: Some(label),
                timestamp_writes: None,
            });
            pass.set_pipeline(pipeline);
            pass.set_bind_group(0, &state.compute_bind_group, &[]);
            pass.dispatch_workgroups(workgroups, 1, 1);
        }

        encoder.clear_buffer(&state.histogram_buffer, 0, None);
        {
            let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
                label: Some("Histogram Pass"),
                timestamp_writes: None,
            });
            pass.set_pipeline(&state.bin_pipeline);
            pass.set_bind_group(0, &state.compute_bind_group, &[]);
            pass.dispatch_workgroups(workgroups, 1, 1);
        }

        let color_view = state
            .target
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());
        {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Raymarch Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &color_view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
            });
            render_pass.set_pipeline(&state.render_pipeline);
            render_pass.set_bind_group(0, &state.render_bind_group, &[]);
            render_pass.draw(0..3, 0..1);
        }

        state.queue.submit(std::iter::once(encoder.finish()));

        let frame = self.frame_index;
        let state = self.state.as_mut().ok_or(RenderError::NotInitialized)?;
        state
            .readback
            .schedule(&state.device, &state.queue, &state.histogram_buffer, frame);

        self.frame_index += 1;
        self.rendered = true;
        Ok(())
    }

    fn histogram(&mut self) -> Option<[u32; NUM_BINS]> {
        let state = self.state.as_mut()?;
        state.readback.poll(&state.device)
    }

    fn resize(&mut self, width: u32, height: u32) {
        self.settings.width = width;
        self.settings.height = height;
        if let Some(state) = self.state.as_mut() {
            debug!(width, height, "resize volume target");
            state.target = Target::new(&state.device, width, height);
            self.rendered = false;
        }
    }

    fn read_pixels(&mut self) -> RenderResult<Vec<u8>> {
        let state = self.state()?;
        if !self.rendered {
            return Err(RenderError::Readback("no frame rendered yet".into()));
        }
        let target = &state.target;
        let unpadded_bytes_per_row = target.width * 4;

        let mut encoder = state
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Pixel Readback Encoder"),
            });
        encoder.copy_texture_to_buffer(
            wgpu::TexelCopyTextureInfo {
                texture: &target.texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            wgpu::TexelCopyBufferInfo {
                buffer: &target.staging,
                layout: wgpu::TexelCopyBufferLayout {
                    offset: 0,
                    bytes_per_row: Some(target.padded_bytes_per_row),
                    rows_per_image: Some(target.height),
                },
            },
            wgpu::Extent3d {
                width: target.width,
                height: target.height,
                depth_or_array_layers: 1,
            },
        );
        state.queue.submit(std::iter::once(encoder.finish()));

        let buffer_slice = target.staging.slice(..);
        let (tx, rx) = mpsc::channel();
        buffer_slice.map_async(wgpu::MapMode::Read, move |result| {
            let _ = tx.send(result);
        });
        let _ = state.device.poll(wgpu::Maintain::Wait);
        rx.recv()
            .map_err(|e| RenderError::Readback(e.to_string()))?
            .map_err(|e| RenderError::Readback(e.to_string()))?;

        let mut pixels = Vec::with_capacity((target.width * target.height * 4) as usize);
        {
            let data = buffer_slice.get_mapped_range();
            // Remove padding from each row
            for y in 0..target.height {
                let start = (y * target.padded_bytes_per_row) as usize;
                let end = start + unpadded_bytes_per_row as usize;
                pixels.extend_from_slice(&data[start..end]);
            }
        }
        target.staging.unmap();
        Ok(pixels)
    }

    fn name(&self) -> &'static str {
        "gpu-volumetric"
    }

    fn particle_count(&self) -> usize {
        self.initial.len()
    }

    fn size(&self) -> (u32, u32) {
        match &self.state {
            Some(state) => (state.target.width, state.target.height),
            None => (self.settings.width, self.settings.height),
        }
    }
}
