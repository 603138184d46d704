//! WGSL shaders for the volumetric backend
//!
//! The compute module holds three entry points sharing one bind group:
//! `integrate`, `splat` and `bin_histogram`. The render module is a
//! fullscreen-triangle raymarch over the density grid.
//!
//! The noise hash and the integration step mirror `rng` and `integrator`
//! exactly; the raymarch mirrors `volume::VolumeCompositor`.

/// Types and bindings shared by the compute entry points
pub const COMPUTE_TYPES: &str = r#"
struct Particle {
    position: vec3<f32>,
    speed: f32,
    velocity: vec3<f32>,
    _pad0: f32,
    home: vec3<f32>,
    _pad1: f32,
}

struct SimUniforms {
    dt: f32,
    t_order: f32,
    time_key: u32,
    particle_count: u32,
    spring_k: f32,
    noise_strength: f32,
    damping_chaos: f32,
    damping_ordered: f32,
    max_speed: f32,
    boundary_radius: f32,
    boundary_strength: f32,
    grid_resolution: u32,
    grid_half_extent: f32,
    splat_radius: f32,
    splat_strength: f32,
    speed_gain: f32,
    fixed_scale: f32,
    num_bins: u32,
    _pad0: u32,
    _pad1: u32,
}

@group(0) @binding(0) var<storage, read_write> particles: array<Particle>;
@group(0) @binding(1) var<storage, read_write> density: array<atomic<u32>>;
@group(0) @binding(2) var<storage, read_write> histogram: array<atomic<u32>>;
@group(0) @binding(3) var<uniform> uniforms: SimUniforms;
"#;

/// Stateless PCG hash and Box-Muller normal samples
pub const NOISE: &str = r#"
const TAU: f32 = 6.28318530718;

fn pcg_hash(input: u32) -> u32 {
    let state = input * 747796405u + 2891336453u;
    let word = ((state >> ((state >> 28u) + 4u)) ^ state) * 277803737u;
    return (word >> 22u) ^ word;
}

fn hash3(a: u32, b: u32, c: u32) -> u32 {
    return pcg_hash(a ^ pcg_hash(b ^ pcg_hash(c)));
}

fn hash_to_unit(h: u32) -> f32 {
    return f32(h >> 8u) / 16777216.0;
}

fn gaussian(time_key: u32, index: u32, sub_seed: u32) -> f32 {
    let u1 = max(hash_to_unit(hash3(time_key, index, sub_seed * 2u)), 1e-7);
    let u2 = hash_to_unit(hash3(time_key, index, sub_seed * 2u + 1u));
    return sqrt(-2.0 * log(u1)) * cos(TAU * u2);
}
"#;

/// Spring, noise, damping, speed clamp and soft boundary
pub const INTEGRATE: &str = r#"
@compute @workgroup_size(256)
fn integrate(@builtin(global_invocation_id) global_id: vec3<u32>) {
    let idx = global_id.x;
    if (idx >= uniforms.particle_count) {
        return;
    }

    var p = particles[idx];
    let t = clamp(uniforms.t_order, 0.0, 1.0);
    let dt = max(uniforms.dt, 0.0);

    let spring = (p.home - p.position) * (uniforms.spring_k * t);
    let n = vec3<f32>(
        gaussian(uniforms.time_key, idx, 0u),
        gaussian(uniforms.time_key, idx, 1u),
        gaussian(uniforms.time_key, idx, 2u),
    );
    let noise = n * (uniforms.noise_strength * (1.0 - t));
    let damping = mix(uniforms.damping_chaos, uniforms.damping_ordered, t);

    var v = p.velocity * damping + (spring + noise) * dt;
    let len = length(v);
    if (len > uniforms.max_speed && len > 1e-10) {
        v = v * (uniforms.max_speed / len);
    }

    let pos = p.position + v * dt;
    let dist = length(pos);
    if (dist > uniforms.boundary_radius) {
        let impulse = (dist - uniforms.boundary_radius) * uniforms.boundary_strength * dt;
        v = v - (pos / dist) * impulse;
    }

    p.position = pos;
    p.velocity = v;
    p.speed = length(v);
    particles[idx] = p;
}
"#;

/// Gaussian splat into the fixed-point density grid
pub const SPLAT: &str = r#"
@compute @workgroup_size(256)
fn splat(@builtin(global_invocation_id) global_id: vec3<u32>) {
    let idx = global_id.x;
    if (idx >= uniforms.particle_count) {
        return;
    }

    let p = particles[idx];
    let res = i32(uniforms.grid_resolution);
    let cell_size = 2.0 * uniforms.grid_half_extent / f32(uniforms.grid_resolution);
    let g = (p.position + vec3<f32>(uniforms.grid_half_extent)) * (1.0 / cell_size);
    let base = vec3<i32>(floor(g));
    let reach = i32(ceil(uniforms.splat_radius));
    let radius_sq = uniforms.splat_radius * uniforms.splat_radius;
    let sigma = uniforms.splat_radius * 0.5;
    let speed_factor = 1.0 + p.speed * uniforms.speed_gain;

    for (var dz = -reach; dz <= reach; dz += 1) {
        for (var dy = -reach; dy <= reach; dy += 1) {
            for (var dx = -reach; dx <= reach; dx += 1) {
                let cell = base + vec3<i32>(dx, dy, dz);
                if (any(cell < vec3<i32>(0)) || any(cell >= vec3<i32>(res))) {
                    continue;
                }
                let offset = vec3<f32>(cell) + vec3<f32>(0.5) - g;
                let d2 = dot(offset, offset);
                if (d2 > radius_sq) {
                    continue;
                }
                let weight = exp(-d2 / (2.0 * sigma * sigma));
                let value = u32(max(weight * uniforms.splat_strength * speed_factor * uniforms.fixed_scale, 0.0));
                if (value > 0u) {
                    let r = u32(res);
                    let cell_idx = u32(cell.x) + r * (u32(cell.y) + r * u32(cell.z));
                    atomicAdd(&density[cell_idx], value);
                }
            }
        }
    }
}
"#;

/// Speed histogram binning
pub const BIN_HISTOGRAM: &str = r#"
@compute @workgroup_size(256)
fn bin_histogram(@builtin(global_invocation_id) global_id: vec3<u32>) {
    let idx = global_id.x;
    if (idx >= uniforms.particle_count) {
        return;
    }

    var fraction = 0.0;
    if (uniforms.max_speed > 0.0) {
        fraction = clamp(particles[idx].speed / uniforms.max_speed, 0.0, 0.9999);
    }
    let bin = min(u32(floor(fraction * f32(uniforms.num_bins))), uniforms.num_bins - 1u);
    atomicAdd(&histogram[bin], 1u);
}
"#;

/// Fullscreen raymarch of the density grid
pub const RAYMARCH: &str = r#"
struct RenderUniforms {
    inv_view: mat4x4<f32>,
    inv_proj: mat4x4<f32>,
    eye: vec3<f32>,
    grid_half_extent: f32,
    resolution: vec2<f32>,
    grid_resolution: u32,
    steps: u32,
    absorption: f32,
    density_threshold: f32,
    inv_fixed_scale: f32,
    early_exit_alpha: f32,
    aabb_margin: f32,
    colour_scale: f32,
    emission_boost: f32,
    _pad: f32,
}

@group(0) @binding(0) var<storage, read> density: array<u32>;
@group(0) @binding(1) var<storage, read> lut: array<vec4<f32>>;
@group(0) @binding(2) var<uniform> u: RenderUniforms;

const BACKGROUND_CENTER: vec3<f32> = vec3<f32>(0.055, 0.05, 0.09);
const BACKGROUND_EDGE: vec3<f32> = vec3<f32>(0.008, 0.008, 0.018);

@vertex
fn vs_fullscreen(@builtin(vertex_index) vertex_index: u32) -> @builtin(position) vec4<f32> {
    let x = f32((vertex_index << 1u) & 2u);
    let y = f32(vertex_index & 2u);
    return vec4<f32>(x * 2.0 - 1.0, y * 2.0 - 1.0, 0.0, 1.0);
}

fn cell_density(x: u32, y: u32, z: u32) -> f32 {
    let r = u.grid_resolution;
    return f32(density[x + r * (y + r * z)]) * u.inv_fixed_scale;
}

fn sample_density(world: vec3<f32>) -> f32 {
    let res = f32(u.grid_resolution);
    let cell_size = 2.0 * u.grid_half_extent / res;
    let g = (world + vec3<f32>(u.grid_half_extent)) * (1.0 / cell_size);
    let c = clamp(g - vec3<f32>(0.5), vec3<f32>(0.0), vec3<f32>(res - 1.0));
    let i0 = vec3<u32>(floor(c));
    let i1 = min(i0 + vec3<u32>(1u), vec3<u32>(u.grid_resolution - 1u));
    let f = c - vec3<f32>(i0);

    let x00 = mix(cell_density(i0.x, i0.y, i0.z), cell_density(i1.x, i0.y, i0.z), f.x);
    let x10 = mix(cell_density(i0.x, i1.y, i0.z), cell_density(i1.x, i1.y, i0.z), f.x);
    let x01 = mix(cell_density(i0.x, i0.y, i1.z), cell_density(i1.x, i0.y, i1.z), f.x);
    let x11 = mix(cell_density(i0.x, i1.y, i1.z), cell_density(i1.x, i1.y, i1.z), f.x);
    return mix(mix(x00, x10, f.y), mix(x01, x11, f.y), f.z);
}

fn blackbody(t: f32) -> vec3<f32> {
    let last = arrayLength(&lut) - 1u;
    let idx = min(u32(floor(clamp(t, 0.0, 1.0) * f32(last) + 0.5)), last);
    return lut[idx].rgb;
}

fn background(uv: vec2<f32>) -> vec3<f32> {
    return mix(BACKGROUND_CENTER, BACKGROUND_EDGE, smoothstep(0.0, 0.75, length(uv - vec2<f32>(0.5))));
}

fn vignette(uv: vec2<f32>) -> f32 {
    return 1.0 - 0.55 * smoothstep(0.35, 0.85, length(uv - vec2<f32>(0.5)));
}

// Returns (t_near, t_far); a miss has t_near > t_far
fn intersect_aabb(origin: vec3<f32>, dir: vec3<f32>, half_size: f32) -> vec2<f32> {
    var t_near = -1e30;
    var t_far = 1e30;
    for (var axis = 0; axis < 3; axis += 1) {
        let o = origin[axis];
        let d = dir[axis];
        if (abs(d) < 1e-8) {
            if (o < -half_size || o > half_size) {
                return vec2<f32>(1.0, -1.0);
            }
            continue;
        }
        let inv = 1.0 / d;
        let t0 = (-half_size - o) * inv;
        let t1 = (half_size - o) * inv;
        t_near = max(t_near, min(t0, t1));
        t_far = min(t_far, max(t0, t1));
    }
    return vec2<f32>(t_near, t_far);
}

@fragment
fn fs_raymarch(@builtin(position) frag_coord: vec4<f32>) -> @location(0) vec4<f32> {
    let uv = frag_coord.xy / u.resolution;
    let ndc = vec2<f32>(uv.x * 2.0 - 1.0, 1.0 - uv.y * 2.0);
    let view = u.inv_proj * vec4<f32>(ndc, -1.0, 1.0);
    let dir_view = view.xyz / view.w;
    let dir = normalize((u.inv_view * vec4<f32>(dir_view, 0.0)).xyz);

    var acc_c = vec3<f32>(0.0);
    var acc_a = 0.0;

    let hit = intersect_aabb(u.eye, dir, u.grid_half_extent + u.aabb_margin);
    if (hit.x <= hit.y && hit.y > 0.0 && u.steps > 0u) {
        let t_start = max(hit.x, 0.0);
        let step_size = (hit.y - t_start) / f32(u.steps);
        for (var i = 0u; i < u.steps; i += 1u) {
            let t = t_start + (f32(i) + 0.5) * step_size;
            let d = sample_density(u.eye + dir * t);
            if (d > u.density_threshold) {
                let alpha = 1.0 - exp(-d * u.absorption * step_size);
                let emission = blackbody(d / u.colour_scale) * (1.0 + d * u.emission_boost);
                let weight = alpha * (1.0 - acc_a);
                acc_c += emission * weight;
                acc_a += weight;
            }
            if (acc_a > u.early_exit_alpha) {
                break;
            }
        }
    }

    let colour = acc_c + background(uv) * (1.0 - acc_a);
    return vec4<f32>(colour * vignette(uv), 1.0);
}
"#;

/// Shader sources handed to the GPU backend
#[derive(Debug, Clone)]
pub struct VolumeShaders {
    /// Compute module with `integrate`, `splat` and `bin_histogram`
    pub compute: String,
    /// Render module with `vs_fullscreen` and `fs_raymarch`
    pub render: String,
}

impl VolumeShaders {
    pub fn new() -> Self {
        Self {
            compute: format!(
                "{}\n{}\n{}\n{}\n{}",
                COMPUTE_TYPES, NOISE, INTEGRATE, SPLAT, BIN_HISTOGRAM
            ),
            render: RAYMARCH.to_string(),
        }
    }
}

impl Default for VolumeShaders {
    fn default() -> Self {
        Self::new()
    }
}
