//! Time- and mouse-driven orbit camera
//!
//! Produces the `{ eye, view_matrix }` pair each renderer consumes, plus the
//! projection both compositors share.

use std::f32::consts::{FRAC_PI_2, PI};

use serde::{Deserialize, Serialize};

use crate::math::{Mat4, cross, dot, normalize, sub};
use crate::renderer::CameraFrame;

/// Default field of view in radians (45 degrees)
pub const DEFAULT_FOV: f32 = PI / 4.0;

/// Default near clip plane
pub const DEFAULT_NEAR: f32 = 0.1;

/// Default far clip plane
pub const DEFAULT_FAR: f32 = 100.0;

/// Default camera distance from the origin
pub const DEFAULT_DISTANCE: f32 = 12.0;

/// Default orbit rate in radians per second
pub const DEFAULT_ORBIT_SPEED: f32 = 0.15;

/// Elevation angle limit (prevent gimbal lock)
const ELEVATION_LIMIT: f32 = FRAC_PI_2 - 0.01;

/// Camera settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraParams {
    pub distance: f32,
    /// Resting elevation in radians
    pub elevation: f32,
    pub orbit_speed: f32,
    /// Maximum extra angle, in radians, a full mouse deflection adds
    pub parallax: f32,
    pub fov: f32,
    pub near: f32,
    pub far: f32,
}

impl Default for CameraParams {
    fn default() -> Self {
        Self {
            distance: DEFAULT_DISTANCE,
            elevation: 0.35,
            orbit_speed: DEFAULT_ORBIT_SPEED,
            parallax: 0.25,
            fov: DEFAULT_FOV,
            near: DEFAULT_NEAR,
            far: DEFAULT_FAR,
        }
    }
}

/// Slow automatic orbit around the origin with mouse parallax.
///
/// Mouse coordinates are normalized to `[-1, 1]` on both axes.
#[derive(Debug, Clone, Default)]
pub struct OrbitCamera {
    params: CameraParams,
}

impl OrbitCamera {
    pub fn new(params: CameraParams) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &CameraParams {
        &self.params
    }

    /// Eye position at `time` seconds with the given mouse offset
    pub fn position(&self, time: f32, mouse: [f32; 2]) -> [f32; 3] {
        let p = &self.params;
        let mouse = [mouse[0].clamp(-1.0, 1.0), mouse[1].clamp(-1.0, 1.0)];
        let azimuth = time * p.orbit_speed + mouse[0] * p.parallax;
        let elevation =
            (p.elevation + mouse[1] * p.parallax).clamp(-ELEVATION_LIMIT, ELEVATION_LIMIT);

        let cos_elev = elevation.cos();
        [
            p.distance * cos_elev * azimuth.sin(),
            p.distance * elevation.sin(),
            p.distance * cos_elev * azimuth.cos(),
        ]
    }

    /// Camera frame handed to the renderer
    pub fn frame(&self, time: f32, mouse: [f32; 2]) -> CameraFrame {
        let eye = self.position(time, mouse);
        CameraFrame {
            eye,
            view_matrix: look_at(eye, [0.0, 0.0, 0.0], [0.0, 1.0, 0.0]),
        }
    }

    /// Perspective projection for a target aspect ratio
    pub fn projection_matrix(&self, aspect: f32) -> Mat4 {
        perspective(self.params.fov, aspect, self.params.near, self.params.far)
    }
}

/// Compute a look-at view matrix
pub fn look_at(eye: [f32; 3], target: [f32; 3], up: [f32; 3]) -> Mat4 {
    let f = normalize(sub(target, eye));
    let r = normalize(cross(f, up));
    let u = cross(r, f);

    // Right-handed, camera looks down -Z
    [
        [r[0], u[0], -f[0], 0.0],
        [r[1], u[1], -f[1], 0.0],
        [r[2], u[2], -f[2], 0.0],
        [-dot(r, eye), -dot(u, eye), dot(f, eye), 1.0],
    ]
}

/// Compute a perspective projection matrix (column-major)
pub fn perspective(fov: f32, aspect: f32, near: f32, far: f32) -> Mat4 {
    let f = 1.0 / (fov / 2.0).tan();
    let nf = 1.0 / (near - far);

    [
        [f / aspect, 0.0, 0.0, 0.0],
        [0.0, f, 0.0, 0.0],
        [0.0, 0.0, (far + near) * nf, -1.0],
        [0.0, 0.0, 2.0 * far * near * nf, 0.0],
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::{length, mul_vec4};

    #[test]
    fn eye_stays_on_orbit_sphere() {
        let camera = OrbitCamera::default();
        for i in 0..20 {
            let t = i as f32 * 1.7;
            let mouse = [(t * 0.3).sin(), (t * 0.7).cos()];
            let eye = camera.position(t, mouse);
            assert!((length(eye) - DEFAULT_DISTANCE).abs() < 1e-3);
        }
    }

    #[test]
    fn starts_on_positive_z_without_input() {
        let camera = OrbitCamera::new(CameraParams {
            elevation: 0.0,
            ..Default::default()
        });
        let eye = camera.position(0.0, [0.0, 0.0]);
        assert!(eye[0].abs() < 1e-4);
        assert!(eye[1].abs() < 1e-4);
        assert!((eye[2] - DEFAULT_DISTANCE).abs() < 1e-4);
    }

    #[test]
    fn mouse_is_clamped() {
        let camera = OrbitCamera::default();
        assert_eq!(
            camera.position(1.0, [5.0, -5.0]),
            camera.position(1.0, [1.0, -1.0])
        );
    }

    #[test]
    fn view_matrix_maps_origin_in_front_of_camera() {
        let camera = OrbitCamera::default();
        let frame = camera.frame(2.5, [0.2, -0.1]);
        let view_origin = mul_vec4(&frame.view_matrix, [0.0, 0.0, 0.0, 1.0]);
        assert!(view_origin[0].abs() < 1e-4);
        assert!(view_origin[1].abs() < 1e-4);
        assert!((view_origin[2] + DEFAULT_DISTANCE).abs() < 1e-3);

        let view_eye = mul_vec4(
            &frame.view_matrix,
            [frame.eye[0], frame.eye[1], frame.eye[2], 1.0],
        );
        for c in &view_eye[..3] {
            assert!(c.abs() < 1e-4);
        }
    }

    #[test]
    fn projection_puts_near_plane_at_minus_one() {
        let proj = perspective(DEFAULT_FOV, 1.5, 0.1, 100.0);
        let clip = mul_vec4(&proj, [0.0, 0.0, -0.1, 1.0]);
        assert!((clip[2] / clip[3] + 1.0).abs() < 1e-4);
        let clip = mul_vec4(&proj, [0.0, 0.0, -100.0, 1.0]);
        assert!((clip[2] / clip[3] - 1.0).abs() < 1e-3);
    }
}
