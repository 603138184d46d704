//! Colour ramps shared by both compositors

use crate::math::{mix3, smoothstep};

/// Number of entries in the blackbody lookup table
pub const BLACKBODY_LUT_SIZE: usize = 256;

/// Glow gradient stops, slow to fast
pub const GLOW_TEAL: [f32; 3] = [0.08, 0.75, 0.78];
pub const GLOW_AMBER: [f32; 3] = [1.0, 0.58, 0.12];
pub const GLOW_WHITE: [f32; 3] = [1.0, 1.0, 1.0];

/// Background colour at the centre of the frame
pub const BACKGROUND_CENTER: [f32; 3] = [0.055, 0.05, 0.09];

/// Background colour at the corners
pub const BACKGROUND_EDGE: [f32; 3] = [0.008, 0.008, 0.018];

/// Blackbody-style ramp: black, deep red, orange, yellow, white
pub fn blackbody(t: f32) -> [f32; 3] {
    let t = t.clamp(0.0, 1.0);
    [
        smoothstep(0.0, 0.4, t),
        smoothstep(0.2, 0.75, t) * 0.92,
        smoothstep(0.55, 1.0, t) * 0.85,
    ]
}

/// Build the 256-entry blackbody table uploaded to the GPU
pub fn blackbody_lut() -> Vec<[f32; 4]> {
    (0..BLACKBODY_LUT_SIZE)
        .map(|i| {
            let c = blackbody(i as f32 / (BLACKBODY_LUT_SIZE - 1) as f32);
            [c[0], c[1], c[2], 1.0]
        })
        .collect()
}

/// Table index for a lookup value in `[0, 1]` (nearest entry)
pub fn lut_index(t: f32) -> usize {
    let max = (BLACKBODY_LUT_SIZE - 1) as f32;
    // NaN casts to 0
    ((t.clamp(0.0, 1.0) * max + 0.5).floor() as usize).min(BLACKBODY_LUT_SIZE - 1)
}

/// Nearest-entry lookup into a blackbody table
pub fn sample_lut(lut: &[[f32; 4]], t: f32) -> [f32; 3] {
    match lut.get(lut_index(t)) {
        Some(c) => [c[0], c[1], c[2]],
        None => [0.0, 0.0, 0.0],
    }
}

/// Speed-driven sprite colour: teal at rest, amber mid-range, white at max
pub fn glow_gradient(t: f32) -> [f32; 3] {
    let t = t.clamp(0.0, 1.0);
    if t < 0.5 {
        mix3(GLOW_TEAL, GLOW_AMBER, t * 2.0)
    } else {
        mix3(GLOW_AMBER, GLOW_WHITE, (t - 0.5) * 2.0)
    }
}

/// Distance of a UV coordinate from the frame centre
fn radial(uv: [f32; 2]) -> f32 {
    let dx = uv[0] - 0.5;
    let dy = uv[1] - 0.5;
    (dx * dx + dy * dy).sqrt()
}

/// Fixed radial background gradient
pub fn background(uv: [f32; 2]) -> [f32; 3] {
    mix3(
        BACKGROUND_CENTER,
        BACKGROUND_EDGE,
        smoothstep(0.0, 0.75, radial(uv)),
    )
}

/// Radial vignette multiplier, 1 at the centre
pub fn vignette(uv: [f32; 2]) -> f32 {
    1.0 - 0.55 * smoothstep(0.35, 0.85, radial(uv))
}

/// Convert a linear `[0, 1]` channel to a byte
pub fn to_u8(c: f32) -> u8 {
    (c.clamp(0.0, 1.0) * 255.0 + 0.5) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blackbody_runs_black_to_white() {
        assert_eq!(blackbody(0.0), [0.0, 0.0, 0.0]);
        let hot = blackbody(1.0);
        assert!(hot.iter().all(|&c| c > 0.8));
        // Red leads green leads blue on the way up
        let warm = blackbody(0.3);
        assert!(warm[0] > warm[1] && warm[1] > warm[2]);
    }

    #[test]
    fn lut_matches_ramp() {
        let lut = blackbody_lut();
        assert_eq!(lut.len(), BLACKBODY_LUT_SIZE);
        assert_eq!(lut_index(0.0), 0);
        assert_eq!(lut_index(1.0), 255);
        assert_eq!(lut_index(7.0), 255);
        assert_eq!(lut_index(-1.0), 0);
        assert_eq!(lut_index(f32::NAN), 0);
        let mid = sample_lut(&lut, 128.0 / 255.0);
        let expected = blackbody(128.0 / 255.0);
        for k in 0..3 {
            assert!((mid[k] - expected[k]).abs() < 1e-6);
        }
    }

    #[test]
    fn glow_gradient_stops() {
        assert_eq!(glow_gradient(0.0), GLOW_TEAL);
        assert_eq!(glow_gradient(0.5), GLOW_AMBER);
        for c in glow_gradient(3.0) {
            assert!((c - 1.0).abs() < 1e-6);
        }
    }

    #[test]
    fn vignette_darkens_corners_only() {
        assert_eq!(vignette([0.5, 0.5]), 1.0);
        assert!(vignette([0.0, 0.0]) < 0.6);
        let center = background([0.5, 0.5]);
        let corner = background([0.0, 0.0]);
        assert_eq!(center, BACKGROUND_CENTER);
        assert!(corner[2] < center[2]);
    }
}
