//! Easing curves used by the order/chaos transitions
//!
//! Both curves clamp their input to `[0, 1]`, are monotonic, and map
//! `0 -> 0` and `1 -> 1`.

/// Fast start, slow finish: `1 - (1 - t)^3`
pub fn ease_out_cubic(t: f32) -> f32 {
    let t = t.clamp(0.0, 1.0);
    let inv = 1.0 - t;
    1.0 - inv * inv * inv
}

/// Slow start and finish, symmetric about `t = 0.5`
pub fn ease_in_out_quad(t: f32) -> f32 {
    let t = t.clamp(0.0, 1.0);
    if t < 0.5 {
        2.0 * t * t
    } else {
        let k = -2.0 * t + 2.0;
        1.0 - k * k / 2.0
    }
}
