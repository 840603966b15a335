//! Pure vector math over landmarks.
//!
//! Every function returns a finite value. Degenerate inputs (zero-length
//! vectors, empty windows) yield `0.0` instead of NaN so thresholds downstream
//! never compare against NaN.

use super::Landmark;

pub const DEFAULT_SMOOTHING_WINDOW: usize = 5;

const EPSILON: f32 = 1e-9;

/// Angle ABC in degrees, in [0, 180], with `b` as the vertex.
pub fn angle_between(a: Landmark, b: Landmark, c: Landmark) -> f32 {
    let ba = [a.x - b.x, a.y - b.y, a.z - b.z];
    let bc = [c.x - b.x, c.y - b.y, c.z - b.z];

    let dot = ba[0] * bc[0] + ba[1] * bc[1] + ba[2] * bc[2];
    let magnitude = norm(ba) * norm(bc);
    if magnitude < EPSILON {
        return 0.0;
    }

    let cosine = (dot / magnitude).clamp(-1.0, 1.0);
    finite_or_zero(cosine.acos().to_degrees())
}

/// Euclidean distance over x, y and depth, in normalized units.
pub fn distance(a: Landmark, b: Landmark) -> f32 {
    finite_or_zero(norm([b.x - a.x, b.y - a.y, b.z - a.z]))
}

/// Signed depth difference; positive when `b` is closer to the camera than `a`.
pub fn depth_delta(a: Landmark, b: Landmark) -> f32 {
    finite_or_zero(a.z - b.z)
}

/// Angle in degrees between the segment `from -> to` and the image vertical.
/// Zero means the segment points straight up or down the frame.
pub fn angle_from_vertical(from: Landmark, to: Landmark) -> f32 {
    let dx = to.x - from.x;
    let dy = to.y - from.y;
    let dz = to.z - from.z;
    let length = norm([dx, dy, dz]);
    if length < EPSILON {
        return 0.0;
    }

    let cosine = (dy.abs() / length).clamp(-1.0, 1.0);
    finite_or_zero(cosine.acos().to_degrees())
}

/// Mean of the last `window_size` values, or of all values if fewer exist.
pub fn moving_average(values: &[f32], window_size: usize) -> f32 {
    let window = window_size.max(1);
    let start = values.len().saturating_sub(window);
    let tail = &values[start..];
    if tail.is_empty() {
        return 0.0;
    }
    finite_or_zero(tail.iter().sum::<f32>() / tail.len() as f32)
}

fn norm(v: [f32; 3]) -> f32 {
    (v[0] * v[0] + v[1] * v[1] + v[2] * v[2]).sqrt()
}

fn finite_or_zero(value: f32) -> f32 {
    if value.is_finite() {
        value
    } else {
        0.0
    }
}
