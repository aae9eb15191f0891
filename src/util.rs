use std::cmp::{max, min};

use na::{vector, Vector2, Vector3};
use nalgebra as na;

/// Below this magnitude the doubled signed area of a triangle is treated as zero.
const DEGENERATE_EPSILON: f32 = 1e-3;

/// Length under which a vector can't be normalized.
const NORMALIZE_EPSILON: f32 = 1e-12;

/// Returned by `barycentric` for degenerate triangles, has a negative coordinate so it is never inside.
pub const OUTSIDE: Vector3<f32> = vector![-1.0, 1.0, 1.0];

/// Axis aligned box of pixel coordinates, both corners inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoundingBox {
    pub ll: Vector2<i32>, // lower left corner
    pub ur: Vector2<i32>, // upper right corner
}

/// Bounding box of the points clamped to [0, width - 1] x [0, height - 1].
/// None if the box lies completely outside of the frame.
pub fn bounding_box(points: &[Vector2<i32>], width: u32, height: u32) -> Option<BoundingBox> {
    if points.is_empty() || width == 0 || height == 0 {
        return None;
    }
    let clamp = vector![width as i32 - 1, height as i32 - 1];
    let mut ll = vector![i32::MAX, i32::MAX];
    let mut ur = vector![i32::MIN, i32::MIN];
    for point in points {
        for axis in 0..2 {
            ll[axis] = min(ll[axis], point[axis]);
            ur[axis] = max(ur[axis], point[axis]);
        }
    }
    for axis in 0..2 {
        ll[axis] = max(ll[axis], 0);
        ur[axis] = min(ur[axis], clamp[axis]);
        if ll[axis] > ur[axis] {
            return None;
        }
    }
    return Some(BoundingBox { ll, ur });
}

/// Barycentric coordinates of point p with respect to triangle abc.
///
/// Components are the weights of a, b and c in this order and sum up to 1. The point is inside
/// the triangle iff all of them are non-negative. For a degenerate (zero area) triangle `OUTSIDE`
/// is returned, so callers never have to special case it.
pub fn barycentric(a: Vector2<f32>, b: Vector2<f32>, c: Vector2<f32>, p: Vector2<f32>) -> Vector3<f32> {
    let mut edges = [Vector3::<f32>::zeros(); 2];
    for axis in 0..2 {
        edges[axis] = vector![c[axis] - a[axis], b[axis] - a[axis], a[axis] - p[axis]];
    }
    let raw_cross = edges[0].cross(&edges[1]);
    if raw_cross.z.abs() <= DEGENERATE_EPSILON {
        return OUTSIDE;
    }
    return vector![
        1.0 - (raw_cross.x + raw_cross.y) / raw_cross.z,
        raw_cross.y / raw_cross.z,
        raw_cross.x / raw_cross.z
    ];
}

/// True if none of the barycentric coordinates is negative.
pub fn is_inside(bar_coord: Vector3<f32>) -> bool {
    return bar_coord.x >= 0.0 && bar_coord.y >= 0.0 && bar_coord.z >= 0.0;
}

/// Unit vector in the direction of v, None for a zero length vector.
pub fn normalized(v: Vector3<f32>) -> Option<Vector3<f32>> {
    return v.try_normalize(NORMALIZE_EPSILON);
}

/// Unnormalized normal of the face abc, pointing to us for counter clockwise winding.
pub fn face_normal(a: Vector3<f32>, b: Vector3<f32>, c: Vector3<f32>) -> Vector3<f32> {
    return (b - a).cross(&(c - a));
}

/// Conversion of integer pixel coordinates to floats for barycentric calculations.
pub fn to_float(v: Vector2<i32>) -> Vector2<f32> {
    return vector![v.x as f32, v.y as f32];
}
