use na::{vector, Vector2, Vector3};
use nalgebra as na;

use super::shader::Shader;
use super::zbuffer::ZBuffer;
use crate::canvas::PixelBuffer;
use crate::util::{barycentric, bounding_box, is_inside, to_float};

/// Point in a scene - x, y give pixel index and z gives the depth, larger is closer to the camera.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScreenPoint {
    pub x: i32,
    pub y: i32,
    pub z: f32,
}

impl ScreenPoint {
    pub fn new(x: i32, y: i32, z: f32) -> Self {
        return Self { x, y, z };
    }

    pub fn coord(&self) -> Vector2<i32> {
        return vector![self.x, self.y];
    }
}

/// Screen space triangle.
pub type Triangle = [ScreenPoint; 3];

/// Draws a triangle into `pixels`, gated by `z_buffer`. Returns the number of pixels written.
///
/// Every pixel of the bounding box (clamped to the buffer) whose barycentric coordinates are all
/// non-negative is covered, so pixels exactly on an edge belong to the triangle. The depth of a
/// covered pixel is the linear interpolation of the vertex depths, and the pixel is only shaded if
/// that depth is strictly greater than the stored one: of two fragments with equal depth the first
/// one stays. If the shader doesn't discard the fragment, depth and color are stored together.
pub fn rasterize<S: Shader + ?Sized>(
    pixels: &mut PixelBuffer,
    z_buffer: &mut ZBuffer,
    triangle: &Triangle,
    shader: &S,
) -> usize {
    let [a, b, c] = *triangle;
    let coords = [a.coord(), b.coord(), c.coord()];
    let width = pixels.width().min(z_buffer.width());
    let height = pixels.height().min(z_buffer.height());
    let Some(bbox) = bounding_box(&coords, width, height) else {
        return 0;
    };
    let [coord_a, coord_b, coord_c] = coords.map(to_float);
    let z_values: Vector3<f32> = vector![a.z, b.z, c.z];

    let mut written = 0;
    for j in bbox.ll.y..=bbox.ur.y {
        for i in bbox.ll.x..=bbox.ur.x {
            let bar_coord = barycentric(coord_a, coord_b, coord_c, vector![i as f32, j as f32]);
            if !is_inside(bar_coord) {
                // If any of the coordinates are negative, point is not in the triangle, so skipping it.
                continue;
            }
            let z = bar_coord.dot(&z_values);
            if !z_buffer.test(i, j, z) {
                continue;
            }
            let Some(color) = shader.fragment(bar_coord) else {
                continue;
            };
            z_buffer.test_and_set(i, j, z);
            pixels.set(i, j, color);
            written += 1;
        }
    }
    return written;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canvas::{Color, Format, BLACK, RED, WHITE};

    fn pt(x: i32, y: i32, z: f32) -> ScreenPoint {
        ScreenPoint::new(x, y, z)
    }

    fn fill(color: Color) -> impl Fn(Vector3<f32>) -> Option<Color> {
        move |_| Some(color)
    }

    fn setup(width: u32, height: u32) -> (PixelBuffer, ZBuffer) {
        (PixelBuffer::new(width, height, Format::Rgb), ZBuffer::new(width, height))
    }

    fn covered(pixels: &PixelBuffer) -> Vec<(i32, i32)> {
        let mut result = Vec::new();
        for y in 0..pixels.height() as i32 {
            for x in 0..pixels.width() as i32 {
                if pixels.get(x, y) != Some(BLACK) {
                    result.push((x, y));
                }
            }
        }
        result
    }

    /// Even-odd scanline fill sampling each row at pixel centers y.
    fn scanline_reference(tri: &[(f32, f32); 3], width: i32, height: i32) -> Vec<(i32, i32)> {
        let mut result = Vec::new();
        for y in 0..height {
            let yc = y as f32;
            let mut xs = Vec::new();
            for k in 0..3 {
                let (x0, y0) = tri[k];
                let (x1, y1) = tri[(k + 1) % 3];
                if (y0 <= yc && yc < y1) || (y1 <= yc && yc < y0) {
                    xs.push(x0 + (yc - y0) * (x1 - x0) / (y1 - y0));
                }
            }
            xs.sort_by(|a, b| a.partial_cmp(b).unwrap());
            for pair in xs.chunks(2) {
                if let [left, right] = pair {
                    for x in 0..width {
                        let xc = x as f32;
                        if *left <= xc && xc < *right {
                            result.push((x, y));
                        }
                    }
                }
            }
        }
        result
    }

    #[test]
    fn example_triangle_coverage() {
        let (mut pixels, mut z_buffer) = setup(100, 100);
        let tri = [pt(10, 10, 0.0), pt(90, 10, 0.0), pt(50, 90, 0.0)];
        let written = rasterize(&mut pixels, &mut z_buffer, &tri, &fill(WHITE));
        assert!(written > 0);
        assert_eq!(pixels.get(50, 50), Some(WHITE));
        assert_eq!(pixels.get(5, 5), Some(BLACK));
        // Vertices and edges are covered.
        assert_eq!(pixels.get(10, 10), Some(WHITE));
        assert_eq!(pixels.get(50, 10), Some(WHITE));
        assert_eq!(pixels.get(50, 90), Some(WHITE));
        assert_eq!(pixels.get(50, 91), Some(BLACK));
        assert_eq!(z_buffer.get(50, 50), Some(0.0));
        assert_eq!(z_buffer.get(5, 5), Some(f32::NEG_INFINITY));
    }

    #[test]
    fn matches_scanline_fill() {
        let tris = [
            [(10, 10), (90, 10), (50, 90)],
            [(3, 7), (61, 29), (17, 58)],
            [(70, 2), (5, 40), (95, 95)],
        ];
        for tri in tris {
            let (mut pixels, mut z_buffer) = setup(100, 100);
            let screen = tri.map(|(x, y)| pt(x, y, 0.0));
            rasterize(&mut pixels, &mut z_buffer, &screen, &fill(WHITE));
            let ours = covered(&pixels);
            let reference = scanline_reference(&tri.map(|(x, y)| (x as f32, y as f32)), 100, 100);

            // Every reference pixel is ours, extra pixels are at most one pixel off the reference.
            for p in &reference {
                assert!(ours.contains(p), "{p:?} of {tri:?} not covered");
            }
            for &(x, y) in &ours {
                let near = reference.iter().any(|&(rx, ry)| (rx - x).abs() <= 1 && (ry - y).abs() <= 1);
                assert!(near, "({x}, {y}) of {tri:?} too far from the reference");
            }
        }
    }

    #[test]
    fn degenerate_covers_nothing() {
        let (mut pixels, mut z_buffer) = setup(50, 50);
        let collinear = [pt(0, 0, 0.0), pt(20, 20, 0.0), pt(40, 40, 0.0)];
        assert_eq!(rasterize(&mut pixels, &mut z_buffer, &collinear, &fill(WHITE)), 0);
        let point = [pt(7, 7, 0.0); 3];
        assert_eq!(rasterize(&mut pixels, &mut z_buffer, &point, &fill(WHITE)), 0);
        assert!(covered(&pixels).is_empty());
    }

    #[test]
    fn winding_does_not_matter() {
        let (mut ccw, mut z_ccw) = setup(40, 40);
        let (mut cw, mut z_cw) = setup(40, 40);
        let a = pt(2, 3, 0.0);
        let b = pt(35, 8, 0.0);
        let c = pt(12, 30, 0.0);
        rasterize(&mut ccw, &mut z_ccw, &[a, b, c], &fill(WHITE));
        rasterize(&mut cw, &mut z_cw, &[a, c, b], &fill(WHITE));
        assert_eq!(ccw, cw);
    }

    #[test]
    fn z_buffer_keeps_closest_regardless_of_order() {
        let near = [pt(0, 0, 0.8), pt(30, 0, 0.8), pt(0, 30, 0.8)];
        let far = [pt(5, 5, 0.2), pt(39, 5, 0.2), pt(5, 39, 0.2)];
        let orders = [[(near, RED), (far, WHITE)], [(far, WHITE), (near, RED)]];
        let mut results = Vec::new();
        for order in orders {
            let (mut pixels, mut z_buffer) = setup(40, 40);
            for (tri, color) in order {
                rasterize(&mut pixels, &mut z_buffer, &tri, &fill(color));
            }
            // Inside both triangles.
            assert_eq!(pixels.get(10, 10), Some(RED));
            assert_eq!(z_buffer.get(10, 10), Some(0.8));
            // Only inside the far one.
            assert_eq!(pixels.get(20, 20), Some(WHITE));
            results.push(pixels);
        }
        assert_eq!(results[0], results[1]);
    }

    #[test]
    fn equal_depth_keeps_first_write() {
        let (mut pixels, mut z_buffer) = setup(20, 20);
        let tri = [pt(0, 0, 0.5), pt(19, 0, 0.5), pt(0, 19, 0.5)];
        rasterize(&mut pixels, &mut z_buffer, &tri, &fill(RED));
        assert_eq!(rasterize(&mut pixels, &mut z_buffer, &tri, &fill(WHITE)), 0);
        assert_eq!(pixels.get(3, 3), Some(RED));
    }

    #[test]
    fn depth_is_interpolated() {
        let (mut pixels, mut z_buffer) = setup(11, 11);
        let tri = [pt(0, 0, 0.0), pt(10, 0, 1.0), pt(0, 10, 0.0)];
        rasterize(&mut pixels, &mut z_buffer, &tri, &fill(WHITE));
        let z = z_buffer.get(5, 0).unwrap();
        assert!((z - 0.5).abs() < 1e-6);
    }

    #[test]
    fn discarded_fragments_leave_depth() {
        let (mut pixels, mut z_buffer) = setup(20, 20);
        let tri = [pt(0, 0, 0.5), pt(19, 0, 0.5), pt(0, 19, 0.5)];
        let discard = |_: Vector3<f32>| -> Option<Color> { None };
        assert_eq!(rasterize(&mut pixels, &mut z_buffer, &tri, &discard), 0);
        assert_eq!(z_buffer.get(3, 3), Some(f32::NEG_INFINITY));
    }

    #[test]
    fn clamped_to_buffer() {
        let (mut pixels, mut z_buffer) = setup(10, 10);
        let tri = [pt(-50, -50, 0.0), pt(200, -50, 0.0), pt(-50, 200, 0.0)];
        let written = rasterize(&mut pixels, &mut z_buffer, &tri, &fill(WHITE));
        assert_eq!(written, 100);
        let outside = [pt(20, 20, 0.0), pt(30, 20, 0.0), pt(20, 30, 0.0)];
        assert_eq!(rasterize(&mut pixels, &mut z_buffer, &outside, &fill(RED)), 0);
    }
}
