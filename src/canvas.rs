pub mod tga;

use std::fmt::{self, Display, Formatter};

use ::image::{DynamicImage, GrayImage, RgbImage, RgbaImage};
use na::{vector, Vector2};
use nalgebra as na;

/// Color stored as raw bytes in the order they appear in a TGA file: b, g, r, a.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Color {
    pub raw: [u8; 4],
}

pub const WHITE: Color = Color::rgb(255, 255, 255);
pub const BLACK: Color = Color::rgb(0, 0, 0);
pub const RED: Color = Color::rgb(255, 0, 0);

impl Color {
    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Color {
        return Color { raw: [b, g, r, a] };
    }

    pub const fn rgb(r: u8, g: u8, b: u8) -> Color {
        return Color::rgba(r, g, b, 255);
    }

    pub const fn gray(v: u8) -> Color {
        return Color::rgb(v, v, v);
    }

    pub fn r(&self) -> u8 {
        return self.raw[2];
    }

    pub fn g(&self) -> u8 {
        return self.raw[1];
    }

    pub fn b(&self) -> u8 {
        return self.raw[0];
    }

    pub fn a(&self) -> u8 {
        return self.raw[3];
    }

    /// Get convex combination of two colors: t * c_1 + (1 - t) * c_2.
    /// t is clamped to [0, 1], alpha is taken from c_1.
    pub fn blend(color_1: Color, color_2: Color, t: f32) -> Color {
        let t = t.clamp(0.0, 1.0);
        let mut raw = color_1.raw;
        for i in 0..3 {
            raw[i] = (t * color_1.raw[i] as f32 + (1.0 - t) * color_2.raw[i] as f32) as u8;
        }
        return Color { raw };
    }

    /// Color darkened by a light intensity in [0, 1].
    pub fn scaled(self, intensity: f32) -> Color {
        return Color::blend(self, BLACK, intensity);
    }
}

/// Number of bytes used for one pixel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Grayscale = 1,
    Rgb = 3,
    Rgba = 4,
}

impl Format {
    pub fn bytes_per_pixel(self) -> usize {
        return self as usize;
    }

    pub fn from_bytes_per_pixel(bytes: usize) -> Option<Format> {
        return match bytes {
            1 => Some(Format::Grayscale),
            3 => Some(Format::Rgb),
            4 => Some(Format::Rgba),
            _ => None,
        };
    }
}

impl Display for Format {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let name = match self {
            Format::Grayscale => "grayscale",
            Format::Rgb => "rgb",
            Format::Rgba => "rgba",
        };
        write!(f, "{}/{}", name, 8 * self.bytes_per_pixel())
    }
}

/// Pixel buffer, holding its width, height and a private flat array of pixel data.
/// Rows are stored one after another starting with row 0, channels in TGA order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PixelBuffer {
    width: u32,
    height: u32,
    format: Format,
    data: Vec<u8>,
}

impl PixelBuffer {
    /// Generates new buffer with all bytes set to 0.
    pub fn new(width: u32, height: u32, format: Format) -> PixelBuffer {
        let capacity = width as usize * height as usize * format.bytes_per_pixel();
        return PixelBuffer {
            width,
            height,
            format,
            data: vec![0; capacity],
        };
    }

    /// Wraps raw pixel bytes, None if their count doesn't match the dimensions.
    pub fn from_raw(width: u32, height: u32, format: Format, data: Vec<u8>) -> Option<PixelBuffer> {
        if data.len() != width as usize * height as usize * format.bytes_per_pixel() {
            return None;
        }
        return Some(PixelBuffer { width, height, format, data });
    }

    pub fn width(&self) -> u32 {
        return self.width;
    }

    pub fn height(&self) -> u32 {
        return self.height;
    }

    pub fn format(&self) -> Format {
        return self.format;
    }

    pub fn as_bytes(&self) -> &[u8] {
        return &self.data[..];
    }

    /// Index of the first byte of a pixel, None outside of the buffer.
    fn offset(&self, x: i32, y: i32) -> Option<usize> {
        if x < 0 || y < 0 || x >= self.width as i32 || y >= self.height as i32 {
            return None;
        }
        let pixel = x as usize + y as usize * self.width as usize;
        return Some(pixel * self.format.bytes_per_pixel());
    }

    /// Color at the coordinate, None outside of the buffer.
    /// Grayscale pixels are returned as gray colors.
    pub fn get(&self, x: i32, y: i32) -> Option<Color> {
        let offset = self.offset(x, y)?;
        let bytes = &self.data[offset..offset + self.format.bytes_per_pixel()];
        return Some(match self.format {
            Format::Grayscale => Color::gray(bytes[0]),
            Format::Rgb => Color { raw: [bytes[0], bytes[1], bytes[2], 255] },
            Format::Rgba => Color { raw: [bytes[0], bytes[1], bytes[2], bytes[3]] },
        });
    }

    /// Sets a pixel to a color. Writes nothing and returns false outside of the buffer.
    /// Only the first bytes-per-pixel channels of the color are stored.
    pub fn set(&mut self, x: i32, y: i32, color: Color) -> bool {
        let Some(offset) = self.offset(x, y) else {
            return false;
        };
        let bytes_per_pixel = self.format.bytes_per_pixel();
        self.data[offset..offset + bytes_per_pixel].copy_from_slice(&color.raw[..bytes_per_pixel]);
        return true;
    }

    /// Sets all pixel data to 0.
    pub fn clear(&mut self) {
        self.data.fill(0);
    }

    /// Swaps rows top to bottom.
    pub fn flip_vertically(&mut self) {
        let row_len = self.width as usize * self.format.bytes_per_pixel();
        let height = self.height as usize;
        for j in 0..height / 2 {
            let (top, bottom) = self.data.split_at_mut((height - 1 - j) * row_len);
            top[j * row_len..(j + 1) * row_len].swap_with_slice(&mut bottom[..row_len]);
        }
    }

    /// Swaps columns left to right.
    pub fn flip_horizontally(&mut self) {
        if self.width == 0 {
            return;
        }
        let bytes_per_pixel = self.format.bytes_per_pixel();
        let width = self.width as usize;
        for row in self.data.chunks_exact_mut(width * bytes_per_pixel) {
            for i in 0..width / 2 {
                let (left, right) = row.split_at_mut((width - 1 - i) * bytes_per_pixel);
                left[i * bytes_per_pixel..(i + 1) * bytes_per_pixel]
                    .swap_with_slice(&mut right[..bytes_per_pixel]);
            }
        }
    }

    /// Part of the segment ab inside the buffer, via Liang-Barsky clipping in f64.
    /// None if the segment misses the buffer.
    fn clip_line(&self, a: Vector2<i32>, b: Vector2<i32>) -> Option<(Vector2<i32>, Vector2<i32>)> {
        if self.width == 0 || self.height == 0 {
            return None;
        }
        let (x_max, y_max) = ((self.width - 1) as f64, (self.height - 1) as f64);
        let (x_0, y_0) = (a.x as f64, a.y as f64);
        let (dx, dy) = (b.x as f64 - x_0, b.y as f64 - y_0);

        let mut t_0: f64 = 0.0;
        let mut t_1: f64 = 1.0;
        for (p, q) in [(-dx, x_0), (dx, x_max - x_0), (-dy, y_0), (dy, y_max - y_0)] {
            if p == 0.0 {
                // Parallel to this edge, fully outside or not restricted by it.
                if q < 0.0 {
                    return None;
                }
                continue;
            }
            let r = q / p;
            if p < 0.0 {
                t_0 = t_0.max(r);
            } else {
                t_1 = t_1.min(r);
            }
            if t_0 > t_1 {
                return None;
            }
        }

        let at = |t: f64| -> Vector2<i32> {
            let x = (x_0 + t * dx).round().clamp(0.0, x_max);
            let y = (y_0 + t * dy).round().clamp(0.0, y_max);
            return vector![x as i32, y as i32];
        };
        return Some((at(t_0), at(t_1)));
    }

    /// Draws a line between coord_a and coord_b with specified color
    /// via Bresenham's algorithm as presented in https://en.wikipedia.org/wiki/Bresenham%27s_line_algorithm
    /// The segment is clipped to the buffer first, so far away endpoints cost nothing.
    pub fn draw_line(&mut self, coord_a: Vector2<i32>, coord_b: Vector2<i32>, color: Color) {
        let Some((coord_a, coord_b)) = self.clip_line(coord_a, coord_b) else {
            return;
        };
        let mut x_0 = coord_a.x;
        let x_1 = coord_b.x;
        let mut y_0 = coord_a.y;
        let y_1 = coord_b.y;
        let dx: i32 = (x_1 - x_0).abs();
        let sx: i32 = if x_0 < x_1 { 1 } else { -1 };
        let dy: i32 = -(y_1 - y_0).abs();
        let sy: i32 = if y_0 < y_1 { 1 } else { -1 };
        let mut error: i32 = dx + dy;

        loop {
            self.set(x_0, y_0, color);
            if x_0 == x_1 && y_0 == y_1 {
                break;
            }
            let e2 = 2 * error;
            if e2 >= dy {
                if x_0 == x_1 {
                    break;
                }
                error += dy;
                x_0 += sx;
            }
            if e2 <= dx {
                if y_0 == y_1 {
                    break;
                }
                error += dx;
                y_0 += sy;
            }
        }
    }

    /// Copies an rgb8 image of the `image` crate, converting channels to TGA order.
    pub fn from_rgb_image(image: &RgbImage) -> PixelBuffer {
        let mut data = Vec::with_capacity(image.as_raw().len());
        for pixel in image.pixels() {
            let [r, g, b] = pixel.0;
            data.extend_from_slice(&[b, g, r]);
        }
        return PixelBuffer {
            width: image.width(),
            height: image.height(),
            format: Format::Rgb,
            data,
        };
    }

    /// Conversion to an `image` crate image for saving in formats other than TGA.
    pub fn to_dynamic_image(&self) -> DynamicImage {
        let (width, height) = (self.width, self.height);
        let image: DynamicImage = match self.format {
            Format::Grayscale => GrayImage::from_fn(width, height, |x, y| {
                ::image::Luma([self.data[x as usize + y as usize * width as usize]])
            })
            .into(),
            Format::Rgb => RgbImage::from_fn(width, height, |x, y| {
                let c = self.pixel(x, y);
                ::image::Rgb([c.r(), c.g(), c.b()])
            })
            .into(),
            Format::Rgba => RgbaImage::from_fn(width, height, |x, y| {
                let c = self.pixel(x, y);
                ::image::Rgba([c.r(), c.g(), c.b(), c.a()])
            })
            .into(),
        };
        return image;
    }

    /// Pixel lookup for coordinates known to be in bounds.
    fn pixel(&self, x: u32, y: u32) -> Color {
        return self.get(x as i32, y as i32).unwrap_or(BLACK);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use na::vector;

    fn numbered(width: u32, height: u32) -> PixelBuffer {
        let mut buf = PixelBuffer::new(width, height, Format::Rgb);
        for y in 0..height as i32 {
            for x in 0..width as i32 {
                buf.set(x, y, Color::rgb(x as u8, y as u8, 0));
            }
        }
        buf
    }

    #[test]
    fn set_and_get() {
        let mut buf = PixelBuffer::new(4, 3, Format::Rgba);
        assert!(buf.set(3, 2, Color::rgba(1, 2, 3, 4)));
        assert_eq!(buf.get(3, 2), Some(Color::rgba(1, 2, 3, 4)));
        assert_eq!(buf.get(0, 0), Some(Color::rgba(0, 0, 0, 0)));
        // Stored as b, g, r, a.
        assert_eq!(&buf.as_bytes()[4 * 11..], &[3, 2, 1, 4]);
    }

    #[test]
    fn out_of_bounds_is_noop() {
        let mut buf = PixelBuffer::new(4, 3, Format::Rgb);
        assert!(!buf.set(4, 0, WHITE));
        assert!(!buf.set(0, 3, WHITE));
        assert!(!buf.set(-1, 1, WHITE));
        assert_eq!(buf.get(-1, 0), None);
        assert_eq!(buf.get(0, 3), None);
        assert!(buf.as_bytes().iter().all(|&b| b == 0));
    }

    #[test]
    fn grayscale_stores_one_channel() {
        let mut buf = PixelBuffer::new(2, 2, Format::Grayscale);
        buf.set(1, 1, Color::gray(77));
        assert_eq!(buf.as_bytes(), &[0, 0, 0, 77]);
        assert_eq!(buf.get(1, 1), Some(Color::gray(77)));
    }

    #[test]
    fn flip_vertically() {
        let mut buf = numbered(3, 3);
        buf.flip_vertically();
        assert_eq!(buf.get(1, 0), Some(Color::rgb(1, 2, 0)));
        assert_eq!(buf.get(2, 2), Some(Color::rgb(2, 0, 0)));
        assert_eq!(buf.get(0, 1), Some(Color::rgb(0, 1, 0)));
    }

    #[test]
    fn double_flip_is_identity() {
        let orig = numbered(5, 4);
        let mut buf = orig.clone();
        buf.flip_vertically();
        assert_ne!(buf, orig);
        buf.flip_vertically();
        assert_eq!(buf, orig);
        buf.flip_horizontally();
        assert_eq!(buf.get(0, 0), Some(Color::rgb(4, 0, 0)));
        buf.flip_horizontally();
        assert_eq!(buf, orig);
    }

    #[test]
    fn draw_line_endpoints() {
        let mut buf = PixelBuffer::new(100, 100, Format::Rgb);
        buf.draw_line(vector![13, 20], vector![80, 40], WHITE);
        assert_eq!(buf.get(13, 20), Some(WHITE));
        assert_eq!(buf.get(80, 40), Some(WHITE));
        assert_eq!(buf.get(13, 40), Some(BLACK));
        // One pixel per column for a shallow line.
        for x in 13..=80 {
            let count = (0..100).filter(|&y| buf.get(x, y) == Some(WHITE)).count();
            assert_eq!(count, 1);
        }
    }

    #[test]
    fn draw_line_clipped() {
        let mut buf = PixelBuffer::new(10, 10, Format::Rgb);
        buf.draw_line(vector![-5, 5], vector![15, 5], RED);
        for x in 0..10 {
            assert_eq!(buf.get(x, 5), Some(RED));
        }
    }

    #[test]
    fn draw_line_far_outside() {
        let mut buf = PixelBuffer::new(10, 10, Format::Rgb);
        buf.draw_line(vector![i32::MIN, 5], vector![i32::MAX, 5], RED);
        for x in 0..10 {
            assert_eq!(buf.get(x, 5), Some(RED));
        }
        buf.draw_line(vector![-1_000_000_000, -1_000_000_000], vector![1_000_000_000, 1_000_000_000], WHITE);
        for i in 0..10 {
            assert_eq!(buf.get(i, i), Some(WHITE));
        }
        // Misses the buffer completely.
        let before = buf.clone();
        buf.draw_line(vector![i32::MIN, -3], vector![i32::MAX, -3], WHITE);
        buf.draw_line(vector![20, i32::MIN], vector![40, i32::MAX], WHITE);
        assert_eq!(buf, before);
    }

    #[test]
    fn format_names() {
        assert_eq!(Format::Grayscale.to_string(), "grayscale/8");
        assert_eq!(Format::Rgb.to_string(), "rgb/24");
        assert_eq!(Format::Rgba.to_string(), "rgba/32");
    }

    #[test]
    fn blend_clamps() {
        assert_eq!(WHITE.scaled(2.0), WHITE);
        assert_eq!(WHITE.scaled(-1.0), BLACK);
        assert_eq!(Color::rgb(200, 100, 50).scaled(0.5), Color::rgb(100, 50, 25));
    }

    #[test]
    fn image_crate_conversion() {
        let buf = numbered(3, 2);
        let rgb = buf.to_dynamic_image().to_rgb8();
        assert_eq!(rgb.get_pixel(2, 1).0, [2, 1, 0]);
        assert_eq!(PixelBuffer::from_rgb_image(&rgb), buf);
    }
}
