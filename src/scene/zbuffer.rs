use crate::canvas::{Color, Format, PixelBuffer};

/// Per-pixel depth of the closest fragment drawn so far. Larger values are closer to the camera.
#[derive(Debug, Clone)]
pub struct ZBuffer {
    width: u32,
    height: u32,
    depth: Vec<f32>,
}

impl ZBuffer {
    /// New z-buffer with every pixel infinitely far away.
    pub fn new(width: u32, height: u32) -> Self {
        let n_pixels = width as usize * height as usize;
        return Self {
            width,
            height,
            depth: vec![f32::NEG_INFINITY; n_pixels],
        };
    }

    pub fn width(&self) -> u32 {
        return self.width;
    }

    pub fn height(&self) -> u32 {
        return self.height;
    }

    /// Resets all depths before the next frame.
    pub fn clear(&mut self) {
        self.depth.fill(f32::NEG_INFINITY);
    }

    fn index(&self, x: i32, y: i32) -> Option<usize> {
        if x < 0 || y < 0 || x >= self.width as i32 || y >= self.height as i32 {
            return None;
        }
        return Some(x as usize + y as usize * self.width as usize);
    }

    /// Stored depth, None outside of the buffer.
    pub fn get(&self, x: i32, y: i32) -> Option<f32> {
        return self.index(x, y).map(|i| self.depth[i]);
    }

    /// True if a fragment with depth z would be visible, i.e. is strictly closer than the stored one.
    pub fn test(&self, x: i32, y: i32, z: f32) -> bool {
        return match self.index(x, y) {
            Some(i) => z > self.depth[i],
            None => false,
        };
    }

    /// Stores z if it passes the depth test. Returns whether it did.
    pub fn test_and_set(&mut self, x: i32, y: i32, z: f32) -> bool {
        let Some(i) = self.index(x, y) else {
            return false;
        };
        if z <= self.depth[i] {
            return false;
        }
        self.depth[i] = z;
        return true;
    }

    /// Get grayscale image, representing z-buffer values.
    /// Depths are normalized over the drawn pixels, untouched pixels stay black.
    pub fn to_image(&self) -> PixelBuffer {
        let mut image = PixelBuffer::new(self.width, self.height, Format::Grayscale);
        let drawn = self.depth.iter().copied().filter(|z| z.is_finite());
        let z_min = drawn.clone().fold(f32::INFINITY, f32::min);
        let z_max = drawn.fold(f32::NEG_INFINITY, f32::max);
        let scale = z_max - z_min;
        for y in 0..self.height as i32 {
            for x in 0..self.width as i32 {
                let z = self.depth[x as usize + y as usize * self.width as usize];
                if !z.is_finite() {
                    continue;
                }
                let value = if scale > 0.0 { 1.0 + 254.0 * (z - z_min) / scale } else { 255.0 };
                image.set(x, y, Color::gray(value as u8));
            }
        }
        return image;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_infinitely_far() {
        let z_buffer = ZBuffer::new(2, 2);
        assert_eq!(z_buffer.get(1, 1), Some(f32::NEG_INFINITY));
        assert_eq!(z_buffer.get(2, 1), None);
        assert!(z_buffer.test(0, 0, -1e30));
    }

    #[test]
    fn larger_depth_wins() {
        let mut z_buffer = ZBuffer::new(2, 2);
        assert!(z_buffer.test_and_set(0, 1, 0.5));
        assert!(!z_buffer.test_and_set(0, 1, 0.2));
        assert!(z_buffer.test_and_set(0, 1, 0.7));
        assert_eq!(z_buffer.get(0, 1), Some(0.7));
    }

    #[test]
    fn ties_keep_first_write() {
        let mut z_buffer = ZBuffer::new(1, 1);
        assert!(z_buffer.test_and_set(0, 0, 0.0));
        assert!(!z_buffer.test(0, 0, 0.0));
        assert!(!z_buffer.test_and_set(0, 0, 0.0));
    }

    #[test]
    fn outside_is_rejected() {
        let mut z_buffer = ZBuffer::new(2, 2);
        assert!(!z_buffer.test_and_set(-1, 0, 1.0));
        assert!(!z_buffer.test_and_set(0, 2, 1.0));
    }

    #[test]
    fn clear_resets() {
        let mut z_buffer = ZBuffer::new(2, 2);
        z_buffer.test_and_set(1, 0, 3.0);
        z_buffer.clear();
        assert_eq!(z_buffer.get(1, 0), Some(f32::NEG_INFINITY));
    }

    #[test]
    fn depth_image() {
        let mut z_buffer = ZBuffer::new(3, 1);
        z_buffer.test_and_set(0, 0, -1.0);
        z_buffer.test_and_set(1, 0, 1.0);
        let image = z_buffer.to_image();
        assert_eq!(image.as_bytes(), &[1, 255, 0]);
    }
}
