pub mod raster;
pub mod shader;
pub mod zbuffer;

use log::debug;
use na::{vector, Matrix2x3, Vector3};
use nalgebra as na;

use crate::canvas::{Color, Format, PixelBuffer, WHITE};
use crate::model::{Face, Model};
use crate::util::{face_normal, normalized};
use raster::{rasterize, ScreenPoint, Triangle};
use shader::{uv_matrix, FlatShader, Shader, ShadingMode, SmoothShader, TexturedShader};
use zbuffer::ZBuffer;

/// Renderer-level configuration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderSettings {
    pub mode: ShadingMode,
    pub light_direction: Vector3<f32>, // Points from the surface to the light.
    pub base_color: Color,             // Used when there is no texture to sample.
}

impl Default for RenderSettings {
    fn default() -> Self {
        return Self {
            mode: ShadingMode::Textured,
            light_direction: vector![0.0, 0.0, 1.0], // Directed to us from the screen.
            base_color: WHITE,
        };
    }
}

/// What happened to the faces of one `Scene::render` call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RenderStats {
    pub faces: usize,      // Faces handed to the rasterizer (or drawn as wireframe).
    pub culled: usize,     // Faces turned away from the light.
    pub degenerate: usize, // Faces with zero area in model space.
    pub pixels: usize,     // Pixels written by the rasterizer.
}

/// Face that passed culling, with its light intensity.
#[derive(Clone, Copy)]
struct LitFace<'a> {
    face: &'a Face,
    intensity: f32,
    light_direction: Vector3<f32>, // Normalized.
}

/// Scene, holding the rendered frame and its z-buffer.
/// (0, 0) is the bottom left coordinate until `finish` is called.
pub struct Scene {
    frame: PixelBuffer,
    z_buffer: ZBuffer, // Filled out by every triangle drawn after the last clear() call.
}

impl Scene {
    /// Black rgb8 frame of the given size, z-buffer infinitely far away.
    pub fn new(width: u32, height: u32) -> Scene {
        return Scene {
            frame: PixelBuffer::new(width, height, Format::Rgb),
            z_buffer: ZBuffer::new(width, height),
        };
    }

    pub fn width(&self) -> u32 {
        return self.frame.width();
    }

    pub fn height(&self) -> u32 {
        return self.frame.height();
    }

    pub fn frame(&self) -> &PixelBuffer {
        return &self.frame;
    }

    pub fn z_buffer(&self) -> &ZBuffer {
        return &self.z_buffer;
    }

    /// Sets all pixels to black and clears z-buffer.
    pub fn clear(&mut self) {
        self.frame.clear();
        self.z_buffer.clear();
    }

    /// Transformation of a vector with x, y in [-1.0, 1.0] to a pixel of the scene.
    /// Depth is kept as is.
    pub fn to_screen_point(&self, v: Vector3<f32>) -> ScreenPoint {
        fn to_pixel(float_coord: f32, scale: u32) -> i32 {
            return ((float_coord + 1.0) * 0.5 * scale as f32).floor() as i32;
        }
        return ScreenPoint::new(to_pixel(v.x, self.width()), to_pixel(v.y, self.height()), v.z);
    }

    /// Draws one screen space triangle through the z-buffer. Returns the number of pixels written.
    pub fn draw_triangle<S: Shader + ?Sized>(&mut self, triangle: &Triangle, shader: &S) -> usize {
        return rasterize(&mut self.frame, &mut self.z_buffer, triangle, shader);
    }

    /// Draws all faces of the model in their order.
    /// `texture` is sampled in textured and smooth modes, faces without texture coordinates
    /// (or a missing texture) fall back to the base color.
    pub fn render(&mut self, model: &Model, texture: Option<&PixelBuffer>, settings: &RenderSettings) -> RenderStats {
        let mut stats = RenderStats::default();
        let light_direction = normalized(settings.light_direction).unwrap_or(Vector3::zeros());
        for face in model.faces() {
            let [a, b, c] = model.face_positions(face);
            let triangle: Triangle = [a, b, c].map(|v| self.to_screen_point(v));

            if settings.mode == ShadingMode::Wireframe {
                for i in 0..3 {
                    let (p, q) = (triangle[i], triangle[(i + 1) % 3]);
                    self.frame.draw_line(p.coord(), q.coord(), settings.base_color);
                }
                stats.faces += 1;
                continue;
            }

            let Some(normal) = normalized(face_normal(a, b, c)) else {
                stats.degenerate += 1;
                continue;
            };
            let intensity = normal.dot(&light_direction);
            // Backface culling.
            if intensity <= 0.0 {
                stats.culled += 1;
                continue;
            }

            let lit = LitFace { face, intensity, light_direction };
            stats.pixels += self.shade_face(model, &lit, &triangle, texture, settings);
            stats.faces += 1;
        }
        debug!(
            "Rendered {} faces ({} culled, {} degenerate), {} pixels written",
            stats.faces, stats.culled, stats.degenerate, stats.pixels
        );
        return stats;
    }

    /// Builds the shader of the selected mode for one lit face and rasterizes it.
    fn shade_face(
        &mut self,
        model: &Model,
        lit: &LitFace,
        triangle: &Triangle,
        texture: Option<&PixelBuffer>,
        settings: &RenderSettings,
    ) -> usize {
        let LitFace { face, intensity, light_direction } = *lit;
        let flat = FlatShader { color: settings.base_color, intensity };
        let uvs = model.face_tex_coords(face).map(uv_matrix);
        return match settings.mode {
            ShadingMode::Textured => match (texture, uvs) {
                (Some(texture), Some(uvs)) => {
                    self.draw_triangle(triangle, &TexturedShader { texture, uvs, intensity })
                }
                _ => self.draw_triangle(triangle, &flat),
            },
            ShadingMode::Smooth => {
                // Without vertex normals every vertex gets the face intensity.
                let intensities = match model.face_normals(face) {
                    Some(normals) => Vector3::from_fn(|i, _| {
                        normalized(normals[i]).map_or(intensity, |n| n.dot(&light_direction))
                    }),
                    None => Vector3::repeat(intensity),
                };
                let shader = SmoothShader {
                    texture: texture.filter(|_| uvs.is_some()),
                    base_color: settings.base_color,
                    uvs: uvs.unwrap_or(Matrix2x3::zeros()),
                    intensities,
                };
                self.draw_triangle(triangle, &shader)
            }
            _ => self.draw_triangle(triangle, &flat),
        };
    }

    /// Z-buffer as a grayscale image, in the same row order as `finish` gives.
    pub fn depth_image(&self) -> PixelBuffer {
        let mut image = self.z_buffer.to_image();
        image.flip_vertically();
        return image;
    }

    /// Gives away the frame with row 0 being the top row, as images are stored.
    pub fn finish(self) -> PixelBuffer {
        let mut frame = self.frame;
        frame.flip_vertically();
        return frame;
    }
}
