use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

use na::{Matrix2x3, Vector2, Vector3};
use nalgebra as na;

use crate::canvas::{Color, PixelBuffer, BLACK};

/// Fragment part of the pipeline, called by the rasterizer for every covered pixel that passed
/// the depth test.
pub trait Shader {
    /// Color of the fragment at the given barycentric coordinates, None discards the fragment.
    fn fragment(&self, bar_coord: Vector3<f32>) -> Option<Color>;
}

impl<F: Fn(Vector3<f32>) -> Option<Color>> Shader for F {
    fn fragment(&self, bar_coord: Vector3<f32>) -> Option<Color> {
        return self(bar_coord);
    }
}

/// How the faces of a model are drawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShadingMode {
    /// Only the edges, no depth test.
    Wireframe,
    /// One color per face scaled by the face intensity.
    Flat,
    /// Texture color scaled by the face intensity.
    Textured,
    /// Texture (or base) color scaled by intensities interpolated from the vertex normals.
    Smooth,
}

/// Name of a shading mode that doesn't exist.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownMode(pub String);

impl Display for UnknownMode {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "unknown shading mode '{}', expected wireframe, flat, textured or smooth", self.0)
    }
}

impl std::error::Error for UnknownMode {}

impl FromStr for ShadingMode {
    type Err = UnknownMode;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        return match name {
            "wireframe" => Ok(ShadingMode::Wireframe),
            "flat" => Ok(ShadingMode::Flat),
            "textured" => Ok(ShadingMode::Textured),
            "smooth" => Ok(ShadingMode::Smooth),
            _ => Err(UnknownMode(name.to_string())),
        };
    }
}

/// Nearest-neighbour lookup of uv in [0, 1]^2, scaled to the texture's own size and clamped to its edges.
/// Row 0 of the texture corresponds to v = 0.
/// An empty texture samples as black.
pub fn sample_nearest(texture: &PixelBuffer, uv: Vector2<f32>) -> Color {
    if texture.width() == 0 || texture.height() == 0 {
        return BLACK;
    }
    let x = ((uv.x * texture.width() as f32).floor() as i32).clamp(0, texture.width() as i32 - 1);
    let y = ((uv.y * texture.height() as f32).floor() as i32).clamp(0, texture.height() as i32 - 1);
    return texture.get(x, y).unwrap_or(BLACK);
}

/// Constant color scaled by the face intensity.
#[derive(Debug, Clone, Copy)]
pub struct FlatShader {
    pub color: Color,
    pub intensity: f32,
}

impl Shader for FlatShader {
    fn fragment(&self, _bar_coord: Vector3<f32>) -> Option<Color> {
        return Some(self.color.scaled(self.intensity));
    }
}

/// Texture sampled at interpolated uv, scaled by the face intensity.
pub struct TexturedShader<'a> {
    pub texture: &'a PixelBuffer,
    pub uvs: Matrix2x3<f32>, // UV coordinates of each vertex as columns.
    pub intensity: f32,
}

impl Shader for TexturedShader<'_> {
    fn fragment(&self, bar_coord: Vector3<f32>) -> Option<Color> {
        let uv = self.uvs * bar_coord;
        return Some(sample_nearest(self.texture, uv).scaled(self.intensity));
    }
}

/// Light intensity interpolated between the vertices.
pub struct SmoothShader<'a> {
    pub texture: Option<&'a PixelBuffer>,
    pub base_color: Color,
    pub uvs: Matrix2x3<f32>,
    pub intensities: Vector3<f32>, // Light intensity in each vertex.
}

impl Shader for SmoothShader<'_> {
    fn fragment(&self, bar_coord: Vector3<f32>) -> Option<Color> {
        let color = match self.texture {
            Some(texture) => sample_nearest(texture, self.uvs * bar_coord),
            None => self.base_color,
        };
        let intensity = bar_coord.dot(&self.intensities).max(0.0);
        return Some(color.scaled(intensity));
    }
}

/// UVs of the three vertices as matrix columns.
pub fn uv_matrix(uvs: [Vector2<f32>; 3]) -> Matrix2x3<f32> {
    return Matrix2x3::from_columns(&uvs);
}
