use std::fmt::{self, Display, Formatter};
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::Path;

use log::info;
use na::{vector, Vector2, Vector3};
use nalgebra as na;
use obj::raw::object::Polygon;
use obj::raw::{parse_obj, RawObj};
use obj::ObjError;

/// Indices of the attributes of one face corner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FaceVertex {
    pub position: usize,
    pub tex_coord: Option<usize>,
    pub normal: Option<usize>,
}

impl FaceVertex {
    pub fn new(position: usize, tex_coord: Option<usize>, normal: Option<usize>) -> Self {
        return Self { position, tex_coord, normal };
    }
}

/// Triangle of the mesh.
pub type Face = [FaceVertex; 3];

/// Kind of vertex attribute a face refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Attribute {
    Position,
    TexCoord,
    Normal,
}

impl Display for Attribute {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let name = match self {
            Attribute::Position => "position",
            Attribute::TexCoord => "texture coordinate",
            Attribute::Normal => "normal",
        };
        f.write_str(name)
    }
}

/// Error while loading or validating a mesh.
#[derive(Debug)]
pub enum ModelError {
    /// Mesh file couldn't be opened.
    Io(io::Error),
    /// Mesh file isn't valid Wavefront OBJ.
    Parse(ObjError),
    /// Polygon with less than 3 corners.
    DegenerateFace { face: usize, corners: usize },
    /// Face refers to an attribute that doesn't exist.
    IndexOutOfRange { face: usize, attribute: Attribute, index: usize, len: usize },
}

impl Display for ModelError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            ModelError::Io(e) => write!(f, "can't read mesh: {e}"),
            ModelError::Parse(e) => write!(f, "can't parse mesh: {e}"),
            ModelError::DegenerateFace { face, corners } => {
                write!(f, "face {face} has only {corners} corners")
            }
            ModelError::IndexOutOfRange { face, attribute, index, len } => write!(
                f,
                "face {face} refers to {attribute} {index}, but the mesh has only {len}"
            ),
        }
    }
}

impl std::error::Error for ModelError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ModelError::Io(e) => Some(e),
            ModelError::Parse(e) => Some(e),
            _ => None,
        }
    }
}

/// Indexed triangle mesh, immutable once loaded.
/// Every index stored in the faces is checked to be in range.
#[derive(Debug, Clone, Default)]
pub struct Model {
    positions: Vec<Vector3<f32>>,
    tex_coords: Vec<Vector2<f32>>,
    normals: Vec<Vector3<f32>>,
    faces: Vec<Face>,
}

impl Model {
    /// Builds a mesh, failing on the first face corner with an index out of range.
    pub fn new(
        positions: Vec<Vector3<f32>>,
        tex_coords: Vec<Vector2<f32>>,
        normals: Vec<Vector3<f32>>,
        faces: Vec<Face>,
    ) -> Result<Self, ModelError> {
        fn check(face: usize, attribute: Attribute, index: usize, len: usize) -> Result<(), ModelError> {
            if index >= len {
                return Err(ModelError::IndexOutOfRange { face, attribute, index, len });
            }
            return Ok(());
        }

        for (i, face) in faces.iter().enumerate() {
            for corner in face {
                check(i, Attribute::Position, corner.position, positions.len())?;
                if let Some(index) = corner.tex_coord {
                    check(i, Attribute::TexCoord, index, tex_coords.len())?;
                }
                if let Some(index) = corner.normal {
                    check(i, Attribute::Normal, index, normals.len())?;
                }
            }
        }
        return Ok(Self { positions, tex_coords, normals, faces });
    }

    /// Loads a Wavefront OBJ file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ModelError> {
        let file = File::open(path).map_err(ModelError::Io)?;
        return Self::from_reader(BufReader::new(file));
    }

    /// Parses Wavefront OBJ data.
    pub fn from_reader(reader: impl BufRead) -> Result<Self, ModelError> {
        let raw = parse_obj(reader).map_err(ModelError::Parse)?;
        return Self::from_raw(raw);
    }

    /// Conversion of a parsed OBJ, polygons with more than 3 corners are split into a fan of triangles.
    pub fn from_raw(raw: RawObj) -> Result<Self, ModelError> {
        let positions: Vec<Vector3<f32>> = raw.positions.iter().map(|p| vector![p.0, p.1, p.2]).collect();
        let tex_coords: Vec<Vector2<f32>> = raw.tex_coords.iter().map(|t| vector![t.0, t.1]).collect();
        let normals: Vec<Vector3<f32>> = raw.normals.iter().map(|n| vector![n.0, n.1, n.2]).collect();

        let mut faces = Vec::<Face>::with_capacity(raw.polygons.len());
        for (i, polygon) in raw.polygons.iter().enumerate() {
            let corners: Vec<FaceVertex> = match polygon {
                Polygon::P(ps) => ps.iter().map(|&p| FaceVertex::new(p, None, None)).collect(),
                Polygon::PT(pts) => pts.iter().map(|&(p, t)| FaceVertex::new(p, Some(t), None)).collect(),
                Polygon::PN(pns) => pns.iter().map(|&(p, n)| FaceVertex::new(p, None, Some(n))).collect(),
                Polygon::PTN(ptns) => ptns
                    .iter()
                    .map(|&(p, t, n)| FaceVertex::new(p, Some(t), Some(n)))
                    .collect(),
            };
            if corners.len() < 3 {
                return Err(ModelError::DegenerateFace { face: i, corners: corners.len() });
            }
            for j in 1..corners.len() - 1 {
                faces.push([corners[0], corners[j], corners[j + 1]]);
            }
        }

        let model = Self::new(positions, tex_coords, normals, faces)?;
        info!("Number of positions  - {}", model.position_count());
        info!("Number of tex coords - {}", model.tex_coord_count());
        info!("Number of normals    - {}", model.normal_count());
        info!("Number of faces      - {}", model.face_count());
        return Ok(model);
    }

    pub fn position_count(&self) -> usize {
        return self.positions.len();
    }

    pub fn position(&self, i: usize) -> Vector3<f32> {
        return self.positions[i];
    }

    pub fn tex_coord_count(&self) -> usize {
        return self.tex_coords.len();
    }

    pub fn tex_coord(&self, i: usize) -> Vector2<f32> {
        return self.tex_coords[i];
    }

    pub fn normal_count(&self) -> usize {
        return self.normals.len();
    }

    pub fn normal(&self, i: usize) -> Vector3<f32> {
        return self.normals[i];
    }

    pub fn face_count(&self) -> usize {
        return self.faces.len();
    }

    pub fn face(&self, i: usize) -> Face {
        return self.faces[i];
    }

    pub fn faces(&self) -> &[Face] {
        return &self.faces[..];
    }

    /// Positions of the corners of a face.
    pub fn face_positions(&self, face: &Face) -> [Vector3<f32>; 3] {
        return face.map(|corner| self.positions[corner.position]);
    }

    /// Texture coordinates of the corners of a face, None if any corner has none.
    pub fn face_tex_coords(&self, face: &Face) -> Option<[Vector2<f32>; 3]> {
        let mut tex_coords = [Vector2::zeros(); 3];
        for i in 0..3 {
            tex_coords[i] = self.tex_coords[face[i].tex_coord?];
        }
        return Some(tex_coords);
    }

    /// Normals of the corners of a face, None if any corner has none.
    pub fn face_normals(&self, face: &Face) -> Option<[Vector3<f32>; 3]> {
        let mut normals = [Vector3::zeros(); 3];
        for i in 0..3 {
            normals[i] = self.normals[face[i].normal?];
        }
        return Some(normals);
    }
}
