//! Software rasterizer: loads a Wavefront OBJ mesh, draws it through a z-buffer with flat,
//! textured or smoothly lit triangles and writes the frame as a TGA (or any `image` format).

pub mod app;
pub mod canvas;
pub mod model;
pub mod scene;
pub mod util;
