use std::path::{Path, PathBuf};
use std::time;

use anyhow::{bail, Context, Result};
use log::{info, warn};

use crate::canvas::{tga, PixelBuffer};
use crate::model::Model;
use crate::scene::shader::ShadingMode;
use crate::scene::{RenderSettings, Scene};

/// Parameters of one rendering run.
#[derive(Debug, Clone, PartialEq)]
pub struct Params {
    pub width: u32,
    pub height: u32,
    pub model_path: PathBuf,
    pub texture_path: Option<PathBuf>, // None means `<mesh stem>_diffuse.tga` next to the mesh, if it exists.
    pub output_path: PathBuf,
    pub depth_path: Option<PathBuf>,
    pub mode: ShadingMode,
    pub rle: bool, // Compress TGA output.
}

/// True if the file extension is tga, in any case.
fn is_tga(path: &Path) -> bool {
    return path
        .extension()
        .map_or(false, |extension| extension.eq_ignore_ascii_case("tga"));
}

/// Diffuse texture conventionally stored next to a mesh: `head.obj` -> `head_diffuse.tga`.
pub fn default_texture_path(model_path: &Path) -> PathBuf {
    let stem = model_path.file_stem().unwrap_or_default().to_string_lossy();
    return model_path.with_file_name(format!("{stem}_diffuse.tga"));
}

/// Loads a texture so that row 0 corresponds to v = 0, i.e. the bottom row of the image.
/// TGA files go through our own codec, anything else through the `image` crate.
pub fn load_texture(path: &Path) -> Result<PixelBuffer> {
    let mut texture = if is_tga(path) {
        tga::load_tga(path).with_context(|| format!("can't load texture {}", path.display()))?
    } else {
        let image = ::image::open(path).with_context(|| format!("can't load texture {}", path.display()))?;
        PixelBuffer::from_rgb_image(&image.to_rgb8())
    };
    texture.flip_vertically();
    info!(
        "Texture {} - {}x{} {}",
        path.display(),
        texture.width(),
        texture.height(),
        texture.format()
    );
    return Ok(texture);
}

/// Saves an image as TGA or, for other extensions, in the format the `image` crate guesses from it.
pub fn save_image(image: &PixelBuffer, path: &Path, rle: bool) -> Result<()> {
    if is_tga(path) {
        tga::save_tga(path, image, rle).with_context(|| format!("can't save {}", path.display()))?;
    } else {
        image
            .to_dynamic_image()
            .save(path)
            .with_context(|| format!("can't save {}", path.display()))?;
    }
    info!("Saved {}", path.display());
    return Ok(());
}

/// Picks the explicitly given texture or the default one, if it exists.
fn find_texture(params: &Params) -> Result<Option<PixelBuffer>> {
    if let Some(path) = &params.texture_path {
        return Ok(Some(load_texture(path)?));
    }
    let path = default_texture_path(&params.model_path);
    if !path.exists() {
        warn!("No texture found at {}", path.display());
        return Ok(None);
    }
    return Ok(Some(load_texture(&path)?));
}

/// Loads the mesh and the texture, renders one frame and writes the images.
/// Nothing is rendered if any of the inputs can't be loaded.
pub fn run(params: Params) -> Result<()> {
    let model = Model::load(&params.model_path)
        .with_context(|| format!("can't load mesh {}", params.model_path.display()))?;
    let texture = match params.mode {
        ShadingMode::Textured | ShadingMode::Smooth => find_texture(&params)?,
        _ => None,
    };
    if params.mode == ShadingMode::Textured && texture.is_none() {
        bail!("textured mode needs a texture, pass one with -t");
    }

    let settings = RenderSettings { mode: params.mode, ..Default::default() };
    let mut scene = Scene::new(params.width, params.height);
    let time_begin = time::Instant::now();
    let stats = scene.render(&model, texture.as_ref(), &settings);
    info!(
        "Rendered {} of {} faces in {:.3}s",
        stats.faces,
        model.face_count(),
        time::Instant::now().duration_since(time_begin).as_secs_f32()
    );

    if let Some(depth_path) = &params.depth_path {
        save_image(&scene.depth_image(), depth_path, params.rle)?;
    }
    save_image(&scene.finish(), &params.output_path, params.rle)?;
    return Ok(());
}
