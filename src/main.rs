use std::env;
use std::path::PathBuf;

use anyhow::{anyhow, bail, Context, Result};
use tiny_rasterizer::app;
use tiny_rasterizer::scene::shader::ShadingMode;

const WIDTH: u32 = 800;
const HEIGHT: u32 = 800;

const USAGE: &str = "usage: tiny_rasterizer [-m mesh.obj] [-t texture] [-o output] [-s wireframe|flat|textured|smooth] \
                     [-W width] [-H height] [-d depth_output] [--raw]";

fn parse_size(value: &str, flag: &str) -> Result<u32> {
    let size: u32 = value.parse().with_context(|| format!("{flag} expects a positive integer, got '{value}'"))?;
    if size == 0 {
        bail!("{flag} expects a positive integer, got 0");
    }
    return Ok(size);
}

fn parse_args(args: &[String]) -> Result<app::Params> {
    // Default values.
    let mut params = app::Params {
        width: WIDTH,
        height: HEIGHT,
        model_path: PathBuf::from("assets/african_head.obj"),
        texture_path: None,
        output_path: PathBuf::from("output.tga"),
        depth_path: None,
        mode: ShadingMode::Textured,
        rle: true,
    };

    let mut i = 0;
    while i < args.len() {
        let flag = args[i].as_str();
        if flag == "--raw" {
            params.rle = false;
            i += 1;
            continue;
        }
        let value = args
            .get(i + 1)
            .ok_or_else(|| anyhow!("missing value for {flag}\n{USAGE}"))?;
        match flag {
            "-m" => { params.model_path = PathBuf::from(value); }
            "-t" => { params.texture_path = Some(PathBuf::from(value)); }
            "-o" => { params.output_path = PathBuf::from(value); }
            "-d" => { params.depth_path = Some(PathBuf::from(value)); }
            "-s" => { params.mode = value.parse()?; }
            "-W" => { params.width = parse_size(value, flag)?; }
            "-H" => { params.height = parse_size(value, flag)?; }
            _ => bail!("unknown argument '{flag}'\n{USAGE}"),
        }
        i += 2;
    }
    return Ok(params);
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args: Vec<String> = env::args().skip(1).collect();
    let params = parse_args(&args)?;
    app::run(params)?;

    return Ok(());
}
