//! Code-to-image rendering.
//!
//! Source text is lexed into highlighted spans, painted with an embedded
//! glyph font onto an RGB canvas, and post-processed so every pixel is one
//! of the stylesheet's declared colors. [`render_batch`] renders many
//! snippets in parallel, writing numbered PNGs and returning tensors in
//! input order.

mod html;
mod lexer;
mod raster;
mod style;

pub use html::{escape, HtmlDocument};
pub use lexer::{lex_java, Span, TokenKind};
pub use raster::{rasterize, snap_to_palette, CELL_HEIGHT, CELL_WIDTH, TAB_WIDTH};
pub use style::{Stylesheet, DEFAULT_CSS};

use image::RgbImage;
use image::RgbaImage;
use rayon::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};

/// Rendering failures
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("image error for {path}: {source}")]
    Image {
        path: PathBuf,
        source: image::ImageError,
    },

    #[error("i/o error for {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("stylesheet declares no colors")]
    EmptyPalette,
}

/// Canvas size and colors for rendering
#[derive(Debug, Clone)]
pub struct RenderConfig {
    pub width: u32,
    pub height: u32,
    pub stylesheet: Stylesheet,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            width: 128,
            height: 128,
            stylesheet: Stylesheet::default(),
        }
    }
}

fn tensor_from_rgb(img: &RgbImage) -> Vec<f32> {
    img.as_raw().iter().map(|&v| f32::from(v) / 255.0).collect()
}

/// Renders a snippet to a palette-snapped image.
pub fn render_to_image(source: &str, config: &RenderConfig) -> RgbaImage {
    let document = HtmlDocument::from_source(source);
    let mut img = rasterize(&document, &config.stylesheet, config.width, config.height);
    snap_to_palette(&mut img, &config.stylesheet);
    img
}

/// Renders a snippet to a flat RGB tensor of `width * height * 3` values
/// in `[0, 1]`, laid out row-major as (row, col, channel).
pub fn render_to_tensor(source: &str, config: &RenderConfig) -> Vec<f32> {
    let rgb = image::DynamicImage::ImageRgba8(render_to_image(source, config)).to_rgb8();
    tensor_from_rgb(&rgb)
}

/// Renders a snippet and writes it as a PNG, creating parent directories.
pub fn render_to_file(source: &str, path: &Path, config: &RenderConfig) -> crate::Result<()> {
    let img = render_to_image(source, config);
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).map_err(|source| RenderError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }
    }
    img.save(path).map_err(|source| RenderError::Image {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(())
}

/// Renders every snippet in parallel and returns their tensors in input
/// order.
///
/// Each snippet is written as `<index>.png` under `out_dir`, or under a
/// temporary directory that is removed once the tensors have been read
/// back. Any render failure aborts the whole batch.
pub fn render_batch(
    snippets: &[&str],
    out_dir: Option<&Path>,
    config: &RenderConfig,
) -> crate::Result<Vec<Vec<f32>>> {
    let mut temp = None;
    let dir = match out_dir {
        Some(dir) => {
            fs::create_dir_all(dir).map_err(|source| RenderError::Io {
                path: dir.to_path_buf(),
                source,
            })?;
            dir.to_path_buf()
        }
        None => {
            let created = tempfile::TempDir::new()?;
            let path = created.path().to_path_buf();
            temp = Some(created);
            path
        }
    };

    snippets
        .par_iter()
        .enumerate()
        .try_for_each(|(index, snippet)| {
            render_to_file(snippet, &dir.join(format!("{index}.png")), config)
        })?;

    let mut tensors = Vec::with_capacity(snippets.len());
    for index in 0..snippets.len() {
        let path = dir.join(format!("{index}.png"));
        let img = image::open(&path)
            .map_err(|source| RenderError::Image {
                path: path.clone(),
                source,
            })?
            .to_rgb8();
        tensors.push(tensor_from_rgb(&img));
    }

    drop(temp);
    Ok(tensors)
}
