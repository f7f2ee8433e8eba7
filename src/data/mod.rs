//! Dataset loading: the three modality preprocessors and the keyed join
//! that assembles complete training samples.
//!
//! Each modality lives in its own directory tree with `Readable` and
//! `Unreadable` label subfolders; the filename minus its extension is the
//! join key shared across modalities. Samples that cannot be joined are
//! reported, never silently dropped.

mod dataset;
mod picture;
mod structure;
mod texture;

pub use dataset::{Dataset, JoinGap, Modality};
pub use picture::{load_picture, load_pictures};
pub use structure::{load_structures, matrix_from_rows, StructureData, MAX_COLUMNS};
pub use texture::{clean_snippet, encode_snippet, read_corpus, PAD_WORD};

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Data pipeline errors
#[derive(Debug, Error)]
pub enum DataError {
    #[error("malformed input in {path} line {line}: {detail}")]
    MalformedInput {
        path: PathBuf,
        line: usize,
        detail: String,
    },

    #[error("cannot decode image {path}: {source}")]
    Image {
        path: PathBuf,
        source: image::ImageError,
    },

    #[error("I/O error reading {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("sample {key} has no {modality} representation")]
    MissingModality { key: String, modality: Modality },

    #[error("no complete samples were assembled")]
    EmptyDataset,
}

/// One fully joined training sample.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Sample {
    /// File-stem join key shared across the modality directories.
    pub key: String,
    /// 0.0 readable, 1.0 unreadable.
    pub label: f32,
    /// Row-major ASCII matrix, `rows * cols` values.
    pub structure: Vec<f32>,
    /// Token ids, padded to the configured sequence length.
    pub tokens: Vec<u32>,
    /// Segment ids aligned with `tokens`.
    pub segments: Vec<u32>,
    /// Row-major (row, col, rgb) pixels scaled to [0, 1].
    pub picture: Vec<f32>,
}

/// The two label subfolders under a modality root, matched case-insensitively.
pub(crate) fn label_dirs(root: &Path) -> Result<Vec<(f32, PathBuf)>, DataError> {
    let entries = fs::read_dir(root).map_err(|source| DataError::Io {
        path: root.to_path_buf(),
        source,
    })?;
    let mut dirs = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|source| DataError::Io {
            path: root.to_path_buf(),
            source,
        })?;
        let path = entry.path();
        if !path.is_dir() {
            continue;
        }
        let label = match entry.file_name().to_string_lossy().to_lowercase().as_str() {
            "readable" => 0.0,
            "unreadable" => 1.0,
            _ => continue,
        };
        dirs.push((label, path));
    }
    dirs.sort_by(|a, b| a.1.cmp(&b.1));
    Ok(dirs)
}

/// Regular files in `dir`, hidden names skipped, sorted for determinism.
pub(crate) fn visible_files(dir: &Path) -> Result<Vec<PathBuf>, DataError> {
    let entries = fs::read_dir(dir).map_err(|source| DataError::Io {
        path: dir.to_path_buf(),
        source,
    })?;
    let mut files = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|source| DataError::Io {
            path: dir.to_path_buf(),
            source,
        })?;
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        if entry.file_name().to_string_lossy().starts_with('.') {
            continue;
        }
        files.push(path);
    }
    files.sort();
    Ok(files)
}

pub(crate) fn file_stem_string(path: &Path) -> String {
    path.file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default()
}
