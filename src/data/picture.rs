//! Picture modality: decode, resize, and scale rendered snippet images.

use super::{file_stem_string, label_dirs, visible_files, DataError};
use image::imageops::FilterType;
use std::collections::BTreeMap;
use std::path::Path;

/// Decodes one image, resizes it to `size` x `size`, and scales RGB values
/// to [0, 1] in row-major (row, col, channel) order.
pub fn load_picture(path: &Path, size: u32) -> Result<Vec<f32>, DataError> {
    let img = image::open(path).map_err(|source| DataError::Image {
        path: path.to_path_buf(),
        source,
    })?;
    let rgb = img.resize_exact(size, size, FilterType::Triangle).to_rgb8();
    Ok(rgb.into_raw().iter().map(|&v| f32::from(v) / 255.0).collect())
}

/// Loads every image under the label subfolders of `root`, keyed by
/// file stem.
pub fn load_pictures(root: &Path, size: u32) -> Result<BTreeMap<String, Vec<f32>>, DataError> {
    let mut pictures = BTreeMap::new();
    for (_, dir) in label_dirs(root)? {
        for path in visible_files(&dir)? {
            pictures.insert(file_stem_string(&path), load_picture(&path, size)?);
        }
    }
    Ok(pictures)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};
    use std::fs;

    fn solid_png(dir: &Path, name: &str, w: u32, h: u32, color: [u8; 3]) {
        let img = RgbImage::from_pixel(w, h, Rgb(color));
        img.save(dir.join(name)).unwrap();
    }

    #[test]
    fn test_load_picture_shape_and_range() {
        let dir = tempfile::tempdir().unwrap();
        solid_png(dir.path(), "a.png", 40, 20, [255, 128, 0]);

        let pixels = load_picture(&dir.path().join("a.png"), 16).unwrap();
        assert_eq!(pixels.len(), 16 * 16 * 3);
        assert!(pixels.iter().all(|&v| (0.0..=1.0).contains(&v)));
        // solid color survives resampling
        assert_eq!(pixels[0], 1.0);
        assert_eq!(pixels[2], 0.0);
    }

    #[test]
    fn test_load_picture_rejects_non_image() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.png"), "not a png").unwrap();
        let err = load_picture(&dir.path().join("a.png"), 16).unwrap_err();
        assert!(matches!(err, DataError::Image { .. }));
    }

    #[test]
    fn test_load_pictures_walks_label_folders() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("readable")).unwrap();
        fs::create_dir_all(dir.path().join("unreadable")).unwrap();
        solid_png(&dir.path().join("readable"), "r1.png", 8, 8, [0, 0, 0]);
        solid_png(&dir.path().join("unreadable"), "u1.png", 8, 8, [255, 255, 255]);

        let pictures = load_pictures(dir.path(), 8).unwrap();
        assert_eq!(pictures.len(), 2);
        assert!(pictures.contains_key("r1"));
        assert!(pictures.contains_key("u1"));
    }
}
