//! Structural modality: comma-separated character matrices.

use super::{file_stem_string, label_dirs, visible_files, DataError};
use std::collections::HashMap;
use std::fs;
use std::path::Path;

/// Widest row retained from a structural matrix file.
pub const MAX_COLUMNS: usize = 305;

/// Everything the structural directory provides: sample keys in sorted
/// order, each sample's label, and its fixed-shape matrix.
#[derive(Debug, Clone, Default)]
pub struct StructureData {
    pub keys: Vec<String>,
    pub labels: HashMap<String, f32>,
    pub matrices: HashMap<String, Vec<f32>>,
}

/// Reads every matrix file under the label subfolders of `root`, fixing each
/// matrix to `rows * cols` values.
pub fn load_structures(root: &Path, rows: usize, cols: usize) -> Result<StructureData, DataError> {
    let mut data = StructureData::default();
    for (label, dir) in label_dirs(root)? {
        for path in visible_files(&dir)? {
            let key = file_stem_string(&path);
            let raw = parse_matrix_file(&path)?;
            data.matrices.insert(key.clone(), matrix_from_rows(&raw, rows, cols));
            data.labels.insert(key.clone(), label);
            data.keys.push(key);
        }
    }
    data.keys.sort_unstable();
    data.keys.dedup();
    Ok(data)
}

/// Fixes a ragged matrix to `rows * cols` values in row-major order.
///
/// Rows wider than `cols` keep their first `cols` values in original order;
/// everything short is zero padded.
pub fn matrix_from_rows(raw: &[Vec<f32>], rows: usize, cols: usize) -> Vec<f32> {
    let mut out = vec![0.0; rows * cols];
    for (r, row) in raw.iter().take(rows).enumerate() {
        for (c, &value) in row.iter().take(cols).enumerate() {
            out[r * cols + c] = value;
        }
    }
    out
}

fn parse_matrix_file(path: &Path) -> Result<Vec<Vec<f32>>, DataError> {
    let text = fs::read_to_string(path).map_err(|source| DataError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let mut rows = Vec::new();
    for (i, line) in text.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let mut row = Vec::new();
        for cell in line.split(',') {
            let cell = cell.trim();
            if cell.is_empty() {
                continue;
            }
            let value: i32 = cell.parse().map_err(|_| DataError::MalformedInput {
                path: path.to_path_buf(),
                line: i + 1,
                detail: format!("{cell:?} is not an integer"),
            })?;
            row.push(value as f32);
        }
        rows.push(row);
    }
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn write_tree(files: &[(&str, &str)]) -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        for (rel, content) in files {
            let path = dir.path().join(rel);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(path, content).unwrap();
        }
        dir
    }

    #[test]
    fn test_load_structures_labels_and_keys() {
        let dir = write_tree(&[
            ("Readable/b.csv", "104,101\n108,112"),
            ("Readable/a.csv", "32"),
            ("Unreadable/c.csv", "9,9,9"),
            ("Readable/.skip.csv", "1"),
        ]);

        let data = load_structures(dir.path(), 2, 3).unwrap();
        assert_eq!(data.keys, vec!["a", "b", "c"]);
        assert_eq!(data.labels["a"], 0.0);
        assert_eq!(data.labels["c"], 1.0);
        assert_eq!(data.matrices["b"], vec![104.0, 101.0, 0.0, 108.0, 112.0, 0.0]);
    }

    #[test]
    fn test_malformed_cell_reports_path_and_line() {
        let dir = write_tree(&[("Unreadable/bad.csv", "1,2\n3,oops")]);
        let err = load_structures(dir.path(), 2, 2).unwrap_err();
        match err {
            DataError::MalformedInput { path, line, detail } => {
                assert!(path.ends_with("bad.csv"));
                assert_eq!(line, 2);
                assert!(detail.contains("oops"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_wide_row_keeps_first_cols_in_order() {
        let raw = vec![(0..400).map(|v| v as f32).collect::<Vec<f32>>()];
        let fixed = matrix_from_rows(&raw, 1, MAX_COLUMNS);
        assert_eq!(fixed.len(), MAX_COLUMNS);
        assert_eq!(fixed[0], 0.0);
        assert_eq!(fixed[MAX_COLUMNS - 1], (MAX_COLUMNS - 1) as f32);
    }

    #[test]
    fn test_short_matrix_zero_padded() {
        let raw = vec![vec![7.0]];
        let fixed = matrix_from_rows(&raw, 2, 2);
        assert_eq!(fixed, vec![7.0, 0.0, 0.0, 0.0]);
    }

    #[test]
    fn test_extra_rows_dropped() {
        let raw = vec![vec![1.0], vec![2.0], vec![3.0]];
        let fixed = matrix_from_rows(&raw, 2, 1);
        assert_eq!(fixed, vec![1.0, 2.0]);
    }

    #[test]
    fn test_trailing_commas_and_blank_lines_tolerated() {
        let dir = write_tree(&[("Readable/a.csv", "1,2,\n\n3,4")]);
        let data = load_structures(dir.path(), 2, 2).unwrap();
        assert_eq!(data.matrices["a"], vec![1.0, 2.0, 3.0, 4.0]);
    }
}
