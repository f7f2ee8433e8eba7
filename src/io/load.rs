//! Pretrained embedding tables.
//!
//! A table is a JSON document with the vocabulary size, the hidden width,
//! and the row-major `vocab_size * hidden_size` weight matrix. Tables are
//! produced by an external pretraining run and consumed read-only here.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// A pretrained token embedding matrix
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingTable {
    /// Number of rows (token ids)
    pub vocab_size: usize,

    /// Width of each embedding row
    pub hidden_size: usize,

    /// Row-major weights, `vocab_size * hidden_size` values
    pub values: Vec<f32>,
}

/// Loads an embedding table from a JSON file, checking its dimensions.
pub fn load_embedding_table(path: &Path) -> crate::Result<EmbeddingTable> {
    let contents = fs::read_to_string(path)?;
    let table: EmbeddingTable = serde_json::from_str(&contents)?;
    let expected = table.vocab_size * table.hidden_size;
    if table.values.len() != expected {
        return Err(crate::Error::Config(format!(
            "embedding table {} holds {} values, expected {} ({} x {})",
            path.display(),
            table.values.len(),
            expected,
            table.vocab_size,
            table.hidden_size
        )));
    }
    Ok(table)
}

/// Writes an embedding table as JSON, creating parent directories.
pub fn save_embedding_table(table: &EmbeddingTable, path: &Path) -> crate::Result<()> {
    let serialized = serde_json::to_string(table)?;
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    fs::write(path, serialized)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn sample_table() -> EmbeddingTable {
        EmbeddingTable {
            vocab_size: 4,
            hidden_size: 3,
            values: (0..12).map(|i| i as f32 * 0.5).collect(),
        }
    }

    #[test]
    fn test_round_trip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("table.json");

        let table = sample_table();
        save_embedding_table(&table, &path).unwrap();
        let loaded = load_embedding_table(&path).unwrap();

        assert_eq!(loaded.vocab_size, 4);
        assert_eq!(loaded.hidden_size, 3);
        assert_eq!(loaded.values, table.values);
    }

    #[test]
    fn test_rejects_wrong_value_count() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("table.json");

        let mut table = sample_table();
        table.values.pop();
        save_embedding_table(&table, &path).unwrap();

        let err = load_embedding_table(&path).unwrap_err();
        assert!(matches!(err, crate::Error::Config(_)));
    }

    #[test]
    fn test_rejects_non_json() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("table.json");
        std::fs::write(&path, "not a table").unwrap();

        let err = load_embedding_table(&path).unwrap_err();
        assert!(matches!(err, crate::Error::Json(_)));
    }

    #[test]
    fn test_missing_file() {
        let err = load_embedding_table(Path::new("/nonexistent/table.json")).unwrap_err();
        assert!(matches!(err, crate::Error::Io(_)));
    }
}
