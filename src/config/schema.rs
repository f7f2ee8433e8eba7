//! YAML schema for declarative experiment configuration

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::model::ModelConfig;
use crate::train::TrainSettings;

/// Number of special tokens a trained vocabulary always contains.
const SPECIAL_TOKEN_COUNT: usize = 5;

/// Complete experiment specification
///
/// Everything except the data directories has a default, so a minimal
/// config names three directories and nothing else.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExperimentSpec {
    /// Modality directory roots
    pub data: DataPaths,

    /// Tokenizer source and limits
    #[serde(default)]
    pub tokenizer: TokenizerSpec,

    /// Model shapes
    #[serde(default)]
    pub model: ModelConfig,

    /// Training hyperparameters
    #[serde(default)]
    pub training: TrainSettings,
}

/// Where each modality lives on disk
///
/// Every root holds `Readable` and `Unreadable` label subfolders; the
/// filename minus its extension is the join key across the three trees.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DataPaths {
    /// Character-matrix CSV files
    #[serde(default)]
    pub structure_dir: PathBuf,

    /// Raw snippet text files
    #[serde(default)]
    pub texture_dir: PathBuf,

    /// Rendered snippet images
    #[serde(default)]
    pub picture_dir: PathBuf,
}

/// Tokenizer source and limits
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TokenizerSpec {
    /// Existing vocabulary file; trained from the corpus when absent
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vocab_file: Option<PathBuf>,

    /// Target vocabulary size when training from the corpus
    pub vocab_size: usize,

    /// Token/segment sequence length, must match the model's
    pub max_length: usize,
}

impl Default for TokenizerSpec {
    fn default() -> Self {
        Self {
            vocab_file: None,
            vocab_size: 30_000,
            max_length: 100,
        }
    }
}

impl ExperimentSpec {
    /// Checks cross-section consistency, not filesystem state.
    pub fn validate(&self) -> crate::Result<()> {
        for (name, dir) in [
            ("data.structure_dir", &self.data.structure_dir),
            ("data.texture_dir", &self.data.texture_dir),
            ("data.picture_dir", &self.data.picture_dir),
        ] {
            if dir.as_os_str().is_empty() {
                return Err(crate::Error::Config(format!("{name} is not set")));
            }
        }
        if self.tokenizer.vocab_size <= SPECIAL_TOKEN_COUNT {
            return Err(crate::Error::Config(format!(
                "tokenizer.vocab_size {} leaves no room beyond the {} special tokens",
                self.tokenizer.vocab_size, SPECIAL_TOKEN_COUNT
            )));
        }
        if self.tokenizer.max_length != self.model.embedding.max_sequence_length {
            return Err(crate::Error::Config(format!(
                "tokenizer.max_length {} does not match model sequence length {}",
                self.tokenizer.max_length, self.model.embedding.max_sequence_length
            )));
        }
        self.model.validate()?;
        self.training.validate()?;
        Ok(())
    }
}

/// Loads and validates an experiment spec from a YAML file.
pub fn load_config(path: &Path) -> crate::Result<ExperimentSpec> {
    let text = fs::read_to_string(path)?;
    let spec: ExperimentSpec = serde_yaml::from_str(&text)?;
    spec.validate()?;
    Ok(spec)
}
