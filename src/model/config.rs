//! Model configuration structures

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use super::ModelError;

/// Configuration for the token-sequence embedding
///
/// Mirrors a full transformer config so the same file can describe the
/// encoder a vocabulary was trained with. Only the embedding-related
/// fields are consumed here; the layer and head counts are carried along
/// untouched.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    /// Vocabulary size (token table rows)
    pub vocab_size: usize,
    /// Hidden dimension (embedding size)
    pub hidden_size: usize,
    /// Number of transformer layers (unused by the embedding)
    pub num_hidden_layers: usize,
    /// Number of attention heads (unused by the embedding)
    pub num_attention_heads: usize,
    /// Segment/token-type table rows
    pub type_vocab_size: usize,
    /// Dropout applied after the summed embedding
    pub hidden_dropout: f32,
    /// Attention dropout (unused by the embedding)
    pub attention_dropout: f32,
    /// Position table rows; longer sequences wrap modulo this
    pub max_position_embeddings: usize,
    /// Token/segment sequence length every sample is padded to
    pub max_sequence_length: usize,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            vocab_size: 30_000,
            hidden_size: 768,
            num_hidden_layers: 12,
            num_attention_heads: 12,
            type_vocab_size: 300,
            hidden_dropout: 0.1,
            attention_dropout: 0.1,
            max_position_embeddings: 200,
            max_sequence_length: 100,
        }
    }
}

impl EmbeddingConfig {
    /// Small configuration for testing
    ///
    /// The sequence length exceeds `max_position_embeddings` on purpose so
    /// tests cover the position wrap.
    pub fn tiny() -> Self {
        Self {
            vocab_size: 64,
            hidden_size: 8,
            num_hidden_layers: 1,
            num_attention_heads: 1,
            type_vocab_size: 24,
            hidden_dropout: 0.1,
            attention_dropout: 0.1,
            max_position_embeddings: 12,
            max_sequence_length: 20,
        }
    }

    pub fn validate(&self) -> Result<(), ModelError> {
        if self.vocab_size == 0 || self.hidden_size == 0 {
            return Err(ModelError::InvalidConfig(
                "vocab_size and hidden_size must be non-zero".to_string(),
            ));
        }
        if self.max_position_embeddings == 0 {
            return Err(ModelError::InvalidConfig(
                "max_position_embeddings must be non-zero".to_string(),
            ));
        }
        if !(0.0..1.0).contains(&self.hidden_dropout) {
            return Err(ModelError::InvalidConfig(format!(
                "hidden_dropout {} outside [0, 1)",
                self.hidden_dropout
            )));
        }
        Ok(())
    }
}

/// Shapes and options shared by every model variant
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Token embedding configuration
    pub embedding: EmbeddingConfig,
    /// Structural matrix rows (source lines kept per snippet)
    pub structure_rows: usize,
    /// Structural matrix columns (character codes kept per line)
    pub structure_cols: usize,
    /// Rendered image edge length in pixels
    pub image_size: usize,
    /// Optional pretrained token-embedding table; when set, the semantic
    /// path uses it frozen instead of training its own
    pub pretrained_table: Option<PathBuf>,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            embedding: EmbeddingConfig::default(),
            structure_rows: 50,
            structure_cols: 305,
            image_size: 128,
            pretrained_table: None,
        }
    }
}

impl ModelConfig {
    /// Small configuration for testing
    pub fn tiny() -> Self {
        Self {
            embedding: EmbeddingConfig::tiny(),
            structure_rows: 28,
            structure_cols: 30,
            image_size: 16,
            pretrained_table: None,
        }
    }

    pub fn validate(&self) -> Result<(), ModelError> {
        self.embedding.validate()?;
        if super::extractor::structural_output_len(self.structure_rows, self.structure_cols) == 0 {
            return Err(ModelError::InvalidConfig(format!(
                "structure {}x{} collapses to an empty feature map",
                self.structure_rows, self.structure_cols
            )));
        }
        if super::extractor::semantic_output_len(self.embedding.max_sequence_length) == 0 {
            return Err(ModelError::InvalidConfig(format!(
                "sequence length {} collapses to an empty feature map",
                self.embedding.max_sequence_length
            )));
        }
        if super::extractor::visual_output_len(self.image_size) == 0 {
            return Err(ModelError::InvalidConfig(format!(
                "image size {} collapses to an empty feature map",
                self.image_size
            )));
        }
        Ok(())
    }
}
