//! Readability classifier models
//!
//! Four variants share one classification head: a structural CNN over the
//! character matrix, a semantic CNN+BiLSTM over token ids, a visual CNN
//! over the rendered image, and a fused model concatenating all three
//! feature vectors. [`build_model`] assembles any of them from a
//! [`ModelConfig`].

mod assemble;
mod config;
mod conv;
mod dense;
mod embedding;
mod extractor;
mod head;
mod recurrent;

pub use assemble::{build_model, FusedModel, ReadabilityModel, SemanticModel, StructuralModel, Variant, VisualModel};
pub use config::{EmbeddingConfig, ModelConfig};
pub use dense::Dense;
pub use embedding::{position_indices, BertEmbedding, PretrainedEmbedding, SequenceEmbedding};
pub use extractor::{
    semantic_output_len, structural_output_len, visual_output_len, SemanticExtractor,
    StructuralExtractor, VisualExtractor,
};
pub use head::ClassificationHead;

use thiserror::Error;

/// Model construction and forward-pass failures
#[derive(Debug, Error)]
pub enum ModelError {
    #[error("{what} has {actual} elements, expected {expected}")]
    ShapeMismatch {
        what: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("invalid model configuration: {0}")]
    InvalidConfig(String),

    #[error("saved state names unknown parameter '{0}'")]
    UnknownParameter(String),

    #[error("parameter {name} has {actual} stored values, expected {expected}")]
    ParameterLength {
        name: String,
        expected: usize,
        actual: usize,
    },

    #[error("checkpoint was trained as {found}, model is {expected}")]
    VariantMismatch {
        expected: assemble::Variant,
        found: assemble::Variant,
    },

    #[error("model state is corrupt: {0}")]
    CorruptState(String),
}
