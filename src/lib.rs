//! Legible: multi-modal code readability classification
//!
//! Trains binary readability classifiers over three parallel views of a
//! source-code snippet:
//!
//! - **structural** — a fixed-size ASCII matrix fed to a 2D CNN
//! - **semantic** — a token/segment sequence fed through a BERT-style
//!   embedding, 1D convolutions, and a bidirectional LSTM
//! - **visual** — a rendered 128×128 image of the highlighted code fed to a
//!   2D CNN
//!
//! plus a fused model that concatenates all three feature vectors before the
//! shared classification head. Training runs k-fold cross-validation with
//! per-fold checkpointing and reports accuracy/F1/AUC/MCC per fold and
//! cross-fold means.
//!
//! The crate is self-contained: gradients come from the tape-based engine in
//! [`autograd`], optimization from [`optim`], and the data pipeline from
//! [`data`] and [`render`].

pub mod autograd;
pub mod cli;
pub mod config;
pub mod data;
pub mod io;
pub mod model;
pub mod optim;
pub mod render;
pub mod tokenizer;
pub mod train;

pub use autograd::Tensor;
pub use data::{Dataset, Sample};
pub use model::{build_model, EmbeddingConfig, ModelConfig, ReadabilityModel, Variant};
pub use train::{run_experiment, ExperimentReport, TrainSettings};

/// Crate-level error type
///
/// Module errors convert into this via `From`; fallible public functions
/// return [`Result`].
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error(transparent)]
    Data(#[from] data::DataError),

    #[error(transparent)]
    Render(#[from] render::RenderError),

    #[error(transparent)]
    Tokenizer(#[from] tokenizer::TokenizerError),

    #[error(transparent)]
    Metrics(#[from] train::MetricsError),

    #[error(transparent)]
    Model(#[from] model::ModelError),

    #[error("configuration error: {0}")]
    Config(String),
}

/// Crate-level result alias
pub type Result<T> = std::result::Result<T, Error>;
