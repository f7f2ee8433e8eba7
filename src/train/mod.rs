//! Cross-validated training.
//!
//! The pipeline: [`contiguous_folds`] partitions the dataset, each fold
//! trains a fresh model with [`BinaryCrossEntropy`] loss and RMSprop,
//! [`EpochMetrics`] scores every epoch, and [`run_experiment`] assembles
//! the per-variant [`ExperimentReport`].

mod batch;
mod fold;
mod loss;
mod metrics;
mod report;
mod trainer;

pub use batch::index_batches;
pub use fold::{contiguous_folds, Fold};
pub use loss::{BinaryCrossEntropy, LossFn};
pub use metrics::{auc, ConfusionCounts, EpochMetrics, MetricsError, DECISION_THRESHOLD};
pub use report::{ExperimentReport, FoldRecord, VariantReport, VariantSummary};
pub use trainer::{run_experiment, TrainSettings};
