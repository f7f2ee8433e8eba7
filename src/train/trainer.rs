//! Cross-validated training driver.
//!
//! [`run_experiment`] trains every requested model variant across k
//! contiguous folds. Each fold gets a freshly seeded model and optimizer;
//! the epoch with the best validation accuracy is checkpointed under
//! `output_dir/fold_<i>/`.

use super::batch::index_batches;
use super::fold::{contiguous_folds, Fold};
use super::loss::{BinaryCrossEntropy, LossFn};
use super::metrics::EpochMetrics;
use super::report::{ExperimentReport, FoldRecord, VariantReport, VariantSummary};
use crate::autograd::{backward, concat, Tensor};
use crate::data::Dataset;
use crate::model::{build_model, ModelConfig, ReadabilityModel, Variant};
use crate::optim::{clip_grad_norm, Optimizer, RmsProp};
use ndarray::Array1;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Experiment hyperparameters
///
/// Defaults reproduce the published readability experiments. Unknown fields
/// in a config file are rejected by serde; missing fields fall back to the
/// defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TrainSettings {
    /// Number of cross-validation folds
    pub folds: usize,

    /// Training epochs per fold
    pub epochs: usize,

    /// Samples per gradient step
    pub batch_size: usize,

    /// RMSprop learning rate
    pub learning_rate: f32,

    /// Global gradient-norm ceiling, unclipped when `None`
    pub clip_norm: Option<f32>,

    /// Base seed; folds and variants derive their own streams from it
    pub seed: u64,

    /// Directory receiving per-fold checkpoints and the report
    pub output_dir: PathBuf,

    /// Which model variants to train
    pub variants: Vec<Variant>,

    /// Print progress every n epochs, 0 for silence
    pub log_every: usize,
}

impl Default for TrainSettings {
    fn default() -> Self {
        Self {
            folds: 10,
            epochs: 20,
            batch_size: 42,
            learning_rate: 0.0015,
            clip_norm: None,
            seed: 42,
            output_dir: PathBuf::from("runs"),
            variants: Variant::all().to_vec(),
            log_every: 1,
        }
    }
}

impl TrainSettings {
    pub fn with_folds(mut self, folds: usize) -> Self {
        self.folds = folds;
        self
    }

    pub fn with_epochs(mut self, epochs: usize) -> Self {
        self.epochs = epochs;
        self
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    pub fn with_learning_rate(mut self, learning_rate: f32) -> Self {
        self.learning_rate = learning_rate;
        self
    }

    pub fn with_clip_norm(mut self, clip_norm: f32) -> Self {
        self.clip_norm = Some(clip_norm);
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_output_dir(mut self, output_dir: impl Into<PathBuf>) -> Self {
        self.output_dir = output_dir.into();
        self
    }

    pub fn with_variants(mut self, variants: Vec<Variant>) -> Self {
        self.variants = variants;
        self
    }

    pub fn with_log_every(mut self, log_every: usize) -> Self {
        self.log_every = log_every;
        self
    }

    pub fn validate(&self) -> crate::Result<()> {
        if self.folds < 2 {
            return Err(crate::Error::Config(
                "cross-validation needs at least 2 folds".to_string(),
            ));
        }
        if self.epochs == 0 {
            return Err(crate::Error::Config("epochs must be at least 1".to_string()));
        }
        if self.batch_size == 0 {
            return Err(crate::Error::Config(
                "batch_size must be at least 1".to_string(),
            ));
        }
        if !(self.learning_rate.is_finite() && self.learning_rate > 0.0) {
            return Err(crate::Error::Config(format!(
                "learning_rate must be positive, got {}",
                self.learning_rate
            )));
        }
        if let Some(clip) = self.clip_norm {
            if !(clip.is_finite() && clip > 0.0) {
                return Err(crate::Error::Config(format!(
                    "clip_norm must be positive, got {clip}"
                )));
            }
        }
        if self.variants.is_empty() {
            return Err(crate::Error::Config(
                "at least one variant must be selected".to_string(),
            ));
        }
        Ok(())
    }
}

/// One model plus its optimizer and loss, bound to a single fold
struct FoldTrainer {
    model: Box<dyn ReadabilityModel>,
    params: Vec<Tensor>,
    optimizer: RmsProp,
    loss: BinaryCrossEntropy,
    clip_norm: Option<f32>,
}

impl FoldTrainer {
    /// Parameters are captured once so the optimizer sees a stable order.
    fn new(model: Box<dyn ReadabilityModel>, settings: &TrainSettings) -> Self {
        let params = model.parameters();
        Self {
            model,
            params,
            optimizer: RmsProp::new(settings.learning_rate),
            loss: BinaryCrossEntropy::new(),
            clip_norm: settings.clip_norm,
        }
    }

    fn model(&self) -> &dyn ReadabilityModel {
        self.model.as_ref()
    }

    /// One gradient step over a batch of sample indices.
    ///
    /// Returns the batch loss including the L2 penalty.
    fn train_batch(&mut self, dataset: &Dataset, indices: &[usize]) -> crate::Result<f32> {
        self.optimizer.zero_grad(&mut self.params);

        let samples = dataset.samples();
        let mut predictions = Vec::with_capacity(indices.len());
        let mut labels = Vec::with_capacity(indices.len());
        for &i in indices {
            predictions.push(self.model.forward(&samples[i], true)?);
            labels.push(samples[i].label);
        }
        let refs: Vec<&Tensor> = predictions.iter().collect();
        let scores = concat(&refs);
        let targets = Tensor::new(Array1::from(labels), false);

        let mut loss = self.loss.forward(&scores, &targets);
        let penalty = self.model.l2_penalty();
        backward(&mut loss, None);
        self.model.apply_l2();

        if let Some(max_norm) = self.clip_norm {
            clip_grad_norm(&mut self.params, max_norm);
        }
        self.optimizer.step(&mut self.params);

        Ok(loss.data()[0] + penalty)
    }

    /// Mean per-sample training loss over one pass of `order`.
    fn train_epoch(
        &mut self,
        dataset: &Dataset,
        order: &[usize],
        batch_size: usize,
    ) -> crate::Result<f32> {
        let mut total = 0.0;
        for batch in index_batches(order, batch_size) {
            total += self.train_batch(dataset, &batch)? * batch.len() as f32;
        }
        Ok(total / order.len() as f32)
    }

    /// Scores `indices` with dropout disabled.
    ///
    /// Returns the mean validation loss plus the scores and labels in index
    /// order, ready for the metrics pass.
    fn evaluate(
        &mut self,
        dataset: &Dataset,
        indices: &[usize],
    ) -> crate::Result<(f32, Vec<f32>, Vec<f32>)> {
        let samples = dataset.samples();
        let mut predictions = Vec::with_capacity(indices.len());
        let mut scores = Vec::with_capacity(indices.len());
        let mut labels = Vec::with_capacity(indices.len());
        for &i in indices {
            let prediction = self.model.forward(&samples[i], false)?;
            scores.push(prediction.data()[0]);
            labels.push(samples[i].label);
            predictions.push(prediction);
        }
        let refs: Vec<&Tensor> = predictions.iter().collect();
        let stacked = concat(&refs);
        let targets = Tensor::new(Array1::from(labels.clone()), false);
        let val_loss = self.loss.forward(&stacked, &targets).data()[0];
        Ok((val_loss, scores, labels))
    }
}

/// Seed stream per (variant, fold) so reordering variants cannot alias runs
fn derive_seed(base: u64, variant: Variant, fold_index: usize) -> u64 {
    let variant_offset = match variant {
        Variant::Structural => 0u64,
        Variant::Semantic => 1,
        Variant::Visual => 2,
        Variant::Fused => 3,
    };
    base.wrapping_add(variant_offset.wrapping_mul(1_000_003))
        .wrapping_add(fold_index as u64)
}

fn train_fold(
    dataset: &Dataset,
    fold: &Fold,
    variant: Variant,
    config: &ModelConfig,
    settings: &TrainSettings,
) -> crate::Result<FoldRecord> {
    let seed = derive_seed(settings.seed, variant, fold.index);
    let model = build_model(variant, config, seed)?;
    let mut trainer = FoldTrainer::new(model, settings);
    let mut shuffle_rng = StdRng::seed_from_u64(seed);

    let checkpoint = settings
        .output_dir
        .join(format!("fold_{}", fold.index))
        .join(format!("{variant}_best.json"));

    let mut order = fold.train.clone();
    let mut epochs = Vec::with_capacity(settings.epochs);
    let mut best_epoch = 0;
    let mut best_accuracy = f32::NEG_INFINITY;

    for epoch in 1..=settings.epochs {
        order.shuffle(&mut shuffle_rng);
        let train_loss = trainer.train_epoch(dataset, &order, settings.batch_size)?;
        let (val_loss, scores, labels) = trainer.evaluate(dataset, &fold.validation)?;
        let metrics = EpochMetrics::from_validation(epoch, train_loss, val_loss, &scores, &labels);

        if metrics.accuracy > best_accuracy {
            best_accuracy = metrics.accuracy;
            best_epoch = epoch;
            crate::io::save_model(trainer.model(), &checkpoint)?;
        }

        if settings.log_every > 0 && (epoch % settings.log_every == 0 || epoch == settings.epochs)
        {
            println!(
                "[{variant}] fold {} epoch {epoch}/{}: train loss {train_loss:.4}, \
                 val loss {val_loss:.4}, val acc {:.3}",
                fold.index, settings.epochs, metrics.accuracy
            );
        }
        epochs.push(metrics);
    }

    let best = epochs[best_epoch - 1].clone();
    Ok(FoldRecord {
        fold: fold.index,
        train_size: fold.train.len(),
        validation_size: fold.validation.len(),
        best_epoch,
        best,
        epochs,
        checkpoint,
    })
}

/// Trains every selected variant across all folds and writes the report.
///
/// Fold boundaries are shared across variants so their metrics stay
/// comparable. The report is also saved to `output_dir/report.json`.
pub fn run_experiment(
    dataset: &Dataset,
    config: &ModelConfig,
    settings: &TrainSettings,
) -> crate::Result<ExperimentReport> {
    settings.validate()?;
    if dataset.len() < settings.folds {
        return Err(crate::Error::Config(format!(
            "dataset has {} samples, fewer than {} folds",
            dataset.len(),
            settings.folds
        )));
    }

    let folds = contiguous_folds(dataset.len(), settings.folds);
    let mut variants = Vec::with_capacity(settings.variants.len());
    for &variant in &settings.variants {
        let mut records = Vec::with_capacity(folds.len());
        for fold in &folds {
            records.push(train_fold(dataset, fold, variant, config, settings)?);
        }
        let summary = VariantSummary::from_folds(&records);
        variants.push(VariantReport {
            variant,
            folds: records,
            summary,
        });
    }

    let report = ExperimentReport::new(settings.clone(), dataset.len(), variants);
    report.save(&settings.output_dir.join("report.json"))?;
    Ok(report)
}
