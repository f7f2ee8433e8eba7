//! Evaluation metrics for binary classification.
//!
//! Scores are probabilities in `[0, 1]`; a sample counts as positive when its
//! score reaches the decision threshold. F1 and MCC are only reported when
//! every confusion cell is populated, since a fold with an empty cell makes
//! those statistics unstable or undefined.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Scores at or above this value are classified positive.
pub const DECISION_THRESHOLD: f32 = 0.5;

#[derive(Debug, Error, PartialEq)]
pub enum MetricsError {
    #[error("confusion matrix has an empty cell ({0:?})")]
    DegenerateConfusion(ConfusionCounts),
    #[error("auc needs at least one sample from each class")]
    SingleClass,
}

/// 2x2 confusion matrix counts at a fixed decision threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfusionCounts {
    pub true_positives: usize,
    pub true_negatives: usize,
    pub false_positives: usize,
    pub false_negatives: usize,
}

impl ConfusionCounts {
    /// Tallies the confusion matrix from scores and 0/1 labels.
    pub fn from_scores(scores: &[f32], labels: &[f32]) -> Self {
        assert_eq!(
            scores.len(),
            labels.len(),
            "metrics: scores and labels must have the same length"
        );
        let mut counts = Self {
            true_positives: 0,
            true_negatives: 0,
            false_positives: 0,
            false_negatives: 0,
        };
        for (&score, &label) in scores.iter().zip(labels.iter()) {
            let predicted = score >= DECISION_THRESHOLD;
            let actual = label >= 0.5;
            match (predicted, actual) {
                (true, true) => counts.true_positives += 1,
                (false, false) => counts.true_negatives += 1,
                (true, false) => counts.false_positives += 1,
                (false, true) => counts.false_negatives += 1,
            }
        }
        counts
    }

    pub fn total(&self) -> usize {
        self.true_positives + self.true_negatives + self.false_positives + self.false_negatives
    }

    /// Fraction of correct predictions, 0.0 on an empty set.
    pub fn accuracy(&self) -> f32 {
        let total = self.total();
        if total == 0 {
            return 0.0;
        }
        (self.true_positives + self.true_negatives) as f32 / total as f32
    }

    /// True positives over predicted positives, 0.0 when nothing was
    /// predicted positive.
    pub fn precision(&self) -> f32 {
        let predicted = self.true_positives + self.false_positives;
        if predicted == 0 {
            return 0.0;
        }
        self.true_positives as f32 / predicted as f32
    }

    /// True positives over actual positives, 0.0 when the set has no
    /// positive samples.
    pub fn recall(&self) -> f32 {
        let actual = self.true_positives + self.false_negatives;
        if actual == 0 {
            return 0.0;
        }
        self.true_positives as f32 / actual as f32
    }

    /// True when any confusion cell is empty.
    pub fn is_degenerate(&self) -> bool {
        self.true_positives == 0
            || self.true_negatives == 0
            || self.false_positives == 0
            || self.false_negatives == 0
    }

    /// F1 = 2*TP / (2*TP + FP + FN).
    pub fn f1(&self) -> Result<f32, MetricsError> {
        if self.is_degenerate() {
            return Err(MetricsError::DegenerateConfusion(*self));
        }
        let tp = self.true_positives as f32;
        Ok(2.0 * tp / (2.0 * tp + self.false_positives as f32 + self.false_negatives as f32))
    }

    /// Matthews correlation coefficient.
    ///
    /// MCC = (TP*TN - FP*FN) / sqrt((TP+FP)(TP+FN)(TN+FP)(TN+FN)), in
    /// `[-1, 1]` with 1.0 for perfect agreement. Products are taken in f64
    /// so large folds do not lose precision.
    pub fn mcc(&self) -> Result<f32, MetricsError> {
        if self.is_degenerate() {
            return Err(MetricsError::DegenerateConfusion(*self));
        }
        let tp = self.true_positives as f64;
        let tn = self.true_negatives as f64;
        let fp = self.false_positives as f64;
        let fn_ = self.false_negatives as f64;
        let numerator = tp * tn - fp * fn_;
        let denominator = ((tp + fp) * (tp + fn_) * (tn + fp) * (tn + fn_)).sqrt();
        Ok((numerator / denominator) as f32)
    }
}

/// Area under the ROC curve computed from the rank statistic.
///
/// Equals the probability that a uniformly drawn positive sample scores
/// higher than a uniformly drawn negative one, with ties counted as half a
/// win. Exact over all pairs, no curve interpolation.
pub fn auc(scores: &[f32], labels: &[f32]) -> Result<f32, MetricsError> {
    assert_eq!(
        scores.len(),
        labels.len(),
        "metrics: scores and labels must have the same length"
    );
    let positives = labels.iter().filter(|&&l| l >= 0.5).count();
    let negatives = scores.len() - positives;
    if positives == 0 || negatives == 0 {
        return Err(MetricsError::SingleClass);
    }

    let mut order: Vec<usize> = (0..scores.len()).collect();
    order.sort_by(|&a, &b| scores[a].total_cmp(&scores[b]));

    // Tied scores share the average of the ranks they span (1-based).
    let mut ranks = vec![0.0f64; scores.len()];
    let mut i = 0;
    while i < order.len() {
        let mut j = i;
        while j + 1 < order.len() && scores[order[j + 1]] == scores[order[i]] {
            j += 1;
        }
        let average = (i + j) as f64 / 2.0 + 1.0;
        for &index in &order[i..=j] {
            ranks[index] = average;
        }
        i = j + 1;
    }

    let rank_sum: f64 = labels
        .iter()
        .zip(ranks.iter())
        .filter(|(&label, _)| label >= 0.5)
        .map(|(_, &rank)| rank)
        .sum();
    let p = positives as f64;
    let n = negatives as f64;
    let wins = rank_sum - p * (p + 1.0) / 2.0;
    Ok((wins / (p * n)) as f32)
}

/// Validation metrics recorded after one training epoch.
///
/// `f1`, `auc`, and `mcc` are `None` when the validation fold cannot support
/// them (an empty confusion cell or a single-class fold).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EpochMetrics {
    pub epoch: usize,
    pub train_loss: f32,
    pub val_loss: f32,
    pub accuracy: f32,
    pub precision: f32,
    pub recall: f32,
    pub f1: Option<f32>,
    pub auc: Option<f32>,
    pub mcc: Option<f32>,
}

impl EpochMetrics {
    /// Scores the validation set and fills in every metric it supports.
    pub fn from_validation(
        epoch: usize,
        train_loss: f32,
        val_loss: f32,
        scores: &[f32],
        labels: &[f32],
    ) -> Self {
        let counts = ConfusionCounts::from_scores(scores, labels);
        Self {
            epoch,
            train_loss,
            val_loss,
            accuracy: counts.accuracy(),
            precision: counts.precision(),
            recall: counts.recall(),
            f1: counts.f1().ok(),
            auc: auc(scores, labels).ok(),
            mcc: counts.mcc().ok(),
        }
    }
}
