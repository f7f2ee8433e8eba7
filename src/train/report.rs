//! Experiment reports.
//!
//! A report captures everything needed to compare variants after a run:
//! per-epoch metrics for every fold, the checkpointed best epoch, and
//! cross-fold means. Folds whose best epoch could not support F1/AUC/MCC
//! are left out of those means rather than counted as zero.

use super::metrics::EpochMetrics;
use super::trainer::TrainSettings;
use crate::model::Variant;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// One fold's training history
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FoldRecord {
    /// Fold index, 0-based
    pub fold: usize,

    /// Training partition size
    pub train_size: usize,

    /// Validation partition size
    pub validation_size: usize,

    /// 1-based epoch whose weights were checkpointed
    pub best_epoch: usize,

    /// Metrics at the checkpointed epoch
    pub best: EpochMetrics,

    /// Metrics for every epoch in order
    pub epochs: Vec<EpochMetrics>,

    /// Where the best weights were written
    pub checkpoint: PathBuf,
}

/// Cross-fold means of the best-epoch metrics
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VariantSummary {
    pub mean_accuracy: f32,

    /// `None` when no fold produced a defined F1
    pub mean_f1: Option<f32>,

    /// `None` when every validation fold was single-class
    pub mean_auc: Option<f32>,

    /// `None` when no fold produced a defined MCC
    pub mean_mcc: Option<f32>,

    /// Folds excluded from the F1/MCC means
    pub degenerate_folds: usize,
}

fn mean(values: &[f32]) -> Option<f32> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f32>() / values.len() as f32)
    }
}

impl VariantSummary {
    pub fn from_folds(folds: &[FoldRecord]) -> Self {
        let accuracies: Vec<f32> = folds.iter().map(|f| f.best.accuracy).collect();
        let f1s: Vec<f32> = folds.iter().filter_map(|f| f.best.f1).collect();
        let aucs: Vec<f32> = folds.iter().filter_map(|f| f.best.auc).collect();
        let mccs: Vec<f32> = folds.iter().filter_map(|f| f.best.mcc).collect();
        Self {
            mean_accuracy: mean(&accuracies).unwrap_or(0.0),
            mean_f1: mean(&f1s),
            mean_auc: mean(&aucs),
            mean_mcc: mean(&mccs),
            degenerate_folds: folds.iter().filter(|f| f.best.f1.is_none()).count(),
        }
    }
}

/// All folds of one variant plus their summary
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VariantReport {
    pub variant: Variant,
    pub folds: Vec<FoldRecord>,
    pub summary: VariantSummary,
}

/// Full record of one experiment run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExperimentReport {
    /// RFC 3339 timestamp of the run
    pub created_at: String,

    /// Settings the run used
    pub settings: TrainSettings,

    /// Total dataset size before fold splitting
    pub dataset_size: usize,

    /// One entry per trained variant, in training order
    pub variants: Vec<VariantReport>,
}

impl ExperimentReport {
    pub fn new(settings: TrainSettings, dataset_size: usize, variants: Vec<VariantReport>) -> Self {
        Self {
            created_at: chrono::Utc::now().to_rfc3339(),
            settings,
            dataset_size,
            variants,
        }
    }

    /// Writes the report as pretty JSON, creating parent directories.
    pub fn save(&self, path: &Path) -> crate::Result<()> {
        let serialized = serde_json::to_string_pretty(self)?;
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        fs::write(path, serialized)?;
        Ok(())
    }

    pub fn load(path: &Path) -> crate::Result<Self> {
        let contents = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&contents)?)
    }

    /// Human-readable summary table, one line per variant.
    pub fn summary_lines(&self) -> Vec<String> {
        fn cell(value: Option<f32>) -> String {
            match value {
                Some(v) => format!("{v:.3}"),
                None => "n/a".to_string(),
            }
        }

        let mut lines = Vec::with_capacity(self.variants.len() + 1);
        lines.push(format!(
            "{:<12} {:>9} {:>9} {:>9} {:>9} {:>11}",
            "variant", "accuracy", "f1", "auc", "mcc", "skipped"
        ));
        for report in &self.variants {
            let s = &report.summary;
            lines.push(format!(
                "{:<12} {:>9.3} {:>9} {:>9} {:>9} {:>11}",
                report.variant.to_string(),
                s.mean_accuracy,
                cell(s.mean_f1),
                cell(s.mean_auc),
                cell(s.mean_mcc),
                s.degenerate_folds
            ));
        }
        lines
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn epoch_metrics(accuracy: f32, f1: Option<f32>, auc: Option<f32>, mcc: Option<f32>) -> EpochMetrics {
        EpochMetrics {
            epoch: 1,
            train_loss: 0.5,
            val_loss: 0.6,
            accuracy,
            precision: 0.5,
            recall: 0.5,
            f1,
            auc,
            mcc,
        }
    }

    fn fold_record(fold: usize, best: EpochMetrics) -> FoldRecord {
        FoldRecord {
            fold,
            train_size: 8,
            validation_size: 2,
            best_epoch: 1,
            epochs: vec![best.clone()],
            best,
            checkpoint: PathBuf::from(format!("runs/fold_{fold}/structural_best.json")),
        }
    }

    #[test]
    fn test_summary_averages_only_defined_metrics() {
        let folds = vec![
            fold_record(0, epoch_metrics(0.8, Some(0.7), Some(0.9), Some(0.6))),
            fold_record(1, epoch_metrics(0.6, None, Some(0.7), None)),
        ];
        let summary = VariantSummary::from_folds(&folds);

        assert!((summary.mean_accuracy - 0.7).abs() < 1e-6);
        assert!((summary.mean_f1.unwrap() - 0.7).abs() < 1e-6);
        assert!((summary.mean_auc.unwrap() - 0.8).abs() < 1e-6);
        assert!((summary.mean_mcc.unwrap() - 0.6).abs() < 1e-6);
        assert_eq!(summary.degenerate_folds, 1);
    }

    #[test]
    fn test_summary_with_no_defined_metrics() {
        let folds = vec![fold_record(0, epoch_metrics(0.5, None, None, None))];
        let summary = VariantSummary::from_folds(&folds);

        assert_eq!(summary.mean_f1, None);
        assert_eq!(summary.mean_auc, None);
        assert_eq!(summary.mean_mcc, None);
        assert_eq!(summary.degenerate_folds, 1);
    }

    #[test]
    fn test_report_round_trip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("report.json");

        let folds = vec![fold_record(0, epoch_metrics(0.9, Some(0.8), Some(0.95), Some(0.7)))];
        let summary = VariantSummary::from_folds(&folds);
        let report = ExperimentReport::new(
            TrainSettings::default(),
            10,
            vec![VariantReport {
                variant: Variant::Fused,
                folds,
                summary,
            }],
        );

        report.save(&path).unwrap();
        let loaded = ExperimentReport::load(&path).unwrap();
        assert_eq!(loaded.dataset_size, 10);
        assert_eq!(loaded.variants.len(), 1);
        assert_eq!(loaded.variants[0].variant, Variant::Fused);
        assert_eq!(loaded.created_at, report.created_at);
    }

    #[test]
    fn test_summary_lines_mark_missing_metrics() {
        let folds = vec![fold_record(0, epoch_metrics(0.5, None, None, None))];
        let summary = VariantSummary::from_folds(&folds);
        let report = ExperimentReport::new(
            TrainSettings::default(),
            4,
            vec![VariantReport {
                variant: Variant::Visual,
                folds,
                summary,
            }],
        );

        let lines = report.summary_lines();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].contains("accuracy"));
        assert!(lines[1].contains("visual"));
        assert!(lines[1].contains("n/a"));
    }
}
