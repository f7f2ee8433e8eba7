//! Cross-validation fold assignment.

/// One train/validation split over sample indices.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fold {
    /// Position of this fold in the schedule.
    pub index: usize,
    /// Indices the model trains on.
    pub train: Vec<usize>,
    /// Indices held out for validation.
    pub validation: Vec<usize>,
}

/// Splits `len` samples into up to `k` contiguous folds.
///
/// Fold `i` validates on the block of `ceil(len / k)` indices starting at
/// `i * ceil(len / k)` and trains on everything else. Blocks that fall past
/// the end are dropped, so fewer than `k` folds come back when `len < k`.
pub fn contiguous_folds(len: usize, k: usize) -> Vec<Fold> {
    assert!(k > 0, "fold: k must be positive");
    let block = len.div_ceil(k);
    let mut folds = Vec::new();
    for i in 0..k {
        let start = i * block;
        if start >= len {
            break;
        }
        let end = (start + block).min(len);
        let validation: Vec<usize> = (start..end).collect();
        let train: Vec<usize> = (0..start).chain(end..len).collect();
        folds.push(Fold {
            index: folds.len(),
            train,
            validation,
        });
    }
    folds
}
