//! Mini-batch index grouping.

/// Groups sample indices into batches of at most `batch_size`, in order.
/// The final batch holds whatever remains.
pub fn index_batches(indices: &[usize], batch_size: usize) -> Vec<Vec<usize>> {
    assert!(batch_size > 0, "batch: batch_size must be positive");
    indices.chunks(batch_size).map(<[usize]>::to_vec).collect()
}
