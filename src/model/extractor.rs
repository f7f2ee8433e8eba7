//! Per-modality feature extractors
//!
//! Each extractor folds one input modality down to a flat feature vector.
//! The stage layouts are fixed; only the input shapes come from config.

use rand::rngs::StdRng;

use crate::autograd::ops::{max_pool1d, max_pool2d, relu, Padding};
use crate::autograd::Tensor;

use super::conv::{Conv1dLayer, Conv2dLayer};
use super::embedding::SequenceEmbedding;
use super::recurrent::BiLstmLayer;

/// Feature length produced by [`StructuralExtractor`] for a given matrix
/// shape, or 0 if the shape collapses before the last stage
pub fn structural_output_len(rows: usize, cols: usize) -> usize {
    let stage = |h: usize, w: usize, pool: usize| -> Option<(usize, usize)> {
        let h = h.checked_sub(2)?;
        let w = w.checked_sub(2)?;
        if h == 0 || w == 0 {
            return None;
        }
        Some((h / pool, w / pool))
    };
    let dims = stage(rows, cols, 2)
        .and_then(|(h, w)| stage(h, w, 2))
        .and_then(|(h, w)| stage(h, w, 3));
    match dims {
        Some((h, w)) => h * w * 64,
        None => 0,
    }
}

/// Feature length produced by [`SemanticExtractor`] for a given padded
/// sequence length, or 0 if the sequence is too short for the conv stack
pub fn semantic_output_len(sequence_length: usize) -> usize {
    let steps = sequence_length
        .checked_sub(4)
        .map(|s| s / 3)
        .and_then(|s| s.checked_sub(4));
    match steps {
        Some(s) if s > 0 => s * 64,
        _ => 0,
    }
}

/// Feature length produced by [`VisualExtractor`] for a given square image
/// edge, or 0 if pooling collapses the map
pub fn visual_output_len(image_size: usize) -> usize {
    let edge = image_size / 8;
    edge * edge * 64
}

/// Convolutional stack over the structural character matrix
///
/// Three (valid conv 3×3 → ReLU → max-pool) stages with 32/32/64 filters
/// and pool sizes 2/2/3, treating the matrix as a one-channel image.
pub struct StructuralExtractor {
    conv1: Conv2dLayer,
    conv2: Conv2dLayer,
    conv3: Conv2dLayer,
    rows: usize,
    cols: usize,
}

impl StructuralExtractor {
    pub fn new(rows: usize, cols: usize) -> Self {
        Self {
            conv1: Conv2dLayer::new(1, 32, 3, Padding::Valid, 0.257),
            conv2: Conv2dLayer::new(32, 32, 3, Padding::Valid, 0.349),
            conv3: Conv2dLayer::new(32, 64, 3, Padding::Valid, 0.431),
            rows,
            cols,
        }
    }

    pub fn forward(&self, structure: &Tensor) -> Tensor {
        let (y, h, w) = self.conv1.forward(structure, self.rows, self.cols);
        let y = relu(&y);
        let y = max_pool2d(&y, h, w, 32, 2);
        let (h, w) = (h / 2, w / 2);

        let (y, h, w) = self.conv2.forward(&y, h, w);
        let y = relu(&y);
        let y = max_pool2d(&y, h, w, 32, 2);
        let (h, w) = (h / 2, w / 2);

        let (y, h, w) = self.conv3.forward(&y, h, w);
        let y = relu(&y);
        max_pool2d(&y, h, w, 64, 3)
    }

    pub fn output_len(&self) -> usize {
        structural_output_len(self.rows, self.cols)
    }

    pub fn parameters(&self) -> Vec<Tensor> {
        vec![
            self.conv1.kernel.clone(),
            self.conv1.bias.clone(),
            self.conv2.kernel.clone(),
            self.conv2.bias.clone(),
            self.conv3.kernel.clone(),
            self.conv3.bias.clone(),
        ]
    }

    pub fn named_parameters(&self, prefix: &str) -> Vec<(String, Tensor)> {
        vec![
            (format!("{prefix}.conv1.kernel"), self.conv1.kernel.clone()),
            (format!("{prefix}.conv1.bias"), self.conv1.bias.clone()),
            (format!("{prefix}.conv2.kernel"), self.conv2.kernel.clone()),
            (format!("{prefix}.conv2.bias"), self.conv2.bias.clone()),
            (format!("{prefix}.conv3.kernel"), self.conv3.kernel.clone()),
            (format!("{prefix}.conv3.bias"), self.conv3.bias.clone()),
        ]
    }
}

/// Embedding → 1D conv stack → bidirectional LSTM over the token sequence
pub struct SemanticExtractor {
    embedding: Box<dyn SequenceEmbedding>,
    conv1: Conv1dLayer,
    conv2: Conv1dLayer,
    lstm: BiLstmLayer,
    sequence_length: usize,
}

impl SemanticExtractor {
    pub fn new(embedding: Box<dyn SequenceEmbedding>, sequence_length: usize) -> Self {
        let hidden = embedding.hidden_size();
        Self {
            embedding,
            conv1: Conv1dLayer::new(hidden, 32, 5, 0.173),
            conv2: Conv1dLayer::new(32, 32, 5, 0.227),
            lstm: BiLstmLayer::new(32, 32, 0.443),
            sequence_length,
        }
    }

    pub fn forward(
        &self,
        tokens: &[u32],
        segments: &[u32],
        training: bool,
        rng: &mut StdRng,
    ) -> Tensor {
        let embedded = self.embedding.forward(tokens, segments, training, rng);

        let (y, steps) = self.conv1.forward(&embedded, tokens.len());
        let y = relu(&y);
        let y = max_pool1d(&y, steps, 32, 3);
        let steps = steps / 3;

        let (y, steps) = self.conv2.forward(&y, steps);
        let y = relu(&y);

        self.lstm.forward(&y, steps)
    }

    pub fn output_len(&self) -> usize {
        semantic_output_len(self.sequence_length)
    }

    pub fn parameters(&self) -> Vec<Tensor> {
        let mut params = self.embedding.parameters();
        params.push(self.conv1.kernel.clone());
        params.push(self.conv1.bias.clone());
        params.push(self.conv2.kernel.clone());
        params.push(self.conv2.bias.clone());
        params.extend(self.lstm.parameters());
        params
    }

    pub fn named_parameters(&self, prefix: &str) -> Vec<(String, Tensor)> {
        let mut params = self.embedding.named_parameters(&format!("{prefix}.embedding"));
        params.push((format!("{prefix}.conv1.kernel"), self.conv1.kernel.clone()));
        params.push((format!("{prefix}.conv1.bias"), self.conv1.bias.clone()));
        params.push((format!("{prefix}.conv2.kernel"), self.conv2.kernel.clone()));
        params.push((format!("{prefix}.conv2.bias"), self.conv2.bias.clone()));
        for (name, tensor) in [
            ("w_ih_f", &self.lstm.w_ih_f),
            ("w_hh_f", &self.lstm.w_hh_f),
            ("b_f", &self.lstm.b_f),
            ("w_ih_b", &self.lstm.w_ih_b),
            ("w_hh_b", &self.lstm.w_hh_b),
            ("b_b", &self.lstm.b_b),
        ] {
            params.push((format!("{prefix}.lstm.{name}"), tensor.clone()));
        }
        params
    }
}

/// Convolutional stack over the rendered code image
///
/// Three (same-padding conv 3×3 → ReLU → max-pool 2) stages with 32/32/64
/// filters over RGB input.
pub struct VisualExtractor {
    conv1: Conv2dLayer,
    conv2: Conv2dLayer,
    conv3: Conv2dLayer,
    image_size: usize,
}

impl VisualExtractor {
    pub fn new(image_size: usize) -> Self {
        Self {
            conv1: Conv2dLayer::new(3, 32, 3, Padding::Same, 0.521),
            conv2: Conv2dLayer::new(32, 32, 3, Padding::Same, 0.613),
            conv3: Conv2dLayer::new(32, 64, 3, Padding::Same, 0.701),
            image_size,
        }
    }

    pub fn forward(&self, picture: &Tensor) -> Tensor {
        let size = self.image_size;
        let (y, h, w) = self.conv1.forward(picture, size, size);
        let y = relu(&y);
        let y = max_pool2d(&y, h, w, 32, 2);

        let (y, h, w) = self.conv2.forward(&y, h / 2, w / 2);
        let y = relu(&y);
        let y = max_pool2d(&y, h, w, 32, 2);

        let (y, h, w) = self.conv3.forward(&y, h / 2, w / 2);
        let y = relu(&y);
        max_pool2d(&y, h, w, 64, 2)
    }

    pub fn output_len(&self) -> usize {
        visual_output_len(self.image_size)
    }

    pub fn parameters(&self) -> Vec<Tensor> {
        vec![
            self.conv1.kernel.clone(),
            self.conv1.bias.clone(),
            self.conv2.kernel.clone(),
            self.conv2.bias.clone(),
            self.conv3.kernel.clone(),
            self.conv3.bias.clone(),
        ]
    }

    pub fn named_parameters(&self, prefix: &str) -> Vec<(String, Tensor)> {
        vec![
            (format!("{prefix}.conv1.kernel"), self.conv1.kernel.clone()),
            (format!("{prefix}.conv1.bias"), self.conv1.bias.clone()),
            (format!("{prefix}.conv2.kernel"), self.conv2.kernel.clone()),
            (format!("{prefix}.conv2.bias"), self.conv2.bias.clone()),
            (format!("{prefix}.conv3.kernel"), self.conv3.kernel.clone()),
            (format!("{prefix}.conv3.bias"), self.conv3.bias.clone()),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::config::EmbeddingConfig;
    use crate::model::embedding::BertEmbedding;
    use rand::SeedableRng;

    #[test]
    fn test_published_feature_lengths() {
        assert_eq!(structural_output_len(50, 305), 4608);
        assert_eq!(semantic_output_len(100), 1792);
        assert_eq!(visual_output_len(128), 16384);
    }

    #[test]
    fn test_tiny_feature_lengths() {
        assert_eq!(structural_output_len(28, 30), 64);
        assert_eq!(semantic_output_len(20), 64);
        assert_eq!(visual_output_len(16), 256);
    }

    #[test]
    fn test_degenerate_shapes_report_zero() {
        assert_eq!(structural_output_len(10, 10), 0);
        assert_eq!(semantic_output_len(18), 0);
        assert_eq!(visual_output_len(4), 0);
    }

    #[test]
    fn test_structural_forward_matches_output_len() {
        let extractor = StructuralExtractor::new(28, 30);
        let x = Tensor::from_vec((0..28 * 30).map(|i| (i % 97) as f32).collect(), false);
        let features = extractor.forward(&x);
        assert_eq!(features.len(), extractor.output_len());
    }

    #[test]
    fn test_semantic_forward_matches_output_len() {
        let embedding = Box::new(BertEmbedding::new(&EmbeddingConfig::tiny()));
        let extractor = SemanticExtractor::new(embedding, 20);
        let mut rng = StdRng::seed_from_u64(0);

        let tokens: Vec<u32> = (0..20).map(|i| i % 60).collect();
        let segments: Vec<u32> = (0..20).collect();
        let features = extractor.forward(&tokens, &segments, false, &mut rng);
        assert_eq!(features.len(), extractor.output_len());
    }

    #[test]
    fn test_visual_forward_matches_output_len() {
        let extractor = VisualExtractor::new(16);
        let x = Tensor::from_vec(vec![0.5; 16 * 16 * 3], false);
        let features = extractor.forward(&x);
        assert_eq!(features.len(), extractor.output_len());
    }

    #[test]
    fn test_forward_deterministic_outside_training() {
        let extractor = StructuralExtractor::new(28, 30);
        let x = Tensor::from_vec((0..28 * 30).map(|i| (i % 31) as f32).collect(), false);
        let a = extractor.forward(&x);
        let b = extractor.forward(&x);
        assert_eq!(a.data().to_vec(), b.data().to_vec());
    }
}
