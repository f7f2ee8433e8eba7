//! Token sequence embeddings
//!
//! Two interchangeable implementations: a trained-from-scratch embedding
//! summing token, segment and position tables (BERT layout), and a frozen
//! pretrained token table paired with a trainable position table.

use rand::rngs::StdRng;

use crate::autograd::ops::{add, dropout, layer_norm_rows, lookup};
use crate::autograd::Tensor;

use super::config::EmbeddingConfig;

/// Layer-norm epsilon used by the trained embedding
const LAYER_NORM_EPS: f32 = 1e-12;

/// Maps token and segment id sequences to a (length × hidden) tensor
pub trait SequenceEmbedding {
    /// Embed one sequence; `training` enables dropout
    fn forward(
        &self,
        tokens: &[u32],
        segments: &[u32],
        training: bool,
        rng: &mut StdRng,
    ) -> Tensor;

    fn hidden_size(&self) -> usize;

    /// Trainable tensors, in a stable order
    fn parameters(&self) -> Vec<Tensor>;

    /// Trainable tensors with persistence names under `prefix`
    fn named_parameters(&self, prefix: &str) -> Vec<(String, Tensor)>;
}

/// Position ids for a sequence, wrapping modulo the position table size
pub fn position_indices(length: usize, max_position_embeddings: usize) -> Vec<u32> {
    (0..length)
        .map(|p| (p % max_position_embeddings) as u32)
        .collect()
}

/// Trained token + segment + position embedding with layer norm and dropout
pub struct BertEmbedding {
    /// Token table (vocab_size x hidden_size)
    pub token_table: Tensor,
    /// Segment/token-type table (type_vocab_size x hidden_size)
    pub segment_table: Tensor,
    /// Position table (max_position_embeddings x hidden_size)
    pub position_table: Tensor,
    /// Layer-norm scale (hidden_size)
    pub norm_gamma: Tensor,
    /// Layer-norm shift (hidden_size)
    pub norm_beta: Tensor,
    vocab_size: usize,
    type_vocab_size: usize,
    max_position_embeddings: usize,
    hidden_size: usize,
    dropout: f32,
}

impl BertEmbedding {
    pub fn new(config: &EmbeddingConfig) -> Self {
        let hidden = config.hidden_size;
        let scale = (1.0 / hidden as f32).sqrt();
        let table = |rows: usize, phase: f32| -> Tensor {
            Tensor::from_vec(
                (0..rows * hidden).map(|i| (i as f32 * phase).sin() * scale).collect(),
                true,
            )
        };
        Self {
            token_table: table(config.vocab_size, 0.111),
            segment_table: table(config.type_vocab_size, 0.173),
            position_table: table(config.max_position_embeddings, 0.291),
            norm_gamma: Tensor::ones(hidden, true),
            norm_beta: Tensor::zeros(hidden, true),
            vocab_size: config.vocab_size,
            type_vocab_size: config.type_vocab_size,
            max_position_embeddings: config.max_position_embeddings,
            hidden_size: hidden,
            dropout: config.hidden_dropout,
        }
    }
}

impl SequenceEmbedding for BertEmbedding {
    fn forward(
        &self,
        tokens: &[u32],
        segments: &[u32],
        training: bool,
        rng: &mut StdRng,
    ) -> Tensor {
        assert_eq!(tokens.len(), segments.len(), "embedding: token/segment length mismatch");
        let length = tokens.len();
        let hidden = self.hidden_size;

        let tok = lookup(&self.token_table, tokens, self.vocab_size, hidden);
        let seg = lookup(&self.segment_table, segments, self.type_vocab_size, hidden);
        let pos_ids = position_indices(length, self.max_position_embeddings);
        let pos = lookup(
            &self.position_table,
            &pos_ids,
            self.max_position_embeddings,
            hidden,
        );

        let summed = add(&add(&tok, &seg), &pos);
        let normed = layer_norm_rows(
            &summed,
            &self.norm_gamma,
            &self.norm_beta,
            length,
            hidden,
            LAYER_NORM_EPS,
        );

        if training && self.dropout > 0.0 {
            dropout(&normed, self.dropout, rng)
        } else {
            normed
        }
    }

    fn hidden_size(&self) -> usize {
        self.hidden_size
    }

    fn parameters(&self) -> Vec<Tensor> {
        vec![
            self.token_table.clone(),
            self.segment_table.clone(),
            self.position_table.clone(),
            self.norm_gamma.clone(),
            self.norm_beta.clone(),
        ]
    }

    fn named_parameters(&self, prefix: &str) -> Vec<(String, Tensor)> {
        vec![
            (format!("{prefix}.token_table"), self.token_table.clone()),
            (format!("{prefix}.segment_table"), self.segment_table.clone()),
            (format!("{prefix}.position_table"), self.position_table.clone()),
            (format!("{prefix}.norm_gamma"), self.norm_gamma.clone()),
            (format!("{prefix}.norm_beta"), self.norm_beta.clone()),
        ]
    }
}

/// Frozen pretrained token table plus a trainable position table
///
/// No segment contribution and no layer norm; the table is used as shipped.
pub struct PretrainedEmbedding {
    /// Frozen token table (vocab_size x hidden_size)
    pub token_table: Tensor,
    /// Trainable position table (max_position_embeddings x hidden_size)
    pub position_table: Tensor,
    vocab_size: usize,
    max_position_embeddings: usize,
    hidden_size: usize,
    dropout: f32,
}

impl PretrainedEmbedding {
    /// Wrap an externally trained table; `values` is (vocab_size ×
    /// hidden_size) flattened
    pub fn from_table(
        values: Vec<f32>,
        vocab_size: usize,
        hidden_size: usize,
        max_position_embeddings: usize,
        dropout: f32,
    ) -> Self {
        assert_eq!(
            values.len(),
            vocab_size * hidden_size,
            "pretrained table: size mismatch"
        );
        let scale = (1.0 / hidden_size as f32).sqrt();
        Self {
            token_table: Tensor::from_vec(values, false),
            position_table: Tensor::from_vec(
                (0..max_position_embeddings * hidden_size)
                    .map(|i| (i as f32 * 0.291).sin() * scale)
                    .collect(),
                true,
            ),
            vocab_size,
            max_position_embeddings,
            hidden_size,
            dropout,
        }
    }
}

impl SequenceEmbedding for PretrainedEmbedding {
    fn forward(
        &self,
        tokens: &[u32],
        segments: &[u32],
        training: bool,
        rng: &mut StdRng,
    ) -> Tensor {
        assert_eq!(tokens.len(), segments.len(), "embedding: token/segment length mismatch");
        let length = tokens.len();

        let tok = lookup(&self.token_table, tokens, self.vocab_size, self.hidden_size);
        let pos_ids = position_indices(length, self.max_position_embeddings);
        let pos = lookup(
            &self.position_table,
            &pos_ids,
            self.max_position_embeddings,
            self.hidden_size,
        );
        let summed = add(&tok, &pos);

        if training && self.dropout > 0.0 {
            dropout(&summed, self.dropout, rng)
        } else {
            summed
        }
    }

    fn hidden_size(&self) -> usize {
        self.hidden_size
    }

    fn parameters(&self) -> Vec<Tensor> {
        vec![self.position_table.clone()]
    }

    fn named_parameters(&self, prefix: &str) -> Vec<(String, Tensor)> {
        vec![(format!("{prefix}.position_table"), self.position_table.clone())]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array1;
    use rand::SeedableRng;

    fn tiny() -> BertEmbedding {
        BertEmbedding::new(&EmbeddingConfig::tiny())
    }

    #[test]
    fn test_output_shape() {
        let embed = tiny();
        let mut rng = StdRng::seed_from_u64(0);
        let tokens: Vec<u32> = (0..20).collect();
        let segments: Vec<u32> = (0..20).collect();
        let out = embed.forward(&tokens, &segments, false, &mut rng);
        assert_eq!(out.len(), 20 * 8);
    }

    #[test]
    fn test_position_wraps_modulo_table_size() {
        assert_eq!(position_indices(6, 4), vec![0, 1, 2, 3, 0, 1]);

        // same token and segment ids at positions 0 and max_pos give
        // identical rows once the position wraps
        let embed = tiny();
        let max_pos = 12;
        let mut rng = StdRng::seed_from_u64(0);
        let tokens = vec![7u32; max_pos + 1];
        let segments = vec![3u32; max_pos + 1];
        let out = embed.forward(&tokens, &segments, false, &mut rng);

        let d = out.data();
        let hidden = 8;
        for c in 0..hidden {
            assert_eq!(d[c], d[max_pos * hidden + c]);
        }
    }

    #[test]
    fn test_out_of_range_segment_does_not_panic() {
        let embed = tiny();
        let mut rng = StdRng::seed_from_u64(0);
        let tokens = vec![1u32, 2];
        let segments = vec![0u32, 999];
        let out = embed.forward(&tokens, &segments, false, &mut rng);
        assert!(out.data().iter().all(|v| v.is_finite()));
    }

    #[test]
    fn test_eval_deterministic_training_stochastic() {
        let embed = tiny();
        let tokens: Vec<u32> = (0..20).collect();
        let segments: Vec<u32> = (0..20).collect();

        let mut rng = StdRng::seed_from_u64(5);
        let a = embed.forward(&tokens, &segments, false, &mut rng);
        let b = embed.forward(&tokens, &segments, false, &mut rng);
        assert_eq!(a.data().to_vec(), b.data().to_vec());

        let c = embed.forward(&tokens, &segments, true, &mut rng);
        let d = embed.forward(&tokens, &segments, true, &mut rng);
        assert_ne!(c.data().to_vec(), d.data().to_vec());
    }

    #[test]
    fn test_gradients_reach_all_tables() {
        let embed = tiny();
        let mut rng = StdRng::seed_from_u64(0);
        let tokens = vec![1u32, 2, 3];
        let segments = vec![0u32, 1, 2];
        let out = embed.forward(&tokens, &segments, false, &mut rng);

        out.set_grad(Array1::ones(out.len()));
        out.backward_op().unwrap().backward();

        assert!(embed.token_table.grad().is_some());
        assert!(embed.segment_table.grad().is_some());
        assert!(embed.position_table.grad().is_some());
        assert!(embed.norm_gamma.grad().is_some());
        assert!(embed.norm_beta.grad().is_some());
    }

    #[test]
    fn test_pretrained_token_table_stays_frozen() {
        let vocab = 10;
        let hidden = 4;
        let table: Vec<f32> = (0..vocab * hidden).map(|i| i as f32 * 0.01).collect();
        let embed = PretrainedEmbedding::from_table(table, vocab, hidden, 6, 0.0);
        let mut rng = StdRng::seed_from_u64(0);

        let out = embed.forward(&[1, 2], &[0, 1], true, &mut rng);
        out.set_grad(Array1::ones(out.len()));
        out.backward_op().unwrap().backward();

        assert!(embed.token_table.grad().is_none());
        assert!(embed.position_table.grad().is_some());
        assert_eq!(embed.parameters().len(), 1);
    }

    #[test]
    fn test_variants_share_the_extractor_interface() {
        let boxed: Vec<Box<dyn SequenceEmbedding>> = vec![
            Box::new(tiny()),
            Box::new(PretrainedEmbedding::from_table(vec![0.0; 64 * 8], 64, 8, 12, 0.1)),
        ];
        for embed in &boxed {
            assert_eq!(embed.hidden_size(), 8);
        }
    }
}
