//! Shared classification head

use rand::rngs::StdRng;

use crate::autograd::ops::{dropout, relu, sigmoid};
use crate::autograd::Tensor;

use super::dense::Dense;

/// L2 coefficient on the first dense layer's weights
const HEAD_L2: f32 = 0.001;

/// Dropout rate between the first and second dense layers
const HEAD_DROPOUT: f32 = 0.5;

/// Dense(64) → dropout → Dense(16) → Dense(1, sigmoid) over extractor
/// features
pub struct ClassificationHead {
    dense1: Dense,
    dense2: Dense,
    output: Dense,
}

impl ClassificationHead {
    pub fn new(in_features: usize) -> Self {
        Self {
            dense1: Dense::new(in_features, 64, 0.567).with_l2(HEAD_L2),
            dense2: Dense::new(64, 16, 0.678),
            output: Dense::new(16, 1, 0.789),
        }
    }

    /// Forward pass producing a scalar probability tensor
    pub fn forward(&self, features: &Tensor, training: bool, rng: &mut StdRng) -> Tensor {
        let y = relu(&self.dense1.forward(features));
        let y = if training {
            dropout(&y, HEAD_DROPOUT, rng)
        } else {
            y
        };
        let y = relu(&self.dense2.forward(&y));
        sigmoid(&self.output.forward(&y))
    }

    /// L2 penalty contributed to the reported loss
    pub fn penalty(&self) -> f32 {
        self.dense1.penalty() + self.dense2.penalty() + self.output.penalty()
    }

    /// Adds every layer's L2 gradient after the loss backward pass
    pub fn apply_l2_grad(&self) {
        self.dense1.apply_l2_grad();
        self.dense2.apply_l2_grad();
        self.output.apply_l2_grad();
    }

    pub fn parameters(&self) -> Vec<Tensor> {
        vec![
            self.dense1.weight.clone(),
            self.dense1.bias.clone(),
            self.dense2.weight.clone(),
            self.dense2.bias.clone(),
            self.output.weight.clone(),
            self.output.bias.clone(),
        ]
    }

    pub fn named_parameters(&self, prefix: &str) -> Vec<(String, Tensor)> {
        vec![
            (format!("{prefix}.dense1.weight"), self.dense1.weight.clone()),
            (format!("{prefix}.dense1.bias"), self.dense1.bias.clone()),
            (format!("{prefix}.dense2.weight"), self.dense2.weight.clone()),
            (format!("{prefix}.dense2.bias"), self.dense2.bias.clone()),
            (format!("{prefix}.output.weight"), self.output.weight.clone()),
            (format!("{prefix}.output.bias"), self.output.bias.clone()),
        ]
    }
}
