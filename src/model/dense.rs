//! Fully connected layer

use crate::autograd::ops::{add_bias, matmul};
use crate::autograd::Tensor;

/// Dense layer computing `x @ weight + bias`
///
/// The weight is stored (in_features × out_features) flattened so a
/// (rows × in) input maps straight through [`matmul`].
pub struct Dense {
    /// Projection weight (in_features x out_features)
    pub weight: Tensor,
    /// Bias (out_features)
    pub bias: Tensor,
    in_features: usize,
    out_features: usize,
    l2: f32,
}

impl Dense {
    /// Create a layer with deterministic Xavier-scaled weights
    ///
    /// `phase` keeps sibling layers from initializing identically.
    pub fn new(in_features: usize, out_features: usize, phase: f32) -> Self {
        let scale = (2.0 / (in_features + out_features) as f32).sqrt();
        Self {
            weight: Tensor::from_vec(
                (0..in_features * out_features)
                    .map(|i| (i as f32 * phase).sin() * scale)
                    .collect(),
                true,
            ),
            bias: Tensor::zeros(out_features, true),
            in_features,
            out_features,
            l2: 0.0,
        }
    }

    /// Attach an L2 weight penalty with the given coefficient
    pub fn with_l2(mut self, l2: f32) -> Self {
        self.l2 = l2;
        self
    }

    /// Forward pass over one or more rows
    pub fn forward(&self, x: &Tensor) -> Tensor {
        assert_eq!(
            x.len() % self.in_features,
            0,
            "dense: input not a multiple of in_features"
        );
        let rows = x.len() / self.in_features;
        let projected = matmul(x, &self.weight, rows, self.in_features, self.out_features);
        add_bias(&projected, &self.bias, rows, self.out_features)
    }

    /// L2 penalty term for the loss report (weights only, bias exempt)
    pub fn penalty(&self) -> f32 {
        if self.l2 == 0.0 {
            return 0.0;
        }
        self.l2 * self.weight.data().iter().map(|v| v * v).sum::<f32>()
    }

    /// Adds the L2 gradient (2·λ·w) onto the weight's accumulated gradient
    ///
    /// Called after the loss backward pass so the penalty never enters the
    /// recorded graph.
    pub fn apply_l2_grad(&self) {
        if self.l2 == 0.0 {
            return;
        }
        self.weight.accumulate_grad(self.weight.data() * (2.0 * self.l2));
    }

    pub fn in_features(&self) -> usize {
        self.in_features
    }

    pub fn out_features(&self) -> usize {
        self.out_features
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::Array1;

    #[test]
    fn test_forward_shape() {
        let layer = Dense::new(6, 4, 0.567);
        let x = Tensor::from_vec(vec![0.5; 6], false);
        assert_eq!(layer.forward(&x).len(), 4);

        let batch = Tensor::from_vec(vec![0.5; 18], false);
        assert_eq!(layer.forward(&batch).len(), 12);
    }

    #[test]
    fn test_bias_starts_at_zero() {
        let layer = Dense::new(3, 2, 0.567);
        assert!(layer.bias.data().iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_init_deterministic() {
        let a = Dense::new(5, 5, 0.567);
        let b = Dense::new(5, 5, 0.567);
        assert_eq!(a.weight.data().to_vec(), b.weight.data().to_vec());

        let c = Dense::new(5, 5, 0.789);
        assert_ne!(a.weight.data().to_vec(), c.weight.data().to_vec());
    }

    #[test]
    fn test_penalty_is_scaled_squared_norm() {
        let layer = Dense::new(2, 1, 0.567).with_l2(0.5);
        *layer.weight.data_mut() = Array1::from(vec![3.0, 4.0]);
        assert_relative_eq!(layer.penalty(), 0.5 * 25.0);
    }

    #[test]
    fn test_apply_l2_grad_accumulates() {
        let layer = Dense::new(2, 1, 0.567).with_l2(0.1);
        *layer.weight.data_mut() = Array1::from(vec![1.0, -2.0]);
        layer.weight.accumulate_grad(Array1::from(vec![0.5, 0.5]));
        layer.apply_l2_grad();

        let g = layer.weight.grad().unwrap();
        assert_relative_eq!(g[0], 0.5 + 0.2);
        assert_relative_eq!(g[1], 0.5 - 0.4);
    }

    #[test]
    fn test_gradient_reaches_weights() {
        let layer = Dense::new(3, 2, 0.567);
        let x = Tensor::from_vec(vec![1.0, 2.0, 3.0], false);
        let y = layer.forward(&x);

        y.set_grad(Array1::from(vec![1.0, 1.0]));
        y.backward_op().unwrap().backward();

        assert!(layer.weight.grad().is_some());
        assert_eq!(layer.bias.grad().unwrap().to_vec(), vec![1.0, 1.0]);
    }
}
