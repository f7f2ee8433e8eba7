//! Loss functions for classifier training.

use crate::autograd::{BackwardOp, Tensor};
use ndarray::Array1;
use std::cell::RefCell;
use std::rc::Rc;

/// Probabilities are clamped into `[EPS, 1 - EPS]` before taking logs so a
/// saturated sigmoid cannot produce an infinite loss or gradient.
const EPS: f32 = 1e-7;

/// Loss function trait for training.
pub trait LossFn {
    /// Computes the loss given predictions and targets.
    fn forward(&self, predictions: &Tensor, targets: &Tensor) -> Tensor;

    /// Returns the name of the loss function.
    fn name(&self) -> &str;
}

/// Binary cross-entropy over sigmoid probabilities.
///
/// Expects `predictions` already passed through a sigmoid, one probability
/// per sample, and `targets` containing 0.0 / 1.0 labels of the same length.
/// Returns the mean negative log-likelihood as a scalar tensor.
pub struct BinaryCrossEntropy;

impl BinaryCrossEntropy {
    pub fn new() -> Self {
        Self
    }
}

impl Default for BinaryCrossEntropy {
    fn default() -> Self {
        Self::new()
    }
}

impl LossFn for BinaryCrossEntropy {
    fn forward(&self, predictions: &Tensor, targets: &Tensor) -> Tensor {
        let preds = predictions.data();
        let targs = targets.data();
        assert_eq!(
            preds.len(),
            targs.len(),
            "bce: predictions and targets must have the same length"
        );
        assert!(!preds.is_empty(), "bce: empty predictions");

        let n = preds.len() as f32;
        let mut total = 0.0f32;
        let mut grad = Array1::zeros(preds.len());
        for (i, (&p, &t)) in preds.iter().zip(targs.iter()).enumerate() {
            let p = p.clamp(EPS, 1.0 - EPS);
            total -= t * p.ln() + (1.0 - t) * (1.0 - p).ln();
            grad[i] = (p - t) / (p * (1.0 - p)) / n;
        }

        let requires_grad = predictions.requires_grad();
        let mut result = Tensor::new(Array1::from_elem(1, total / n), requires_grad);

        if requires_grad {
            result.set_backward_op(Rc::new(BceBackward {
                predictions: predictions.clone(),
                grad,
                result_grad: result.grad_cell(),
            }));
        }

        result
    }

    fn name(&self) -> &str {
        "binary_cross_entropy"
    }
}

struct BceBackward {
    predictions: Tensor,
    grad: Array1<f32>,
    result_grad: Rc<RefCell<Option<Array1<f32>>>>,
}

impl BackwardOp for BceBackward {
    fn backward(&self) {
        if let Some(grad_output) = self.result_grad.borrow().as_ref() {
            let scale = grad_output[0];
            self.predictions.accumulate_grad(&self.grad * scale);
        }
        if let Some(op) = self.predictions.backward_op() {
            op.backward();
        }
    }
}
