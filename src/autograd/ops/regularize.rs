//! Inverted dropout

use crate::autograd::{BackwardOp, Tensor};
use ndarray::Array1;
use rand::rngs::StdRng;
use rand::Rng;
use std::cell::RefCell;
use std::rc::Rc;

/// Randomly zeroes elements with probability `rate`, scaling survivors by
/// 1 / (1 − rate) so the expected activation is unchanged
///
/// Call only during training; at evaluation time skip the op entirely.
/// A rate of zero returns the input untouched.
pub fn dropout(x: &Tensor, rate: f32, rng: &mut StdRng) -> Tensor {
    assert!((0.0..1.0).contains(&rate), "dropout: rate must be in [0, 1)");

    if rate == 0.0 {
        return x.clone();
    }

    let scale = 1.0 / (1.0 - rate);
    let mask: Vec<f32> = (0..x.len())
        .map(|_| if rng.gen::<f32>() < rate { 0.0 } else { scale })
        .collect();

    let data = x.data();
    let out: Array1<f32> = data
        .iter()
        .zip(&mask)
        .map(|(&v, &m)| v * m)
        .collect();

    let requires_grad = x.requires_grad();
    let mut result = Tensor::new(out, requires_grad);

    if requires_grad {
        let backward_op = Rc::new(DropoutBackward {
            input: x.clone(),
            mask,
            result_grad: result.grad_cell(),
        });
        result.set_backward_op(backward_op);
    }

    result
}

struct DropoutBackward {
    input: Tensor,
    mask: Vec<f32>,
    result_grad: Rc<RefCell<Option<Array1<f32>>>>,
}

impl BackwardOp for DropoutBackward {
    fn backward(&self) {
        if let Some(grad_output) = self.result_grad.borrow().as_ref() {
            if self.input.requires_grad() {
                let grad: Array1<f32> = grad_output
                    .iter()
                    .zip(&self.mask)
                    .map(|(&g, &m)| g * m)
                    .collect();
                self.input.accumulate_grad(grad);
            }

            if let Some(op) = self.input.backward_op() {
                op.backward();
            }
        }
    }
}
