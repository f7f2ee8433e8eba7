//! Layer normalization over the rows of a flattened matrix

use crate::autograd::{BackwardOp, Tensor};
use ndarray::Array1;
use std::cell::RefCell;
use std::rc::Rc;

/// Row-wise layer normalization
///
/// `x` is (rows × row_len) flattened; each row is normalized independently
/// to zero mean and unit variance, then scaled and shifted:
///
/// out = gamma ⊙ (x − mean) / √(var + epsilon) + beta
///
/// `gamma` and `beta` have length `row_len` and are shared across rows, so
/// their gradients sum over rows.
pub fn layer_norm_rows(
    x: &Tensor,
    gamma: &Tensor,
    beta: &Tensor,
    rows: usize,
    row_len: usize,
    epsilon: f32,
) -> Tensor {
    assert_eq!(x.len(), rows * row_len, "layer_norm_rows: input size mismatch");
    assert_eq!(gamma.len(), row_len, "layer_norm_rows: gamma size mismatch");
    assert_eq!(beta.len(), row_len, "layer_norm_rows: beta size mismatch");

    let x_data = x.data();
    let g = gamma.data();
    let b = beta.data();
    let n = row_len as f32;

    let mut out = Array1::zeros(rows * row_len);
    for r in 0..rows {
        let row = &x_data.as_slice().expect("contiguous")[r * row_len..(r + 1) * row_len];
        let mean: f32 = row.iter().sum::<f32>() / n;
        let var: f32 = row.iter().map(|&v| (v - mean) * (v - mean)).sum::<f32>() / n;
        let std = (var + epsilon).sqrt();
        for c in 0..row_len {
            let norm = (row[c] - mean) / std;
            out[r * row_len + c] = g[c] * norm + b[c];
        }
    }

    let requires_grad = x.requires_grad() || gamma.requires_grad() || beta.requires_grad();
    let mut result = Tensor::new(out, requires_grad);

    if requires_grad {
        let backward_op = Rc::new(LayerNormRowsBackward {
            x: x.clone(),
            gamma: gamma.clone(),
            beta: beta.clone(),
            rows,
            row_len,
            epsilon,
            result_grad: result.grad_cell(),
        });
        result.set_backward_op(backward_op);
    }

    result
}

struct LayerNormRowsBackward {
    x: Tensor,
    gamma: Tensor,
    beta: Tensor,
    rows: usize,
    row_len: usize,
    epsilon: f32,
    result_grad: Rc<RefCell<Option<Array1<f32>>>>,
}

impl BackwardOp for LayerNormRowsBackward {
    fn backward(&self) {
        if let Some(grad_output) = self.result_grad.borrow().as_ref() {
            let row_len = self.row_len;
            let n = row_len as f32;
            let x_data = self.x.data();
            let g = self.gamma.data();
            let x_slice = x_data.as_slice().expect("contiguous");
            let go_slice = grad_output.as_slice().expect("contiguous");

            let mut grad_x = Array1::zeros(self.rows * row_len);
            let mut grad_gamma = Array1::zeros(row_len);
            let mut grad_beta = Array1::zeros(row_len);

            for r in 0..self.rows {
                let row = &x_slice[r * row_len..(r + 1) * row_len];
                let go = &go_slice[r * row_len..(r + 1) * row_len];

                let mean: f32 = row.iter().sum::<f32>() / n;
                let var: f32 = row.iter().map(|&v| (v - mean) * (v - mean)).sum::<f32>() / n;
                let std = (var + self.epsilon).sqrt();

                // grad through the affine part
                let mut sum_grad = 0.0f32;
                let mut sum_grad_norm = 0.0f32;
                for c in 0..row_len {
                    let norm = (row[c] - mean) / std;
                    let gn = go[c] * g[c];
                    grad_gamma[c] += go[c] * norm;
                    grad_beta[c] += go[c];
                    sum_grad += gn;
                    sum_grad_norm += gn * norm;
                }

                // grad through the normalization:
                // (gn − Σgn/n − norm·Σ(gn·norm)/n) / std
                for c in 0..row_len {
                    let norm = (row[c] - mean) / std;
                    let gn = go[c] * g[c];
                    grad_x[r * row_len + c] =
                        (gn - sum_grad / n - norm * sum_grad_norm / n) / std;
                }
            }

            if self.x.requires_grad() {
                self.x.accumulate_grad(grad_x);
            }
            if self.gamma.requires_grad() {
                self.gamma.accumulate_grad(grad_gamma);
            }
            if self.beta.requires_grad() {
                self.beta.accumulate_grad(grad_beta);
            }

            if let Some(op) = self.x.backward_op() {
                op.backward();
            }
            if let Some(op) = self.gamma.backward_op() {
                op.backward();
            }
            if let Some(op) = self.beta.backward_op() {
                op.backward();
            }
        }
    }
}
