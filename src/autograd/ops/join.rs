//! Concatenation of tensors into one flat vector

use crate::autograd::{BackwardOp, Tensor};
use ndarray::Array1;
use std::cell::RefCell;
use std::rc::Rc;

/// Concatenates the inputs end to end
///
/// The backward pass slices the output gradient at the same offsets and
/// routes each piece to its source.
pub fn concat(parts: &[&Tensor]) -> Tensor {
    assert!(!parts.is_empty(), "concat: no inputs");

    let total: usize = parts.iter().map(|p| p.len()).sum();
    let mut out = Array1::zeros(total);
    let mut offset = 0;
    for part in parts {
        let d = part.data();
        out.as_slice_mut().expect("contiguous")[offset..offset + part.len()]
            .copy_from_slice(d.as_slice().expect("contiguous"));
        offset += part.len();
    }

    let requires_grad = parts.iter().any(|p| p.requires_grad());
    let mut result = Tensor::new(out, requires_grad);

    if requires_grad {
        let backward_op = Rc::new(ConcatBackward {
            parts: parts.iter().map(|&p| p.clone()).collect(),
            result_grad: result.grad_cell(),
        });
        result.set_backward_op(backward_op);
    }

    result
}

struct ConcatBackward {
    parts: Vec<Tensor>,
    result_grad: Rc<RefCell<Option<Array1<f32>>>>,
}

impl BackwardOp for ConcatBackward {
    fn backward(&self) {
        if let Some(grad_output) = self.result_grad.borrow().as_ref() {
            let gos = grad_output.as_slice().expect("contiguous");
            let mut offset = 0;
            for part in &self.parts {
                if part.requires_grad() {
                    part.accumulate_grad(Array1::from(
                        gos[offset..offset + part.len()].to_vec(),
                    ));
                }
                offset += part.len();
            }

            for part in &self.parts {
                if let Some(op) = part.backward_op() {
                    op.backward();
                }
            }
        }
    }
}
