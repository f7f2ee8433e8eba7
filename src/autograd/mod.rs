//! Tape-based autograd engine
//!
//! Reverse-mode automatic differentiation over flat `f32` tensors. Ops are
//! free functions that compute the forward value and attach a [`BackwardOp`]
//! capturing clones of the inputs and the result's gradient cell; calling
//! [`backward`] on the final tensor walks the tape and accumulates gradients
//! into every reachable leaf.

mod backward;
pub mod ops;
mod tensor;

pub use backward::BackwardOp;
pub use ops::*;
pub use tensor::Tensor;

/// Perform the backward pass from a tensor
///
/// Seeds the tensor's gradient with `grad_output`, or with ones for a scalar
/// loss, then walks the tape.
pub fn backward(tensor: &mut Tensor, grad_output: Option<ndarray::Array1<f32>>) {
    if let Some(grad) = grad_output {
        tensor.set_grad(grad);
    } else {
        let ones = ndarray::Array1::ones(tensor.data().len());
        tensor.set_grad(ones);
    }

    if let Some(op) = tensor.backward_op() {
        op.backward();
    }
}
