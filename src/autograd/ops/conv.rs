//! Convolution over flattened channel-last feature maps
//!
//! 2D inputs are (height × width × channels) flattened row-major, 1D inputs
//! are (steps × channels). Kernels are stored [out][in][ky][kx] (or
//! [out][in][dt] for 1D) and stride is fixed at 1.

use crate::autograd::{BackwardOp, Tensor};
use ndarray::Array1;
use std::cell::RefCell;
use std::rc::Rc;

/// Spatial padding mode for 2D convolution
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Padding {
    /// No padding; output shrinks by kernel_size − 1
    Valid,
    /// Zero padding keeping the output the same size as the input
    Same,
}

/// Output dimensions of [`conv2d`] for the given input size and padding
pub fn conv2d_output_dims(
    height: usize,
    width: usize,
    kernel_size: usize,
    padding: Padding,
) -> (usize, usize) {
    match padding {
        Padding::Valid => (height - kernel_size + 1, width - kernel_size + 1),
        Padding::Same => (height, width),
    }
}

/// 2D convolution with bias
///
/// `input` is (height × width × c_in) flattened, `kernel` is
/// (c_out × c_in × k × k) flattened, `bias` has length c_out. The output is
/// (out_h × out_w × c_out) flattened with dims from [`conv2d_output_dims`].
#[allow(clippy::too_many_arguments)]
pub fn conv2d(
    input: &Tensor,
    kernel: &Tensor,
    bias: &Tensor,
    height: usize,
    width: usize,
    c_in: usize,
    c_out: usize,
    kernel_size: usize,
    padding: Padding,
) -> Tensor {
    assert_eq!(input.len(), height * width * c_in, "conv2d: input size mismatch");
    assert_eq!(
        kernel.len(),
        c_out * c_in * kernel_size * kernel_size,
        "conv2d: kernel size mismatch"
    );
    assert_eq!(bias.len(), c_out, "conv2d: bias size mismatch");

    let (out_h, out_w) = conv2d_output_dims(height, width, kernel_size, padding);
    let pad = match padding {
        Padding::Valid => 0isize,
        Padding::Same => ((kernel_size - 1) / 2) as isize,
    };

    let x = input.data();
    let w = kernel.data();
    let b = bias.data();
    let xs = x.as_slice().expect("contiguous");
    let ws = w.as_slice().expect("contiguous");

    let mut out = Array1::zeros(out_h * out_w * c_out);
    for oy in 0..out_h {
        for ox in 0..out_w {
            for co in 0..c_out {
                let mut acc = b[co];
                for ky in 0..kernel_size {
                    let iy = oy as isize + ky as isize - pad;
                    if iy < 0 || iy >= height as isize {
                        continue;
                    }
                    for kx in 0..kernel_size {
                        let ix = ox as isize + kx as isize - pad;
                        if ix < 0 || ix >= width as isize {
                            continue;
                        }
                        let px = (iy as usize * width + ix as usize) * c_in;
                        let kb = ((co * c_in) * kernel_size + ky) * kernel_size + kx;
                        for ci in 0..c_in {
                            acc += xs[px + ci] * ws[kb + ci * kernel_size * kernel_size];
                        }
                    }
                }
                out[(oy * out_w + ox) * c_out + co] = acc;
            }
        }
    }

    let requires_grad = input.requires_grad() || kernel.requires_grad() || bias.requires_grad();
    let mut result = Tensor::new(out, requires_grad);

    if requires_grad {
        let backward_op = Rc::new(Conv2dBackward {
            input: input.clone(),
            kernel: kernel.clone(),
            bias: bias.clone(),
            height,
            width,
            c_in,
            c_out,
            kernel_size,
            padding,
            result_grad: result.grad_cell(),
        });
        result.set_backward_op(backward_op);
    }

    result
}

struct Conv2dBackward {
    input: Tensor,
    kernel: Tensor,
    bias: Tensor,
    height: usize,
    width: usize,
    c_in: usize,
    c_out: usize,
    kernel_size: usize,
    padding: Padding,
    result_grad: Rc<RefCell<Option<Array1<f32>>>>,
}

impl BackwardOp for Conv2dBackward {
    fn backward(&self) {
        if let Some(grad_output) = self.result_grad.borrow().as_ref() {
            let k = self.kernel_size;
            let (out_h, out_w) = conv2d_output_dims(self.height, self.width, k, self.padding);
            let pad = match self.padding {
                Padding::Valid => 0isize,
                Padding::Same => ((k - 1) / 2) as isize,
            };

            let x = self.input.data();
            let w = self.kernel.data();
            let xs = x.as_slice().expect("contiguous");
            let ws = w.as_slice().expect("contiguous");
            let gos = grad_output.as_slice().expect("contiguous");

            let mut grad_input = Array1::zeros(self.input.len());
            let mut grad_kernel = Array1::zeros(self.kernel.len());
            let mut grad_bias = Array1::zeros(self.c_out);

            for oy in 0..out_h {
                for ox in 0..out_w {
                    for co in 0..self.c_out {
                        let go = gos[(oy * out_w + ox) * self.c_out + co];
                        if go == 0.0 {
                            continue;
                        }
                        grad_bias[co] += go;
                        for ky in 0..k {
                            let iy = oy as isize + ky as isize - pad;
                            if iy < 0 || iy >= self.height as isize {
                                continue;
                            }
                            for kx in 0..k {
                                let ix = ox as isize + kx as isize - pad;
                                if ix < 0 || ix >= self.width as isize {
                                    continue;
                                }
                                let px = (iy as usize * self.width + ix as usize) * self.c_in;
                                let kb = ((co * self.c_in) * k + ky) * k + kx;
                                for ci in 0..self.c_in {
                                    let ki = kb + ci * k * k;
                                    grad_input[px + ci] += go * ws[ki];
                                    grad_kernel[ki] += go * xs[px + ci];
                                }
                            }
                        }
                    }
                }
            }

            if self.input.requires_grad() {
                self.input.accumulate_grad(grad_input);
            }
            if self.kernel.requires_grad() {
                self.kernel.accumulate_grad(grad_kernel);
            }
            if self.bias.requires_grad() {
                self.bias.accumulate_grad(grad_bias);
            }

            if let Some(op) = self.input.backward_op() {
                op.backward();
            }
            if let Some(op) = self.kernel.backward_op() {
                op.backward();
            }
            if let Some(op) = self.bias.backward_op() {
                op.backward();
            }
        }
    }
}

/// 1D convolution with bias, valid padding
///
/// `input` is (steps × c_in) flattened, `kernel` is (c_out × c_in × k)
/// flattened, `bias` has length c_out. The output is
/// ((steps − k + 1) × c_out) flattened.
pub fn conv1d(
    input: &Tensor,
    kernel: &Tensor,
    bias: &Tensor,
    steps: usize,
    c_in: usize,
    c_out: usize,
    kernel_size: usize,
) -> Tensor {
    assert_eq!(input.len(), steps * c_in, "conv1d: input size mismatch");
    assert_eq!(
        kernel.len(),
        c_out * c_in * kernel_size,
        "conv1d: kernel size mismatch"
    );
    assert_eq!(bias.len(), c_out, "conv1d: bias size mismatch");
    assert!(steps >= kernel_size, "conv1d: input shorter than kernel");

    let out_steps = steps - kernel_size + 1;
    let x = input.data();
    let w = kernel.data();
    let b = bias.data();
    let xs = x.as_slice().expect("contiguous");
    let ws = w.as_slice().expect("contiguous");

    let mut out = Array1::zeros(out_steps * c_out);
    for t in 0..out_steps {
        for co in 0..c_out {
            let mut acc = b[co];
            for dt in 0..kernel_size {
                let px = (t + dt) * c_in;
                let kb = (co * c_in) * kernel_size + dt;
                for ci in 0..c_in {
                    acc += xs[px + ci] * ws[kb + ci * kernel_size];
                }
            }
            out[t * c_out + co] = acc;
        }
    }

    let requires_grad = input.requires_grad() || kernel.requires_grad() || bias.requires_grad();
    let mut result = Tensor::new(out, requires_grad);

    if requires_grad {
        let backward_op = Rc::new(Conv1dBackward {
            input: input.clone(),
            kernel: kernel.clone(),
            bias: bias.clone(),
            steps,
            c_in,
            c_out,
            kernel_size,
            result_grad: result.grad_cell(),
        });
        result.set_backward_op(backward_op);
    }

    result
}

struct Conv1dBackward {
    input: Tensor,
    kernel: Tensor,
    bias: Tensor,
    steps: usize,
    c_in: usize,
    c_out: usize,
    kernel_size: usize,
    result_grad: Rc<RefCell<Option<Array1<f32>>>>,
}

impl BackwardOp for Conv1dBackward {
    fn backward(&self) {
        if let Some(grad_output) = self.result_grad.borrow().as_ref() {
            let k = self.kernel_size;
            let out_steps = self.steps - k + 1;

            let x = self.input.data();
            let w = self.kernel.data();
            let xs = x.as_slice().expect("contiguous");
            let ws = w.as_slice().expect("contiguous");
            let gos = grad_output.as_slice().expect("contiguous");

            let mut grad_input = Array1::zeros(self.input.len());
            let mut grad_kernel = Array1::zeros(self.kernel.len());
            let mut grad_bias = Array1::zeros(self.c_out);

            for t in 0..out_steps {
                for co in 0..self.c_out {
                    let go = gos[t * self.c_out + co];
                    if go == 0.0 {
                        continue;
                    }
                    grad_bias[co] += go;
                    for dt in 0..k {
                        let px = (t + dt) * self.c_in;
                        let kb = (co * self.c_in) * k + dt;
                        for ci in 0..self.c_in {
                            let ki = kb + ci * k;
                            grad_input[px + ci] += go * ws[ki];
                            grad_kernel[ki] += go * xs[px + ci];
                        }
                    }
                }
            }

            if self.input.requires_grad() {
                self.input.accumulate_grad(grad_input);
            }
            if self.kernel.requires_grad() {
                self.kernel.accumulate_grad(grad_kernel);
            }
            if self.bias.requires_grad() {
                self.bias.accumulate_grad(grad_bias);
            }

            if let Some(op) = self.input.backward_op() {
                op.backward();
            }
            if let Some(op) = self.kernel.backward_op() {
                op.backward();
            }
            if let Some(op) = self.bias.backward_op() {
                op.backward();
            }
        }
    }
}
