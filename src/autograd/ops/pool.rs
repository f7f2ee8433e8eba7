//! Max pooling with stride equal to the window size
//!
//! Trailing elements that do not fill a whole window are dropped, so the
//! output dims are the floor of input / window.

use crate::autograd::{BackwardOp, Tensor};
use ndarray::Array1;
use std::cell::RefCell;
use std::rc::Rc;

/// 2D max pooling over a (height × width × channels) flattened map
pub fn max_pool2d(input: &Tensor, height: usize, width: usize, channels: usize, window: usize) -> Tensor {
    assert_eq!(input.len(), height * width * channels, "max_pool2d: input size mismatch");
    assert!(window > 0, "max_pool2d: zero window");

    let out_h = height / window;
    let out_w = width / window;
    let x = input.data();
    let xs = x.as_slice().expect("contiguous");

    let mut out = Array1::zeros(out_h * out_w * channels);
    let mut argmax = vec![0usize; out_h * out_w * channels];
    for oy in 0..out_h {
        for ox in 0..out_w {
            for c in 0..channels {
                let mut best = f32::NEG_INFINITY;
                let mut best_idx = 0usize;
                for dy in 0..window {
                    for dx in 0..window {
                        let idx = ((oy * window + dy) * width + ox * window + dx) * channels + c;
                        if xs[idx] > best {
                            best = xs[idx];
                            best_idx = idx;
                        }
                    }
                }
                let o = (oy * out_w + ox) * channels + c;
                out[o] = best;
                argmax[o] = best_idx;
            }
        }
    }

    let requires_grad = input.requires_grad();
    let mut result = Tensor::new(out, requires_grad);

    if requires_grad {
        let backward_op = Rc::new(MaxPoolBackward {
            input: input.clone(),
            argmax,
            result_grad: result.grad_cell(),
        });
        result.set_backward_op(backward_op);
    }

    result
}

/// 1D max pooling over a (steps × channels) flattened sequence
pub fn max_pool1d(input: &Tensor, steps: usize, channels: usize, window: usize) -> Tensor {
    assert_eq!(input.len(), steps * channels, "max_pool1d: input size mismatch");
    assert!(window > 0, "max_pool1d: zero window");

    let out_steps = steps / window;
    let x = input.data();
    let xs = x.as_slice().expect("contiguous");

    let mut out = Array1::zeros(out_steps * channels);
    let mut argmax = vec![0usize; out_steps * channels];
    for t in 0..out_steps {
        for c in 0..channels {
            let mut best = f32::NEG_INFINITY;
            let mut best_idx = 0usize;
            for dt in 0..window {
                let idx = (t * window + dt) * channels + c;
                if xs[idx] > best {
                    best = xs[idx];
                    best_idx = idx;
                }
            }
            let o = t * channels + c;
            out[o] = best;
            argmax[o] = best_idx;
        }
    }

    let requires_grad = input.requires_grad();
    let mut result = Tensor::new(out, requires_grad);

    if requires_grad {
        let backward_op = Rc::new(MaxPoolBackward {
            input: input.clone(),
            argmax,
            result_grad: result.grad_cell(),
        });
        result.set_backward_op(backward_op);
    }

    result
}

/// Shared backward for both pooling variants: the gradient of each output
/// element flows to the input position that won the max.
struct MaxPoolBackward {
    input: Tensor,
    argmax: Vec<usize>,
    result_grad: Rc<RefCell<Option<Array1<f32>>>>,
}

impl BackwardOp for MaxPoolBackward {
    fn backward(&self) {
        if let Some(grad_output) = self.result_grad.borrow().as_ref() {
            if self.input.requires_grad() {
                let mut grad_input = Array1::zeros(self.input.len());
                for (o, &src) in self.argmax.iter().enumerate() {
                    grad_input[src] += grad_output[o];
                }
                self.input.accumulate_grad(grad_input);
            }

            if let Some(op) = self.input.backward_op() {
                op.backward();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_pool2d_picks_window_max() {
        // 4x4 single channel, 2x2 windows
        let input = Tensor::from_vec(
            vec![
                1.0, 2.0, 5.0, 3.0, //
                4.0, 0.0, 1.0, 2.0, //
                9.0, 1.0, 0.0, 7.0, //
                2.0, 3.0, 8.0, 1.0,
            ],
            false,
        );
        let out = max_pool2d(&input, 4, 4, 1, 2);

        assert_eq!(out.data().to_vec(), vec![4.0, 5.0, 9.0, 8.0]);
    }

    #[test]
    fn test_pool2d_channels_independent() {
        // 2x2 with 2 channels, one window; channel maxima come from
        // different pixels
        let input = Tensor::from_vec(
            vec![
                1.0, 8.0, // (0,0)
                2.0, 1.0, // (0,1)
                7.0, 2.0, // (1,0)
                3.0, 3.0, // (1,1)
            ],
            false,
        );
        let out = max_pool2d(&input, 2, 2, 2, 2);

        assert_eq!(out.data().to_vec(), vec![7.0, 8.0]);
    }

    #[test]
    fn test_pool2d_drops_partial_windows() {
        // 5x5 pooled by 2 keeps only the 4x4 corner
        let input = Tensor::from_vec((0..25).map(|i| i as f32).collect(), false);
        let out = max_pool2d(&input, 5, 5, 1, 2);

        assert_eq!(out.len(), 4);
        // row 4 and column 4 never participate
        assert_eq!(out.data().to_vec(), vec![6.0, 8.0, 16.0, 18.0]);
    }

    #[test]
    fn test_pool1d_known_values() {
        let input = Tensor::from_vec(vec![1.0, 5.0, 2.0, 0.0, 3.0, 4.0, 9.0], false);
        let out = max_pool1d(&input, 7, 1, 3);

        assert_eq!(out.data().to_vec(), vec![5.0, 4.0]);
    }

    #[test]
    fn test_pool2d_backward_routes_to_argmax() {
        let input = Tensor::from_vec(vec![1.0, 2.0, 4.0, 3.0], true);
        let out = max_pool2d(&input, 2, 2, 1, 2);

        out.set_grad(Array1::from(vec![2.5]));
        out.backward_op().unwrap().backward();

        assert_eq!(input.grad().unwrap().to_vec(), vec![0.0, 0.0, 2.5, 0.0]);
    }

    #[test]
    fn test_pool1d_backward_routes_to_argmax() {
        let input = Tensor::from_vec(vec![0.0, 3.0, 1.0, 7.0, 2.0, 2.0], true);
        let out = max_pool1d(&input, 6, 1, 2);

        out.set_grad(Array1::from(vec![1.0, 1.0, 1.0]));
        out.backward_op().unwrap().backward();

        assert_eq!(
            input.grad().unwrap().to_vec(),
            vec![0.0, 1.0, 0.0, 1.0, 1.0, 0.0]
        );
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        #[test]
        fn prop_pool_output_never_below_any_window_member(
            vals in proptest::collection::vec(-10.0f32..10.0, 12),
        ) {
            let input = Tensor::from_vec(vals.clone(), false);
            let out = max_pool1d(&input, 12, 1, 3);
            let d = out.data();
            for t in 0..4 {
                for dt in 0..3 {
                    prop_assert!(d[t] >= vals[t * 3 + dt]);
                }
            }
        }
    }
}
