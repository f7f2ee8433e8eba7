//! Bidirectional LSTM as a single fused op
//!
//! The whole unrolled recurrence is one tape node with hand-derived
//! backpropagation through time. Fusing keeps the recorded graph a tree:
//! the per-step hidden states fan out internally (into the next step and
//! into the output), which the tape's tree-shaped backward cannot express
//! as separate ops without double-counting.

use crate::autograd::{BackwardOp, Tensor};
use ndarray::Array1;
use std::cell::RefCell;
use std::rc::Rc;

use super::activations::sigmoid_scalar;

/// Bidirectional LSTM over a (steps × input_size) flattened sequence
///
/// Weights follow the stacked-gate convention: `w_ih` is (4·hidden ×
/// input_size), `w_hh` is (4·hidden × hidden) and `b` is (4·hidden), with
/// gate rows ordered input, forget, cell, output. The `_f` set runs the
/// sequence forward, the `_b` set backward; both halves are concatenated
/// per step, so the output is (steps × 2·hidden) flattened.
#[allow(clippy::too_many_arguments)]
pub fn bilstm(
    x: &Tensor,
    steps: usize,
    input_size: usize,
    hidden: usize,
    w_ih_f: &Tensor,
    w_hh_f: &Tensor,
    b_f: &Tensor,
    w_ih_b: &Tensor,
    w_hh_b: &Tensor,
    b_b: &Tensor,
) -> Tensor {
    assert_eq!(x.len(), steps * input_size, "bilstm: input size mismatch");
    for (w, label) in [(w_ih_f, "w_ih_f"), (w_ih_b, "w_ih_b")] {
        assert_eq!(w.len(), 4 * hidden * input_size, "bilstm: {label} size mismatch");
    }
    for (w, label) in [(w_hh_f, "w_hh_f"), (w_hh_b, "w_hh_b")] {
        assert_eq!(w.len(), 4 * hidden * hidden, "bilstm: {label} size mismatch");
    }
    for (b, label) in [(b_f, "b_f"), (b_b, "b_b")] {
        assert_eq!(b.len(), 4 * hidden, "bilstm: {label} size mismatch");
    }

    let x_data = x.data();
    let xs = x_data.as_slice().expect("contiguous");

    let fwd = run_direction(
        xs,
        steps,
        input_size,
        hidden,
        &w_ih_f.data(),
        &w_hh_f.data(),
        &b_f.data(),
        false,
    );
    let bwd = run_direction(
        xs,
        steps,
        input_size,
        hidden,
        &w_ih_b.data(),
        &w_hh_b.data(),
        &b_b.data(),
        true,
    );

    let mut out = Array1::zeros(steps * 2 * hidden);
    for t in 0..steps {
        for u in 0..hidden {
            out[t * 2 * hidden + u] = fwd.h[t * hidden + u];
            out[t * 2 * hidden + hidden + u] = bwd.h[t * hidden + u];
        }
    }

    let requires_grad = x.requires_grad()
        || w_ih_f.requires_grad()
        || w_hh_f.requires_grad()
        || b_f.requires_grad()
        || w_ih_b.requires_grad()
        || w_hh_b.requires_grad()
        || b_b.requires_grad();
    let mut result = Tensor::new(out, requires_grad);

    if requires_grad {
        let backward_op = Rc::new(BiLstmBackward {
            x: x.clone(),
            w_ih_f: w_ih_f.clone(),
            w_hh_f: w_hh_f.clone(),
            b_f: b_f.clone(),
            w_ih_b: w_ih_b.clone(),
            w_hh_b: w_hh_b.clone(),
            b_b: b_b.clone(),
            steps,
            input_size,
            hidden,
            fwd,
            bwd,
            result_grad: result.grad_cell(),
        });
        result.set_backward_op(backward_op);
    }

    result
}

/// Per-direction forward activations, all keyed by original timestep
struct DirectionCache {
    i: Vec<f32>,
    f: Vec<f32>,
    g: Vec<f32>,
    o: Vec<f32>,
    c: Vec<f32>,
    h: Vec<f32>,
}

#[allow(clippy::too_many_arguments)]
fn run_direction(
    xs: &[f32],
    steps: usize,
    input_size: usize,
    hidden: usize,
    w_ih: &Array1<f32>,
    w_hh: &Array1<f32>,
    b: &Array1<f32>,
    reverse: bool,
) -> DirectionCache {
    let w_ih = w_ih.as_slice().expect("contiguous");
    let w_hh = w_hh.as_slice().expect("contiguous");
    let b = b.as_slice().expect("contiguous");

    let mut cache = DirectionCache {
        i: vec![0.0; steps * hidden],
        f: vec![0.0; steps * hidden],
        g: vec![0.0; steps * hidden],
        o: vec![0.0; steps * hidden],
        c: vec![0.0; steps * hidden],
        h: vec![0.0; steps * hidden],
    };

    let order: Vec<usize> = if reverse {
        (0..steps).rev().collect()
    } else {
        (0..steps).collect()
    };

    let mut h_prev = vec![0.0f32; hidden];
    let mut c_prev = vec![0.0f32; hidden];
    let mut z = vec![0.0f32; 4 * hidden];

    for &t in &order {
        let xt = &xs[t * input_size..(t + 1) * input_size];
        for (r, zr) in z.iter_mut().enumerate() {
            let mut acc = b[r];
            let wr = &w_ih[r * input_size..(r + 1) * input_size];
            for (col, &xv) in xt.iter().enumerate() {
                acc += wr[col] * xv;
            }
            let hr = &w_hh[r * hidden..(r + 1) * hidden];
            for (col, &hv) in h_prev.iter().enumerate() {
                acc += hr[col] * hv;
            }
            *zr = acc;
        }

        for u in 0..hidden {
            let i = sigmoid_scalar(z[u]);
            let f = sigmoid_scalar(z[hidden + u]);
            let g = z[2 * hidden + u].tanh();
            let o = sigmoid_scalar(z[3 * hidden + u]);
            let c = f * c_prev[u] + i * g;
            cache.i[t * hidden + u] = i;
            cache.f[t * hidden + u] = f;
            cache.g[t * hidden + u] = g;
            cache.o[t * hidden + u] = o;
            cache.c[t * hidden + u] = c;
            cache.h[t * hidden + u] = o * c.tanh();
        }
        h_prev.copy_from_slice(&cache.h[t * hidden..(t + 1) * hidden]);
        c_prev.copy_from_slice(&cache.c[t * hidden..(t + 1) * hidden]);
    }

    cache
}

struct BiLstmBackward {
    x: Tensor,
    w_ih_f: Tensor,
    w_hh_f: Tensor,
    b_f: Tensor,
    w_ih_b: Tensor,
    w_hh_b: Tensor,
    b_b: Tensor,
    steps: usize,
    input_size: usize,
    hidden: usize,
    fwd: DirectionCache,
    bwd: DirectionCache,
    result_grad: Rc<RefCell<Option<Array1<f32>>>>,
}

/// Gradients accumulated by one direction's unrolled backward pass
struct DirectionGrads {
    x: Array1<f32>,
    w_ih: Array1<f32>,
    w_hh: Array1<f32>,
    b: Array1<f32>,
}

impl BiLstmBackward {
    /// Backpropagation through time for one direction
    ///
    /// Walks timesteps in reverse processing order, carrying the hidden and
    /// cell gradients across steps. `half` selects which half of each output
    /// step belongs to this direction.
    fn backprop_direction(
        &self,
        cache: &DirectionCache,
        grad_output: &[f32],
        w_ih: &Array1<f32>,
        w_hh: &Array1<f32>,
        reverse: bool,
        half: usize,
    ) -> DirectionGrads {
        let hidden = self.hidden;
        let input_size = self.input_size;
        let steps = self.steps;
        let w_ih = w_ih.as_slice().expect("contiguous");
        let w_hh = w_hh.as_slice().expect("contiguous");
        let x_data = self.x.data();
        let xs = x_data.as_slice().expect("contiguous");

        let mut grads = DirectionGrads {
            x: Array1::zeros(steps * input_size),
            w_ih: Array1::zeros(4 * hidden * input_size),
            w_hh: Array1::zeros(4 * hidden * hidden),
            b: Array1::zeros(4 * hidden),
        };

        // reverse of processing order
        let order: Vec<usize> = if reverse {
            (0..steps).collect()
        } else {
            (0..steps).rev().collect()
        };

        let mut dh_next = vec![0.0f32; hidden];
        let mut dc_next = vec![0.0f32; hidden];
        let mut dz = vec![0.0f32; 4 * hidden];

        for &t in &order {
            let prev: Option<usize> = if reverse {
                if t + 1 < steps { Some(t + 1) } else { None }
            } else {
                t.checked_sub(1)
            };

            for u in 0..hidden {
                let i = cache.i[t * hidden + u];
                let f = cache.f[t * hidden + u];
                let g = cache.g[t * hidden + u];
                let o = cache.o[t * hidden + u];
                let c = cache.c[t * hidden + u];
                let tanh_c = c.tanh();
                let c_prev = prev.map_or(0.0, |p| cache.c[p * hidden + u]);

                let dh = grad_output[t * 2 * hidden + half + u] + dh_next[u];
                let dc = dc_next[u] + dh * o * (1.0 - tanh_c * tanh_c);

                dz[u] = dc * g * i * (1.0 - i);
                dz[hidden + u] = dc * c_prev * f * (1.0 - f);
                dz[2 * hidden + u] = dc * i * (1.0 - g * g);
                dz[3 * hidden + u] = dh * tanh_c * o * (1.0 - o);

                dc_next[u] = dc * f;
            }

            let xt = &xs[t * input_size..(t + 1) * input_size];
            for (r, &dzr) in dz.iter().enumerate() {
                grads.b[r] += dzr;
                for (col, &xv) in xt.iter().enumerate() {
                    grads.w_ih[r * input_size + col] += dzr * xv;
                    grads.x[t * input_size + col] += w_ih[r * input_size + col] * dzr;
                }
                if let Some(p) = prev {
                    let hp = &cache.h[p * hidden..(p + 1) * hidden];
                    for (col, &hv) in hp.iter().enumerate() {
                        grads.w_hh[r * hidden + col] += dzr * hv;
                    }
                }
            }

            for (col, dhn) in dh_next.iter_mut().enumerate() {
                let mut acc = 0.0f32;
                for (r, &dzr) in dz.iter().enumerate() {
                    acc += w_hh[r * hidden + col] * dzr;
                }
                *dhn = acc;
            }
        }

        grads
    }
}

impl BackwardOp for BiLstmBackward {
    fn backward(&self) {
        if let Some(grad_output) = self.result_grad.borrow().as_ref() {
            let gos = grad_output.as_slice().expect("contiguous");

            let fg = self.backprop_direction(
                &self.fwd,
                gos,
                &self.w_ih_f.data(),
                &self.w_hh_f.data(),
                false,
                0,
            );
            let bg = self.backprop_direction(
                &self.bwd,
                gos,
                &self.w_ih_b.data(),
                &self.w_hh_b.data(),
                true,
                self.hidden,
            );

            if self.x.requires_grad() {
                self.x.accumulate_grad(fg.x + bg.x);
            }
            if self.w_ih_f.requires_grad() {
                self.w_ih_f.accumulate_grad(fg.w_ih);
            }
            if self.w_hh_f.requires_grad() {
                self.w_hh_f.accumulate_grad(fg.w_hh);
            }
            if self.b_f.requires_grad() {
                self.b_f.accumulate_grad(fg.b);
            }
            if self.w_ih_b.requires_grad() {
                self.w_ih_b.accumulate_grad(bg.w_ih);
            }
            if self.w_hh_b.requires_grad() {
                self.w_hh_b.accumulate_grad(bg.w_hh);
            }
            if self.b_b.requires_grad() {
                self.b_b.accumulate_grad(bg.b);
            }

            if let Some(op) = self.x.backward_op() {
                op.backward();
            }
            // weight tensors are leaves in every model here, but recurse
            // anyway so the op composes
            for w in [
                &self.w_ih_f,
                &self.w_hh_f,
                &self.b_f,
                &self.w_ih_b,
                &self.w_hh_b,
                &self.b_b,
            ] {
                if let Some(op) = w.backward_op() {
                    op.backward();
                }
            }
        }
    }
}
