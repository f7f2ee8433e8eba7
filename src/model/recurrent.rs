//! Bidirectional LSTM layer

use crate::autograd::ops::bilstm;
use crate::autograd::Tensor;

/// Bidirectional single-layer LSTM
///
/// Owns the stacked gate weights for both directions (gate rows ordered
/// input, forget, cell, output). Forget-gate biases start at one so early
/// steps keep their cell state.
pub struct BiLstmLayer {
    /// Forward input weights (4·hidden x input_size)
    pub w_ih_f: Tensor,
    /// Forward recurrent weights (4·hidden x hidden)
    pub w_hh_f: Tensor,
    /// Forward gate biases (4·hidden)
    pub b_f: Tensor,
    /// Backward input weights (4·hidden x input_size)
    pub w_ih_b: Tensor,
    /// Backward recurrent weights (4·hidden x hidden)
    pub w_hh_b: Tensor,
    /// Backward gate biases (4·hidden)
    pub b_b: Tensor,
    input_size: usize,
    hidden: usize,
}

impl BiLstmLayer {
    pub fn new(input_size: usize, hidden: usize, phase: f32) -> Self {
        let scale = (1.0 / hidden as f32).sqrt();
        let weights = |n: usize, shift: f32| -> Tensor {
            Tensor::from_vec(
                (0..n).map(|i| ((i as f32 * phase + shift).sin() * scale)).collect(),
                true,
            )
        };
        let gate_bias = || -> Tensor {
            let mut b = vec![0.0f32; 4 * hidden];
            for v in &mut b[hidden..2 * hidden] {
                *v = 1.0;
            }
            Tensor::from_vec(b, true)
        };
        Self {
            w_ih_f: weights(4 * hidden * input_size, 0.0),
            w_hh_f: weights(4 * hidden * hidden, 1.0),
            b_f: gate_bias(),
            w_ih_b: weights(4 * hidden * input_size, 2.0),
            w_hh_b: weights(4 * hidden * hidden, 3.0),
            b_b: gate_bias(),
            input_size,
            hidden,
        }
    }

    /// Forward pass over a (steps × input_size) flattened sequence,
    /// producing (steps × 2·hidden)
    pub fn forward(&self, x: &Tensor, steps: usize) -> Tensor {
        bilstm(
            x,
            steps,
            self.input_size,
            self.hidden,
            &self.w_ih_f,
            &self.w_hh_f,
            &self.b_f,
            &self.w_ih_b,
            &self.w_hh_b,
            &self.b_b,
        )
    }

    pub fn hidden_size(&self) -> usize {
        self.hidden
    }

    pub fn parameters(&self) -> Vec<Tensor> {
        vec![
            self.w_ih_f.clone(),
            self.w_hh_f.clone(),
            self.b_f.clone(),
            self.w_ih_b.clone(),
            self.w_hh_b.clone(),
            self.b_b.clone(),
        ]
    }
}
