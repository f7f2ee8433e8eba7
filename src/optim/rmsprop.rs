//! RMSprop optimizer

use super::Optimizer;
use crate::Tensor;
use ndarray::Array1;

/// RMSprop with exponentially decaying squared-gradient average
///
/// Update rule per parameter: `s = rho·s + (1 − rho)·g²`, then
/// `p -= lr · g / (√s + eps)`. State is allocated lazily on the first step
/// and keyed by parameter position, so the same parameter order must be
/// passed every call.
pub struct RmsProp {
    lr: f32,
    rho: f32,
    eps: f32,
    sq_avg: Vec<Option<Array1<f32>>>,
}

impl RmsProp {
    /// Decay and epsilon defaults matching the published experiments
    pub fn new(lr: f32) -> Self {
        Self::with_params(lr, 0.9, 1e-7)
    }

    pub fn with_params(lr: f32, rho: f32, eps: f32) -> Self {
        Self {
            lr,
            rho,
            eps,
            sq_avg: Vec::new(),
        }
    }

    fn ensure_state(&mut self, params: &[Tensor]) {
        if self.sq_avg.is_empty() {
            self.sq_avg = params.iter().map(|_| None).collect();
        }
        assert_eq!(
            self.sq_avg.len(),
            params.len(),
            "rmsprop: parameter count changed between steps"
        );
    }
}

impl Optimizer for RmsProp {
    fn step(&mut self, params: &mut [Tensor]) {
        self.ensure_state(params);

        for (i, param) in params.iter_mut().enumerate() {
            if let Some(grad) = param.grad() {
                if self.sq_avg[i].is_none() {
                    self.sq_avg[i] = Some(Array1::zeros(grad.len()));
                }
                let sq_avg = self.sq_avg[i].as_mut().expect("state initialized above");

                let mut data = param.data_mut();
                for ((p, &g), s) in data.iter_mut().zip(grad.iter()).zip(sq_avg.iter_mut()) {
                    *s = self.rho * *s + (1.0 - self.rho) * g * g;
                    *p -= self.lr * g / (s.sqrt() + self.eps);
                }
            }
        }
    }

    fn lr(&self) -> f32 {
        self.lr
    }

    fn set_lr(&mut self, lr: f32) {
        self.lr = lr;
    }
}
