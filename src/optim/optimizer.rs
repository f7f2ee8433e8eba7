//! Optimizer trait

use crate::Tensor;

/// Trait for optimization algorithms
pub trait Optimizer {
    /// Perform a single optimization step over the parameters
    ///
    /// Parameter order must stay stable across calls; stateful optimizers
    /// key their per-parameter state by position.
    fn step(&mut self, params: &mut [Tensor]);

    /// Zero out all gradients
    fn zero_grad(&mut self, params: &mut [Tensor]) {
        for param in params {
            param.zero_grad();
        }
    }

    /// Get learning rate
    fn lr(&self) -> f32;

    /// Set learning rate
    fn set_lr(&mut self, lr: f32);
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::arr1;

    struct PlainDescent {
        learning_rate: f32,
    }

    impl Optimizer for PlainDescent {
        fn step(&mut self, params: &mut [Tensor]) {
            for param in params {
                if let Some(grad) = param.grad() {
                    *param.data_mut() = param.data() - &(&grad * self.learning_rate);
                }
            }
        }

        fn lr(&self) -> f32 {
            self.learning_rate
        }

        fn set_lr(&mut self, lr: f32) {
            self.learning_rate = lr;
        }
    }

    #[test]
    fn test_step_updates_against_gradient() {
        let mut opt = PlainDescent { learning_rate: 0.1 };
        let param = Tensor::from_vec(vec![1.0, 2.0], true);
        param.set_grad(arr1(&[0.5, 1.0]));

        opt.step(&mut [param.clone()]);

        let data = param.data();
        assert!((data[0] - 0.95).abs() < 1e-6);
        assert!((data[1] - 1.9).abs() < 1e-6);
    }

    #[test]
    fn test_default_zero_grad_clears_all() {
        let mut opt = PlainDescent { learning_rate: 0.1 };
        let mut params = vec![
            Tensor::from_vec(vec![1.0], true),
            Tensor::from_vec(vec![2.0], true),
        ];
        for p in &params {
            p.set_grad(arr1(&[1.0]));
        }

        opt.zero_grad(&mut params);
        assert!(params.iter().all(|p| p.grad().is_none()));
    }

    #[test]
    fn test_lr_accessors() {
        let mut opt = PlainDescent { learning_rate: 0.1 };
        assert_eq!(opt.lr(), 0.1);
        opt.set_lr(0.01);
        assert_eq!(opt.lr(), 0.01);
    }
}
