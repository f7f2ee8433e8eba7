//! Gradient clipping

use crate::Tensor;

/// Clip gradients by global norm
///
/// Computes the global norm across every parameter's gradient and, when it
/// exceeds `max_norm`, rescales all gradients by `max_norm / global_norm`
/// so their relative magnitudes are preserved.
///
/// Returns the global norm measured before clipping.
pub fn clip_grad_norm(params: &mut [Tensor], max_norm: f32) -> f32 {
    let mut total_norm_sq = 0.0;
    for param in params.iter() {
        if let Some(grad) = param.grad() {
            total_norm_sq += grad.iter().map(|&g| g * g).sum::<f32>();
        }
    }
    let global_norm = total_norm_sq.sqrt();

    if global_norm > max_norm {
        let clip_coef = max_norm / global_norm;
        for param in params.iter_mut() {
            if let Some(grad) = param.grad() {
                param.set_grad(grad * clip_coef);
            }
        }
    }

    global_norm
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::arr1;

    #[test]
    fn test_norm_below_threshold_leaves_grads_alone() {
        let mut params = vec![Tensor::from_vec(vec![1.0, 2.0], true)];
        params[0].set_grad(arr1(&[0.3, 0.4]));

        let norm = clip_grad_norm(&mut params, 1.0);

        assert_abs_diff_eq!(norm, 0.5, epsilon = 1e-6);
        assert_abs_diff_eq!(params[0].grad().unwrap()[0], 0.3, epsilon = 1e-6);
    }

    #[test]
    fn test_norm_above_threshold_rescales() {
        let mut params = vec![
            Tensor::from_vec(vec![1.0, 2.0], true),
            Tensor::from_vec(vec![3.0], true),
        ];
        params[0].set_grad(arr1(&[3.0, 4.0]));
        params[1].set_grad(arr1(&[0.0]));

        let norm = clip_grad_norm(&mut params, 1.0);

        assert_abs_diff_eq!(norm, 5.0, epsilon = 1e-6);
        assert_abs_diff_eq!(params[0].grad().unwrap()[0], 0.6, epsilon = 1e-6);
        assert_abs_diff_eq!(params[0].grad().unwrap()[1], 0.8, epsilon = 1e-6);
    }

    #[test]
    fn test_relative_magnitudes_preserved() {
        let mut params = vec![
            Tensor::from_vec(vec![1.0], true),
            Tensor::from_vec(vec![1.0], true),
        ];
        params[0].set_grad(arr1(&[10.0]));
        params[1].set_grad(arr1(&[5.0]));

        clip_grad_norm(&mut params, 1.0);

        let g0 = params[0].grad().unwrap()[0];
        let g1 = params[1].grad().unwrap()[0];
        assert_abs_diff_eq!(g0 / g1, 2.0, epsilon = 1e-4);
    }

    #[test]
    fn test_params_without_grads_contribute_zero() {
        let mut params = vec![Tensor::from_vec(vec![1.0], false)];
        let norm = clip_grad_norm(&mut params, 1.0);
        assert_abs_diff_eq!(norm, 0.0, epsilon = 1e-6);
    }
}
