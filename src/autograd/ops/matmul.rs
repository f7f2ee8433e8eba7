//! Matrix multiplication autograd operations

use crate::autograd::{BackwardOp, Tensor};
use ndarray::Array1;
use std::cell::RefCell;
use std::rc::Rc;

/// Transpose a row-major matrix (rows × cols) to (cols × rows)
#[inline]
pub fn transpose(data: &[f32], rows: usize, cols: usize) -> Vec<f32> {
    let mut transposed = vec![0.0f32; rows * cols];
    for r in 0..rows {
        for c in 0..cols {
            transposed[c * rows + r] = data[r * cols + c];
        }
    }
    transposed
}

/// Compute C = A @ B on plain slices
///
/// Row-major, A is m×k, B is k×n, result is m×n. The loop order keeps the
/// innermost walk contiguous in both B and C.
pub fn matmul_compute(a: &[f32], b: &[f32], m: usize, k: usize, n: usize) -> Vec<f32> {
    let mut c = vec![0.0f32; m * n];
    for i in 0..m {
        for p in 0..k {
            let a_ip = a[i * k + p];
            if a_ip == 0.0 {
                continue;
            }
            let b_row = &b[p * n..(p + 1) * n];
            let c_row = &mut c[i * n..(i + 1) * n];
            for (cv, bv) in c_row.iter_mut().zip(b_row.iter()) {
                *cv += a_ip * bv;
            }
        }
    }
    c
}

/// Matrix multiplication
///
/// Computes C = A @ B where A is m×k, B is k×n, and C is m×n, all stored
/// flattened row-major.
pub fn matmul(a: &Tensor, b: &Tensor, m: usize, k: usize, n: usize) -> Tensor {
    assert_eq!(a.len(), m * k, "matmul: matrix A size mismatch");
    assert_eq!(b.len(), k * n, "matmul: matrix B size mismatch");

    let a_data = a.data();
    let b_data = b.data();
    let result_data = matmul_compute(
        a_data.as_slice().expect("matrix A must be contiguous"),
        b_data.as_slice().expect("matrix B must be contiguous"),
        m,
        k,
        n,
    );

    let requires_grad = a.requires_grad() || b.requires_grad();
    let mut result = Tensor::new(Array1::from(result_data), requires_grad);

    if requires_grad {
        let backward_op = Rc::new(MatmulBackward {
            a: a.clone(),
            b: b.clone(),
            m,
            k,
            n,
            result_grad: result.grad_cell(),
        });
        result.set_backward_op(backward_op);
    }

    result
}

struct MatmulBackward {
    a: Tensor,
    b: Tensor,
    m: usize,
    k: usize,
    n: usize,
    result_grad: Rc<RefCell<Option<Array1<f32>>>>,
}

impl BackwardOp for MatmulBackward {
    fn backward(&self) {
        if let Some(grad_output) = self.result_grad.borrow().as_ref() {
            // ∂L/∂A = ∂L/∂C @ Bᵀ   (m×n)(n×k)
            // ∂L/∂B = Aᵀ @ ∂L/∂C   (k×m)(m×n)
            let grad_c = grad_output.as_slice().expect("gradient must be contiguous");
            let a_data = self.a.data();
            let b_data = self.b.data();

            if self.a.requires_grad() {
                let b_t = transpose(b_data.as_slice().expect("contiguous"), self.k, self.n);
                let grad_a = matmul_compute(grad_c, &b_t, self.m, self.n, self.k);
                self.a.accumulate_grad(Array1::from(grad_a));
            }

            if self.b.requires_grad() {
                let a_t = transpose(a_data.as_slice().expect("contiguous"), self.m, self.k);
                let grad_b = matmul_compute(&a_t, grad_c, self.k, self.m, self.n);
                self.b.accumulate_grad(Array1::from(grad_b));
            }

            if let Some(op) = self.a.backward_op() {
                op.backward();
            }
            if let Some(op) = self.b.backward_op() {
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
    fn test_transpose_2x3() {
        let data = vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0];
        assert_eq!(transpose(&data, 2, 3), vec![1.0, 4.0, 2.0, 5.0, 3.0, 6.0]);
    }

    #[test]
    fn test_transpose_round_trip() {
        let data = vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0];
        let t = transpose(&data, 2, 3);
        assert_eq!(transpose(&t, 3, 2), data);
    }

    #[test]
    fn test_matmul_compute_known_result() {
        // [[1,2,3],[4,5,6]] @ [[7,8],[9,10],[11,12]]
        let a = vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0];
        let b = vec![7.0, 8.0, 9.0, 10.0, 11.0, 12.0];
        assert_eq!(matmul_compute(&a, &b, 2, 3, 2), vec![58.0, 64.0, 139.0, 154.0]);
    }

    #[test]
    fn test_matmul_backward_accumulates_both() {
        let a = Tensor::from_vec(vec![1.0, 2.0, 3.0, 4.0], true);
        let b = Tensor::from_vec(vec![5.0, 6.0, 7.0, 8.0], true);
        let c = matmul(&a, &b, 2, 2, 2);

        c.set_grad(Array1::from(vec![1.0, 1.0, 1.0, 1.0]));
        c.backward_op().unwrap().backward();

        // grad_A = 1 @ Bᵀ: rows are [5+6, 7+8]
        assert_eq!(a.grad().unwrap().to_vec(), vec![11.0, 15.0, 11.0, 15.0]);
        // grad_B = Aᵀ @ 1: rows are [1+3, 2+4]
        assert_eq!(b.grad().unwrap().to_vec(), vec![4.0, 4.0, 6.0, 6.0]);
    }

    #[test]
    fn test_matmul_grad_skips_frozen_input() {
        let a = Tensor::from_vec(vec![1.0, 2.0, 3.0, 4.0], true);
        let b = Tensor::from_vec(vec![5.0, 6.0, 7.0, 8.0], false);
        let c = matmul(&a, &b, 2, 2, 2);

        c.set_grad(Array1::from(vec![1.0, 1.0, 1.0, 1.0]));
        c.backward_op().unwrap().backward();

        assert!(a.grad().is_some());
        assert!(b.grad().is_none());
    }

    #[test]
    #[should_panic(expected = "matmul: matrix A size mismatch")]
    fn test_matmul_size_mismatch_panics() {
        let a = Tensor::from_vec(vec![1.0, 2.0, 3.0], false);
        let b = Tensor::from_vec(vec![1.0; 4], false);
        let _ = matmul(&a, &b, 2, 2, 2);
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        #[test]
        fn prop_matmul_output_shape(m in 1..=8usize, k in 1..=8usize, n in 1..=8usize) {
            let c = matmul_compute(&vec![1.0; m * k], &vec![1.0; k * n], m, k, n);
            prop_assert_eq!(c.len(), m * n);
        }

        #[test]
        fn prop_matmul_identity(m in 1..=6usize, k in 1..=6usize, seed in 0..500u32) {
            let a: Vec<f32> = (0..m * k).map(|i| ((i as f32 + seed as f32) * 0.37).sin()).collect();
            let mut identity = vec![0.0; k * k];
            for i in 0..k {
                identity[i * k + i] = 1.0;
            }
            let c = matmul_compute(&a, &identity, m, k, k);
            for (got, exp) in c.iter().zip(a.iter()) {
                prop_assert!((got - exp).abs() < 1e-4);
            }
        }
    }
}
