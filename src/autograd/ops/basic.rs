//! Elementwise autograd operations: add, mul, scale, sum, add_bias

use crate::autograd::{BackwardOp, Tensor};
use ndarray::Array1;
use std::cell::RefCell;
use std::rc::Rc;

/// Elementwise addition
pub fn add(a: &Tensor, b: &Tensor) -> Tensor {
    assert_eq!(a.len(), b.len(), "add: length mismatch");
    let data = a.data() + &b.data();

    let requires_grad = a.requires_grad() || b.requires_grad();
    let mut result = Tensor::new(data, requires_grad);

    if requires_grad {
        let backward_op = Rc::new(AddBackward {
            a: a.clone(),
            b: b.clone(),
            result_grad: result.grad_cell(),
        });
        result.set_backward_op(backward_op);
    }

    result
}

struct AddBackward {
    a: Tensor,
    b: Tensor,
    result_grad: Rc<RefCell<Option<Array1<f32>>>>,
}

impl BackwardOp for AddBackward {
    fn backward(&self) {
        if let Some(grad) = self.result_grad.borrow().as_ref() {
            if self.a.requires_grad() {
                self.a.accumulate_grad(grad.clone());
            }
            if self.b.requires_grad() {
                self.b.accumulate_grad(grad.clone());
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

/// Elementwise multiplication
pub fn mul(a: &Tensor, b: &Tensor) -> Tensor {
    assert_eq!(a.len(), b.len(), "mul: length mismatch");
    let data = a.data() * &b.data();

    let requires_grad = a.requires_grad() || b.requires_grad();
    let mut result = Tensor::new(data, requires_grad);

    if requires_grad {
        let backward_op = Rc::new(MulBackward {
            a: a.clone(),
            b: b.clone(),
            result_grad: result.grad_cell(),
        });
        result.set_backward_op(backward_op);
    }

    result
}

struct MulBackward {
    a: Tensor,
    b: Tensor,
    result_grad: Rc<RefCell<Option<Array1<f32>>>>,
}

impl BackwardOp for MulBackward {
    fn backward(&self) {
        if let Some(grad) = self.result_grad.borrow().as_ref() {
            if self.a.requires_grad() {
                self.a.accumulate_grad(grad * &self.b.data());
            }
            if self.b.requires_grad() {
                self.b.accumulate_grad(grad * &self.a.data());
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

/// Multiply by a scalar constant
pub fn scale(a: &Tensor, factor: f32) -> Tensor {
    let data = a.data() * factor;

    let requires_grad = a.requires_grad();
    let mut result = Tensor::new(data, requires_grad);

    if requires_grad {
        let backward_op = Rc::new(ScaleBackward {
            a: a.clone(),
            factor,
            result_grad: result.grad_cell(),
        });
        result.set_backward_op(backward_op);
    }

    result
}

struct ScaleBackward {
    a: Tensor,
    factor: f32,
    result_grad: Rc<RefCell<Option<Array1<f32>>>>,
}

impl BackwardOp for ScaleBackward {
    fn backward(&self) {
        if let Some(grad) = self.result_grad.borrow().as_ref() {
            if self.a.requires_grad() {
                self.a.accumulate_grad(grad * self.factor);
            }
            if let Some(op) = self.a.backward_op() {
                op.backward();
            }
        }
    }
}

/// Sum all elements into a length-1 tensor
pub fn sum(a: &Tensor) -> Tensor {
    let total = a.data().sum();

    let requires_grad = a.requires_grad();
    let mut result = Tensor::from_vec(vec![total], requires_grad);

    if requires_grad {
        let backward_op = Rc::new(SumBackward {
            a: a.clone(),
            result_grad: result.grad_cell(),
        });
        result.set_backward_op(backward_op);
    }

    result
}

struct SumBackward {
    a: Tensor,
    result_grad: Rc<RefCell<Option<Array1<f32>>>>,
}

impl BackwardOp for SumBackward {
    fn backward(&self) {
        if let Some(grad) = self.result_grad.borrow().as_ref() {
            if self.a.requires_grad() {
                let g = grad[0];
                self.a.accumulate_grad(Array1::from_elem(self.a.len(), g));
            }
            if let Some(op) = self.a.backward_op() {
                op.backward();
            }
        }
    }
}

/// Add a bias row-wise
///
/// `x` is (rows × cols) flattened, `b` has length `cols`; the bias is added
/// to every row. Gradient of the bias is the column sum of the output
/// gradient.
pub fn add_bias(x: &Tensor, b: &Tensor, rows: usize, cols: usize) -> Tensor {
    assert_eq!(x.len(), rows * cols, "add_bias: input size mismatch");
    assert_eq!(b.len(), cols, "add_bias: bias size mismatch");

    let mut data = x.data();
    let bias = b.data();
    for r in 0..rows {
        for c in 0..cols {
            data[r * cols + c] += bias[c];
        }
    }

    let requires_grad = x.requires_grad() || b.requires_grad();
    let mut result = Tensor::new(data, requires_grad);

    if requires_grad {
        let backward_op = Rc::new(AddBiasBackward {
            x: x.clone(),
            b: b.clone(),
            rows,
            cols,
            result_grad: result.grad_cell(),
        });
        result.set_backward_op(backward_op);
    }

    result
}

struct AddBiasBackward {
    x: Tensor,
    b: Tensor,
    rows: usize,
    cols: usize,
    result_grad: Rc<RefCell<Option<Array1<f32>>>>,
}

impl BackwardOp for AddBiasBackward {
    fn backward(&self) {
        if let Some(grad) = self.result_grad.borrow().as_ref() {
            if self.x.requires_grad() {
                self.x.accumulate_grad(grad.clone());
            }
            if self.b.requires_grad() {
                let mut grad_b = Array1::zeros(self.cols);
                for r in 0..self.rows {
                    for c in 0..self.cols {
                        grad_b[c] += grad[r * self.cols + c];
                    }
                }
                self.b.accumulate_grad(grad_b);
            }

            if let Some(op) = self.x.backward_op() {
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
    use approx::assert_relative_eq;
    use ndarray::arr1;

    #[test]
    fn test_add_forward() {
        let a = Tensor::from_vec(vec![1.0, 2.0], false);
        let b = Tensor::from_vec(vec![3.0, 4.0], false);
        let c = add(&a, &b);
        assert_eq!(c.data().to_vec(), vec![4.0, 6.0]);
        assert!(!c.requires_grad());
    }

    #[test]
    fn test_add_backward_distributes_grad() {
        let a = Tensor::from_vec(vec![1.0, 2.0], true);
        let b = Tensor::from_vec(vec![3.0, 4.0], true);
        let c = add(&a, &b);

        c.set_grad(arr1(&[1.0, 0.5]));
        c.backward_op().unwrap().backward();

        assert_eq!(a.grad().unwrap().to_vec(), vec![1.0, 0.5]);
        assert_eq!(b.grad().unwrap().to_vec(), vec![1.0, 0.5]);
    }

    #[test]
    fn test_mul_backward_cross_terms() {
        let a = Tensor::from_vec(vec![2.0, 3.0], true);
        let b = Tensor::from_vec(vec![5.0, 7.0], true);
        let c = mul(&a, &b);

        c.set_grad(arr1(&[1.0, 1.0]));
        c.backward_op().unwrap().backward();

        assert_eq!(a.grad().unwrap().to_vec(), vec![5.0, 7.0]);
        assert_eq!(b.grad().unwrap().to_vec(), vec![2.0, 3.0]);
    }

    #[test]
    fn test_scale_forward_backward() {
        let a = Tensor::from_vec(vec![1.0, -2.0], true);
        let c = scale(&a, 3.0);
        assert_eq!(c.data().to_vec(), vec![3.0, -6.0]);

        c.set_grad(arr1(&[1.0, 1.0]));
        c.backward_op().unwrap().backward();
        assert_eq!(a.grad().unwrap().to_vec(), vec![3.0, 3.0]);
    }

    #[test]
    fn test_sum_forward_backward() {
        let a = Tensor::from_vec(vec![1.0, 2.0, 3.0], true);
        let s = sum(&a);
        assert_relative_eq!(s.data()[0], 6.0, epsilon = 1e-6);

        s.set_grad(arr1(&[2.0]));
        s.backward_op().unwrap().backward();
        assert_eq!(a.grad().unwrap().to_vec(), vec![2.0, 2.0, 2.0]);
    }

    #[test]
    fn test_add_bias_broadcasts_rows() {
        // x: 2x3, b: 3
        let x = Tensor::from_vec(vec![0.0, 0.0, 0.0, 1.0, 1.0, 1.0], true);
        let b = Tensor::from_vec(vec![0.1, 0.2, 0.3], true);
        let y = add_bias(&x, &b, 2, 3);
        let d = y.data();
        assert_relative_eq!(d[0], 0.1, epsilon = 1e-6);
        assert_relative_eq!(d[4], 1.2, epsilon = 1e-6);
    }

    #[test]
    fn test_add_bias_backward_column_sums() {
        let x = Tensor::from_vec(vec![0.0; 6], true);
        let b = Tensor::from_vec(vec![0.0; 3], true);
        let y = add_bias(&x, &b, 2, 3);

        y.set_grad(arr1(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]));
        y.backward_op().unwrap().backward();

        assert_eq!(b.grad().unwrap().to_vec(), vec![5.0, 7.0, 9.0]);
        assert_eq!(x.grad().unwrap().to_vec(), vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
    }

    #[test]
    #[should_panic(expected = "add: length mismatch")]
    fn test_add_length_mismatch_panics() {
        let a = Tensor::from_vec(vec![1.0], false);
        let b = Tensor::from_vec(vec![1.0, 2.0], false);
        let _ = add(&a, &b);
    }
}
