//! Flat f32 tensor with shared gradient state

use crate::autograd::BackwardOp;
use ndarray::Array1;
use std::cell::{RefCell, RefMut};
use std::fmt;
use std::rc::Rc;

/// A flat `f32` tensor participating in the gradient tape.
///
/// Data, gradient, and producer op live behind shared `Rc<RefCell<…>>`
/// cells, so cloning a `Tensor` yields another handle onto the same storage.
/// Optimizers exploit this: a model hands out clones of its parameters, and
/// stepping the clones updates the model in place.
///
/// Shape is not stored; shaped ops take explicit dimensions and treat the
/// data as row-major.
#[derive(Clone)]
pub struct Tensor {
    data: Rc<RefCell<Array1<f32>>>,
    grad: Rc<RefCell<Option<Array1<f32>>>>,
    requires_grad: bool,
    backward_op: Rc<RefCell<Option<Rc<dyn BackwardOp>>>>,
}

impl Tensor {
    /// Create a tensor from an ndarray
    pub fn new(data: Array1<f32>, requires_grad: bool) -> Self {
        Self {
            data: Rc::new(RefCell::new(data)),
            grad: Rc::new(RefCell::new(None)),
            requires_grad,
            backward_op: Rc::new(RefCell::new(None)),
        }
    }

    /// Create a tensor from a plain vector
    pub fn from_vec(values: Vec<f32>, requires_grad: bool) -> Self {
        Self::new(Array1::from(values), requires_grad)
    }

    /// Zero-filled tensor of the given length
    pub fn zeros(len: usize, requires_grad: bool) -> Self {
        Self::new(Array1::zeros(len), requires_grad)
    }

    /// One-filled tensor of the given length
    pub fn ones(len: usize, requires_grad: bool) -> Self {
        Self::new(Array1::ones(len), requires_grad)
    }

    /// Snapshot of the tensor's data
    ///
    /// Returns an owned copy; in-place mutation goes through [`data_mut`].
    ///
    /// [`data_mut`]: Tensor::data_mut
    pub fn data(&self) -> Array1<f32> {
        self.data.borrow().clone()
    }

    /// Mutable access to the underlying storage
    pub fn data_mut(&self) -> RefMut<'_, Array1<f32>> {
        self.data.borrow_mut()
    }

    /// Number of elements
    pub fn len(&self) -> usize {
        self.data.borrow().len()
    }

    /// True when the tensor holds no elements
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether gradients are tracked for this tensor
    pub fn requires_grad(&self) -> bool {
        self.requires_grad
    }

    /// Current gradient, if one has been accumulated
    pub fn grad(&self) -> Option<Array1<f32>> {
        self.grad.borrow().clone()
    }

    /// Replace the gradient
    pub fn set_grad(&self, grad: Array1<f32>) {
        assert_eq!(grad.len(), self.len(), "gradient length mismatch");
        *self.grad.borrow_mut() = Some(grad);
    }

    /// Add into the gradient, initializing it on first use
    pub fn accumulate_grad(&self, grad: Array1<f32>) {
        assert_eq!(grad.len(), self.len(), "gradient length mismatch");
        let mut cell = self.grad.borrow_mut();
        match cell.as_mut() {
            Some(existing) => *existing += &grad,
            None => *cell = Some(grad),
        }
    }

    /// Clear the gradient
    pub fn zero_grad(&self) {
        *self.grad.borrow_mut() = None;
    }

    /// Shared handle onto the gradient cell (captured by backward ops)
    pub fn grad_cell(&self) -> Rc<RefCell<Option<Array1<f32>>>> {
        Rc::clone(&self.grad)
    }

    /// The op that produced this tensor, if any
    pub fn backward_op(&self) -> Option<Rc<dyn BackwardOp>> {
        self.backward_op.borrow().clone()
    }

    /// Attach the producer op
    pub fn set_backward_op(&mut self, op: Rc<dyn BackwardOp>) {
        *self.backward_op.borrow_mut() = Some(op);
    }
}

impl fmt::Debug for Tensor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Tensor")
            .field("len", &self.len())
            .field("requires_grad", &self.requires_grad)
            .field("has_grad", &self.grad.borrow().is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::arr1;

    #[test]
    fn test_from_vec_and_len() {
        let t = Tensor::from_vec(vec![1.0, 2.0, 3.0], false);
        assert_eq!(t.len(), 3);
        assert!(!t.is_empty());
        assert!(!t.requires_grad());
        assert_eq!(t.data().to_vec(), vec![1.0, 2.0, 3.0]);
    }

    #[test]
    fn test_zeros_and_ones() {
        let z = Tensor::zeros(4, true);
        let o = Tensor::ones(4, true);
        assert_eq!(z.data().sum(), 0.0);
        assert_eq!(o.data().sum(), 4.0);
        assert!(z.requires_grad());
    }

    #[test]
    fn test_clone_shares_data() {
        let a = Tensor::from_vec(vec![1.0, 2.0], true);
        let b = a.clone();
        b.data_mut()[0] = 9.0;
        assert_eq!(a.data()[0], 9.0);
    }

    #[test]
    fn test_clone_shares_grad() {
        let a = Tensor::from_vec(vec![1.0, 2.0], true);
        let b = a.clone();
        b.set_grad(arr1(&[0.5, 0.5]));
        assert_eq!(a.grad().unwrap().to_vec(), vec![0.5, 0.5]);
    }

    #[test]
    fn test_accumulate_grad_initializes_then_adds() {
        let t = Tensor::from_vec(vec![0.0, 0.0], true);
        assert!(t.grad().is_none());
        t.accumulate_grad(arr1(&[1.0, 2.0]));
        t.accumulate_grad(arr1(&[0.5, 0.5]));
        assert_eq!(t.grad().unwrap().to_vec(), vec![1.5, 2.5]);
    }

    #[test]
    fn test_zero_grad_clears() {
        let t = Tensor::from_vec(vec![1.0], true);
        t.set_grad(arr1(&[3.0]));
        t.zero_grad();
        assert!(t.grad().is_none());
    }

    #[test]
    #[should_panic(expected = "gradient length mismatch")]
    fn test_set_grad_length_mismatch_panics() {
        let t = Tensor::from_vec(vec![1.0, 2.0], true);
        t.set_grad(arr1(&[1.0]));
    }

    #[test]
    fn test_data_snapshot_is_detached() {
        let t = Tensor::from_vec(vec![1.0, 2.0], false);
        let mut snap = t.data();
        snap[0] = 7.0;
        assert_eq!(t.data()[0], 1.0);
    }
}
