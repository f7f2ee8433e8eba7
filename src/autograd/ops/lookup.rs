//! Embedding table row lookup

use crate::autograd::{BackwardOp, Tensor};
use ndarray::Array1;
use std::cell::RefCell;
use std::rc::Rc;

/// Gathers rows of a (rows × row_len) flattened table by id
///
/// The output is (ids.len() × row_len) flattened. Ids at or beyond `rows`
/// select a zero row and receive no gradient.
pub fn lookup(table: &Tensor, ids: &[u32], rows: usize, row_len: usize) -> Tensor {
    assert_eq!(table.len(), rows * row_len, "lookup: table size mismatch");

    let t = table.data();
    let ts = t.as_slice().expect("contiguous");

    let mut out = Array1::zeros(ids.len() * row_len);
    for (pos, &id) in ids.iter().enumerate() {
        let id = id as usize;
        if id < rows {
            out.as_slice_mut().expect("contiguous")[pos * row_len..(pos + 1) * row_len]
                .copy_from_slice(&ts[id * row_len..(id + 1) * row_len]);
        }
    }

    let requires_grad = table.requires_grad();
    let mut result = Tensor::new(out, requires_grad);

    if requires_grad {
        let backward_op = Rc::new(LookupBackward {
            table: table.clone(),
            ids: ids.to_vec(),
            rows,
            row_len,
            result_grad: result.grad_cell(),
        });
        result.set_backward_op(backward_op);
    }

    result
}

struct LookupBackward {
    table: Tensor,
    ids: Vec<u32>,
    rows: usize,
    row_len: usize,
    result_grad: Rc<RefCell<Option<Array1<f32>>>>,
}

impl BackwardOp for LookupBackward {
    fn backward(&self) {
        if let Some(grad_output) = self.result_grad.borrow().as_ref() {
            if self.table.requires_grad() {
                let gos = grad_output.as_slice().expect("contiguous");
                let mut grad_table = Array1::zeros(self.table.len());
                for (pos, &id) in self.ids.iter().enumerate() {
                    let id = id as usize;
                    if id < self.rows {
                        for c in 0..self.row_len {
                            grad_table[id * self.row_len + c] += gos[pos * self.row_len + c];
                        }
                    }
                }
                self.table.accumulate_grad(grad_table);
            }

            if let Some(op) = self.table.backward_op() {
                op.backward();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array1;

    #[test]
    fn test_lookup_gathers_rows() {
        // 3 rows of width 2
        let table = Tensor::from_vec(vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0], false);
        let out = lookup(&table, &[2, 0, 2], 3, 2);

        assert_eq!(out.data().to_vec(), vec![5.0, 6.0, 1.0, 2.0, 5.0, 6.0]);
    }

    #[test]
    fn test_lookup_out_of_range_id_yields_zero_row() {
        let table = Tensor::from_vec(vec![1.0, 2.0, 3.0, 4.0], false);
        let out = lookup(&table, &[1, 9], 2, 2);

        assert_eq!(out.data().to_vec(), vec![3.0, 4.0, 0.0, 0.0]);
    }

    #[test]
    fn test_backward_scatter_adds_repeated_ids() {
        let table = Tensor::from_vec(vec![1.0, 2.0, 3.0, 4.0], true);
        let out = lookup(&table, &[0, 1, 0], 2, 2);

        out.set_grad(Array1::from(vec![1.0, 1.0, 0.5, 0.5, 2.0, 2.0]));
        out.backward_op().unwrap().backward();

        // row 0 was selected twice
        assert_eq!(table.grad().unwrap().to_vec(), vec![3.0, 3.0, 0.5, 0.5]);
    }

    #[test]
    fn test_backward_ignores_out_of_range_positions() {
        let table = Tensor::from_vec(vec![1.0, 2.0], true);
        let out = lookup(&table, &[5, 0], 1, 2);

        out.set_grad(Array1::from(vec![9.0, 9.0, 1.0, 1.0]));
        out.backward_op().unwrap().backward();

        assert_eq!(table.grad().unwrap().to_vec(), vec![1.0, 1.0]);
    }
}
