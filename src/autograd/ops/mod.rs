//! Autograd operations
//!
//! Each op computes its forward value eagerly and attaches a backward object
//! when any input requires gradients. Shaped ops take explicit row-major
//! dimensions instead of carrying shape on the tensor.

mod activations;
mod basic;
mod conv;
mod join;
mod lookup;
mod matmul;
mod normalize;
mod pool;
mod recurrent;
mod regularize;

pub use activations::{relu, sigmoid, tanh};
pub use basic::{add, add_bias, mul, scale, sum};
pub use conv::{conv1d, conv2d, conv2d_output_dims, Padding};
pub use join::concat;
pub use lookup::lookup;
pub use matmul::{matmul, matmul_compute, transpose};
pub use normalize::layer_norm_rows;
pub use pool::{max_pool1d, max_pool2d};
pub use recurrent::bilstm;
pub use regularize::dropout;
