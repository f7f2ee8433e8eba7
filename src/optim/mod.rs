//! Optimization
//!
//! The trainer drives models through the [`Optimizer`] trait; [`RmsProp`]
//! is the only implementation the experiments use. Gradient clipping lives
//! in [`clip_grad_norm`].

mod clip;
mod optimizer;
mod rmsprop;

pub use clip::clip_grad_norm;
pub use optimizer::Optimizer;
pub use rmsprop::RmsProp;
