//! Backward-op trait for the gradient tape

/// A node on the gradient tape.
///
/// Each op that produces a tensor with `requires_grad` attaches one of these
/// to the result. `backward` reads the result's gradient cell, accumulates
/// gradients into the op's inputs, and recurses into the inputs' own
/// backward ops. Recursion terminates at leaf tensors (parameters, inputs),
/// which have no producer.
///
/// The tape handles tree-shaped graphs: every non-leaf tensor must be
/// consumed by exactly one downstream op, otherwise its subgraph is walked
/// more than once and gradients double-count. Leaf tensors may fan out
/// freely. Ops whose internals fan out (the bidirectional LSTM, for one)
/// implement the full gradient by hand inside a single backward object.
pub trait BackwardOp {
    /// Propagate gradients from the result to the op's inputs
    fn backward(&self);
}
