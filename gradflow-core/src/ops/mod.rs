// src/ops/mod.rs

use crate::error::GradFlowError;
use crate::graph::{Graph, NodeId};
use crate::mat::{Element, Matrix};
use std::fmt::Debug;

pub mod activation;
pub mod arithmetic;
pub mod linalg;
pub mod reduction;
pub mod stack;

// Re-export the op constructor functions for flat access (ops::add, ...)
pub use activation::{relu, sigmoid, tanh};
pub use arithmetic::{add, mul, square, sub};
pub use linalg::{matmul, transpose};
pub use reduction::sum;
pub use stack::stack;

/// The per-operator unit of computation.
///
/// A `Function` owns the ids of its operand nodes and defines the operator's
/// local forward and backward math. `forward` reads the operands' cached
/// values through the graph and returns the fresh output matrix (the handler
/// caches it on the operator's node). `backward` receives the node's
/// accumulated output gradient `gy`, computes each operand's local
/// contribution, and hands it to [`Graph::propagate_grad`], skipping
/// operands that do not require gradients.
///
/// Implementations must not mutate shared state other than their operands'
/// gradient accumulators: within a height group the engine runs sibling
/// functions in parallel and relies on that discipline.
pub trait Function<T: Element>: Debug + Send + Sync {
    /// The operand node ids, in the order the operator consumes them.
    fn operands(&self) -> &[NodeId];

    /// Computes the operator's output from its operands' cached values.
    fn forward(&self, g: &Graph<T>) -> Result<Matrix<T>, GradFlowError>;

    /// Distributes `gy` to the operands' gradient accumulators.
    fn backward(&self, g: &Graph<T>, gy: &Matrix<T>) -> Result<(), GradFlowError>;
}
