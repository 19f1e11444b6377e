//! GradFlow core: a computation-graph engine with reverse-mode automatic
//! differentiation.
//!
//! Client code appends leaf nodes and operator nodes to a [`Graph`], runs a
//! forward pass (serial, or parallel across height groups), and propagates
//! gradients backward from a target node, optionally truncated at a
//! time-step boundary for BPTT over unrolled recurrent structures.

pub mod error;
pub mod graph;
pub mod mat;
pub mod ops;
pub mod utils;

pub use error::GradFlowError;
pub use graph::{Graph, NodeId};
pub use mat::{Element, Matrix};
pub use ops::Function;

// Re-export traits required by public signatures
pub use num_traits;
