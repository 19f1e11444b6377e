use thiserror::Error;

/// Custom error type for the GradFlow engine.
#[derive(Error, Debug, PartialEq, Clone)] // PartialEq for easier testing
pub enum GradFlowError {
    /// An operator was constructed with an operand id that does not exist in
    /// the owning graph. Operators may only reference already-built nodes.
    #[error("invalid operand: node {id} does not exist in this graph ({num_nodes} nodes)")]
    InvalidOperand { id: usize, num_nodes: usize },

    #[error("shape mismatch: expected {expected:?}, got {actual:?} during operation {operation}")]
    ShapeMismatch {
        expected: (usize, usize),
        actual: (usize, usize),
        operation: String,
    },

    /// Backward (or a Function reading an operand) found no cached value on a
    /// node: the forward pass was not run, or did not cover this node.
    #[error("node {id} has no cached value: forward did not run before backward")]
    NotForwarded { id: usize },

    #[error("matrix creation error: data length {len} does not match shape ({rows}, {cols})")]
    InvalidData {
        len: usize,
        rows: usize,
        cols: usize,
    },
}
