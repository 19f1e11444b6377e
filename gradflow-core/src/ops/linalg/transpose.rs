// src/ops/linalg/transpose.rs

use crate::error::GradFlowError;
use crate::graph::{Graph, NodeId};
use crate::mat::{Element, Matrix};
use crate::ops::Function;

/// Appends a transpose operator.
pub fn transpose<T: Element>(g: &mut Graph<T>, x: NodeId) -> Result<NodeId, GradFlowError> {
    g.new_operator(Box::new(Transpose { operands: [x] }))
}

#[derive(Debug)]
pub(crate) struct Transpose {
    operands: [NodeId; 1],
}

impl<T: Element> Function<T> for Transpose {
    fn operands(&self) -> &[NodeId] {
        &self.operands
    }

    fn forward(&self, g: &Graph<T>) -> Result<Matrix<T>, GradFlowError> {
        Ok(g.operand_value(self.operands[0])?.transpose())
    }

    fn backward(&self, g: &Graph<T>, gy: &Matrix<T>) -> Result<(), GradFlowError> {
        let x = self.operands[0];
        if g.requires_grad(x) {
            g.propagate_grad(x, &gy.transpose())?;
        }
        Ok(())
    }
}
