// src/ops/reduction/sum.rs

use crate::error::GradFlowError;
use crate::graph::{Graph, NodeId};
use crate::mat::{create, Element, Matrix};
use crate::ops::Function;

/// Appends a full-reduction operator: the sum of all elements, as a 1 x 1
/// matrix. The usual way to scalarize a loss before backward.
pub fn sum<T: Element>(g: &mut Graph<T>, x: NodeId) -> Result<NodeId, GradFlowError> {
    g.new_operator(Box::new(Sum { operands: [x] }))
}

#[derive(Debug)]
pub(crate) struct Sum {
    operands: [NodeId; 1],
}

impl<T: Element> Function<T> for Sum {
    fn operands(&self) -> &[NodeId] {
        &self.operands
    }

    fn forward(&self, g: &Graph<T>) -> Result<Matrix<T>, GradFlowError> {
        Ok(Matrix::scalar(g.operand_value(self.operands[0])?.sum()))
    }

    // The scalar output gradient is broadcast to the operand's shape.
    fn backward(&self, g: &Graph<T>, gy: &Matrix<T>) -> Result<(), GradFlowError> {
        let x = self.operands[0];
        if g.requires_grad(x) {
            let gy0 = gy.to_scalar().ok_or_else(|| GradFlowError::ShapeMismatch {
                expected: (1, 1),
                actual: gy.shape(),
                operation: "sum backward".to_string(),
            })?;
            let xv = g.operand_value(x)?;
            g.propagate_grad(x, &create::full(xv.rows(), xv.cols(), gy0))?;
        }
        Ok(())
    }
}
