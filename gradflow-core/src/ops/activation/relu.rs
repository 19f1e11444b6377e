// src/ops/activation/relu.rs

use crate::error::GradFlowError;
use crate::graph::{Graph, NodeId};
use crate::mat::{Element, Matrix};
use crate::ops::Function;

/// Appends a rectified-linear operator: `max(0, x)` element-wise.
pub fn relu<T: Element>(g: &mut Graph<T>, x: NodeId) -> Result<NodeId, GradFlowError> {
    g.new_operator(Box::new(ReLU { operands: [x] }))
}

#[derive(Debug)]
pub(crate) struct ReLU {
    operands: [NodeId; 1],
}

impl<T: Element> Function<T> for ReLU {
    fn operands(&self) -> &[NodeId] {
        &self.operands
    }

    fn forward(&self, g: &Graph<T>) -> Result<Matrix<T>, GradFlowError> {
        let x = g.operand_value(self.operands[0])?;
        Ok(x.map(|v| v.max(T::zero())))
    }

    fn backward(&self, g: &Graph<T>, gy: &Matrix<T>) -> Result<(), GradFlowError> {
        let x = self.operands[0];
        if g.requires_grad(x) {
            let xv = g.operand_value(x)?;
            let mask = xv.map(|v| if v > T::zero() { T::one() } else { T::zero() });
            g.propagate_grad(x, &gy.mul(&mask)?)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::testing::check_matrix_near;

    #[test]
    fn test_relu_forward_backward() {
        let mut g = Graph::new();
        let x = g.new_leaf(Matrix::vector(vec![-1.0_f32, 0.0, 2.0]), true);
        let y = relu(&mut g, x).unwrap();
        g.forward(false).unwrap();
        check_matrix_near(&g.value(y).unwrap(), (3, 1), &[0.0, 0.0, 2.0], 1e-6);

        g.backward(y, false).unwrap();
        check_matrix_near(&g.grad(x).unwrap(), (3, 1), &[0.0, 0.0, 1.0], 1e-6);
    }
}
