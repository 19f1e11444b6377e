// src/ops/arithmetic/sub.rs

use crate::error::GradFlowError;
use crate::graph::{Graph, NodeId};
use crate::mat::{Element, Matrix};
use crate::ops::Function;

/// Appends an element-wise subtraction operator (`a - b`).
pub fn sub<T: Element>(g: &mut Graph<T>, a: NodeId, b: NodeId) -> Result<NodeId, GradFlowError> {
    g.new_operator(Box::new(Sub { operands: [a, b] }))
}

#[derive(Debug)]
pub(crate) struct Sub {
    operands: [NodeId; 2],
}

impl<T: Element> Function<T> for Sub {
    fn operands(&self) -> &[NodeId] {
        &self.operands
    }

    fn forward(&self, g: &Graph<T>) -> Result<Matrix<T>, GradFlowError> {
        let a = g.operand_value(self.operands[0])?;
        let b = g.operand_value(self.operands[1])?;
        a.sub(&b)
    }

    fn backward(&self, g: &Graph<T>, gy: &Matrix<T>) -> Result<(), GradFlowError> {
        let [a, b] = self.operands;
        if g.requires_grad(a) {
            g.propagate_grad(a, gy)?;
        }
        if g.requires_grad(b) {
            g.propagate_grad(b, &gy.scale(-T::one()))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::testing::check_matrix_near;

    #[test]
    fn test_sub_forward_backward() {
        let mut g = Graph::new();
        let a = g.new_leaf(Matrix::vector(vec![5.0_f32, 2.0]), true);
        let b = g.new_leaf(Matrix::vector(vec![3.0_f32, 4.0]), true);
        let c = sub(&mut g, a, b).unwrap();
        g.forward(false).unwrap();
        check_matrix_near(&g.value(c).unwrap(), (2, 1), &[2.0, -2.0], 1e-6);

        g.backward(c, false).unwrap();
        check_matrix_near(&g.grad(a).unwrap(), (2, 1), &[1.0, 1.0], 1e-6);
        check_matrix_near(&g.grad(b).unwrap(), (2, 1), &[-1.0, -1.0], 1e-6);
    }
}
