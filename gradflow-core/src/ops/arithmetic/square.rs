// src/ops/arithmetic/square.rs

use crate::error::GradFlowError;
use crate::graph::{Graph, NodeId};
use crate::mat::{Element, Matrix};
use crate::ops::Function;

/// Appends an element-wise square operator.
pub fn square<T: Element>(g: &mut Graph<T>, x: NodeId) -> Result<NodeId, GradFlowError> {
    g.new_operator(Box::new(Square { operands: [x] }))
}

#[derive(Debug)]
pub(crate) struct Square {
    operands: [NodeId; 1],
}

impl<T: Element> Function<T> for Square {
    fn operands(&self) -> &[NodeId] {
        &self.operands
    }

    fn forward(&self, g: &Graph<T>) -> Result<Matrix<T>, GradFlowError> {
        let x = g.operand_value(self.operands[0])?;
        x.mul(&x)
    }

    // d(x^2)/dx = 2x
    fn backward(&self, g: &Graph<T>, gy: &Matrix<T>) -> Result<(), GradFlowError> {
        let x = self.operands[0];
        if g.requires_grad(x) {
            let xv = g.operand_value(x)?;
            let two = T::one() + T::one();
            g.propagate_grad(x, &gy.mul(&xv)?.scale(two))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::grad_check::check_grad;
    use crate::utils::testing::check_matrix_near;

    #[test]
    fn test_square_forward_backward() {
        let mut g = Graph::new();
        let x = g.new_leaf(Matrix::vector(vec![3.0_f32, -2.0]), true);
        let y = square(&mut g, x).unwrap();
        g.forward(false).unwrap();
        check_matrix_near(&g.value(y).unwrap(), (2, 1), &[9.0, 4.0], 1e-6);

        g.backward(y, false).unwrap();
        check_matrix_near(&g.grad(x).unwrap(), (2, 1), &[6.0, -4.0], 1e-6);
    }

    #[test]
    fn test_square_grad_check() {
        let inputs = [Matrix::vector(vec![0.8_f64, -1.1, 2.3])];
        check_grad(|g, ids| square(g, ids[0]), &inputs, 1e-5, 1e-4).unwrap();
    }
}
