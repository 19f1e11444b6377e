// src/ops/arithmetic/add.rs

use crate::error::GradFlowError;
use crate::graph::{Graph, NodeId};
use crate::mat::{Element, Matrix};
use crate::ops::Function;

/// Appends an element-wise addition operator over two equally-shaped nodes.
pub fn add<T: Element>(g: &mut Graph<T>, a: NodeId, b: NodeId) -> Result<NodeId, GradFlowError> {
    g.new_operator(Box::new(Add { operands: [a, b] }))
}

#[derive(Debug)]
pub(crate) struct Add {
    operands: [NodeId; 2],
}

impl<T: Element> Function<T> for Add {
    fn operands(&self) -> &[NodeId] {
        &self.operands
    }

    fn forward(&self, g: &Graph<T>) -> Result<Matrix<T>, GradFlowError> {
        let a = g.operand_value(self.operands[0])?;
        let b = g.operand_value(self.operands[1])?;
        a.add(&b)
    }

    fn backward(&self, g: &Graph<T>, gy: &Matrix<T>) -> Result<(), GradFlowError> {
        let [a, b] = self.operands;
        if g.requires_grad(a) {
            g.propagate_grad(a, gy)?;
        }
        if g.requires_grad(b) {
            g.propagate_grad(b, gy)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::testing::check_matrix_near;

    #[test]
    fn test_add_forward() {
        let mut g = Graph::new();
        let a = g.new_leaf(Matrix::vector(vec![1.0_f32, 2.0]), false);
        let b = g.new_leaf(Matrix::vector(vec![3.0_f32, 4.0]), false);
        let c = add(&mut g, a, b).unwrap();
        g.forward(false).unwrap();
        check_matrix_near(&g.value(c).unwrap(), (2, 1), &[4.0, 6.0], 1e-6);
    }

    #[test]
    fn test_add_backward() {
        let mut g = Graph::new();
        let a = g.new_leaf(Matrix::vector(vec![1.0_f32, 2.0]), true);
        let b = g.new_leaf(Matrix::vector(vec![3.0_f32, 4.0]), true);
        let c = add(&mut g, a, b).unwrap();
        g.forward(false).unwrap();
        g.backward(c, false).unwrap();
        check_matrix_near(&g.grad(a).unwrap(), (2, 1), &[1.0, 1.0], 1e-6);
        check_matrix_near(&g.grad(b).unwrap(), (2, 1), &[1.0, 1.0], 1e-6);
    }

    #[test]
    fn test_add_propagates_requires_grad() {
        let mut g = Graph::new();
        let a = g.new_leaf(Matrix::scalar(1.0_f32), false);
        let b = g.new_leaf(Matrix::scalar(2.0_f32), true);
        let c = g.new_leaf(Matrix::scalar(3.0_f32), false);

        let ab = add(&mut g, a, b).unwrap();
        assert!(g.requires_grad(ab));

        let ac = add(&mut g, a, c).unwrap();
        assert!(!g.requires_grad(ac));
    }

    #[test]
    fn test_add_forward_shape_mismatch() {
        let mut g = Graph::new();
        let a = g.new_leaf(Matrix::vector(vec![1.0_f32, 2.0]), false);
        let b = g.new_leaf(Matrix::vector(vec![1.0_f32, 2.0, 3.0]), false);
        add(&mut g, a, b).unwrap();
        match g.forward(false) {
            Err(GradFlowError::ShapeMismatch { operation, .. }) => assert_eq!(operation, "add"),
            other => panic!("expected ShapeMismatch, got {:?}", other),
        }
    }
}
