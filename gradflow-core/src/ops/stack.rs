// src/ops/stack.rs

use crate::error::GradFlowError;
use crate::graph::{Graph, NodeId};
use crate::mat::{Element, Matrix};
use crate::ops::Function;

/// Appends a stacking operator: each operand must be a vector of the same
/// length; operand `i` becomes row `i` of the output matrix.
pub fn stack<T: Element>(g: &mut Graph<T>, xs: &[NodeId]) -> Result<NodeId, GradFlowError> {
    g.new_operator(Box::new(Stack {
        operands: xs.to_vec(),
    }))
}

#[derive(Debug)]
pub(crate) struct Stack {
    operands: Vec<NodeId>,
}

impl<T: Element> Function<T> for Stack {
    fn operands(&self) -> &[NodeId] {
        &self.operands
    }

    fn forward(&self, g: &Graph<T>) -> Result<Matrix<T>, GradFlowError> {
        let mut width = 0;
        let mut data = Vec::new();
        for (i, &x) in self.operands.iter().enumerate() {
            let v = g.operand_value(x)?;
            if i == 0 {
                width = v.len();
                data.reserve(self.operands.len() * width);
            } else if v.len() != width {
                return Err(GradFlowError::ShapeMismatch {
                    expected: (width, 1),
                    actual: v.shape(),
                    operation: "stack".to_string(),
                });
            }
            data.extend_from_slice(v.data());
        }
        Matrix::new(self.operands.len(), width, data)
    }

    // Row i of the output gradient flows back to operand i, reshaped to the
    // operand's own shape.
    fn backward(&self, g: &Graph<T>, gy: &Matrix<T>) -> Result<(), GradFlowError> {
        if gy.rows() != self.operands.len() {
            return Err(GradFlowError::ShapeMismatch {
                expected: (self.operands.len(), gy.cols()),
                actual: gy.shape(),
                operation: "stack backward".to_string(),
            });
        }
        for (i, &x) in self.operands.iter().enumerate() {
            if !g.requires_grad(x) {
                continue;
            }
            let xv = g.operand_value(x)?;
            if xv.len() != gy.cols() {
                return Err(GradFlowError::ShapeMismatch {
                    expected: xv.shape(),
                    actual: (1, gy.cols()),
                    operation: "stack backward".to_string(),
                });
            }
            let gx = gy.row(i).reshape(xv.rows(), xv.cols())?;
            g.propagate_grad(x, &gx)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::testing::check_matrix_near;

    #[test]
    fn test_stack_forward() {
        let mut g = Graph::new();
        let a = g.new_leaf(Matrix::vector(vec![1.0_f32, 2.0, 3.0]), false);
        let b = g.new_leaf(Matrix::vector(vec![4.0_f32, 5.0, 6.0]), false);
        let s = stack(&mut g, &[a, b]).unwrap();
        g.forward(false).unwrap();
        check_matrix_near(
            &g.value(s).unwrap(),
            (2, 3),
            &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0],
            1e-6,
        );
    }

    #[test]
    fn test_stack_backward_splits_rows() {
        let mut g = Graph::new();
        let a = g.new_leaf(Matrix::vector(vec![1.0_f32, 2.0]), true);
        let b = g.new_leaf(Matrix::vector(vec![3.0_f32, 4.0]), true);
        let s = stack(&mut g, &[a, b]).unwrap();
        g.forward(false).unwrap();
        let seed = Matrix::new(2, 2, vec![0.1_f32, 0.2, 0.3, 0.4]).unwrap();
        g.backward_with(s, Some(seed), None, false).unwrap();
        check_matrix_near(&g.grad(a).unwrap(), (2, 1), &[0.1, 0.2], 1e-6);
        check_matrix_near(&g.grad(b).unwrap(), (2, 1), &[0.3, 0.4], 1e-6);
    }

    #[test]
    fn test_stack_rejects_uneven_vectors() {
        let mut g = Graph::new();
        let a = g.new_leaf(Matrix::vector(vec![1.0_f32, 2.0]), false);
        let b = g.new_leaf(Matrix::vector(vec![1.0_f32, 2.0, 3.0]), false);
        stack(&mut g, &[a, b]).unwrap();
        assert!(matches!(
            g.forward(false),
            Err(GradFlowError::ShapeMismatch { .. })
        ));
    }

    #[test]
    fn test_stack_skips_frozen_operand() {
        let mut g = Graph::new();
        let a = g.new_leaf(Matrix::vector(vec![1.0_f32]), true);
        let b = g.new_leaf(Matrix::vector(vec![2.0_f32]), false);
        let s = stack(&mut g, &[a, b]).unwrap();
        g.forward(false).unwrap();
        g.backward(s, false).unwrap();
        assert!(g.grad(a).is_some());
        assert_eq!(g.grad(b), None);
    }
}
