// src/ops/linalg/matmul.rs

use crate::error::GradFlowError;
use crate::graph::{Graph, NodeId};
use crate::mat::{Element, Matrix};
use crate::ops::Function;

/// Appends a matrix-product operator (`a` is m x k, `b` is k x n).
pub fn matmul<T: Element>(g: &mut Graph<T>, a: NodeId, b: NodeId) -> Result<NodeId, GradFlowError> {
    g.new_operator(Box::new(MatMul { operands: [a, b] }))
}

#[derive(Debug)]
pub(crate) struct MatMul {
    operands: [NodeId; 2],
}

impl<T: Element> Function<T> for MatMul {
    fn operands(&self) -> &[NodeId] {
        &self.operands
    }

    fn forward(&self, g: &Graph<T>) -> Result<Matrix<T>, GradFlowError> {
        let a = g.operand_value(self.operands[0])?;
        let b = g.operand_value(self.operands[1])?;
        a.matmul(&b)
    }

    // dL/da = gy . b^T, dL/db = a^T . gy
    fn backward(&self, g: &Graph<T>, gy: &Matrix<T>) -> Result<(), GradFlowError> {
        let [a, b] = self.operands;
        if g.requires_grad(a) {
            let bv = g.operand_value(b)?;
            g.propagate_grad(a, &gy.matmul(&bv.transpose())?)?;
        }
        if g.requires_grad(b) {
            let av = g.operand_value(a)?;
            g.propagate_grad(b, &av.transpose().matmul(gy)?)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::grad_check::check_grad;
    use crate::ops;
    use crate::utils::testing::check_matrix_near;

    #[test]
    fn test_matmul_forward() {
        let mut g = Graph::new();
        let a = g.new_leaf(
            Matrix::new(2, 3, vec![1.0_f32, 2.0, 3.0, 4.0, 5.0, 6.0]).unwrap(),
            false,
        );
        let b = g.new_leaf(Matrix::vector(vec![1.0_f32, 0.0, -1.0]), false);
        let c = matmul(&mut g, a, b).unwrap();
        g.forward(false).unwrap();
        check_matrix_near(&g.value(c).unwrap(), (2, 1), &[-2.0, -2.0], 1e-6);
    }

    #[test]
    fn test_matmul_backward() {
        let mut g = Graph::new();
        let a = g.new_leaf(Matrix::new(1, 2, vec![2.0_f32, 3.0]).unwrap(), true);
        let b = g.new_leaf(Matrix::vector(vec![4.0_f32, 5.0]), true);
        let c = matmul(&mut g, a, b).unwrap();
        g.forward(false).unwrap();
        check_matrix_near(&g.value(c).unwrap(), (1, 1), &[23.0], 1e-6);

        g.backward(c, false).unwrap();
        check_matrix_near(&g.grad(a).unwrap(), (1, 2), &[4.0, 5.0], 1e-6);
        check_matrix_near(&g.grad(b).unwrap(), (2, 1), &[2.0, 3.0], 1e-6);
    }

    #[test]
    fn test_matmul_grad_check() {
        let inputs = [
            Matrix::new(2, 3, vec![0.3_f64, -0.8, 1.2, 0.5, 0.1, -0.4]).unwrap(),
            Matrix::new(3, 2, vec![1.0_f64, -0.2, 0.6, 0.9, -1.1, 0.7]).unwrap(),
        ];
        check_grad(
            |g, ids| ops::matmul(g, ids[0], ids[1]),
            &inputs,
            1e-5,
            1e-4,
        )
        .unwrap();
    }

    #[test]
    fn test_matmul_incompatible_shapes() {
        let mut g = Graph::new();
        let a = g.new_leaf(Matrix::new(2, 3, vec![0.0_f32; 6]).unwrap(), false);
        let b = g.new_leaf(Matrix::new(2, 2, vec![0.0_f32; 4]).unwrap(), false);
        matmul(&mut g, a, b).unwrap();
        assert!(matches!(
            g.forward(false),
            Err(GradFlowError::ShapeMismatch { .. })
        ));
    }
}
