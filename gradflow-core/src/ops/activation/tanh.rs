// src/ops/activation/tanh.rs

use crate::error::GradFlowError;
use crate::graph::{Graph, NodeId};
use crate::mat::{Element, Matrix};
use crate::ops::Function;

/// Appends a hyperbolic-tangent operator.
pub fn tanh<T: Element>(g: &mut Graph<T>, x: NodeId) -> Result<NodeId, GradFlowError> {
    g.new_operator(Box::new(Tanh { operands: [x] }))
}

#[derive(Debug)]
pub(crate) struct Tanh {
    operands: [NodeId; 1],
}

impl<T: Element> Function<T> for Tanh {
    fn operands(&self) -> &[NodeId] {
        &self.operands
    }

    fn forward(&self, g: &Graph<T>) -> Result<Matrix<T>, GradFlowError> {
        Ok(g.operand_value(self.operands[0])?.map(|v| v.tanh()))
    }

    // d(tanh x)/dx = 1 - tanh^2 x
    fn backward(&self, g: &Graph<T>, gy: &Matrix<T>) -> Result<(), GradFlowError> {
        let x = self.operands[0];
        if g.requires_grad(x) {
            let y = g.operand_value(x)?.map(|v| v.tanh());
            let dy = y.map(|yv| T::one() - yv * yv);
            g.propagate_grad(x, &gy.mul(&dy)?)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::grad_check::check_grad;
    use approx::assert_relative_eq;

    #[test]
    fn test_tanh_forward() {
        let mut g = Graph::new();
        let x = g.new_leaf(Matrix::vector(vec![0.0_f32, 1.0]), false);
        let y = tanh(&mut g, x).unwrap();
        g.forward(false).unwrap();
        let yv = g.value(y).unwrap();
        assert_relative_eq!(yv.get(0, 0), 0.0, epsilon = 1e-6);
        assert_relative_eq!(yv.get(1, 0), 0.761594, epsilon = 1e-5);
    }

    #[test]
    fn test_tanh_grad_check() {
        let inputs = [Matrix::vector(vec![-0.9_f64, 0.2, 1.7])];
        check_grad(|g, ids| tanh(g, ids[0]), &inputs, 1e-5, 1e-4).unwrap();
    }
}
