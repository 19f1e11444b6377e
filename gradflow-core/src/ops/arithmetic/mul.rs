// src/ops/arithmetic/mul.rs

use crate::error::GradFlowError;
use crate::graph::{Graph, NodeId};
use crate::mat::{Element, Matrix};
use crate::ops::Function;

/// Appends an element-wise (Hadamard) product operator.
pub fn mul<T: Element>(g: &mut Graph<T>, a: NodeId, b: NodeId) -> Result<NodeId, GradFlowError> {
    g.new_operator(Box::new(Mul { operands: [a, b] }))
}

#[derive(Debug)]
pub(crate) struct Mul {
    operands: [NodeId; 2],
}

impl<T: Element> Function<T> for Mul {
    fn operands(&self) -> &[NodeId] {
        &self.operands
    }

    fn forward(&self, g: &Graph<T>) -> Result<Matrix<T>, GradFlowError> {
        let a = g.operand_value(self.operands[0])?;
        let b = g.operand_value(self.operands[1])?;
        a.mul(&b)
    }

    // d(a*b)/da = b, d(a*b)/db = a, both read from the forward cache.
    fn backward(&self, g: &Graph<T>, gy: &Matrix<T>) -> Result<(), GradFlowError> {
        let [a, b] = self.operands;
        if g.requires_grad(a) {
            let bv = g.operand_value(b)?;
            g.propagate_grad(a, &gy.mul(&bv)?)?;
        }
        if g.requires_grad(b) {
            let av = g.operand_value(a)?;
            g.propagate_grad(b, &gy.mul(&av)?)?;
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "mul_test.rs"]
mod tests;
