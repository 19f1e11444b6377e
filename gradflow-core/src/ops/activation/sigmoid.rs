// src/ops/activation/sigmoid.rs

use crate::error::GradFlowError;
use crate::graph::{Graph, NodeId};
use crate::mat::{Element, Matrix};
use crate::ops::Function;

/// Appends a logistic-sigmoid operator: `1 / (1 + e^-x)` element-wise.
pub fn sigmoid<T: Element>(g: &mut Graph<T>, x: NodeId) -> Result<NodeId, GradFlowError> {
    g.new_operator(Box::new(Sigmoid { operands: [x] }))
}

#[derive(Debug)]
pub(crate) struct Sigmoid {
    operands: [NodeId; 1],
}

fn transfer<T: Element>(v: T) -> T {
    T::one() / (T::one() + (-v).exp())
}

impl<T: Element> Function<T> for Sigmoid {
    fn operands(&self) -> &[NodeId] {
        &self.operands
    }

    fn forward(&self, g: &Graph<T>) -> Result<Matrix<T>, GradFlowError> {
        Ok(g.operand_value(self.operands[0])?.map(transfer))
    }

    // ds/dx = s(1 - s), with s recomputed from the cached operand
    fn backward(&self, g: &Graph<T>, gy: &Matrix<T>) -> Result<(), GradFlowError> {
        let x = self.operands[0];
        if g.requires_grad(x) {
            let s = g.operand_value(x)?.map(transfer);
            let ds = s.map(|sv| sv * (T::one() - sv));
            g.propagate_grad(x, &gy.mul(&ds)?)?;
        }
        Ok(())
    }
}
