// src/graph/handlers.rs
//
// Forward and backward traversal strategies. Handlers are transient: built
// once per pass, parameterized over the graph, and discarded. The serial
// strategies walk the arena by id; the concurrent ones walk height groups,
// with one rayon scope per group acting as the inter-group barrier. Height
// strictly increases along every dependency edge, so when a group runs, all
// its operands (forward) or all its consumers (backward) are already final.

use super::node::{Node, NodeId};
use super::Graph;
use crate::error::GradFlowError;
use crate::mat::{Element, Matrix};
use log::trace;
use rayon::prelude::*;

#[cfg(test)]
#[path = "handlers_test.rs"]
mod handlers_test;

pub(super) struct ForwardHandler<'g, T: Element> {
    graph: &'g Graph<T>,
    from_time_step: Option<i64>,
    to_time_step: Option<i64>,
}

impl<'g, T: Element> ForwardHandler<'g, T> {
    pub(super) fn new(
        graph: &'g Graph<T>,
        from_time_step: Option<i64>,
        to_time_step: Option<i64>,
    ) -> Self {
        ForwardHandler {
            graph,
            from_time_step,
            to_time_step,
        }
    }

    fn in_range(&self, time_step: i64) -> bool {
        self.from_time_step.map_or(true, |from| time_step >= from)
            && self.to_time_step.map_or(true, |to| time_step <= to)
    }

    fn compute(&self, node: &Node<T>) -> Result<(), GradFlowError> {
        if let Some(function) = node.function() {
            node.set_value(function.forward(self.graph)?);
        }
        Ok(())
    }

    pub(super) fn run_serial(&self) -> Result<(), GradFlowError> {
        for node in self.graph.nodes() {
            if node.is_operator() && self.in_range(node.time_step()) {
                self.compute(node)?;
            }
        }
        Ok(())
    }

    /// Each height group runs as one parallel scope; `try_for_each` joins
    /// every task in the group before the next group starts, so a node only
    /// ever reads operands finalized in earlier groups and only writes its
    /// own output slot. Results are bit-identical to the serial walk.
    pub(super) fn run_concurrent(&self, groups: &[Vec<NodeId>]) -> Result<(), GradFlowError> {
        for group in groups {
            group.par_iter().try_for_each(|&id| {
                let node = &self.graph.nodes()[id.index()];
                if node.is_operator() && self.in_range(node.time_step()) {
                    self.compute(node)
                } else {
                    Ok(())
                }
            })?;
        }
        Ok(())
    }
}

pub(super) struct BackwardHandler<'g, T: Element> {
    graph: &'g Graph<T>,
    target: NodeId,
    /// Truncation boundary: the largest id `<= target` whose time step is at
    /// or before the stop time step (computed by the graph, which also drops
    /// gradient contributions into the region at or below it). Computing the
    /// boundary up front makes the serial and concurrent strategies process
    /// the exact same node set on any graph, monotonically unrolled or not.
    boundary: Option<usize>,
}

impl<'g, T: Element> BackwardHandler<'g, T> {
    pub(super) fn new(graph: &'g Graph<T>, target: NodeId, boundary: Option<usize>) -> Self {
        if let Some(b) = boundary {
            trace!("backward truncation boundary at node {}", b);
        }
        BackwardHandler {
            graph,
            target,
            boundary,
        }
    }

    /// Seeds the target's gradient: the provided output gradient, or an
    /// all-ones matrix matching the target value's shape (the standard
    /// reverse-mode seed).
    pub(super) fn propagate_output_grad(
        &self,
        output_grad: Option<Matrix<T>>,
    ) -> Result<(), GradFlowError> {
        let node = &self.graph.nodes()[self.target.index()];
        let value = node.value().ok_or(GradFlowError::NotForwarded {
            id: self.target.index(),
        })?;
        let gx = match output_grad {
            Some(g) => {
                if g.shape() != value.shape() {
                    return Err(GradFlowError::ShapeMismatch {
                        expected: value.shape(),
                        actual: g.shape(),
                        operation: "backward seed".to_string(),
                    });
                }
                g
            }
            None => value.ones_like(),
        };
        // Routed through the graph so a truncation boundary at or beyond the
        // target suppresses even the seed.
        self.graph.propagate_grad(self.target, &gx)
    }

    /// First id (inclusive) that still participates in this pass.
    fn first_id(&self) -> usize {
        self.boundary.map_or(0, |b| b + 1)
    }

    fn step(&self, node: &Node<T>) -> Result<(), GradFlowError> {
        if let Some(function) = node.function() {
            // Nodes outside the target's ancestor cone, and frozen subgraphs,
            // never accumulate a gradient and are skipped here.
            if let Some(gy) = node.grad() {
                function.backward(self.graph, &gy)?;
            }
        }
        Ok(())
    }

    pub(super) fn run_serial(&self) -> Result<(), GradFlowError> {
        for i in (self.first_id()..=self.target.index()).rev() {
            self.step(&self.graph.nodes()[i])?;
        }
        Ok(())
    }

    /// Height groups in descending order; within a group only nodes in
    /// `(boundary, target]` participate; nodes constructed after the target
    /// are irrelevant to this pass and are excluded outright. The per-group
    /// barrier guarantees a node's gradient accumulation is complete before
    /// its own backward runs; fan-in onto a shared operand lands on the
    /// operand's synchronized accumulator.
    pub(super) fn run_concurrent(&self, groups: &[Vec<NodeId>]) -> Result<(), GradFlowError> {
        let first = self.first_id();
        let last = self.target.index();
        let target_height = self.graph.height(self.target).unwrap_or(0) as usize;
        for h in (0..=target_height).rev() {
            let Some(group) = groups.get(h) else {
                continue;
            };
            group.par_iter().try_for_each(|&id| {
                if id.index() >= first && id.index() <= last {
                    self.step(&self.graph.nodes()[id.index()])
                } else {
                    Ok(())
                }
            })?;
        }
        Ok(())
    }
}
