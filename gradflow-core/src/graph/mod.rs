// src/graph/mod.rs

use crate::error::GradFlowError;
use crate::mat::{Element, Matrix};
use crate::ops::Function;
use log::{debug, trace};
use std::sync::Arc;

pub mod grad_check;
mod handlers;
mod node;

pub use node::NodeId;

use handlers::{BackwardHandler, ForwardHandler};
use node::Node;


/// Height buckets, extended incrementally as nodes are appended.
#[derive(Default)]
struct GroupCache {
    /// Number of leading nodes already distributed into `groups`.
    covered: usize,
    groups: Vec<Vec<NodeId>>,
}

/// The computation graph: single owner and sequencer of all nodes.
///
/// Nodes live in an arena indexed by [`NodeId`]; they reference each other
/// only by id, never by pointer, so reverse traversal and height computation
/// are index-based. Ids define the single global topological order: an
/// operator can only be built from already-constructed nodes, so its id is
/// greater than every operand's id.
///
/// A graph supports one active pass at a time (`forward*`/`backward*` take
/// `&mut self`); to share non-trainable parameters across graphs, insert the
/// same matrix as a `requires_grad = false` leaf in each graph.
///
/// Typical lifecycle: build leaves and operators, `forward`, `backward`,
/// read gradients, then drop or [`clear`](Graph::clear) the graph before the
/// next training example.
pub struct Graph<T: Element> {
    nodes: Vec<Node<T>>,
    /// Height per node, indexed by id. 0 for leaves, `1 + max(operands)` for
    /// operators; strictly increasing along every dependency edge.
    heights: Vec<u32>,
    cache: GroupCache,
    cur_time_step: i64,
    /// Set for the duration of a truncated backward pass: gradient
    /// contributions into nodes with id at or below the boundary are dropped,
    /// so the truncated region stays untouched.
    truncation_boundary: Option<usize>,
}

impl<T: Element> Graph<T> {
    pub fn new() -> Self {
        Graph {
            nodes: Vec::new(),
            heights: Vec::new(),
            cache: GroupCache::default(),
            cur_time_step: 0,
            truncation_boundary: None,
        }
    }

    /// Appends a leaf node holding `value`. Leaves are valued at
    /// construction and have height 0.
    pub fn new_leaf(&mut self, value: Matrix<T>, requires_grad: bool) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes
            .push(Node::variable(id, self.cur_time_step, value, requires_grad));
        self.heights.push(0);
        id
    }

    /// Appends a 1 x 1 constant leaf.
    pub fn new_scalar(&mut self, v: T) -> NodeId {
        self.new_leaf(Matrix::scalar(v), false)
    }

    /// Appends an operator node computing `function`.
    ///
    /// Every operand id must already exist in this graph, which is what makes
    /// ids a topological order. The node's height is `1 + max(operand
    /// heights)` and it requires gradients iff any operand does.
    pub fn new_operator(
        &mut self,
        function: Box<dyn Function<T>>,
    ) -> Result<NodeId, GradFlowError> {
        let num_nodes = self.nodes.len();
        let mut max_height = 0u32;
        let mut requires_grad = false;
        for &operand in function.operands() {
            if operand.index() >= num_nodes {
                return Err(GradFlowError::InvalidOperand {
                    id: operand.index(),
                    num_nodes,
                });
            }
            max_height = max_height.max(self.heights[operand.index()]);
            requires_grad = requires_grad || self.nodes[operand.index()].requires_grad();
        }
        let id = NodeId(num_nodes);
        self.nodes.push(Node::operator(
            id,
            self.cur_time_step,
            function,
            requires_grad,
        ));
        self.heights.push(max_height + 1);
        Ok(id)
    }

    /// Runs a full forward pass over all time steps.
    pub fn forward(&mut self, concurrent: bool) -> Result<(), GradFlowError> {
        self.forward_range(None, None, concurrent)
    }

    /// Runs a forward pass restricted to operators whose time step lies in
    /// `[from_time_step, to_time_step]`; `None` means unbounded on that side.
    pub fn forward_range(
        &mut self,
        from_time_step: Option<i64>,
        to_time_step: Option<i64>,
        concurrent: bool,
    ) -> Result<(), GradFlowError> {
        debug!(
            "forward pass: {} nodes, range {:?}..{:?}, concurrent={}",
            self.nodes.len(),
            from_time_step,
            to_time_step,
            concurrent
        );
        if concurrent {
            self.update_group_cache();
        }
        let handler = ForwardHandler::new(self, from_time_step, to_time_step);
        if concurrent {
            handler.run_concurrent(&self.cache.groups)
        } else {
            handler.run_serial()
        }
    }

    /// Runs a full backward pass from `target`, seeding with an all-ones
    /// gradient of the target value's shape.
    pub fn backward(&mut self, target: NodeId, concurrent: bool) -> Result<(), GradFlowError> {
        self.backward_with(target, None, None, concurrent)
    }

    /// Runs a backward pass from `target`.
    ///
    /// `output_grad`, when given, seeds the target's gradient and must match
    /// the target value's shape. `stop_at_time_step` enables truncated BPTT:
    /// the pass computes the truncation boundary (the last node, by id at or
    /// before the target, whose time step is at or before the stop), and
    /// nodes at or below it neither run their backward nor receive any
    /// gradient contribution. The serial and concurrent strategies process
    /// exactly the same node set.
    pub fn backward_with(
        &mut self,
        target: NodeId,
        output_grad: Option<Matrix<T>>,
        stop_at_time_step: Option<i64>,
        concurrent: bool,
    ) -> Result<(), GradFlowError> {
        if target.index() >= self.nodes.len() {
            return Err(GradFlowError::InvalidOperand {
                id: target.index(),
                num_nodes: self.nodes.len(),
            });
        }
        debug!(
            "backward pass: target={}, stop_at_time_step={:?}, concurrent={}",
            target, stop_at_time_step, concurrent
        );
        let boundary = stop_at_time_step.and_then(|stop| {
            (0..=target.index())
                .rev()
                .find(|&i| self.nodes[i].time_step() <= stop)
        });
        if concurrent {
            self.update_group_cache();
        }
        self.truncation_boundary = boundary;
        let result = {
            let handler = BackwardHandler::new(&*self, target, boundary);
            handler.propagate_output_grad(output_grad).and_then(|()| {
                if concurrent {
                    handler.run_concurrent(&self.cache.groups)
                } else {
                    handler.run_serial()
                }
            })
        };
        self.truncation_boundary = None;
        result
    }

    /// The cached value of a node, if any. Leaves are always valued;
    /// operators only after a forward pass covered them.
    pub fn value(&self, id: NodeId) -> Option<Arc<Matrix<T>>> {
        self.nodes.get(id.index()).and_then(|n| n.value())
    }

    /// Like [`value`](Graph::value) but an absent value is the
    /// [`NotForwarded`](GradFlowError::NotForwarded) error. This is what
    /// `Function` implementations use to read their operands.
    pub fn operand_value(&self, id: NodeId) -> Result<Arc<Matrix<T>>, GradFlowError> {
        self.value(id)
            .ok_or(GradFlowError::NotForwarded { id: id.index() })
    }

    /// The gradient accumulated on a node during backward passes, or `None`
    /// if nothing was propagated or the node does not require gradients.
    pub fn grad(&self, id: NodeId) -> Option<Matrix<T>> {
        self.nodes.get(id.index()).and_then(|n| n.grad())
    }

    pub fn has_grad(&self, id: NodeId) -> bool {
        self.nodes.get(id.index()).is_some_and(|n| n.has_grad())
    }

    pub fn requires_grad(&self, id: NodeId) -> bool {
        self.nodes.get(id.index()).is_some_and(|n| n.requires_grad())
    }

    pub fn height(&self, id: NodeId) -> Option<u32> {
        self.heights.get(id.index()).copied()
    }

    pub fn time_step_of(&self, id: NodeId) -> Option<i64> {
        self.nodes.get(id.index()).map(|n| n.time_step())
    }

    /// Accumulates `gx` into a node's gradient; a no-op for nodes that do not
    /// require gradients, and for nodes inside the truncated region of an
    /// in-flight truncated backward pass. Fails with `InvalidOperand` for
    /// unknown ids and `ShapeMismatch` when `gx` is incompatible with the
    /// accumulated shape.
    pub fn propagate_grad(&self, id: NodeId, gx: &Matrix<T>) -> Result<(), GradFlowError> {
        if self.truncation_boundary.is_some_and(|b| id.index() <= b) {
            return Ok(());
        }
        match self.nodes.get(id.index()) {
            Some(node) => node.propagate_grad(gx),
            None => Err(GradFlowError::InvalidOperand {
                id: id.index(),
                num_nodes: self.nodes.len(),
            }),
        }
    }

    /// Resets one node's gradient to the unset state.
    pub fn zero_grad(&self, id: NodeId) {
        if let Some(node) = self.nodes.get(id.index()) {
            node.zero_grad();
        }
    }

    /// Resets every node's gradient. Called at the start of a training step.
    pub fn zero_grad_all(&self) {
        for node in &self.nodes {
            node.zero_grad();
        }
    }

    /// Drops all nodes and resets the height cache and time step. Any
    /// outstanding [`NodeId`] becomes invalid; the caller contract is to
    /// never reuse ids across a `clear`.
    pub fn clear(&mut self) {
        trace!("clearing graph ({} nodes)", self.nodes.len());
        self.nodes.clear();
        self.heights.clear();
        self.cache = GroupCache::default();
        self.cur_time_step = 0;
        self.truncation_boundary = None;
    }

    /// Nodes partitioned into height buckets, ascending height, id order
    /// within each bucket. Operators in the same bucket have no dependency
    /// edge between them; that independence is what the concurrent handlers
    /// exploit.
    pub fn group_by_height(&mut self) -> &[Vec<NodeId>] {
        self.update_group_cache();
        &self.cache.groups
    }

    /// The time step stamped on nodes built from now on.
    pub fn time_step(&self) -> i64 {
        self.cur_time_step
    }

    /// Advances the current time step, e.g. once per unrolled recurrent step.
    pub fn inc_time_step(&mut self) {
        self.cur_time_step += 1;
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub(crate) fn nodes(&self) -> &[Node<T>] {
        &self.nodes
    }

    fn update_group_cache(&mut self) {
        for i in self.cache.covered..self.nodes.len() {
            let h = self.heights[i] as usize;
            if self.cache.groups.len() <= h {
                self.cache.groups.resize_with(h + 1, Vec::new);
            }
            let id = self.nodes[i].id();
            self.cache.groups[h].push(id);
        }
        self.cache.covered = self.nodes.len();
    }
}

impl<T: Element> Default for Graph<T> {
    fn default() -> Self {
        Self::new()
    }
}
