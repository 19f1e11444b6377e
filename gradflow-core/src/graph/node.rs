// src/graph/node.rs

use crate::error::GradFlowError;
use crate::mat::{Element, Matrix};
use crate::ops::Function;
use std::fmt;
use std::sync::{Arc, Mutex, RwLock};

/// Identifier of a node within its owning [`Graph`](crate::graph::Graph).
///
/// Ids are dense and strictly increasing: `nodes[i].id == i`, and an
/// operator's id is always greater than every one of its operands' ids.
/// Ids are only meaningful for the graph that issued them, and become
/// invalid after [`Graph::clear`](crate::graph::Graph::clear).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) usize);

impl NodeId {
    /// Position of the node in the graph's arena.
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NodeId({})", self.0)
    }
}

/// A value with an optionally-accumulated gradient.
///
/// The gradient is `None` until the first `propagate_grad` after creation or
/// after `zero_grad`; subsequent calls accumulate element-wise. When
/// `requires_grad` is false the whole gradient side is inert: `grad` reads
/// `None`, `has_grad` is false, and `propagate_grad`/`zero_grad` are no-ops.
/// That gate is what lets externally-shared, non-trainable parameters live in
/// a graph without gradient bookkeeping.
///
/// The cached value sits behind `Arc` so concurrent Function evaluation reads
/// it cheaply; the gradient sits behind a `Mutex` because backward fan-in may
/// accumulate into the same destination from sibling tasks.
pub(crate) struct GradValue<T: Element> {
    value: RwLock<Option<Arc<Matrix<T>>>>,
    grad: Mutex<Option<Matrix<T>>>,
    requires_grad: bool,
}

impl<T: Element> GradValue<T> {
    pub(crate) fn with_value(value: Matrix<T>, requires_grad: bool) -> Self {
        GradValue {
            value: RwLock::new(Some(Arc::new(value))),
            grad: Mutex::new(None),
            requires_grad,
        }
    }

    pub(crate) fn empty(requires_grad: bool) -> Self {
        GradValue {
            value: RwLock::new(None),
            grad: Mutex::new(None),
            requires_grad,
        }
    }

    pub(crate) fn value(&self) -> Option<Arc<Matrix<T>>> {
        self.value.read().unwrap().clone()
    }

    pub(crate) fn set_value(&self, value: Matrix<T>) {
        *self.value.write().unwrap() = Some(Arc::new(value));
    }

    pub(crate) fn grad(&self) -> Option<Matrix<T>> {
        if !self.requires_grad {
            return None;
        }
        self.grad.lock().unwrap().clone()
    }

    pub(crate) fn has_grad(&self) -> bool {
        if !self.requires_grad {
            return false;
        }
        self.grad.lock().unwrap().is_some()
    }

    pub(crate) fn requires_grad(&self) -> bool {
        self.requires_grad
    }

    /// Accumulates `gx` into the gradient. First call after creation or
    /// `zero_grad` installs it; later calls add element-wise, shape-checked.
    pub(crate) fn propagate_grad(&self, gx: &Matrix<T>) -> Result<(), GradFlowError> {
        if !self.requires_grad {
            return Ok(());
        }
        let mut guard = self.grad.lock().unwrap();
        match guard.as_mut() {
            Some(g) => g.add_assign_checked(gx)?,
            None => *guard = Some(gx.clone()),
        }
        Ok(())
    }

    pub(crate) fn zero_grad(&self) {
        if !self.requires_grad {
            return;
        }
        *self.grad.lock().unwrap() = None;
    }
}

impl<T: Element> fmt::Debug for GradValue<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GradValue")
            .field("has_value", &self.value.read().unwrap().is_some())
            .field("has_grad", &self.grad.lock().unwrap().is_some())
            .field("requires_grad", &self.requires_grad)
            .finish()
    }
}

/// What a node is: a leaf variable, or the cached result of an operator.
pub(crate) enum NodeKind<T: Element> {
    Variable,
    Operator { function: Box<dyn Function<T>> },
}

impl<T: Element> fmt::Debug for NodeKind<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeKind::Variable => write!(f, "Variable"),
            NodeKind::Operator { function } => write!(f, "Operator({:?})", function),
        }
    }
}

/// An addressable element of the computation graph.
#[derive(Debug)]
pub(crate) struct Node<T: Element> {
    id: NodeId,
    time_step: i64,
    grad_value: GradValue<T>,
    kind: NodeKind<T>,
}

impl<T: Element> Node<T> {
    pub(crate) fn variable(
        id: NodeId,
        time_step: i64,
        value: Matrix<T>,
        requires_grad: bool,
    ) -> Self {
        Node {
            id,
            time_step,
            grad_value: GradValue::with_value(value, requires_grad),
            kind: NodeKind::Variable,
        }
    }

    pub(crate) fn operator(
        id: NodeId,
        time_step: i64,
        function: Box<dyn Function<T>>,
        requires_grad: bool,
    ) -> Self {
        Node {
            id,
            time_step,
            grad_value: GradValue::empty(requires_grad),
            kind: NodeKind::Operator { function },
        }
    }

    pub(crate) fn id(&self) -> NodeId {
        self.id
    }

    pub(crate) fn time_step(&self) -> i64 {
        self.time_step
    }

    pub(crate) fn is_operator(&self) -> bool {
        matches!(self.kind, NodeKind::Operator { .. })
    }

    pub(crate) fn function(&self) -> Option<&dyn Function<T>> {
        match &self.kind {
            NodeKind::Operator { function } => Some(function.as_ref()),
            NodeKind::Variable => None,
        }
    }

    pub(crate) fn value(&self) -> Option<Arc<Matrix<T>>> {
        self.grad_value.value()
    }

    pub(crate) fn set_value(&self, value: Matrix<T>) {
        self.grad_value.set_value(value);
    }

    pub(crate) fn grad(&self) -> Option<Matrix<T>> {
        self.grad_value.grad()
    }

    pub(crate) fn has_grad(&self) -> bool {
        self.grad_value.has_grad()
    }

    pub(crate) fn requires_grad(&self) -> bool {
        self.grad_value.requires_grad()
    }

    pub(crate) fn propagate_grad(&self, gx: &Matrix<T>) -> Result<(), GradFlowError> {
        self.grad_value.propagate_grad(gx)
    }

    pub(crate) fn zero_grad(&self) {
        self.grad_value.zero_grad()
    }
}
