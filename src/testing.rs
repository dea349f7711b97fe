//! Small test-graph builder, public so that `tests/` integration tests and
//! `proptest` strategies can construct IR fragments without reaching into
//! crate internals. Not part of the analyser itself.

use crate::ir::graph::GraphId;
use crate::ir::mode::I32;
use crate::ir::node::{Node, NodeId};
use crate::ir::program::Program;
use crate::ir::ty::{Ty, TypeId};

/// A fresh program with one graph and one `i32` type, ready for building
/// pointer-arithmetic chains on top of its frame or its arguments.
pub struct TestGraph {
    pub prog: Program,
    pub graph: GraphId,
    pub i32_ty: TypeId,
}

impl TestGraph {
    pub fn new() -> Self {
        let mut prog = Program::new();
        let graph = prog.new_graph();
        let i32_ty = prog.intern_type(Ty::Primitive(I32));
        Self { prog, graph, i32_ty }
    }

    pub fn arg(&mut self, index: u32) -> NodeId {
        self.prog.graph_mut(self.graph).add_arg(index)
    }

    /// `base + const_offset`.
    pub fn offset(&mut self, base: NodeId, const_offset: i128) -> NodeId {
        let c = self.prog.graph_mut(self.graph).push(Node::Const(const_offset));
        self.prog.graph_mut(self.graph).push(Node::Add { left: base, right: c })
    }
}

impl Default for TestGraph {
    fn default() -> Self {
        Self::new()
    }
}
