//! Per-procedure IR graph: a node arena plus the handful of distinguished
//! nodes and per-graph state the analyser consults.

use crate::ana::options::DisambiguatorOptions;
use crate::ir::node::{Node, NodeId};

pub type GraphId = usize;

#[derive(Debug)]
pub struct Graph {
    pub id: GraphId,
    nodes: Vec<Node>,
    /// The single `Frame` node for this graph (§4.A rule 2, §4.D).
    pub frame: NodeId,
    /// The `Arg` nodes, indexed by parameter number; out-edges of
    /// `args[0]` are the static-link accesses inspected by §4.D's
    /// per-graph pass for inner-function outer-frame access.
    pub args: Vec<NodeId>,
    pub options: DisambiguatorOptions,
    /// Corresponds to the `CONSISTENT_ENTITY_USAGE` graph property (§3
    /// Lifecycle). Cleared by `invalidate_entity_usage`.
    pub entity_usage_consistent: bool,
}

impl Graph {
    pub fn new(id: GraphId) -> Self {
        let nodes = vec![Node::Frame];
        Self {
            id,
            nodes,
            frame: 0,
            args: Vec::new(),
            options: DisambiguatorOptions::INHERITED,
            entity_usage_consistent: false,
        }
    }

    pub fn push(&mut self, node: Node) -> NodeId {
        self.nodes.push(node);
        self.nodes.len() - 1
    }

    pub fn add_arg(&mut self, index: u32) -> NodeId {
        let id = self.push(Node::Arg(index));
        self.args.push(id);
        id
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id]
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn node_ids(&self) -> impl Iterator<Item = NodeId> {
        0..self.nodes.len()
    }

    /// Out-edges of `id`: every node whose inputs mention `id`. Computed on
    /// demand by linear scan rather than maintained incrementally, since
    /// building/mutating the graph is out of scope for this crate (§1) --
    /// callers that need this on a hot path are expected to have their own
    /// out-edge cache, exactly as `foreach_irn_out_r` requires
    /// `assure_irg_outs` to have run first in the reference IR.
    pub fn out_edges(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        for (candidate, node) in self.nodes.iter().enumerate() {
            if node.inputs().contains(&id) {
                out.push(candidate);
            }
        }
        out
    }

    pub fn invalidate_entity_usage(&mut self) {
        self.entity_usage_consistent = false;
    }
}
