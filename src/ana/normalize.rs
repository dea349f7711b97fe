//! Component B: address normaliser. Grounded on the two `while (is_Add(...))`
//! offset-peeling loops and `find_base_addr` in `irmemory.c`.

use crate::ir::entity::EntityId;
use crate::ir::graph::Graph;
use crate::ir::node::{Node, NodeId};

/// Result of peeling additions off an address expression (§4.B "Offset
/// peeling"): a base node, the accumulated constant offset, at most one
/// symbolic addend, and whether a second, distinct symbolic addend was
/// seen (in which case offset comparisons against this address must be
/// suppressed -- see SPEC_FULL.md §9).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NormalizedOffset {
    pub base: NodeId,
    pub const_offset: i128,
    pub sym_offset: Option<NodeId>,
    pub have_sym_overflow: bool,
}

/// Peel `Add` nodes off `addr`, splitting it into `(base, const_offset,
/// sym_offset, have_sym_overflow)`. Mirrors the reference IR's "sub is
/// normalised to add with a negated constant" assumption: this crate's IR
/// has no separate `Sub` offset form at the node-input level (a `Sub` node
/// is its own opcode, see `ir::node::Node::Sub`, but offset peeling only
/// ever sees `Add` chains, matching upstream's `while (is_Add(addr))`).
pub fn peel_offsets(graph: &Graph, mut addr: NodeId) -> NormalizedOffset {
    let mut const_offset: i128 = 0;
    let mut sym_offset: Option<NodeId> = None;
    let mut have_sym_overflow = false;

    while let Node::Add { left, right } = graph.node(addr) {
        let (left, right) = (*left, *right);
        let left_mode = graph.node(left).mode(graph);
        let (ptr_node, int_node) = if left_mode.is_reference() { (left, right) } else { (right, left) };

        if let Node::Const(value) = graph.node(int_node) {
            const_offset += value;
        } else if sym_offset.is_none() {
            sym_offset = Some(int_node);
        } else if sym_offset != Some(int_node) {
            have_sym_overflow = true;
        }

        addr = ptr_node;
    }

    NormalizedOffset { base: addr, const_offset, sym_offset, have_sym_overflow }
}

/// Peel `Sel`/`Member` nodes off `addr` (§4.B "Base-of-field peeling"),
/// returning the root pointer and the last-seen field entity, if any.
pub fn peel_fields(graph: &Graph, mut addr: NodeId) -> (NodeId, Option<EntityId>) {
    let mut selected_entity = None;
    loop {
        match graph.node(addr) {
            Node::Sel { base, .. } => addr = *base,
            Node::Member { base, entity } => {
                selected_entity = Some(*entity);
                addr = *base;
            }
            _ => break,
        }
    }
    (addr, selected_entity)
}
