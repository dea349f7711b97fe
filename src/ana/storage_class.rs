//! Component A: storage-class classifier. Grounded on `classify_pointer` in
//! `irmemory.c`.

use bitflags::bitflags;

use crate::ir::entity::{EntityId, Owner};
use crate::ir::node::{Node, NodeId};
use crate::ir::program::Program;

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct StorageClassModifiers: u8 {
        /// The entity's address was never taken.
        const NOTTAKEN = 1 << 0;
        /// The node is a formal-parameter projection.
        const ARGUMENT = 1 << 1;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageClass {
    Pointer,
    Localvar,
    Globalvar,
    Tls,
    Globaladdr,
    Malloced,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Classification {
    pub class: StorageClass,
    pub modifiers: StorageClassModifiers,
}

impl Classification {
    fn new(class: StorageClass) -> Self {
        Self { class, modifiers: StorageClassModifiers::empty() }
    }

    fn with(class: StorageClass, modifiers: StorageClassModifiers) -> Self {
        Self { class, modifiers }
    }
}

fn is_malloc_result(prog: &Program, graph: &crate::ir::graph::Graph, node: NodeId) -> bool {
    // Pattern: Proj(Proj(Call)) where the callee has the `malloc` property.
    let Node::Proj { pred, .. } = graph.node(node) else { return false };
    let Node::Proj { pred: call, .. } = graph.node(*pred) else { return false };
    let Node::Call { callee, .. } = graph.node(*call) else { return false };
    let Node::Address(entity) = graph.node(*callee) else { return false };
    prog.entity(*entity).props.contains(crate::ir::entity::EntityProperties::MALLOC)
}

fn is_arg_proj(graph: &crate::ir::graph::Graph, node: NodeId) -> bool {
    if let Node::Proj { pred, .. } = graph.node(node) {
        matches!(graph.node(*pred), Node::Arg(_))
    } else {
        matches!(graph.node(node), Node::Arg(_))
    }
}

/// Classify a base address into a storage class with modifiers (§4.A).
/// Rules are evaluated in order; the first matching rule wins.
pub fn classify_pointer(
    prog: &Program,
    graph_id: crate::ir::graph::GraphId,
    base: NodeId,
    entity: Option<EntityId>,
) -> Classification {
    let graph = prog.graph(graph_id);
    match graph.node(base) {
        Node::Address(addr_entity) => {
            let ent = prog.entity(*addr_entity);
            let class = if ent.owner == Owner::Tls { StorageClass::Tls } else { StorageClass::Globalvar };
            let mut modifiers = StorageClassModifiers::empty();
            if !ent.usage.is_address_taken() {
                modifiers |= StorageClassModifiers::NOTTAKEN;
            }
            Classification::with(class, modifiers)
        }
        _ if base == graph.frame => {
            // No entity means "some local, we don't know which field" --
            // nothing has proven its address taken, so NOTTAKEN stands until
            // a known entity's usage bits say otherwise.
            let address_taken = entity.is_some_and(|ent_id| prog.entity(ent_id).usage.is_address_taken());
            let mut modifiers = StorageClassModifiers::empty();
            if !address_taken {
                modifiers |= StorageClassModifiers::NOTTAKEN;
            }
            Classification::with(StorageClass::Localvar, modifiers)
        }
        Node::Proj { .. } if is_malloc_result(prog, graph, base) => Classification::new(StorageClass::Malloced),
        Node::Const(_) => Classification::new(StorageClass::Globaladdr),
        _ if is_arg_proj(graph, base) => Classification::with(StorageClass::Pointer, StorageClassModifiers::ARGUMENT),
        _ => Classification::new(StorageClass::Pointer),
    }
}
