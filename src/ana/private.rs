//! Component E: private-method marking. Grounded on `mark_private_methods`,
//! `clone_type_and_cache`, and `update_calls_to_private` in `irmemory.c`.
//!
//! The method-type clone cache is deliberately function-local (SPEC_FULL.md
//! §1.B): it exists only to avoid cloning the same method type twice within
//! one `mark_private_methods` run, not as long-lived `Program` state.

use log::debug;

use crate::common::fx_hash::FxHashMap;
use crate::ir::entity::{EntityId, EntityProperties, Owner};
use crate::ir::graph::GraphId;
use crate::ir::node::{Node, NodeId};
use crate::ir::program::Program;
use crate::ir::ty::{Ty, TypeId};

const LOG_TARGET: &str = "firm::opt::cc";

fn is_private_candidate(prog: &Program, entity: EntityId) -> bool {
    let ent = prog.entity(entity);
    ent.is_method()
        && !ent.is_externally_visible()
        && !ent.usage.is_address_taken()
        && !ent.props.contains(EntityProperties::PRIVATE)
}

fn clone_type_and_cache(prog: &mut Program, ty: TypeId, cache: &mut FxHashMap<TypeId, TypeId>) -> TypeId {
    if let Some(&cached) = cache.get(&ty) {
        return cached;
    }
    let cloned = match prog.types.get(ty).clone() {
        Ty::Method(mut method) => {
            method.private = true;
            Ty::Method(method)
        }
        other => other,
    };
    let new_id = prog.intern_type(cloned);
    cache.insert(ty, new_id);
    new_id
}

/// Rewrite every call site that calls `entity` directly to record the
/// now-private method type (§4.E).
fn update_calls_to_private(prog: &mut Program, entity: EntityId) {
    let private_ty = prog.entity(entity).ty;
    let graph_ids: Vec<GraphId> = prog.graph_ids().collect();
    for g in graph_ids {
        let call_sites: Vec<NodeId> = prog
            .graph(g)
            .node_ids()
            .filter(|&n| match prog.graph(g).node(n) {
                Node::Call { callee, .. } => matches!(prog.graph(g).node(*callee), Node::Address(e) if *e == entity),
                _ => false,
            })
            .collect();
        for call in call_sites {
            prog.set_call_type(g, call, private_ty);
            debug!(target: LOG_TARGET, "call {call} in graph {g} retargeted to private method type");
        }
    }
}

/// Mark every method entity that is unreachable from outside the program
/// (not externally visible, never had its address taken) as private, and
/// retarget its call sites' recorded method types accordingly (§4.E).
///
/// Ensures a consistent program-wide entity-usage picture itself (mirrors
/// `mark_private_methods`'s opening `assure_irp_globals_entity_usage_computed()`
/// call in `irmemory.c`) -- callers never need to compute usage first.
pub fn mark_private_methods(prog: &mut Program) {
    crate::ana::usage::assure_program_globals_entity_usage(prog);

    let mut cache: FxHashMap<TypeId, TypeId> = FxHashMap::default();
    let candidates: Vec<EntityId> = prog.entity_ids().filter(|&e| is_private_candidate(prog, e)).collect();
    for entity in candidates {
        prog.entity_mut(entity).props |= EntityProperties::PRIVATE;
        let old_ty = prog.entity(entity).ty;
        let new_ty = clone_type_and_cache(prog, old_ty, &mut cache);
        prog.entity_mut(entity).ty = new_ty;
        debug!(target: LOG_TARGET, "marked entity {entity} private");
        update_calls_to_private(prog, entity);
    }
}

/// Look up the entity, if any, that a call's callee node denotes (`find_entity`).
pub fn find_entity(prog: &Program, graph_id: GraphId, node: NodeId) -> Option<EntityId> {
    match prog.graph(graph_id).node(node) {
        Node::Address(e) => Some(*e),
        Node::Member { entity, .. } => Some(*entity),
        _ => None,
    }
}

pub fn entities_owned_by(prog: &Program, owner: Owner) -> Vec<EntityId> {
    prog.entities_with_owner(owner).collect()
}
