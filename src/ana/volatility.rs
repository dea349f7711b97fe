//! Component F: volatility probing. Grounded on `is_partly_volatile`,
//! `is_inside_volatile_entity`, `contains_volatile_entity`, and `find_entity`
//! in `irmemory.c`.

use crate::common::fx_hash::FxHashSet;
use crate::common::visited::VisitedGuard;
use crate::ir::entity::{EntityId, Owner};
use crate::ir::graph::{Graph, GraphId};
use crate::ir::node::{Node, NodeId};
use crate::ir::program::Program;
use crate::ir::ty::{Ty, TypeId};

/// Resolve the entity a pointer node points into, ignoring any offset
/// (`find_entity`): an `Address`/`Member` node names its entity directly; an
/// `Add`/`Sub` is a pointer plus an offset, so the reference-typed operand is
/// the one that still denotes an entity. Returns `None` when no entity can be
/// found (e.g. the pointer is itself the result of a `Load`).
fn find_entity(graph: &Graph, node: NodeId) -> Option<EntityId> {
    match graph.node(node) {
        Node::Address(e) => Some(*e),
        Node::Member { entity, .. } => Some(*entity),
        Node::Add { left, right } | Node::Sub { left, right } => {
            if graph.node(*left).mode(graph).is_reference() {
                find_entity(graph, *left)
            } else if graph.node(*right).mode(graph).is_reference() {
                find_entity(graph, *right)
            } else {
                None
            }
        }
        _ => None,
    }
}

/// Is the entity `ptr` points to volatile itself, or part of a larger
/// volatile entity reached by walking back up an array-index chain?
///
/// If no entity can be found, this assumes volatility.
pub fn is_inside_volatile_entity(prog: &Program, graph_id: GraphId, ptr: NodeId) -> bool {
    let graph = prog.graph(graph_id);
    let Some(entity) = find_entity(graph, ptr) else {
        return true;
    };
    if prog.entity(entity).volatile {
        return true;
    }
    match graph.node(ptr) {
        Node::Sel { base, .. } => is_inside_volatile_entity(prog, graph_id, *base),
        _ => false,
    }
}

/// Does `ty` (directly, or through a struct/union member, recursively) carry
/// a `volatile`-qualified field? Fields are represented as entities owned by
/// `Owner::Type(ty)` (§3 "Entity"); a compound type without any volatile
/// member, direct or nested, is not partly volatile.
pub fn contains_volatile_entity(prog: &Program, ty: TypeId) -> bool {
    let mut visited = FxHashSet::default();
    contains_volatile_entity_rec(prog, ty, &mut visited)
}

fn contains_volatile_entity_rec(prog: &Program, ty: TypeId, visited: &mut FxHashSet<TypeId>) -> bool {
    let Some(mut guard) = VisitedGuard::enter(visited, ty) else {
        return false;
    };
    match prog.types.get(ty) {
        Ty::Struct(_) | Ty::Union(_) => {
            let fields: Vec<_> = prog.entities_with_owner(Owner::Type(ty)).collect();
            fields.into_iter().any(|field| {
                let field_entity = prog.entity(field);
                field_entity.volatile || contains_volatile_entity_rec(prog, field_entity.ty, guard.set())
            })
        }
        Ty::Primitive(_) | Ty::Pointer(_) | Ty::Class { .. } | Ty::Method(_) => false,
    }
}

/// Does loading or storing through `ptr` touch volatile storage, whether
/// because the entity it points to is itself volatile, because it is part of
/// a volatile enclosing entity, or because its type contains a volatile
/// member?
///
/// If no entity can be found for `ptr`, this assumes volatility (§4.F, §7).
pub fn is_partly_volatile(prog: &Program, graph_id: GraphId, ptr: NodeId) -> bool {
    let graph = prog.graph(graph_id);
    let Some(entity) = find_entity(graph, ptr) else {
        return true;
    };
    let ty = prog.entity(entity).ty;
    contains_volatile_entity(prog, ty) || is_inside_volatile_entity(prog, graph_id, ptr)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::entity::Entity;
    use crate::ir::mode::PTR64;
    use crate::ir::ty::Field;

    #[test]
    fn struct_with_no_volatile_field_is_not_volatile() {
        let mut prog = Program::new();
        let i32_ty = prog.intern_type(Ty::Primitive(PTR64));
        let s = prog.intern_type(Ty::Struct(vec![Field { name: "a".into(), ty: i32_ty, bitfield_size: None }]));
        prog.add_entity(Entity::new("a", Owner::Type(s), i32_ty));
        assert!(!contains_volatile_entity(&prog, s));
    }

    #[test]
    fn direct_volatile_field_makes_struct_contain_volatile_entity() {
        let mut prog = Program::new();
        let i32_ty = prog.intern_type(Ty::Primitive(PTR64));
        let s = prog.intern_type(Ty::Struct(vec![Field { name: "a".into(), ty: i32_ty, bitfield_size: None }]));
        let mut field = Entity::new("a", Owner::Type(s), i32_ty);
        field.volatile = true;
        prog.add_entity(field);
        assert!(contains_volatile_entity(&prog, s));
    }

    #[test]
    fn nested_volatile_field_propagates_to_outer_struct() {
        let mut prog = Program::new();
        let i32_ty = prog.intern_type(Ty::Primitive(PTR64));
        let inner = prog.intern_type(Ty::Struct(vec![Field { name: "x".into(), ty: i32_ty, bitfield_size: None }]));
        let mut inner_field = Entity::new("x", Owner::Type(inner), i32_ty);
        inner_field.volatile = true;
        prog.add_entity(inner_field);

        let outer = prog.intern_type(Ty::Struct(vec![Field { name: "inner".into(), ty: inner, bitfield_size: None }]));
        prog.add_entity(Entity::new("inner", Owner::Type(outer), inner));

        assert!(contains_volatile_entity(&prog, outer));
    }

    #[test]
    fn self_referential_class_hierarchy_does_not_infinite_loop() {
        let mut prog = Program::new();
        let i32_ty = prog.intern_type(Ty::Primitive(PTR64));
        let s = prog.intern_type(Ty::Struct(vec![Field { name: "a".into(), ty: i32_ty, bitfield_size: None }]));
        // A field whose type is the struct itself -- pathological, but must
        // terminate rather than recurse forever.
        prog.add_entity(Entity::new("self", Owner::Type(s), s));
        assert!(!contains_volatile_entity(&prog, s));
    }

    #[test]
    fn is_inside_volatile_entity_detects_volatile_field_through_member_chain() {
        let mut prog = Program::new();
        let i32_ty = prog.intern_type(Ty::Primitive(PTR64));
        let s = prog.intern_type(Ty::Struct(vec![Field { name: "a".into(), ty: i32_ty, bitfield_size: None }]));
        let mut field = Entity::new("a", Owner::Type(s), i32_ty);
        field.volatile = true;
        let field_ent = prog.add_entity(field);

        let g = prog.new_graph();
        let frame = prog.graph(g).frame;
        let member = prog.graph_mut(g).push(Node::Member { base: frame, entity: field_ent });
        assert!(is_inside_volatile_entity(&prog, g, member));
    }

    #[test]
    fn is_inside_volatile_entity_walks_back_through_sel() {
        let mut prog = Program::new();
        let i32_ty = prog.intern_type(Ty::Primitive(PTR64));
        let elem = prog.intern_type(Ty::Struct(vec![Field { name: "a".into(), ty: i32_ty, bitfield_size: None }]));
        let array_entity_ty = elem;
        let mut elem_field = Entity::new("a", Owner::Type(elem), i32_ty);
        elem_field.volatile = true;
        prog.add_entity(elem_field);

        let g = prog.new_graph();
        let frame = prog.graph(g).frame;
        let array_entity = prog.add_entity({
            let mut e = Entity::new("arr", Owner::Frame(g), array_entity_ty);
            e.volatile = true;
            e
        });
        let graph = prog.graph_mut(g);
        let member = graph.push(Node::Member { base: frame, entity: array_entity });
        let index = graph.push(Node::Const(0));
        let sel = graph.push(Node::Sel { base: member, index });
        assert!(is_inside_volatile_entity(&prog, g, sel));
    }

    #[test]
    fn is_inside_volatile_entity_returns_true_when_no_entity_found() {
        let mut prog = Program::new();
        let g = prog.new_graph();
        let load = prog.graph_mut(g).push(Node::Load { ptr: 0, mode: PTR64 });
        assert!(is_inside_volatile_entity(&prog, g, load));
    }

    #[test]
    fn is_partly_volatile_true_for_volatile_entity_itself() {
        let mut prog = Program::new();
        let i32_ty = prog.intern_type(Ty::Primitive(PTR64));
        let g = prog.new_graph();
        let frame = prog.graph(g).frame;
        let mut local = Entity::new("x", Owner::Frame(g), i32_ty);
        local.volatile = true;
        let local_ent = prog.add_entity(local);
        let member = prog.graph_mut(g).push(Node::Member { base: frame, entity: local_ent });
        assert!(is_partly_volatile(&prog, g, member));
    }

    #[test]
    fn is_partly_volatile_true_when_type_contains_a_volatile_field() {
        let mut prog = Program::new();
        let i32_ty = prog.intern_type(Ty::Primitive(PTR64));
        let s = prog.intern_type(Ty::Struct(vec![Field { name: "a".into(), ty: i32_ty, bitfield_size: None }]));
        let mut field = Entity::new("a", Owner::Type(s), i32_ty);
        field.volatile = true;
        prog.add_entity(field);

        let g = prog.new_graph();
        let frame = prog.graph(g).frame;
        let local_ent = prog.add_entity(Entity::new("x", Owner::Frame(g), s));
        let member = prog.graph_mut(g).push(Node::Member { base: frame, entity: local_ent });
        assert!(is_partly_volatile(&prog, g, member));
    }

    #[test]
    fn is_partly_volatile_false_for_plain_non_volatile_entity() {
        let mut prog = Program::new();
        let i32_ty = prog.intern_type(Ty::Primitive(PTR64));
        let g = prog.new_graph();
        let frame = prog.graph(g).frame;
        let local_ent = prog.add_entity(Entity::new("x", Owner::Frame(g), i32_ty));
        let member = prog.graph_mut(g).push(Node::Member { base: frame, entity: local_ent });
        assert!(!is_partly_volatile(&prog, g, member));
    }

    #[test]
    fn is_partly_volatile_assumes_volatility_when_no_entity_found() {
        let mut prog = Program::new();
        let g = prog.new_graph();
        let load = prog.graph_mut(g).push(Node::Load { ptr: 0, mode: PTR64 });
        assert!(is_partly_volatile(&prog, g, load));
    }

    #[test]
    fn find_entity_peels_a_reference_typed_add_operand() {
        let mut prog = Program::new();
        let i32_ty = prog.intern_type(Ty::Primitive(PTR64));
        let g = prog.new_graph();
        let frame = prog.graph(g).frame;
        let mut local = Entity::new("x", Owner::Frame(g), i32_ty);
        local.volatile = true;
        let local_ent = prog.add_entity(local);
        let graph = prog.graph_mut(g);
        let member = graph.push(Node::Member { base: frame, entity: local_ent });
        let offset = graph.push(Node::Const(4));
        let add = graph.push(Node::Add { left: member, right: offset });
        assert!(is_partly_volatile(&prog, g, add));
    }
}
