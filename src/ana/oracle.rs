//! Component C: the alias oracle. Grounded on `_get_alias_relation` /
//! `get_alias_relation` in `irmemory.c`; rule numbers in comments refer to
//! SPEC_FULL.md §4.C.

use log::{debug, trace};

use crate::ana::normalize::{peel_fields, peel_offsets};
use crate::ana::options::DisambiguatorOptions;
use crate::ana::storage_class::{classify_pointer, StorageClass, StorageClassModifiers};
use crate::ir::graph::GraphId;
use crate::ir::node::{Node, NodeId};
use crate::ir::program::Program;
use crate::ir::ty::TypeId;

const LOG_TARGET: &str = "firm::ana::irmemory";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AliasRelation {
    No,
    May,
    Sure,
}

impl AliasRelation {
    /// Canonical name (§6). Total over the three variants -- kept
    /// deliberately panic-free in Rust, since an exhaustive three-variant
    /// enum cannot reach an "unknown" arm; the source IR's `panic("UNKNOWN
    /// alias relation")` default case was a translation artifact of C's
    /// non-exhaustive `switch` (see SPEC_FULL.md §1.B).
    pub fn as_str(&self) -> &'static str {
        match self {
            AliasRelation::No => "no",
            AliasRelation::May => "may",
            AliasRelation::Sure => "sure",
        }
    }
}

impl std::fmt::Display for AliasRelation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An address to query: which graph it lives in, and the node itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Addr {
    pub graph: GraphId,
    pub node: NodeId,
}

fn entity_of_address_or_member(graph: &crate::ir::graph::Graph, node: NodeId) -> Option<crate::ir::entity::EntityId> {
    match graph.node(node) {
        Node::Address(e) => Some(*e),
        Node::Member { entity, .. } => Some(*entity),
        _ => None,
    }
}

/// §4.C step 13's entity-type pruning sub-rule: dereference pointer
/// envelopes in lock-step, then compare constructors / class hierarchy.
fn different_types(prog: &Program, a1: &Addr, a2: &Addr) -> AliasRelation {
    let g1 = prog.graph(a1.graph);
    let g2 = prog.graph(a2.graph);
    let ent1 = entity_of_address_or_member(g1, a1.node);
    let ent2 = entity_of_address_or_member(g2, a2.node);

    if let (Some(e1), Some(e2)) = (ent1, ent2) {
        let mut tp1 = prog.entity(e1).ty;
        let mut tp2 = prog.entity(e2).ty;
        if tp1 != tp2 {
            while prog.types.is_pointer(tp1) && prog.types.is_pointer(tp2) {
                tp1 = prog.types.pointee(tp1).unwrap();
                tp2 = prog.types.pointee(tp2).unwrap();
            }
            if !prog.types.same_constructor(tp1, tp2) {
                return AliasRelation::No;
            }
            if prog.types.is_class(tp1) {
                if !prog.types.is_subclass_of(tp1, tp2) && !prog.types.is_subclass_of(tp2, tp1) {
                    return AliasRelation::No;
                }
            } else {
                return AliasRelation::No;
            }
        }
    }
    AliasRelation::May
}

fn is_global_like(class: StorageClass) -> bool {
    matches!(
        class,
        StorageClass::Globalvar | StorageClass::Localvar | StorageClass::Tls | StorageClass::Globaladdr
    )
}

/// Component C's public entry point: `alias(addr1, type1, addr2, type2)`.
pub fn alias_relation(prog: &Program, addr1: Addr, type1: TypeId, addr2: Addr, type2: TypeId) -> AliasRelation {
    let rel = alias_relation_inner(prog, addr1, type1, addr2, type2);
    debug!(target: LOG_TARGET, "alias({:?}, {:?}) = {}", addr1, addr2, rel);
    rel
}

fn alias_relation_inner(prog: &Program, addr1: Addr, type1: TypeId, addr2: Addr, type2: TypeId) -> AliasRelation {
    // Step 1: global kill-switch.
    if prog.program_options.contains(DisambiguatorOptions::NO_ALIAS_ANALYSIS) {
        return AliasRelation::May;
    }

    // Step 2: trivial identity.
    if addr1 == addr2 {
        return AliasRelation::Sure;
    }

    // Step 3: per-graph Armageddon switch.
    let options = prog.get_graph_options(addr1.graph);
    if options.contains(DisambiguatorOptions::NO_ALIAS) {
        return AliasRelation::No;
    }

    // Step 4: offset normalisation.
    let g1 = prog.graph(addr1.graph);
    let g2 = prog.graph(addr2.graph);
    let norm1 = peel_offsets(g1, addr1.node);
    let norm2 = peel_offsets(g2, addr2.node);
    let type_size = prog.types.size_bytes(type1).max(prog.types.size_bytes(type2)) as i128;

    // Step 5: same base and same symbolic offset.
    if addr1.graph == addr2.graph
        && norm1.base == norm2.base
        && norm1.sym_offset == norm2.sym_offset
        && !norm1.have_sym_overflow
        && !norm2.have_sym_overflow
    {
        let (first_off, first_size, last_off) = if norm1.const_offset <= norm2.const_offset {
            (norm1.const_offset, prog.types.size_bytes(type1) as i128, norm2.const_offset)
        } else {
            (norm2.const_offset, prog.types.size_bytes(type2) as i128, norm1.const_offset)
        };
        return if first_off + first_size <= last_off { AliasRelation::No } else { AliasRelation::Sure };
    }

    // Step 6: field peeling.
    let (root1, ent1) = peel_fields(g1, norm1.base);
    let (root2, ent2) = peel_fields(g2, norm2.base);

    // Step 7: field-selection reasoning.
    if let (Some(e1), Some(e2)) = (ent1, ent2) {
        if e1 == e2 {
            return if root1 == root2 && addr1.graph == addr2.graph { AliasRelation::Sure } else { AliasRelation::May };
        }
        let owner1 = prog.entity(e1).owner;
        let owner2 = prog.entity(e2).owner;
        if owner1 != owner2 {
            return AliasRelation::May;
        }
        let same_owner_is_union = match owner1 {
            crate::ir::entity::Owner::Type(tid) => prog.types.is_union(tid),
            _ => false,
        };
        return if same_owner_is_union || prog.entity(e1).is_bitfield() || prog.entity(e2).is_bitfield() {
            AliasRelation::May
        } else {
            AliasRelation::No
        };
    }

    // Step 8: classify roots.
    let c1 = classify_pointer(prog, addr1.graph, root1, ent1);
    let c2 = classify_pointer(prog, addr2.graph, root2, ent2);

    // Step 9: struct-vs-variable asymmetry.
    if ent1.is_none() && ent2.is_some() && is_global_like(c1.class) {
        return AliasRelation::No;
    }
    if ent2.is_none() && ent1.is_some() && is_global_like(c2.class) {
        return AliasRelation::No;
    }

    let (class1, class2);
    let (mut off1, mut off2) = (norm1.const_offset, norm2.const_offset);

    if c1.class == StorageClass::Pointer || c2.class == StorageClass::Pointer {
        // Step 10: arrange so the pointer side is side 1.
        let (mods1, mods2, cls1, cls2, base1, base2) = if c2.class == StorageClass::Pointer {
            (c2.modifiers, c1.modifiers, c2.class, c1.class, root2, root1)
        } else {
            (c1.modifiers, c2.modifiers, c1.class, c2.class, root1, root2)
        };
        class1 = cls1;
        class2 = cls2;
        let _ = (base1, base2);

        if mods2.contains(StorageClassModifiers::NOTTAKEN) {
            return AliasRelation::No;
        }
        if mods1.contains(StorageClassModifiers::ARGUMENT) {
            if options.contains(DisambiguatorOptions::NO_ALIAS_ARGS) && mods2.contains(StorageClassModifiers::ARGUMENT) {
                return AliasRelation::No;
            }
            if options.contains(DisambiguatorOptions::NO_ALIAS_ARGS_GLOBAL)
                && matches!(class2, StorageClass::Globalvar | StorageClass::Tls | StorageClass::Globaladdr)
            {
                return AliasRelation::No;
            }
        }
    } else if c1.class != c2.class {
        // Step 11: different concrete classes.
        return AliasRelation::No;
    } else {
        // Step 12: same concrete class.
        class1 = c1.class;
        class2 = c2.class;
        match class1 {
            StorageClass::Globalvar => {
                let e1 = match g1.node(root1) {
                    Node::Address(e) => *e,
                    _ => unreachable!("globalvar root must be an Address node"),
                };
                let e2 = match g2.node(root2) {
                    Node::Address(e) => *e,
                    _ => unreachable!("globalvar root must be an Address node"),
                };
                return if e1 != e2 { AliasRelation::No } else { AliasRelation::May };
            }
            StorageClass::Globaladdr => {
                let c1v = match g1.node(root1) {
                    Node::Const(v) => *v,
                    _ => unreachable!("globaladdr root must be a Const node"),
                };
                let c2v = match g2.node(root2) {
                    Node::Const(v) => *v,
                    _ => unreachable!("globaladdr root must be a Const node"),
                };
                off1 += c1v;
                off2 += c2v;
                return if (off2 - off1).abs() >= type_size { AliasRelation::No } else { AliasRelation::Sure };
            }
            StorageClass::Malloced => {
                return if root1 == root2 && addr1.graph == addr2.graph { AliasRelation::Sure } else { AliasRelation::No };
            }
            _ => {}
        }
    }
    let _ = (class1, class2);

    // Step 13: type-based pruning.
    if options.contains(DisambiguatorOptions::TYPE_BASED) {
        let byte_sized = prog.types.size_bytes(type1) == 1 || prog.types.size_bytes(type2) == 1;
        if !(options.contains(DisambiguatorOptions::BYTE_TYPE_MAY_ALIAS) && byte_sized) {
            if prog.types.size_bytes(type1) != prog.types.size_bytes(type2) {
                return AliasRelation::No;
            }
            if prog.types.is_pointer(type1) != prog.types.is_pointer(type2) {
                return AliasRelation::No;
            }
            if prog.types.is_primitive(type1) && prog.types.is_primitive(type2) {
                let m1 = prog.types.mode(type1).unwrap();
                let m2 = prog.types.mode(type2).unwrap();
                if m1.arith != m2.arith {
                    return AliasRelation::No;
                }
            }
            let rel = different_types(prog, &addr1, &addr2);
            if rel != AliasRelation::May {
                return rel;
            }
        }
    }

    // Step 14: language callback.
    if let Some(callback) = prog.language_disambiguator() {
        let rel = callback(prog, addr1.node, type1, addr2.node, type2);
        if rel != AliasRelation::May {
            trace!(target: LOG_TARGET, "language disambiguator overrode default may-alias");
            return rel;
        }
    }

    // Step 15: default.
    AliasRelation::May
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::entity::{Entity, EntityProperties, Owner};
    use crate::ir::mode::{I32, I8};
    use crate::ir::node::Node;
    use crate::ir::ty::Ty;

    fn i32_ty(prog: &mut Program) -> TypeId {
        prog.intern_type(Ty::Primitive(I32))
    }

    #[test]
    fn reflexivity() {
        let mut prog = Program::new();
        let g = prog.new_graph();
        let ty = i32_ty(&mut prog);
        let arg0 = prog.graph_mut(g).add_arg(0);
        let addr = Addr { graph: g, node: arg0 };
        assert_eq!(alias_relation(&prog, addr, ty, addr, ty), AliasRelation::Sure);
    }

    #[test]
    fn kill_switch_dominance() {
        let mut prog = Program::new();
        let g = prog.new_graph();
        let ty = i32_ty(&mut prog);
        let a = prog.graph_mut(g).add_arg(0);
        let b = prog.graph_mut(g).add_arg(1);
        prog.program_options = DisambiguatorOptions::NO_ALIAS_ANALYSIS;
        assert_eq!(
            alias_relation(&prog, Addr { graph: g, node: a }, ty, Addr { graph: g, node: b }, ty),
            AliasRelation::May
        );
        prog.program_options = DisambiguatorOptions::empty();
        prog.set_graph_options(g, DisambiguatorOptions::NO_ALIAS);
        assert_eq!(
            alias_relation(&prog, Addr { graph: g, node: a }, ty, Addr { graph: g, node: b }, ty),
            AliasRelation::No
        );
    }

    #[test]
    fn disjoint_fixed_offsets_from_same_base_no_alias() {
        let mut prog = Program::new();
        let g = prog.new_graph();
        let ty = i32_ty(&mut prog);
        let graph = prog.graph_mut(g);
        let base = graph.add_arg(0);
        let c0 = graph.push(Node::Const(0));
        let c4 = graph.push(Node::Const(4));
        let a1 = graph.push(Node::Add { left: base, right: c0 });
        let a2 = graph.push(Node::Add { left: base, right: c4 });
        assert_eq!(
            alias_relation(&prog, Addr { graph: g, node: a1 }, ty, Addr { graph: g, node: a2 }, ty),
            AliasRelation::No
        );
    }

    #[test]
    fn overlapping_fixed_offsets_sure_alias() {
        let mut prog = Program::new();
        let g = prog.new_graph();
        let ty = i32_ty(&mut prog);
        let graph = prog.graph_mut(g);
        let base = graph.add_arg(0);
        let c0 = graph.push(Node::Const(0));
        let c2 = graph.push(Node::Const(2));
        let a1 = graph.push(Node::Add { left: base, right: c0 });
        let a2 = graph.push(Node::Add { left: base, right: c2 });
        assert_eq!(
            alias_relation(&prog, Addr { graph: g, node: a1 }, ty, Addr { graph: g, node: a2 }, ty),
            AliasRelation::Sure
        );
    }

    #[test]
    fn same_symbolic_offset_cancels_no_alias_different_symbol_may_alias() {
        let mut prog = Program::new();
        let g = prog.new_graph();
        let ty = i32_ty(&mut prog);
        let base = prog.graph_mut(g).add_arg(0);
        let i = prog.graph_mut(g).push(Node::Load { ptr: 0, mode: I32 });
        let j = prog.graph_mut(g).push(Node::Load { ptr: 1, mode: I32 });
        let c4 = prog.graph_mut(g).push(Node::Const(4));
        let zero = prog.graph_mut(g).push(Node::Const(0));

        // base + i + 0
        let p1 = prog.graph_mut(g).push(Node::Add { left: base, right: i });
        let addr1 = prog.graph_mut(g).push(Node::Add { left: p1, right: zero });
        // base + i + 4
        let addr2 = prog.graph_mut(g).push(Node::Add { left: p1, right: c4 });
        assert_eq!(
            alias_relation(&prog, Addr { graph: g, node: addr1 }, ty, Addr { graph: g, node: addr2 }, ty),
            AliasRelation::No
        );

        // Now vary the second addend's symbol.
        let p2 = prog.graph_mut(g).push(Node::Add { left: base, right: j });
        let addr3 = prog.graph_mut(g).push(Node::Add { left: p2, right: c4 });
        assert_eq!(
            alias_relation(&prog, Addr { graph: g, node: addr1 }, ty, Addr { graph: g, node: addr3 }, ty),
            AliasRelation::May
        );
    }

    #[test]
    fn two_distinct_globals_no_alias() {
        let mut prog = Program::new();
        let g = prog.new_graph();
        let ty = i32_ty(&mut prog);
        let e1 = prog.add_entity(Entity::new("g1", Owner::Global, ty));
        let e2 = prog.add_entity(Entity::new("g2", Owner::Global, ty));
        let graph = prog.graph_mut(g);
        let a1 = graph.push(Node::Address(e1));
        let a2 = graph.push(Node::Address(e2));
        assert_eq!(
            alias_relation(&prog, Addr { graph: g, node: a1 }, ty, Addr { graph: g, node: a2 }, ty),
            AliasRelation::No
        );
    }

    #[test]
    fn argument_pointer_vs_nottaken_local_no_alias() {
        let mut prog = Program::new();
        let g = prog.new_graph();
        let ty = i32_ty(&mut prog);
        let local = prog.add_entity(Entity::new("local", Owner::Frame(g), ty));
        let arg0 = prog.graph_mut(g).add_arg(0);
        let frame = prog.graph(g).frame;
        let member = prog.graph_mut(g).push(Node::Member { base: frame, entity: local });
        assert_eq!(
            alias_relation(&prog, Addr { graph: g, node: arg0 }, ty, Addr { graph: g, node: member }, ty),
            AliasRelation::No
        );
    }

    #[test]
    fn two_independent_malloc_results_no_alias() {
        let mut prog = Program::new();
        let g = prog.new_graph();
        let ty = i32_ty(&mut prog);
        let method_ty = prog.intern_type(Ty::Method(crate::ir::ty::MethodType {
            params: vec![],
            ret: ty,
            variadic: false,
            private: false,
        }));
        let mut malloc_fn = Entity::new("malloc", Owner::Global, method_ty);
        malloc_fn.props |= EntityProperties::MALLOC;
        let malloc_ent = prog.add_entity(malloc_fn);
        let graph = prog.graph_mut(g);
        let mk_malloc = |graph: &mut crate::ir::graph::Graph| {
            let callee = graph.push(Node::Address(malloc_ent));
            let mem = graph.push(Node::Const(0));
            let call = graph.push(Node::Call { callee, args: vec![], mem });
            let proj0 = graph.push(Node::Proj { pred: call, index: 0 });
            graph.push(Node::Proj { pred: proj0, index: 0 })
        };
        let m1 = mk_malloc(graph);
        let m2 = mk_malloc(graph);
        assert_eq!(
            alias_relation(&prog, Addr { graph: g, node: m1 }, ty, Addr { graph: g, node: m2 }, ty),
            AliasRelation::No
        );
    }

    #[test]
    fn byte_load_vs_int_store_type_based() {
        let mut prog = Program::new();
        let g = prog.new_graph();
        let i32t = i32_ty(&mut prog);
        let i8t = prog.intern_type(Ty::Primitive(I8));
        let a = prog.graph_mut(g).add_arg(0);
        let b = prog.graph_mut(g).add_arg(1);
        prog.set_graph_options(g, DisambiguatorOptions::TYPE_BASED | DisambiguatorOptions::BYTE_TYPE_MAY_ALIAS);
        assert_eq!(
            alias_relation(&prog, Addr { graph: g, node: a }, i8t, Addr { graph: g, node: b }, i32t),
            AliasRelation::May
        );
        prog.set_graph_options(g, DisambiguatorOptions::TYPE_BASED);
        assert_eq!(
            alias_relation(&prog, Addr { graph: g, node: a }, i8t, Addr { graph: g, node: b }, i32t),
            AliasRelation::No
        );
    }

    #[test]
    fn union_field_accesses_may_alias() {
        let mut prog = Program::new();
        let g = prog.new_graph();
        let i32t = i32_ty(&mut prog);
        let union_ty = prog.intern_type(Ty::Union(vec![
            crate::ir::ty::Field { name: "a".into(), ty: i32t, bitfield_size: None },
            crate::ir::ty::Field { name: "b".into(), ty: i32t, bitfield_size: None },
        ]));
        let fa = prog.add_entity(Entity::new("a", Owner::Type(union_ty), i32t));
        let fb = prog.add_entity(Entity::new("b", Owner::Type(union_ty), i32t));
        let graph = prog.graph_mut(g);
        let base = graph.add_arg(0);
        let ma = graph.push(Node::Member { base, entity: fa });
        let mb = graph.push(Node::Member { base, entity: fb });
        assert_eq!(
            alias_relation(&prog, Addr { graph: g, node: ma }, i32t, Addr { graph: g, node: mb }, i32t),
            AliasRelation::May
        );
    }

    #[test]
    fn struct_field_vs_different_entity_struct_no_alias() {
        let mut prog = Program::new();
        let g = prog.new_graph();
        let i32t = i32_ty(&mut prog);
        let struct_ty = prog.intern_type(Ty::Struct(vec![
            crate::ir::ty::Field { name: "a".into(), ty: i32t, bitfield_size: None },
            crate::ir::ty::Field { name: "b".into(), ty: i32t, bitfield_size: None },
        ]));
        let fa = prog.add_entity(Entity::new("a", Owner::Type(struct_ty), i32t));
        let fb = prog.add_entity(Entity::new("b", Owner::Type(struct_ty), i32t));
        let graph = prog.graph_mut(g);
        let base = graph.add_arg(0);
        let ma = graph.push(Node::Member { base, entity: fa });
        let mb = graph.push(Node::Member { base, entity: fb });
        assert_eq!(
            alias_relation(&prog, Addr { graph: g, node: ma }, i32t, Addr { graph: g, node: mb }, i32t),
            AliasRelation::No
        );
    }

    #[test]
    fn symmetry_holds_on_a_sample() {
        let mut prog = Program::new();
        let g = prog.new_graph();
        let ty = i32_ty(&mut prog);
        let graph = prog.graph_mut(g);
        let base = graph.add_arg(0);
        let c0 = graph.push(Node::Const(0));
        let c2 = graph.push(Node::Const(2));
        let a1 = graph.push(Node::Add { left: base, right: c0 });
        let a2 = graph.push(Node::Add { left: base, right: c2 });
        let r1 = alias_relation(&prog, Addr { graph: g, node: a1 }, ty, Addr { graph: g, node: a2 }, ty);
        let r2 = alias_relation(&prog, Addr { graph: g, node: a2 }, ty, Addr { graph: g, node: a1 }, ty);
        assert_eq!(r1, r2);
    }

    #[test]
    fn relation_name_is_canonical() {
        assert_eq!(AliasRelation::No.as_str(), "no");
        assert_eq!(AliasRelation::May.as_str(), "may");
        assert_eq!(AliasRelation::Sure.as_str(), "sure");
    }
}
