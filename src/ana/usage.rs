//! Component D: entity usage analysis. Grounded on `determine_entity_usage`,
//! `analyse_irg_entity_usage`, `assure_irg_entity_usage_computed`,
//! `check_initializer_value`/`check_initializer_nodes`/`check_initializer`/
//! `check_initializers`, and `analyse_irp_globals_entity_usage` in
//! `irmemory.c`.

use log::debug;

use crate::common::fx_hash::{FxHashMap, FxHashSet};
use crate::common::visited::VisitedGuard;
use crate::ir::entity::{EntityId, Initializer, InitializerNode, Owner, UsageBits};
use crate::ir::graph::{Graph, GraphId};
use crate::ir::mode::{Mode, PTR64};
use crate::ir::node::{Node, NodeId};
use crate::ir::program::{GlobalsUsageState, Program};

const LOG_TARGET: &str = "firm::ana::irmemory";

/// §4.D's successor classifier: what using `addr_node` as input to `succ`
/// says about the entity `addr_node` is (transitively) the address of.
/// Nodes that merely relay the address (`Id`, `Proj`, `Tuple`, `Phi`, or a
/// `Sel`/`Member` that further selects within the same entity) are followed
/// recursively instead of contributing a usage bit directly.
fn classify_successor(
    prog: &Program,
    graph: &Graph,
    visited: &mut FxHashSet<NodeId>,
    addr_node: NodeId,
    succ: NodeId,
    entity_mode: Mode,
) -> UsageBits {
    match graph.node(succ) {
        Node::Load { mode, .. } => {
            if mode.is_hidden_cast(entity_mode) {
                UsageBits::READ | UsageBits::REINTERPRET_CAST
            } else {
                UsageBits::READ
            }
        }
        Node::Store { ptr, value, mode } => {
            let mut bits = UsageBits::empty();
            if *ptr == addr_node {
                bits |= UsageBits::WRITE;
                if mode.is_hidden_cast(entity_mode) {
                    bits |= UsageBits::REINTERPRET_CAST;
                }
            }
            if *value == addr_node {
                // The address itself is being stored into memory: the entity
                // it denotes escapes into a location this analysis can no
                // longer track, so its usage degrades to the fixed point.
                bits |= UsageBits::UNKNOWN;
            }
            bits
        }
        Node::CopyB { dst, src, .. } => {
            let mut bits = UsageBits::empty();
            if *dst == addr_node {
                bits |= UsageBits::WRITE;
            }
            if *src == addr_node {
                bits |= UsageBits::READ;
            }
            bits
        }
        Node::Sel { base, index } => {
            if *base == addr_node {
                accumulate(prog, graph, visited, succ, entity_mode)
            } else {
                debug_assert_eq!(*index, addr_node);
                // The address is used as a plain integer value (an array
                // index): it has escaped into ordinary data flow.
                UsageBits::ADDRESS_TAKEN
            }
        }
        Node::Member { base, .. } => {
            debug_assert_eq!(*base, addr_node);
            accumulate(prog, graph, visited, succ, entity_mode)
        }
        Node::Id(_) | Node::Proj { .. } | Node::Tuple(_) | Node::Phi { .. } => {
            accumulate(prog, graph, visited, succ, entity_mode)
        }
        Node::Call { callee, .. } => {
            if *callee == addr_node {
                UsageBits::READ
            } else {
                // Any other input slot (an argument, or -- never in
                // practice, see the invariant on `Node::Call` -- the memory
                // input) means the address has escaped into the callee.
                UsageBits::UNKNOWN
            }
        }
        Node::Builtin { .. } => UsageBits::UNKNOWN,
        _ => UsageBits::UNKNOWN,
    }
}

fn accumulate(prog: &Program, graph: &Graph, visited: &mut FxHashSet<NodeId>, node: NodeId, entity_mode: Mode) -> UsageBits {
    let Some(mut guard) = VisitedGuard::enter(visited, node) else {
        return UsageBits::empty();
    };
    let mut bits = UsageBits::empty();
    for succ in graph.out_edges(node) {
        bits |= classify_successor(prog, graph, guard.set(), node, succ, entity_mode);
        if bits.contains(UsageBits::UNKNOWN) {
            break;
        }
    }
    bits
}

/// Determine the usage bits of an entity given every node in its graph that
/// directly denotes its address (`Address(entity)` or `Member { entity, .. }`
/// nodes).
pub fn determine_entity_usage(prog: &Program, graph: &Graph, roots: &[NodeId], entity_mode: Mode) -> UsageBits {
    let mut visited = FxHashSet::default();
    let mut bits = UsageBits::empty();
    for &root in roots {
        bits |= accumulate(prog, graph, &mut visited, root, entity_mode);
        if bits.contains(UsageBits::UNKNOWN) {
            break;
        }
    }
    bits
}

fn address_roots_for_graph(graph: &Graph, entity_ids: &[EntityId]) -> FxHashMap<EntityId, Vec<NodeId>> {
    let mut roots: FxHashMap<EntityId, Vec<NodeId>> = FxHashMap::default();
    for nid in graph.node_ids() {
        if let Node::Member { entity, .. } = graph.node(nid) {
            if entity_ids.contains(entity) {
                roots.entry(*entity).or_default().push(nid);
            }
        }
    }
    roots
}

/// The per-graph pass (§4.D): (re-)compute usage bits for every local entity
/// owned by this graph's frame.
fn analyse_irg_entity_usage(prog: &mut Program, graph_id: GraphId) {
    let local_entities: Vec<EntityId> = prog.entities_with_owner(Owner::Frame(graph_id)).collect();
    for &e in &local_entities {
        prog.entity_mut(e).usage = UsageBits::empty();
    }

    let roots = address_roots_for_graph(prog.graph(graph_id), &local_entities);
    for (entity, roots) in roots {
        let mode = prog.types.mode(prog.entity(entity).ty).unwrap_or(PTR64);
        let graph = prog.graph(graph_id);
        let bits = determine_entity_usage(prog, graph, &roots, mode);
        prog.entity_mut(entity).usage |= bits;
        debug!(target: LOG_TARGET, "entity {entity} usage = {:?}", prog.entity(entity).usage);
    }

    analyse_static_link_accesses(prog, graph_id, &local_entities);

    prog.graph_mut(graph_id).entity_usage_consistent = true;
}

/// Inner functions reach an outer frame's entities through their static-link
/// argument (argument 0), selected with a `Member` whose owner is the outer
/// frame type. Each such access is as much a use of the outer entity as a
/// direct `Member` rooted at this graph's own frame, so it is folded into the
/// outer entity's usage bits the same way (§4.D, mirrors the
/// "check inner functions accessing outer frame" loop in `irmemory.c`).
fn analyse_static_link_accesses(prog: &mut Program, graph_id: GraphId, local_entities: &[EntityId]) {
    for &e in local_entities {
        if !prog.entity(e).is_method() {
            continue;
        }
        let Some(inner_id) = prog.entity(e).graph else { continue };
        let Some(&static_link_arg) = prog.graph(inner_id).args.first() else { continue };

        let inner_graph = prog.graph(inner_id);
        let accesses: Vec<(NodeId, EntityId)> = inner_graph
            .out_edges(static_link_arg)
            .into_iter()
            .filter_map(|succ| match inner_graph.node(succ) {
                Node::Member { base, entity } if *base == static_link_arg && prog.entity(*entity).owner == Owner::Frame(graph_id) => {
                    Some((succ, *entity))
                }
                _ => None,
            })
            .collect();

        for (member_node, outer_entity) in accesses {
            let mode = prog.types.mode(prog.entity(outer_entity).ty).unwrap_or(PTR64);
            let inner_graph = prog.graph(inner_id);
            let bits = determine_entity_usage(prog, inner_graph, &[member_node], mode);
            prog.entity_mut(outer_entity).usage |= bits;
            debug!(target: LOG_TARGET, "entity {outer_entity} usage (via static link from graph {inner_id}) = {:?}", prog.entity(outer_entity).usage);
        }
    }
}

/// Lazily (re)compute a single graph's local entity usage (§3 Lifecycle).
pub fn assure_graph_entity_usage(prog: &mut Program, graph_id: GraphId) {
    if prog.graph(graph_id).entity_usage_consistent {
        return;
    }
    analyse_irg_entity_usage(prog, graph_id);
}

fn check_initializer_node(prog: &mut Program, owner_entity: EntityId, node: &InitializerNode) {
    match node {
        InitializerNode::Address(referenced) => {
            // Decision (d), SPEC_FULL.md §9: a method's initializer referring
            // to itself (e.g. a vtable slot pointing back at its own method)
            // is not treated as taking its own address.
            let is_self_reference = prog.entity(owner_entity).is_method() && *referenced == owner_entity;
            if !is_self_reference {
                prog.entity_mut(*referenced).usage |= UsageBits::UNKNOWN;
            }
        }
        InitializerNode::Other(children) => {
            for child in children {
                check_initializer_node(prog, owner_entity, child);
            }
        }
    }
}

fn check_initializer(prog: &mut Program, owner_entity: EntityId, init: &Initializer) {
    match init {
        Initializer::Const(node) => check_initializer_node(prog, owner_entity, node),
        Initializer::Compound(items) => {
            for item in items {
                check_initializer(prog, owner_entity, item);
            }
        }
        Initializer::Tarval(_) | Initializer::Null => {}
    }
}

fn check_initializers(prog: &mut Program) {
    let entity_ids: Vec<EntityId> = prog.entity_ids().collect();
    for e in entity_ids {
        if let Some(init) = prog.entity(e).initializer.clone() {
            check_initializer(prog, e, &init);
        }
    }
}

/// Seed every global/TLS-segment entity's usage: `unknown` if it is
/// externally visible (another translation unit, or the linker, may use it
/// in ways this program never shows), `none` otherwise (mirrors
/// `init_entity_usage` in `irmemory.c`).
fn init_entity_usage(prog: &mut Program) {
    let entity_ids: Vec<EntityId> = prog.entity_ids().collect();
    for e in entity_ids {
        if !matches!(prog.entity(e).owner, Owner::Global | Owner::Tls) {
            continue;
        }
        let seed = if prog.entity(e).is_externally_visible() { UsageBits::UNKNOWN } else { UsageBits::empty() };
        prog.entity_mut(e).usage = seed;
    }
}

/// Walk every graph's `Address` nodes and fold the successor-classifier
/// result into the entity each one denotes -- the only place a global or
/// method entity's usage picks up contributions from actually being read,
/// written, called, or having its address passed around in the IR (mirrors
/// `check_global_address` in `irmemory.c`).
fn check_global_addresses(prog: &mut Program) {
    let graph_ids: Vec<GraphId> = prog.graph_ids().collect();
    for g in graph_ids {
        let graph = prog.graph(g);
        let address_nodes: Vec<(NodeId, EntityId)> = graph
            .node_ids()
            .filter_map(|n| match graph.node(n) {
                Node::Address(entity) => Some((n, *entity)),
                _ => None,
            })
            .collect();
        for (addr_node, entity) in address_nodes {
            let mode = prog.types.mode(prog.entity(entity).ty).unwrap_or(PTR64);
            let graph = prog.graph(g);
            let bits = determine_entity_usage(prog, graph, &[addr_node], mode);
            prog.entity_mut(entity).usage |= bits;
            debug!(target: LOG_TARGET, "entity {entity} usage (via Address node in graph {g}) = {:?}", prog.entity(entity).usage);
        }
    }
}

/// The program-wide pass (§4.D): seed every global/TLS entity's usage, fold
/// in every graph's local-entity usage and static-link accesses, every
/// entity's initializer, and every `Address` node's successor walk, into a
/// single "are globals' usage bits up to date" state (§3 Lifecycle, §6
/// `get/set/assure_irp_globals_entity_usage_state`).
pub fn assure_program_globals_entity_usage(prog: &mut Program) {
    if prog.get_globals_usage_state() == GlobalsUsageState::Computed {
        return;
    }
    init_entity_usage(prog);
    let graph_ids: Vec<GraphId> = prog.graph_ids().collect();
    for g in graph_ids {
        assure_graph_entity_usage(prog, g);
    }
    check_initializers(prog);
    check_global_addresses(prog);
    prog.set_globals_usage_state(GlobalsUsageState::Computed);
}
