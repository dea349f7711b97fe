//! The explicit "compiler context" object (§5, §9) that threads all
//! program-wide mutable state: graphs, entities, types, the global segments,
//! the program-wide option mask, the language-disambiguator callback slot,
//! and the globals-usage computation state. Callers own one `Program` per
//! compilation unit rather than reaching for ambient statics.

use crate::ana::options::DisambiguatorOptions;
use crate::common::fx_hash::FxHashMap;
use crate::ir::entity::{Entity, EntityId, Owner};
use crate::ir::graph::{Graph, GraphId};
use crate::ir::node::NodeId;
use crate::ir::ty::{Ty, TypeId, TypePool};

/// Program-level state for the entity-usage analysis (§3 Lifecycle,
/// component D's "program-wide pass").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GlobalsUsageState {
    NotComputed,
    /// Reserved for hosts that compute usage incrementally per segment;
    /// this crate's own `assure_program_globals_entity_usage` only ever
    /// observes `NotComputed` or `Computed`, but the state is public API
    /// (§6) so a host may set it explicitly.
    Partial,
    Computed,
}

pub type AliasCallback =
    Box<dyn Fn(&Program, crate::ir::node::NodeId, TypeId, crate::ir::node::NodeId, TypeId) -> crate::ana::oracle::AliasRelation>;

pub struct Program {
    pub types: TypePool,
    entities: Vec<Entity>,
    graphs: Vec<Graph>,
    pub program_options: DisambiguatorOptions,
    globals_usage_state: GlobalsUsageState,
    language_disambiguator: Option<AliasCallback>,
    /// Method type attached to each `Call` node, if any. This substrate's
    /// `ir::node::Node::Call` does not itself carry a type annotation (unlike
    /// the reference IR's call nodes); callers that want private-method call
    /// rewriting (§4.E `update_calls_to_private`) to have somewhere to land
    /// record it here instead.
    call_types: FxHashMap<(GraphId, NodeId), TypeId>,
}

impl std::fmt::Debug for Program {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Program")
            .field("entities", &self.entities.len())
            .field("graphs", &self.graphs.len())
            .field("program_options", &self.program_options)
            .field("globals_usage_state", &self.globals_usage_state)
            .field("language_disambiguator", &self.language_disambiguator.is_some())
            .finish()
    }
}

impl Program {
    pub fn new() -> Self {
        Self {
            types: TypePool::new(),
            entities: Vec::new(),
            graphs: Vec::new(),
            program_options: DisambiguatorOptions::empty(),
            globals_usage_state: GlobalsUsageState::NotComputed,
            language_disambiguator: None,
            call_types: FxHashMap::default(),
        }
    }

    pub fn new_graph(&mut self) -> GraphId {
        let id = self.graphs.len();
        self.graphs.push(Graph::new(id));
        id
    }

    pub fn graph(&self, id: GraphId) -> &Graph {
        &self.graphs[id]
    }

    pub fn graph_mut(&mut self, id: GraphId) -> &mut Graph {
        &mut self.graphs[id]
    }

    pub fn graph_ids(&self) -> impl Iterator<Item = GraphId> {
        0..self.graphs.len()
    }

    pub fn add_entity(&mut self, entity: Entity) -> EntityId {
        self.entities.push(entity);
        self.entities.len() - 1
    }

    pub fn entity(&self, id: EntityId) -> &Entity {
        &self.entities[id]
    }

    pub fn entity_mut(&mut self, id: EntityId) -> &mut Entity {
        &mut self.entities[id]
    }

    pub fn entity_ids(&self) -> impl Iterator<Item = EntityId> {
        0..self.entities.len()
    }

    pub fn entities_with_owner<'a>(&'a self, owner: Owner) -> impl Iterator<Item = EntityId> + 'a {
        self.entity_ids().filter(move |&id| self.entity(id).owner == owner)
    }

    pub fn intern_type(&mut self, ty: Ty) -> TypeId {
        self.types.intern(ty)
    }

    // --- §6 external interfaces -------------------------------------------------

    pub fn get_graph_options(&self, graph: GraphId) -> DisambiguatorOptions {
        let opts = self.graph(graph).options;
        if opts.contains(DisambiguatorOptions::INHERITED) {
            self.program_options
        } else {
            opts
        }
    }

    pub fn set_graph_options(&mut self, graph: GraphId, options: DisambiguatorOptions) {
        self.graph_mut(graph).options = options & !DisambiguatorOptions::INHERITED;
    }

    pub fn set_program_options(&mut self, options: DisambiguatorOptions) {
        self.program_options = options;
    }

    pub fn register_language_disambiguator(&mut self, callback: AliasCallback) {
        self.language_disambiguator = Some(callback);
    }

    pub fn language_disambiguator(&self) -> Option<&AliasCallback> {
        self.language_disambiguator.as_ref()
    }

    pub fn set_call_type(&mut self, graph: GraphId, call: NodeId, ty: TypeId) {
        self.call_types.insert((graph, call), ty);
    }

    pub fn call_type(&self, graph: GraphId, call: NodeId) -> Option<TypeId> {
        self.call_types.get(&(graph, call)).copied()
    }

    pub fn get_globals_usage_state(&self) -> GlobalsUsageState {
        self.globals_usage_state
    }

    pub fn set_globals_usage_state(&mut self, state: GlobalsUsageState) {
        self.globals_usage_state = state;
    }
}

impl Default for Program {
    fn default() -> Self {
        Self::new()
    }
}
