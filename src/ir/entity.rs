//! Named, typed storage locations: fields, locals, globals, and function
//! entities (§3 "Entity").

use bitflags::bitflags;

use crate::ir::graph::GraphId;
use crate::ir::ty::TypeId;

pub type EntityId = usize;

bitflags! {
    /// Linkage flags. Only the one bit the analyser consults (§4.D "hidden
    /// user") and external visibility are modelled; a real compiler would
    /// carry weak/common/merge flags too, but nothing here reads them.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Linkage: u8 {
        /// Accessed by hand-written code outside the IR (e.g. inline asm,
        /// a runtime support routine referencing the entity by name).
        const HIDDEN_USER = 0b01;
        /// Visible to other translation units / not statically resolvable.
        const EXTERNALLY_VISIBLE = 0b10;
    }
}

bitflags! {
    /// Additional per-entity properties (§3 "additional properties
    /// bitset").
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct EntityProperties: u8 {
        /// The callee of a call returning this entity's address is a
        /// malloc-like allocator (§4.A rule 3).
        const MALLOC = 0b01;
        /// Marked as privately-callable by `ana::private::mark_private_methods`.
        const PRIVATE = 0b10;
    }
}

bitflags! {
    /// Per-entity usage summary (§3 "Usage bits", §4.D).
    ///
    /// `UNKNOWN` is a fixed point under combination with any other flag set
    /// (it subsumes read+write+address-taken); callers that OR usage bits
    /// together get this "for free" from `bitflags`' `Or` impl, since
    /// `UNKNOWN`'s bit pattern already covers read/write/address-taken.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct UsageBits: u8 {
        const READ = 0b0001;
        const WRITE = 0b0010;
        const ADDRESS_TAKEN = 0b0100;
        const REINTERPRET_CAST = 0b1000;
        /// The fixed point of `|`: contains every other bit, so OR-ing it
        /// with any usage set yields itself back (§3 invariant).
        const UNKNOWN = Self::READ.bits() | Self::WRITE.bits() | Self::ADDRESS_TAKEN.bits() | Self::REINTERPRET_CAST.bits();
    }
}

impl UsageBits {
    pub fn is_address_taken(&self) -> bool {
        self.contains(UsageBits::ADDRESS_TAKEN)
    }
}

#[derive(Debug, Clone)]
pub enum Initializer {
    /// An arbitrary expression DAG rooted at a node that is not itself part
    /// of any graph's live code -- only walked for embedded `Address`
    /// nodes (§4.D program-wide pass).
    Const(InitializerNode),
    Tarval(i128),
    Null,
    Compound(Vec<Initializer>),
}

/// A tiny standalone expression node used only inside initialisers, distinct
/// from `ir::node::Node` because initialisers are not part of any graph's
/// live out-edge structure.
#[derive(Debug, Clone)]
pub enum InitializerNode {
    Address(EntityId),
    Other(Vec<InitializerNode>),
}

/// What aggregate an entity belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Owner {
    Type(TypeId),
    Tls,
    Global,
    /// The per-graph frame type; distinguished from `Type` so storage-class
    /// rule 2 (`b == frame node`) and rule 1 (`owner == tls type`) cannot be
    /// confused for each other.
    Frame(GraphId),
}

#[derive(Debug, Clone)]
pub struct Entity {
    pub name: String,
    pub owner: Owner,
    pub ty: TypeId,
    pub linkage: Linkage,
    pub props: EntityProperties,
    pub usage: UsageBits,
    pub volatile: bool,
    pub initializer: Option<Initializer>,
    /// Set only for method entities with an associated IR graph.
    pub graph: Option<GraphId>,
    pub bitfield_size: Option<u32>,
}

impl Entity {
    pub fn new(name: impl Into<String>, owner: Owner, ty: TypeId) -> Self {
        Self {
            name: name.into(),
            owner,
            ty,
            linkage: Linkage::empty(),
            props: EntityProperties::empty(),
            usage: UsageBits::empty(),
            volatile: false,
            initializer: None,
            graph: None,
            bitfield_size: None,
        }
    }

    pub fn is_externally_visible(&self) -> bool {
        self.linkage.contains(Linkage::EXTERNALLY_VISIBLE)
    }

    pub fn is_bitfield(&self) -> bool {
        self.bitfield_size.is_some_and(|n| n > 0)
    }

    pub fn is_method(&self) -> bool {
        self.graph.is_some()
    }
}
